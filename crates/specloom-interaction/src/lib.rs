//! Language-capability implementations.

pub mod openrouter;

pub use openrouter::OpenRouterCapability;
