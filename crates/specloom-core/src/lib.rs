pub mod capability;
pub mod checkpoint;
pub mod error;
pub mod session;
pub mod step;

// Re-export common error type
pub use error::{Result, SpecloomError};
