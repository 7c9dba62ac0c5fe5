//! External capability contracts.
//!
//! Language generation and code search are consumed through these narrow
//! request/response traits; the workflow never talks to a provider directly.
//! Implementations live in the interaction and infrastructure crates and are
//! injected at construction time.

pub mod language;
pub mod search;

pub use language::{ChatMessage, LanguageCapability};
pub use search::{CodeSearchCapability, CodeSnippet};
