//! Storage and search backends.
//!
//! Provides the concrete [`specloom_core::checkpoint::CheckpointRepository`]
//! implementations (in-memory and TOML files) and the ripgrep-backed
//! [`specloom_core::capability::CodeSearchCapability`].

pub mod in_memory_checkpoint_repository;
pub mod ripgrep_search;
pub mod toml_checkpoint_repository;

pub use in_memory_checkpoint_repository::InMemoryCheckpointRepository;
pub use ripgrep_search::RipgrepCodeSearch;
pub use toml_checkpoint_repository::TomlCheckpointRepository;
