//! Code-search capability trait.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single code-search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeSnippet {
    /// File path relative to the repository root.
    pub file: String,
    /// Line number where the match was found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// The matching line or snippet.
    pub content: String,
    /// Relevance score assigned by the capability, if it ranks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

/// Service searching one repository for code relevant to a query.
///
/// Results come back in the capability's own ranking order; callers
/// truncate but never re-rank.
#[async_trait]
pub trait CodeSearchCapability: Send + Sync {
    async fn search(&self, repository: &str, query: &str, limit: usize)
        -> Result<Vec<CodeSnippet>>;
}
