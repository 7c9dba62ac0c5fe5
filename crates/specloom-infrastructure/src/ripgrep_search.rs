//! Ripgrep-based code search implementation.

use async_trait::async_trait;
use specloom_core::capability::{CodeSearchCapability, CodeSnippet};
use specloom_core::error::{Result, SpecloomError};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Code search backed by the `rg` binary.
///
/// Repository identifiers resolve to directories under a common root; a
/// repository without a matching directory yields no hits rather than an
/// error, so a stale selection cannot wedge a session.
pub struct RipgrepCodeSearch {
    root: PathBuf,
}

impl RipgrepCodeSearch {
    /// Creates a search service resolving repositories under `root`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn execute_ripgrep(&self, path: &Path, query: &str, limit: usize) -> Result<Vec<CodeSnippet>> {
        let mut cmd = Command::new("rg");
        cmd.arg("--line-number");
        cmd.arg("--no-heading");
        cmd.arg("--with-filename");
        cmd.arg("--fixed-strings");
        cmd.arg("--max-count").arg(limit.to_string());
        cmd.arg(query);
        cmd.arg(path);

        tracing::debug!("Executing ripgrep command: {:?}", cmd);

        let output = cmd
            .output()
            .map_err(|e| SpecloomError::io(format!("Failed to execute ripgrep: {}", e)))?;
        check_ripgrep_exit(output.status.code(), &output.stderr)?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_ripgrep_output(&stdout, limit))
    }
}

/// Validates ripgrep's exit code: 0 is matches, 1 is no matches, anything
/// else is a usage or runtime fault and surfaces as an error.
fn check_ripgrep_exit(code: Option<i32>, stderr: &[u8]) -> Result<()> {
    match code {
        Some(0) | Some(1) => Ok(()),
        _ => {
            let stderr = String::from_utf8_lossy(stderr);
            Err(SpecloomError::io(format!(
                "ripgrep exited with {:?}: {}",
                code,
                stderr.trim()
            )))
        }
    }
}

/// Parses ripgrep's "path:line_number:content" output.
fn parse_ripgrep_output(output: &str, limit: usize) -> Vec<CodeSnippet> {
    let mut snippets = Vec::new();

    for line in output.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.splitn(3, ':').collect();
        if parts.len() >= 3 {
            snippets.push(CodeSnippet {
                file: parts[0].to_string(),
                line: parts[1].parse::<usize>().ok(),
                content: parts[2].to_string(),
                score: None,
            });
        }
        if snippets.len() >= limit {
            break;
        }
    }

    snippets
}

#[async_trait]
impl CodeSearchCapability for RipgrepCodeSearch {
    async fn search(
        &self,
        repository: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<CodeSnippet>> {
        if query.trim().is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let path = self.root.join(repository);
        if !path.is_dir() {
            tracing::warn!("Repository directory not found: {}", path.display());
            return Ok(Vec::new());
        }

        self.execute_ripgrep(&path, query, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_output_extracts_fields() {
        let output = "src/auth.rs:42:fn login() {\nsrc/auth.rs:77:fn logout() {\n";
        let snippets = parse_ripgrep_output(output, 10);

        assert_eq!(snippets.len(), 2);
        assert_eq!(snippets[0].file, "src/auth.rs");
        assert_eq!(snippets[0].line, Some(42));
        assert_eq!(snippets[1].content, "fn logout() {");
    }

    #[test]
    fn test_parse_output_honors_limit() {
        let output = "a.rs:1:x\nb.rs:2:y\nc.rs:3:z\n";
        assert_eq!(parse_ripgrep_output(output, 2).len(), 2);
    }

    #[test]
    fn test_parse_output_skips_malformed_lines() {
        let output = "not-a-match\na.rs:7:let token = refresh();\n";
        let snippets = parse_ripgrep_output(output, 10);
        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].line, Some(7));
    }

    #[test]
    fn test_exit_codes_zero_and_one_are_success() {
        assert!(check_ripgrep_exit(Some(0), b"").is_ok());
        assert!(check_ripgrep_exit(Some(1), b"").is_ok());
    }

    #[test]
    fn test_usage_error_exit_code_is_an_error() {
        let err = check_ripgrep_exit(Some(2), b"error: unrecognized flag").unwrap_err();
        assert!(err.to_string().contains("unrecognized flag"));
        // Killed by signal: no exit code, still an error.
        assert!(check_ripgrep_exit(None, b"").is_err());
    }

    #[tokio::test]
    async fn test_unknown_repository_yields_no_hits() {
        let search = RipgrepCodeSearch::new("/nonexistent-root");
        let hits = search.search("ghost-repo", "fn main", 5).await.unwrap();
        assert!(hits.is_empty());
    }
}
