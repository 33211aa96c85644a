//! Match codes seen in a server log against a pool.
//!
//! Request logs mention codes as they are redeemed or rated. Scanning a log
//! for UUID-shaped tokens and keeping only those the pool issued tells which
//! recipients actually followed their link.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::LazyLock;

use miette::Diagnostic;
use regex::Regex;
use thiserror::Error;

use crate::code::Code;
use crate::pool::CodePool;

#[derive(Debug, Error, Diagnostic)]
pub enum AuditError {
    #[error("failed to read log: {path}")]
    #[diagnostic(
        code(codepool::audit::read),
        help("Point `--log` at the server's captured output.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

static CODE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
        .expect("code pattern is a valid regex")
});

/// Codes mentioned in `text` that belong to `pool`, deduplicated and sorted.
pub fn scan(text: &str, pool: &CodePool) -> Vec<Code> {
    let seen: BTreeSet<&str> = CODE_PATTERN.find_iter(text).map(|m| m.as_str()).collect();
    seen.into_iter()
        .filter(|token| pool.codes.contains_key(*token))
        .map(Code::from)
        .collect()
}

/// Read the log at `path` and [`scan`] it.
pub fn scan_file(path: &Path, pool: &CodePool) -> Result<Vec<Code>, AuditError> {
    let text = std::fs::read_to_string(path).map_err(|e| AuditError::Read {
        path: path.display().to_string(),
        source: e,
    })?;
    let found = scan(&text, pool);
    tracing::debug!(path = %path.display(), found = found.len(), "scanned log");
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISSUED: &str = "0b7e7d4a-3c51-4c1e-9a0e-6f2b8d1c5e90";
    const OTHER_ISSUED: &str = "9f1c2a33-7b4d-4e8a-8c6f-1d2e3f4a5b6c";
    const FOREIGN: &str = "11111111-2222-4333-8444-555555555555";

    fn pool() -> CodePool {
        CodePool::new("codes.json", vec![Code::from(ISSUED), Code::from(OTHER_ISSUED)])
    }

    #[test]
    fn finds_only_issued_codes_once() {
        let log = format!(
            "2026/10/01 redeeming {ISSUED}...\n\
             2026/10/01 redeeming {FOREIGN}...\n\
             2026/10/01 setting score for {ISSUED} to 4...\n"
        );
        assert_eq!(scan(&log, &pool()), vec![Code::from(ISSUED)]);
    }

    #[test]
    fn empty_log_finds_nothing() {
        assert!(scan("starting server...\n", &pool()).is_empty());
    }

    #[test]
    fn missing_log_is_read_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = scan_file(&dir.path().join("absent.log"), &pool()).unwrap_err();
        assert!(matches!(err, AuditError::Read { .. }));
    }

    #[test]
    fn scans_file_contents() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("server.log");
        std::fs::write(&path, format!("{OTHER_ISSUED}\n{ISSUED}\n")).unwrap();
        let found = scan_file(&path, &pool()).unwrap();
        assert_eq!(found.len(), 2);
    }
}
