//! Flat-file persistence for the code pool.
//!
//! The whole pool is one JSON document. Reads replace the in-memory copy
//! wholesale; writes overwrite the file.

use std::path::Path;

use crate::error::StoreError;
use crate::pool::CodePool;
use crate::store::StoreResult;

/// Read and validate the pool stored at `path`.
pub fn read_pool(path: &Path) -> StoreResult<CodePool> {
    let data = std::fs::read_to_string(path).map_err(|e| StoreError::Storage {
        path: path.display().to_string(),
        source: e,
    })?;
    let pool: CodePool = serde_json::from_str(&data).map_err(|e| StoreError::Format {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    pool.check_invariants().map_err(|message| StoreError::Format {
        path: path.display().to_string(),
        message,
    })?;
    tracing::debug!(path = %path.display(), total = pool.total, clicks = pool.clicks, "loaded pool");
    Ok(pool)
}

/// Overwrite the file at `path` with `pool`.
pub fn write_pool(path: &Path, pool: &CodePool) -> StoreResult<()> {
    let json = serde_json::to_string_pretty(pool).map_err(|e| StoreError::Format {
        path: path.display().to_string(),
        message: format!("serialize pool: {e}"),
    })?;
    std::fs::write(path, json).map_err(|e| StoreError::Storage {
        path: path.display().to_string(),
        source: e,
    })?;
    tracing::debug!(path = %path.display(), clicks = pool.clicks, "flushed pool");
    Ok(())
}
