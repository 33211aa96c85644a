//! File-backed code store.
//!
//! [`CodeStore`] owns one pool file and one lock. Every public operation
//! takes the lock, reloads the pool from disk, acts, and (for mutators)
//! flushes it back before releasing the lock. The file is the only source of
//! truth; the in-memory [`CodePool`] is scratch space between calls.

pub mod file;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::code::{self, Outcome};
use crate::error::StoreError;
use crate::pool::CodePool;

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A pool of single-use codes mirrored to a JSON file.
pub struct CodeStore {
    path: PathBuf,
    pool: Mutex<CodePool>,
}

impl CodeStore {
    /// Issue `total` fresh codes and write the new pool to `path`.
    ///
    /// Any existing file at `path` is overwritten.
    pub fn create(path: impl Into<PathBuf>, total: usize) -> StoreResult<Self> {
        let path = path.into();
        let codes = code::generate(total)?;
        let pool = CodePool::new(path.display().to_string(), codes);
        file::write_pool(&path, &pool)?;
        tracing::info!(path = %path.display(), total, "created code pool");
        Ok(Self {
            path,
            pool: Mutex::new(pool),
        })
    }

    /// Reopen a pool previously written by [`CodeStore::create`].
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let pool = file::read_pool(&path)?;
        tracing::info!(
            path = %path.display(),
            total = pool.total,
            clicks = pool.clicks,
            "opened code pool"
        );
        Ok(Self {
            path,
            pool: Mutex::new(pool),
        })
    }

    /// Open the pool at `path`, creating it with `total` codes if absent.
    pub fn open_or_create(path: impl Into<PathBuf>, total: usize) -> StoreResult<Self> {
        let path = path.into();
        if path.exists() {
            Self::open(path)
        } else {
            Self::create(path, total)
        }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Redeem `code` at most once.
    ///
    /// Unknown and already-redeemed codes both yield [`Outcome::NotFound`].
    pub fn redeem(&self, code: &str) -> StoreResult<Outcome> {
        let mut pool = self.load()?;
        let outcome = pool.redeem(code);
        match outcome {
            Outcome::Success => {
                self.flush(&pool)?;
                tracing::info!(code, clicks = pool.clicks, "redeemed code");
            }
            Outcome::NotFound => tracing::warn!(code, "rejected redemption"),
        }
        Ok(outcome)
    }

    /// Record a realism score against `code`, redeemed or not.
    ///
    /// The score is stored as given; range checks belong to the caller.
    pub fn set_score(&self, code: &str, score: i32) -> StoreResult<()> {
        let mut pool = self.load()?;
        if !pool.set_score(code, score) {
            return Err(StoreError::NotFound { code: code.into() });
        }
        self.flush(&pool)?;
        tracing::info!(code, score, "recorded score");
        Ok(())
    }

    /// Realism score of `code`, [`UNSET_SCORE`](crate::code::UNSET_SCORE) if unrated.
    pub fn score(&self, code: &str) -> StoreResult<i32> {
        let pool = self.load()?;
        pool.score(code)
            .ok_or_else(|| StoreError::NotFound { code: code.into() })
    }

    /// Number of successful redemptions.
    pub fn clicks(&self) -> StoreResult<usize> {
        Ok(self.load()?.clicks)
    }

    /// Redeemed codes over issued codes. Fails with [`StoreError::EmptyPool`]
    /// when no codes were issued.
    pub fn clickthrough(&self) -> StoreResult<f64> {
        self.load()?.clickthrough().ok_or(StoreError::EmptyPool)
    }

    /// A freshly loaded copy of the whole pool.
    pub fn snapshot(&self) -> StoreResult<CodePool> {
        Ok(self.load()?.clone())
    }

    /// Take the lock and replace the scratch pool with the file contents.
    ///
    /// On failure the scratch pool is left as it was; it is replaced again on
    /// the next successful load.
    fn load(&self) -> StoreResult<MutexGuard<'_, CodePool>> {
        let mut guard = self.pool.lock().unwrap_or_else(|poisoned| {
            tracing::warn!(path = %self.path.display(), "recovering poisoned pool lock");
            poisoned.into_inner()
        });
        *guard = file::read_pool(&self.path)?;
        Ok(guard)
    }

    /// Write the scratch pool back. The caller must hold the lock.
    fn flush(&self, pool: &CodePool) -> StoreResult<()> {
        file::write_pool(&self.path, pool)
    }
}

impl std::fmt::Debug for CodeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeStore")
            .field("path", &self.path)
            .finish()
    }
}
