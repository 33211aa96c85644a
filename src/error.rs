//! Rich diagnostic error types for codepool.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so operators know exactly
//! what went wrong with the pool file and how to fix it.

use miette::Diagnostic;
use thiserror::Error;

use crate::assign::AssignError;
use crate::audit::AuditError;
use crate::config::ConfigError;

/// Top-level error type for codepool.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text, sources) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum CodePoolError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Assign(#[from] AssignError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Audit(#[from] AuditError),
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("storage error on {path}: {source}")]
    #[diagnostic(
        code(codepool::store::storage),
        help(
            "The pool file could not be read or written. Check that it exists, \
             that its directory has correct permissions, and that the disk is not full. \
             Create a fresh pool with `codepool init`."
        )
    )]
    Storage {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed pool file {path}: {message}")]
    #[diagnostic(
        code(codepool::store::format),
        help(
            "The pool file does not contain a valid code pool. \
             It must be a JSON object with `filename`, `total`, `clicks`, \
             `realismScores` and `codes`, whose code sets agree. \
             Restore it from a backup; regenerating would issue new codes."
        )
    )]
    Format { path: String, message: String },

    #[error("code not found: {code}")]
    #[diagnostic(
        code(codepool::store::not_found),
        help("The code was never issued by this pool. Verify the code is correct.")
    )]
    NotFound { code: String },

    #[error("clickthrough is undefined for an empty pool")]
    #[diagnostic(
        code(codepool::store::empty_pool),
        help("The pool was created with zero codes. Re-initialize it with `--total` greater than 0.")
    )]
    EmptyPool,

    #[error("code generator produced {duplicates} duplicate code(s) while issuing {requested}")]
    #[diagnostic(
        code(codepool::store::duplicate_code),
        help(
            "Random code generation kept colliding, which points at a broken \
             random source. Check the system entropy source and retry."
        )
    )]
    DuplicateCode { requested: usize, duplicates: usize },
}

impl StoreError {
    /// Whether this error means the code is unknown to the pool.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Convenience alias for functions returning codepool results.
pub type CodePoolResult<T> = std::result::Result<T, CodePoolError>;
