//! Redemption codes and their generation.
//!
//! A [`Code`] is an opaque, single-use token. Codes are UUID v4 strings in
//! canonical hyphenated lowercase form, giving 122 random bits per code.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::StoreResult;

/// Score stored against a code that has not been rated yet.
pub const UNSET_SCORE: i32 = -1;

/// Regeneration rounds allowed before a collision is treated as a broken RNG.
const MAX_GENERATION_ROUNDS: usize = 8;

/// An opaque, single-use redemption code.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Code(String);

impl Code {
    /// Generate a fresh random code.
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The code as it appears on the wire and on disk.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Code {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Code {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::borrow::Borrow<str> for Code {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Result of a redemption attempt.
///
/// An already-redeemed code and a code that was never issued both report
/// [`Outcome::NotFound`], so callers cannot probe which codes exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    NotFound,
    Success,
}

impl Outcome {
    pub fn is_success(self) -> bool {
        matches!(self, Outcome::Success)
    }
}

/// Generate `n` distinct codes.
///
/// Collisions are regenerated rather than dropped, so the result always holds
/// exactly `n` codes or the call fails.
pub fn generate(n: usize) -> StoreResult<Vec<Code>> {
    generate_with(n, Code::random)
}

pub(crate) fn generate_with(n: usize, mut next: impl FnMut() -> Code) -> StoreResult<Vec<Code>> {
    let mut seen = BTreeSet::new();
    let mut codes = Vec::with_capacity(n);

    for _ in 0..MAX_GENERATION_ROUNDS {
        let mut duplicates = 0;
        while codes.len() < n {
            let code = next();
            if seen.insert(code.clone()) {
                codes.push(code);
            } else {
                duplicates += 1;
                if duplicates > n {
                    break;
                }
            }
        }
        if codes.len() == n {
            return Ok(codes);
        }
        tracing::warn!(duplicates, requested = n, "code generator collided, regenerating");
    }

    Err(StoreError::DuplicateCode {
        requested: n,
        duplicates: n - codes.len(),
    })
}
