//! The code pool aggregate and its redemption state machine.
//!
//! [`CodePool`] is the serialized shape of the pool file and the scratch copy
//! that [`CodeStore`](crate::store::CodeStore) reloads on every call. All
//! transitions here are pure in-memory mutations; persistence and locking
//! live in the store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::code::{Code, Outcome, UNSET_SCORE};

/// Lifecycle state of a single code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeState {
    Unissued,
    Valid,
    Redeemed,
}

/// A fixed pool of codes with their validity flags and realism scores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodePool {
    /// Location of the backing file, as recorded at creation.
    pub filename: String,
    /// Number of codes issued at creation.
    pub total: usize,
    /// Number of successful redemptions.
    pub clicks: usize,
    /// Realism score per code, [`UNSET_SCORE`] until rated.
    #[serde(rename = "realismScores")]
    pub realism_scores: BTreeMap<Code, i32>,
    /// `true` while a code is still redeemable.
    pub codes: BTreeMap<Code, bool>,
}

impl CodePool {
    /// Build a fresh pool: every code valid, every score unset.
    pub fn new(filename: impl Into<String>, codes: Vec<Code>) -> Self {
        let total = codes.len();
        let realism_scores = codes.iter().map(|c| (c.clone(), UNSET_SCORE)).collect();
        let codes = codes.into_iter().map(|c| (c, true)).collect();
        Self {
            filename: filename.into(),
            total,
            clicks: 0,
            realism_scores,
            codes,
        }
    }

    /// Current state of `code`.
    pub fn state(&self, code: &str) -> CodeState {
        match self.codes.get(code) {
            None => CodeState::Unissued,
            Some(true) => CodeState::Valid,
            Some(false) => CodeState::Redeemed,
        }
    }

    /// Consume `code` if it is still valid.
    pub fn redeem(&mut self, code: &str) -> Outcome {
        match self.codes.get_mut(code) {
            Some(valid) if *valid => {
                *valid = false;
                self.clicks += 1;
                Outcome::Success
            }
            _ => Outcome::NotFound,
        }
    }

    /// Realism score of `code`, or `None` if it was never issued.
    pub fn score(&self, code: &str) -> Option<i32> {
        self.realism_scores.get(code).copied()
    }

    /// Overwrite the score of `code`. Returns `false` if it was never issued.
    pub fn set_score(&mut self, code: &str, score: i32) -> bool {
        match self.realism_scores.get_mut(code) {
            Some(slot) => {
                *slot = score;
                true
            }
            None => false,
        }
    }

    /// Ratio of redeemed codes to issued codes, `None` for an empty pool.
    pub fn clickthrough(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        Some(self.clicks as f64 / self.total as f64)
    }

    /// Codes that can still be redeemed, in sorted order.
    pub fn valid_codes(&self) -> impl Iterator<Item = &Code> {
        self.codes
            .iter()
            .filter(|(_, valid)| **valid)
            .map(|(code, _)| code)
    }

    /// Number of codes whose validity flag is cleared.
    pub fn redeemed_count(&self) -> usize {
        self.codes.values().filter(|valid| !**valid).count()
    }

    /// Check the structural invariants a loaded pool must satisfy.
    ///
    /// Returns a description of the first violation found.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.codes.len() != self.realism_scores.len()
            || !self.codes.keys().eq(self.realism_scores.keys())
        {
            return Err("`codes` and `realismScores` hold different code sets".into());
        }
        if self.total != self.codes.len() {
            return Err(format!(
                "total is {} but the pool holds {} code(s)",
                self.total,
                self.codes.len()
            ));
        }
        let redeemed = self.redeemed_count();
        if self.clicks != redeemed {
            return Err(format!(
                "clicks is {} but {redeemed} code(s) are redeemed",
                self.clicks
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> CodePool {
        CodePool::new(
            "codes.json",
            vec![Code::from("a"), Code::from("b"), Code::from("c")],
        )
    }

    #[test]
    fn fresh_pool_is_all_valid_and_unscored() {
        let pool = pool();
        assert_eq!(pool.total, 3);
        assert_eq!(pool.clicks, 0);
        for code in ["a", "b", "c"] {
            assert_eq!(pool.state(code), CodeState::Valid);
            assert_eq!(pool.score(code), Some(UNSET_SCORE));
        }
        assert!(pool.check_invariants().is_ok());
    }

    #[test]
    fn redeem_is_one_way() {
        let mut pool = pool();
        assert_eq!(pool.redeem("a"), Outcome::Success);
        assert_eq!(pool.state("a"), CodeState::Redeemed);
        assert_eq!(pool.redeem("a"), Outcome::NotFound);
        assert_eq!(pool.clicks, 1);
        assert!(pool.check_invariants().is_ok());
    }

    #[test]
    fn redeem_unknown_code_changes_nothing() {
        let mut pool = pool();
        let before = pool.clone();
        assert_eq!(pool.redeem("zzz"), Outcome::NotFound);
        assert_eq!(pool.state("zzz"), CodeState::Unissued);
        assert_eq!(pool, before);
    }

    #[test]
    fn scores_ignore_redemption_state() {
        let mut pool = pool();
        assert!(pool.set_score("b", 4));
        pool.redeem("b");
        assert!(pool.set_score("b", 2));
        assert_eq!(pool.score("b"), Some(2));
        assert!(!pool.set_score("zzz", 3));
        assert_eq!(pool.score("zzz"), None);
    }

    #[test]
    fn clickthrough_ratio_and_empty_pool() {
        let mut pool = pool();
        pool.redeem("a");
        let ratio = pool.clickthrough().unwrap();
        assert!((ratio - 1.0 / 3.0).abs() < f64::EPSILON);

        let empty = CodePool::new("empty.json", Vec::new());
        assert_eq!(empty.clickthrough(), None);
    }

    #[test]
    fn valid_codes_skip_redeemed() {
        let mut pool = pool();
        pool.redeem("b");
        let valid: Vec<_> = pool.valid_codes().map(Code::as_str).collect();
        assert_eq!(valid, vec!["a", "c"]);
    }

    #[test]
    fn invariant_violations_are_reported() {
        let mut pool = pool();
        pool.clicks = 2;
        assert!(pool.check_invariants().unwrap_err().contains("clicks is 2"));

        let mut pool = self::pool();
        pool.realism_scores.remove("c");
        assert!(pool.check_invariants().is_err());

        let mut pool = self::pool();
        pool.total = 7;
        assert!(pool.check_invariants().unwrap_err().contains("total is 7"));
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let json = serde_json::to_value(pool()).unwrap();
        let obj = json.as_object().unwrap();
        for field in ["filename", "total", "clicks", "realismScores", "codes"] {
            assert!(obj.contains_key(field), "missing field {field}");
        }
        assert_eq!(json["codes"]["a"], serde_json::Value::Bool(true));
        assert_eq!(json["realismScores"]["a"], serde_json::json!(-1));
    }
}
