//! Persistence and recovery tests for the code store.
//!
//! These tests verify that codes, redemptions, scores and the click count
//! survive a restart (drop the store, reopen the same file).

use codepool::code::Outcome;
use codepool::error::StoreError;
use codepool::store::CodeStore;

#[test]
fn pool_survives_restart() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("codes.json");

    let before;
    // First session: issue, redeem and score.
    {
        let store = CodeStore::create(&path, 5).unwrap();
        let codes: Vec<String> = store
            .snapshot()
            .unwrap()
            .codes
            .keys()
            .map(|c| c.to_string())
            .collect();
        store.redeem(&codes[0]).unwrap();
        store.redeem(&codes[3]).unwrap();
        store.set_score(&codes[0], 2).unwrap();
        store.set_score(&codes[4], 5).unwrap();
        before = store.snapshot().unwrap();
    }

    // Second session: reopen without regenerating.
    {
        let store = CodeStore::open(&path).unwrap();
        assert_eq!(store.snapshot().unwrap(), before);
        assert_eq!(store.clicks().unwrap(), 2);
    }
}

#[test]
fn redeemed_code_stays_redeemed_after_restart() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("codes.json");

    let code;
    {
        let store = CodeStore::create(&path, 1).unwrap();
        code = store.snapshot().unwrap().codes.keys().next().unwrap().to_string();
        assert_eq!(store.redeem(&code).unwrap(), Outcome::Success);
    }

    let store = CodeStore::open(&path).unwrap();
    assert_eq!(store.redeem(&code).unwrap(), Outcome::NotFound);
    assert_eq!(store.clicks().unwrap(), 1);
}

#[test]
fn file_uses_documented_field_names() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("codes.json");
    let store = CodeStore::create(&path, 2).unwrap();
    let code = store.snapshot().unwrap().codes.keys().next().unwrap().to_string();
    store.redeem(&code).unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["filename"], serde_json::json!(path.display().to_string()));
    assert_eq!(raw["total"], serde_json::json!(2));
    assert_eq!(raw["clicks"], serde_json::json!(1));
    assert_eq!(raw["codes"][&code], serde_json::json!(false));
    assert_eq!(raw["realismScores"][&code], serde_json::json!(-1));
}

#[test]
fn hand_written_pool_file_opens() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("base.json");
    std::fs::write(
        &path,
        r#"{
  "filename": "base.json",
  "total": 2,
  "clicks": 1,
  "realismScores": { "one": 3, "two": -1 },
  "codes": { "one": false, "two": true }
}"#,
    )
    .unwrap();

    let store = CodeStore::open(&path).unwrap();
    assert_eq!(store.score("one").unwrap(), 3);
    assert_eq!(store.redeem("one").unwrap(), Outcome::NotFound);
    assert_eq!(store.redeem("two").unwrap(), Outcome::Success);
    assert_eq!(store.clickthrough().unwrap(), 1.0);
}

#[test]
fn open_missing_file_is_storage_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let err = CodeStore::open(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, StoreError::Storage { .. }));
}

#[test]
fn open_mismatched_code_sets_is_format_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("codes.json");
    std::fs::write(
        &path,
        r#"{"filename":"codes.json","total":1,"clicks":0,"realismScores":{"a":-1},"codes":{"b":true}}"#,
    )
    .unwrap();
    let err = CodeStore::open(&path).unwrap_err();
    assert!(matches!(err, StoreError::Format { .. }));
}
