// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # codepool
//!
//! A fixed pool of single-use redemption codes, each carrying a realism score,
//! persisted to one flat JSON file.
//!
//! ## Architecture
//!
//! - **Codes** (`code`): UUID v4 tokens, generated collision-free
//! - **Pool** (`pool`): the redemption state machine and its invariants
//! - **Store** (`store`): lock + reload-on-every-call persistence around the pool
//! - **Reporting** (`assign`, `audit`): hand codes out, find who used them
//!
//! ## Library usage
//!
//! ```no_run
//! use codepool::store::CodeStore;
//!
//! let store = CodeStore::open_or_create("codes.json", 40).unwrap();
//! let code = store.snapshot().unwrap().codes.keys().next().unwrap().to_string();
//! if store.redeem(&code).unwrap().is_success() {
//!     store.set_score(&code, 4).unwrap();
//! }
//! println!("clickthrough: {:.2}", store.clickthrough().unwrap());
//! ```

pub mod assign;
pub mod audit;
pub mod code;
pub mod config;
pub mod error;
pub mod pool;
pub mod store;
