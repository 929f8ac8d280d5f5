//! Common test infrastructure
//!
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{next_song_event, TestDataSet, USER_1_ID, TS_1};
//! use sparkify_etl::warehouse::SchemaVariant;
//!
//! #[test]
//! fn test_single_play() {
//!     let data = TestDataSet::with_catalog();
//!     data.add_log("2018/11/2018-11-11-events.json", &[next_song_event(TS_1, USER_1_ID, "free", "Song A", "Artist A", 200.0)]);
//!     let (store, summary) = data.run(SchemaVariant::Ledger).unwrap();
//! }
//! ```

#![allow(dead_code)]

mod constants;
mod fixtures;

pub use constants::*;
pub use fixtures::*;
