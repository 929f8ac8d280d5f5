//! Shared constants for end-to-end tests
//!
//! When the fixture catalog changes, update only this file.

// ============================================================================
// Fixture Catalog
// ============================================================================

pub const SONG_1_ID: &str = "S1";
pub const SONG_1_TITLE: &str = "Larger Than Life";
pub const SONG_1_DURATION: f64 = 236.25098;
pub const ARTIST_1_ID: &str = "A1";
pub const ARTIST_1_NAME: &str = "X";

pub const SONG_2_ID: &str = "SOZCTXZ12AB0182364";
pub const SONG_2_TITLE: &str = "Setanta matins";
pub const SONG_2_DURATION: f64 = 269.58322;
pub const ARTIST_2_ID: &str = "AR5KOSW1187FB35FF4";
pub const ARTIST_2_NAME: &str = "Elena";

// ============================================================================
// Fixture Activity
// ============================================================================

pub const USER_1_ID: i64 = 15;
pub const USER_2_ID: i64 = 26;

/// Sun 2018-11-11 02:33:56.796 UTC
pub const TS_1: i64 = 1541903636796;
pub const TS_2: i64 = 1541903892796;
pub const TS_3: i64 = 1541904034796;
