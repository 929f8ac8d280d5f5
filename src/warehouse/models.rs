//! Row models for the warehouse tables.
//!
//! These are the already-transformed rows handed to a `WarehouseStore`; the raw
//! JSON input shapes live in `etl::records`.

use serde::{Deserialize, Serialize};

// =============================================================================
// Enumerations
// =============================================================================

/// Subscription level of a user at the time of an event.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Free,
    Paid,
}

impl Level {
    /// Convert from database string representation
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "free" => Some(Level::Free),
            "paid" => Some(Level::Paid),
            _ => None,
        }
    }

    /// Convert to database string representation
    pub fn to_db_str(&self) -> &'static str {
        match self {
            Level::Free => "free",
            Level::Paid => "paid",
        }
    }
}

/// Result of submitting a single row under its table's conflict policy.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InsertOutcome {
    /// A new row was written.
    Inserted,
    /// The primary key already existed and the row was skipped.
    Ignored,
    /// The row was written or, if the key existed, its mutable fields overwritten.
    Upserted,
}

// =============================================================================
// Dimension rows
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub song_id: String,
    pub title: String,
    pub artist_id: String,
    pub year: i32,
    /// Length in seconds.
    pub duration: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    pub artist_id: String,
    pub name: String,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub level: Level,
}

/// One decomposed event timestamp. All fields are UTC.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayTime {
    /// Epoch milliseconds, the same value stored on `SongPlay::start_time`.
    pub start_time: i64,
    pub hour: u32,
    pub day: u32,
    /// ISO 8601 week number.
    pub week: u32,
    pub month: u32,
    pub year: i32,
    /// 0 = Monday ... 6 = Sunday.
    pub weekday: u32,
}

// =============================================================================
// Fact rows
// =============================================================================

/// Song and artist ids a play event was resolved to. Both are present or the
/// whole match is absent.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SongMatch {
    pub song_id: String,
    pub artist_id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SongPlay {
    pub start_time: i64,
    pub user_id: i64,
    pub level: Level,
    pub song: Option<SongMatch>,
    pub session_id: i64,
    pub location: Option<String>,
    pub user_agent: Option<String>,
}

/// A song play as read back from the store, with its surrogate key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredSongPlay {
    pub songplay_id: i64,
    #[serde(flatten)]
    pub play: SongPlay,
}

/// Row counts of every warehouse table.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseCounts {
    pub songs: usize,
    pub artists: usize,
    pub users: usize,
    pub times: usize,
    pub song_plays: usize,
}
