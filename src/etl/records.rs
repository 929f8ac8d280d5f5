//! Raw input shapes, exactly as they appear in the JSON source files.

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;

/// The page value marking a song play event.
pub const NEXT_SONG_PAGE: &str = "NextSong";

/// One song-metadata record. A metadata file holds exactly one.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct SongRecord {
    pub song_id: String,
    pub title: String,
    pub artist_id: String,
    pub year: i32,
    pub duration: f64,
    pub artist_name: String,
    #[serde(default)]
    pub artist_location: Option<String>,
    #[serde(default)]
    pub artist_latitude: Option<f64>,
    #[serde(default)]
    pub artist_longitude: Option<f64>,
    #[serde(default)]
    pub num_songs: Option<u32>,
}

/// One user-activity event. Only song plays are decoded in full; other pages
/// (login, home, ...) keep just `page`, since they legitimately lack or mangle
/// user and song fields.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogEvent {
    pub page: String,
    #[serde(default)]
    pub ts: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_user_id")]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub song: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub length: Option<f64>,
    #[serde(default)]
    pub session_id: Option<i64>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl LogEvent {
    pub fn is_song_play(&self) -> bool {
        self.page == NEXT_SONG_PAGE
    }
}

/// A parsed event together with its 1-based line number in the source file.
#[derive(Clone, Debug, PartialEq)]
pub struct LogLine {
    pub line: usize,
    pub event: LogEvent,
}

/// Logged-out events carry `"userId": ""`; the rest use a number or a numeric
/// string depending on the exporter.
fn deserialize_user_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("userId {} is not an integer", n))),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("userId '{}' is not an integer", s))),
        Some(other) => Err(de::Error::custom(format!("invalid userId: {}", other))),
    }
}
