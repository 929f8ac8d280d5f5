//! Deriving warehouse rows from raw records.

use super::reader::RecordError;
use super::records::{LogLine, SongRecord};
use crate::warehouse::{Artist, Level, PlayTime, Song, SongMatch, SongPlay, User};
use chrono::{DateTime, Datelike, Timelike, Utc};
use std::path::Path;

pub fn song_from_record(record: &SongRecord) -> Song {
    Song {
        song_id: record.song_id.clone(),
        title: record.title.clone(),
        artist_id: record.artist_id.clone(),
        year: record.year,
        duration: record.duration,
    }
}

/// An empty `artist_location` means unknown and is stored as NULL.
pub fn artist_from_record(record: &SongRecord) -> Artist {
    Artist {
        artist_id: record.artist_id.clone(),
        name: record.artist_name.clone(),
        location: record
            .artist_location
            .as_ref()
            .filter(|l| !l.trim().is_empty())
            .cloned(),
        latitude: record.artist_latitude,
        longitude: record.artist_longitude,
    }
}

/// Split an epoch-millisecond timestamp into its UTC calendar fields.
pub fn decompose_timestamp(ts_millis: i64) -> Option<PlayTime> {
    let t: DateTime<Utc> = DateTime::from_timestamp_millis(ts_millis)?;
    Some(PlayTime {
        start_time: ts_millis,
        hour: t.hour(),
        day: t.day(),
        week: t.iso_week().week(),
        month: t.month(),
        year: t.year(),
        weekday: t.weekday().num_days_from_monday(),
    })
}

/// A `NextSong` event with every field the warehouse needs.
#[derive(Clone, Debug, PartialEq)]
pub struct SongPlayEvent {
    pub line: usize,
    pub time: PlayTime,
    pub user: User,
    pub song_title: String,
    pub artist_name: String,
    pub length: f64,
    pub session_id: i64,
    pub location: String,
    pub user_agent: String,
}

impl SongPlayEvent {
    /// Validate a song play event read from `path`.
    pub fn from_log_line(path: &Path, log_line: &LogLine) -> Result<Self, RecordError> {
        let event = &log_line.event;
        let line = log_line.line;
        let missing = |field: &'static str| RecordError::MissingField {
            path: path.to_path_buf(),
            line,
            field,
        };
        let invalid = |field: &'static str, value: String| RecordError::InvalidField {
            path: path.to_path_buf(),
            line,
            field,
            value,
        };

        let ts = event.ts.ok_or_else(|| missing("ts"))?;
        let time = decompose_timestamp(ts).ok_or_else(|| invalid("ts", ts.to_string()))?;

        let level_str = event.level.as_deref().ok_or_else(|| missing("level"))?;
        let level =
            Level::from_db_str(level_str).ok_or_else(|| invalid("level", level_str.to_string()))?;

        let user = User {
            user_id: event.user_id.ok_or_else(|| missing("userId"))?,
            first_name: event.first_name.clone().ok_or_else(|| missing("firstName"))?,
            last_name: event.last_name.clone().ok_or_else(|| missing("lastName"))?,
            gender: event.gender.clone().ok_or_else(|| missing("gender"))?,
            level,
        };

        Ok(SongPlayEvent {
            line,
            time,
            user,
            song_title: event.song.clone().ok_or_else(|| missing("song"))?,
            artist_name: event.artist.clone().ok_or_else(|| missing("artist"))?,
            length: event.length.ok_or_else(|| missing("length"))?,
            session_id: event.session_id.ok_or_else(|| missing("sessionId"))?,
            location: event.location.clone().ok_or_else(|| missing("location"))?,
            user_agent: event.user_agent.clone().ok_or_else(|| missing("userAgent"))?,
        })
    }

    pub fn to_song_play(&self, song: Option<SongMatch>) -> SongPlay {
        SongPlay {
            start_time: self.time.start_time,
            user_id: self.user.user_id,
            level: self.user.level,
            song,
            session_id: self.session_id,
            location: Some(self.location.clone()),
            user_agent: Some(self.user_agent.clone()),
        }
    }
}
