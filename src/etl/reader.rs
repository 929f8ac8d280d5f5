//! Reading source files into raw records.

use super::records::{LogEvent, LogLine, SongRecord, NEXT_SONG_PAGE};
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Errors that make a source file unusable.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON in {path:?} at line {line}: {source}")]
    Parse {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("No record found in {0:?}")]
    Empty(PathBuf),

    #[error("Event at line {line} of {path:?} is missing required field '{field}'")]
    MissingField {
        path: PathBuf,
        line: usize,
        field: &'static str,
    },

    #[error("Event at line {line} of {path:?} has invalid {field}: {value}")]
    InvalidField {
        path: PathBuf,
        line: usize,
        field: &'static str,
        value: String,
    },
}

fn read_to_string(path: &Path) -> Result<String, RecordError> {
    std::fs::read_to_string(path).map_err(|source| RecordError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Read the single song record of a metadata file.
///
/// Should a file contain more than one JSON document, the first one is used.
pub fn read_song_record(path: &Path) -> Result<SongRecord, RecordError> {
    let content = read_to_string(path)?;
    let mut records = serde_json::Deserializer::from_str(&content).into_iter::<SongRecord>();

    let record = match records.next() {
        None => return Err(RecordError::Empty(path.to_path_buf())),
        Some(result) => result.map_err(|source| RecordError::Parse {
            path: path.to_path_buf(),
            line: source.line(),
            source,
        })?,
    };

    if records.next().is_some() {
        warn!("{:?} holds more than one song record, only the first is loaded", path);
    }
    Ok(record)
}

/// Decode one log line. Only song plays are decoded field by field; any other
/// page keeps just its name, so the shape of its remaining fields never
/// matters. A line without a string `page` counts as a non-play.
fn parse_log_event(raw_line: &str) -> Result<LogEvent, serde_json::Error> {
    let value: Value = serde_json::from_str(raw_line)?;
    if !value.is_object() {
        return Err(serde::de::Error::custom("expected a JSON object"));
    }
    match value.get("page").and_then(Value::as_str) {
        Some(NEXT_SONG_PAGE) => serde_json::from_value(value),
        page => Ok(LogEvent {
            page: page.unwrap_or_default().to_string(),
            ..Default::default()
        }),
    }
}

/// Read every event of an activity log file, one JSON object per line.
/// Blank lines are skipped.
pub fn read_log_events(path: &Path) -> Result<Vec<LogLine>, RecordError> {
    let content = read_to_string(path)?;
    let mut events = Vec::new();
    for (index, raw_line) in content.lines().enumerate() {
        if raw_line.trim().is_empty() {
            continue;
        }
        let event = parse_log_event(raw_line).map_err(|source| RecordError::Parse {
            path: path.to_path_buf(),
            line: index + 1,
            source,
        })?;
        events.push(LogLine {
            line: index + 1,
            event,
        });
    }
    Ok(events)
}
