//! Data-set fixtures laid out like the real song_data and log_data trees.

use super::constants::*;
use anyhow::Result;
use serde_json::{json, Value};
use sparkify_etl::etl::{self, PipelineOptions, RunSummary};
use sparkify_etl::warehouse::{SchemaVariant, SqliteWarehouse};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// A temporary directory holding `song_data/`, `log_data/` and the warehouse
/// database file.
pub struct TestDataSet {
    pub dir: TempDir,
}

impl TestDataSet {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        fs::create_dir_all(dir.path().join("song_data")).expect("Failed to create song_data");
        fs::create_dir_all(dir.path().join("log_data")).expect("Failed to create log_data");
        Self { dir }
    }

    /// Data set pre-populated with the two fixture songs.
    pub fn with_catalog() -> Self {
        let data = Self::new();
        data.add_song(
            "A/A/A/TRAAAAK128F9318786.json",
            &song_record(
                SONG_1_ID,
                SONG_1_TITLE,
                ARTIST_1_ID,
                ARTIST_1_NAME,
                SONG_1_DURATION,
                1999,
            ),
        );
        data.add_song(
            "A/B/C/TRABCEI128F424C983.json",
            &song_record(
                SONG_2_ID,
                SONG_2_TITLE,
                ARTIST_2_ID,
                ARTIST_2_NAME,
                SONG_2_DURATION,
                0,
            ),
        );
        data
    }

    pub fn song_root(&self) -> PathBuf {
        self.dir.path().join("song_data")
    }

    pub fn log_root(&self) -> PathBuf {
        self.dir.path().join("log_data")
    }

    pub fn db_path(&self) -> PathBuf {
        self.dir.path().join("sparkify.db")
    }

    pub fn add_song(&self, relative_path: &str, record: &Value) {
        self.write(self.song_root().join(relative_path), record.to_string());
    }

    /// Write `events` as one JSON object per line.
    pub fn add_log(&self, relative_path: &str, events: &[Value]) {
        let lines: Vec<String> = events.iter().map(|e| e.to_string()).collect();
        self.write(self.log_root().join(relative_path), lines.join("\n"));
    }

    pub fn add_raw_log(&self, relative_path: &str, content: &str) {
        self.write(self.log_root().join(relative_path), content.to_string());
    }

    fn write(&self, path: PathBuf, content: String) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create fixture dir");
        }
        fs::write(&path, content).expect("Failed to write fixture file");
    }

    pub fn open(&self, variant: SchemaVariant) -> SqliteWarehouse {
        SqliteWarehouse::open(self.db_path(), variant).expect("Failed to open warehouse")
    }

    /// Run the whole pipeline against the on-disk warehouse.
    pub fn run_with(
        &self,
        variant: SchemaVariant,
        options: &PipelineOptions,
    ) -> Result<(SqliteWarehouse, RunSummary)> {
        let store = SqliteWarehouse::open(self.db_path(), variant)?;
        let summary = etl::run(&store, &self.song_root(), &self.log_root(), options)?;
        Ok((store, summary))
    }

    pub fn run(&self, variant: SchemaVariant) -> Result<(SqliteWarehouse, RunSummary)> {
        self.run_with(variant, &PipelineOptions::default())
    }
}

pub fn song_record(
    song_id: &str,
    title: &str,
    artist_id: &str,
    artist_name: &str,
    duration: f64,
    year: i32,
) -> Value {
    json!({
        "num_songs": 1,
        "artist_id": artist_id,
        "artist_latitude": null,
        "artist_longitude": null,
        "artist_location": "",
        "artist_name": artist_name,
        "song_id": song_id,
        "title": title,
        "duration": duration,
        "year": year,
    })
}

/// A `NextSong` event carrying every field the loader requires. `userId` is
/// encoded as a string, the way the activity exporter writes it.
pub fn next_song_event(
    ts: i64,
    user_id: i64,
    level: &str,
    song: &str,
    artist: &str,
    length: f64,
) -> Value {
    json!({
        "artist": artist,
        "auth": "Logged In",
        "firstName": "Lily",
        "gender": "F",
        "itemInSession": 0,
        "lastName": "Koch",
        "length": length,
        "level": level,
        "location": "Chicago-Naperville-Elgin, IL-IN-WI",
        "method": "PUT",
        "page": "NextSong",
        "registration": 1541048010796.0,
        "sessionId": 818,
        "song": song,
        "status": 200,
        "ts": ts,
        "userAgent": "Mozilla/5.0 (X11; Linux x86_64)",
        "userId": user_id.to_string(),
    })
}

/// A non-play event from a logged-out session.
pub fn page_event(page: &str, ts: i64) -> Value {
    json!({
        "artist": null,
        "auth": "Logged Out",
        "firstName": null,
        "gender": null,
        "itemInSession": 0,
        "lastName": null,
        "length": null,
        "level": "free",
        "location": null,
        "method": "GET",
        "page": page,
        "registration": null,
        "sessionId": 52,
        "song": null,
        "status": 200,
        "ts": ts,
        "userAgent": null,
        "userId": "",
    })
}
