//! Loading song-metadata files.

use super::reader::read_song_record;
use super::stats::LoadStats;
use super::transform::{artist_from_record, song_from_record};
use crate::warehouse::WarehouseStore;
use anyhow::Result;
use std::path::Path;
use tracing::debug;

/// Load the song and artist described by one metadata file. Both rows are
/// ignored if their key already exists.
pub fn load_song_file<S: WarehouseStore + ?Sized>(store: &S, path: &Path) -> Result<LoadStats> {
    let record = read_song_record(path)?;
    let mut stats = LoadStats::default();

    let song = song_from_record(&record);
    stats.record_song(store.insert_song(&song)?);

    let artist = artist_from_record(&record);
    stats.record_artist(store.insert_artist(&artist)?);

    debug!("Loaded song {} by artist {}", song.song_id, artist.artist_id);
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::etl::reader::RecordError;
    use crate::warehouse::{SchemaVariant, SqliteWarehouse};
    use std::fs;
    use tempfile::TempDir;

    const LARGER_THAN_LIFE: &str = r#"{"num_songs": 1, "artist_id": "A1", "artist_latitude": null, "artist_longitude": null, "artist_location": "", "artist_name": "X", "song_id": "S1", "title": "Larger Than Life", "duration": 236.25098, "year": 1999}"#;

    #[test]
    fn test_load_song_file_twice_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("TRAAAAK128F9318786.json");
        fs::write(&path, LARGER_THAN_LIFE).unwrap();
        let store = SqliteWarehouse::open_in_memory(SchemaVariant::Ledger).unwrap();

        let first = load_song_file(&store, &path).unwrap();
        assert_eq!(first.songs_inserted, 1);
        assert_eq!(first.artists_inserted, 1);

        let second = load_song_file(&store, &path).unwrap();
        assert_eq!(second.songs_ignored, 1);
        assert_eq!(second.artists_ignored, 1);

        let counts = store.counts().unwrap();
        assert_eq!(counts.songs, 1);
        assert_eq!(counts.artists, 1);

        let song = store.get_song("S1").unwrap().unwrap();
        assert_eq!(song.title, "Larger Than Life");
        assert_eq!(song.year, 1999);
        assert_eq!(song.duration, 236.25098);
    }

    #[test]
    fn test_load_song_file_missing_field_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, r#"{"artist_id": "A1", "artist_name": "X", "title": "T", "year": 1}"#).unwrap();
        let store = SqliteWarehouse::open_in_memory(SchemaVariant::Ledger).unwrap();

        let err = load_song_file(&store, &path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RecordError>(),
            Some(RecordError::Parse { .. })
        ));
        assert_eq!(store.counts().unwrap().songs, 0);
    }
}
