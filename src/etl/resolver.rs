//! Matching a play event to a previously loaded song and artist.

use crate::warehouse::{SongMatch, WarehouseStore};
use anyhow::Result;

/// Resolves `(title, artist name, duration)` against the songs and artists
/// already in the warehouse.
///
/// A match requires string equality on both names and exact equality on the
/// duration. When several songs qualify, the lowest `(song_id, artist_id)`
/// pair wins.
pub struct LookupResolver<'a, S: WarehouseStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: WarehouseStore + ?Sized> LookupResolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// `None` means the song is not in the loaded catalog, which is common
    /// and not an error.
    pub fn resolve(&self, title: &str, artist_name: &str, duration: f64) -> Result<Option<SongMatch>> {
        let candidates = self
            .store
            .find_song_candidates(title, artist_name, duration)?;
        Ok(candidates.into_iter().min())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warehouse::{Artist, SchemaVariant, Song, SqliteWarehouse};

    fn load(store: &SqliteWarehouse, song_id: &str, artist_id: &str, title: &str, name: &str, duration: f64) {
        store
            .insert_artist(&Artist {
                artist_id: artist_id.to_string(),
                name: name.to_string(),
                location: None,
                latitude: None,
                longitude: None,
            })
            .unwrap();
        store
            .insert_song(&Song {
                song_id: song_id.to_string(),
                title: title.to_string(),
                artist_id: artist_id.to_string(),
                year: 0,
                duration,
            })
            .unwrap();
    }

    #[test]
    fn test_resolve_on_empty_warehouse() {
        let store = SqliteWarehouse::open_in_memory(SchemaVariant::Ledger).unwrap();
        let resolver = LookupResolver::new(&store);
        assert_eq!(resolver.resolve("Song A", "Artist A", 200.0).unwrap(), None);
    }

    #[test]
    fn test_resolve_requires_all_three_fields() {
        let store = SqliteWarehouse::open_in_memory(SchemaVariant::Ledger).unwrap();
        load(&store, "SOZCTXZ12AB0182364", "AR5KOSW1187FB35FF4", "Setanta matins", "Elena", 269.58322);
        let resolver = LookupResolver::new(&store);

        assert_eq!(
            resolver.resolve("Setanta matins", "Elena", 269.58322).unwrap(),
            Some(SongMatch {
                song_id: "SOZCTXZ12AB0182364".to_string(),
                artist_id: "AR5KOSW1187FB35FF4".to_string(),
            })
        );
        assert_eq!(resolver.resolve("Setanta matins", "Elena", 269.5832).unwrap(), None);
        assert_eq!(resolver.resolve("Setanta matins", "elena", 269.58322).unwrap(), None);
        assert_eq!(resolver.resolve("Setanta Matins", "Elena", 269.58322).unwrap(), None);
    }

    #[test]
    fn test_resolve_tie_break_lowest_ids() {
        let store = SqliteWarehouse::open_in_memory(SchemaVariant::Keyed).unwrap();
        load(&store, "SOB", "ARB", "Intro", "Same Name", 60.0);
        load(&store, "SOA", "ARC", "Intro", "Same Name", 60.0);
        load(&store, "SOC", "ARA", "Intro", "Same Name", 60.0);
        let resolver = LookupResolver::new(&store);

        let resolved = resolver.resolve("Intro", "Same Name", 60.0).unwrap().unwrap();
        assert_eq!(resolved.song_id, "SOA");
        assert_eq!(resolved.artist_id, "ARC");
    }

    #[test]
    fn test_resolve_title_with_delimiter_characters() {
        let store = SqliteWarehouse::open_in_memory(SchemaVariant::Ledger).unwrap();
        load(&store, "S1", "A1", "Cash $$$ 'n' \"Quotes\"$", "O'Brien $title$", 123.4);
        let resolver = LookupResolver::new(&store);

        assert!(resolver
            .resolve("Cash $$$ 'n' \"Quotes\"$", "O'Brien $title$", 123.4)
            .unwrap()
            .is_some());
    }
}
