//! WarehouseStore trait definition.
//!
//! This is the boundary between the transform/load logic and the relational
//! store. Loaders only talk to the warehouse through it.

use super::models::*;
use super::schema::WarehouseSchema;
use anyhow::Result;

/// Trait for warehouse storage backends.
///
/// Every write is a single statement applying the schema's conflict policy for
/// that entity. Writes issued between `begin` and `commit` become durable
/// together; `rollback` discards them.
pub trait WarehouseStore {
    /// The schema variant this store was opened with.
    fn schema(&self) -> &WarehouseSchema;

    // =========================================================================
    // Write Operations
    // =========================================================================

    fn insert_song(&self, song: &Song) -> Result<InsertOutcome>;

    fn insert_artist(&self, artist: &Artist) -> Result<InsertOutcome>;

    /// Insert a user, or overwrite the `level` of an existing one.
    fn upsert_user(&self, user: &User) -> Result<InsertOutcome>;

    /// Insert a time row; whether a repeated `start_time` is skipped depends
    /// on the schema variant.
    fn insert_time(&self, time: &PlayTime) -> Result<InsertOutcome>;

    /// Always appends a row and returns its surrogate `songplay_id`.
    fn insert_song_play(&self, play: &SongPlay) -> Result<i64>;

    // =========================================================================
    // Lookups
    // =========================================================================

    /// All songs whose title, artist name and duration equal the given values
    /// exactly, ordered by `(song_id, artist_id)`.
    fn find_song_candidates(
        &self,
        title: &str,
        artist_name: &str,
        duration: f64,
    ) -> Result<Vec<SongMatch>>;

    // =========================================================================
    // Transaction Scope
    // =========================================================================

    fn begin(&self) -> Result<()>;

    fn commit(&self) -> Result<()>;

    fn rollback(&self) -> Result<()>;
}
