//! SQLite-backed warehouse store.
//!
//! `SqliteWarehouse` owns a single read-write connection. The pipeline is the
//! only writer, so there is no pool and no locking beyond SQLite's own.

use super::models::*;
use super::schema::{Entity, SchemaVariant, WarehouseSchema};
use super::trait_def::WarehouseStore;
use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tracing::{debug, info};

pub struct SqliteWarehouse {
    conn: Connection,
    schema: WarehouseSchema,
}

impl std::fmt::Debug for SqliteWarehouse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteWarehouse")
            .field("path", &self.conn.path())
            .field("schema", &self.schema)
            .finish()
    }
}

fn user_tables(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    let names = stmt
        .query_map([], |r| r.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(names)
}

/// Creates the schema on a brand new database, otherwise checks that the
/// existing tables match the variant.
fn init_schema(conn: &Connection, schema: &WarehouseSchema) -> Result<()> {
    if user_tables(conn)?.is_empty() {
        info!("Creating warehouse schema ({:?} variant)", schema.variant);
        schema.versioned.create(conn)?;
        return Ok(());
    }

    #[cfg(not(feature = "no_checks"))]
    schema.versioned.validate(conn).with_context(|| {
        format!(
            "Existing database does not match the {:?} schema variant",
            schema.variant
        )
    })?;

    Ok(())
}

impl SqliteWarehouse {
    /// Open (creating if needed) the warehouse at `db_path` without touching
    /// its schema.
    pub fn connect<P: AsRef<Path>>(db_path: P, variant: SchemaVariant) -> Result<Self> {
        let conn = Connection::open_with_flags(
            db_path.as_ref(),
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open warehouse database {:?}", db_path.as_ref()))?;
        Self::from_connection(conn, variant)
    }

    /// Open the warehouse at `db_path`, creating the schema on an empty
    /// database and validating it otherwise.
    pub fn open<P: AsRef<Path>>(db_path: P, variant: SchemaVariant) -> Result<Self> {
        let store = Self::connect(db_path, variant)?;
        init_schema(&store.conn, &store.schema)?;

        let counts = store.counts()?;
        info!(
            "Opened warehouse: {} songs, {} artists, {} users, {} time rows, {} song plays",
            counts.songs, counts.artists, counts.users, counts.times, counts.song_plays
        );
        Ok(store)
    }

    /// In-memory warehouse with the schema already created.
    pub fn open_in_memory(variant: SchemaVariant) -> Result<Self> {
        let store = Self::from_connection(Connection::open_in_memory()?, variant)?;
        init_schema(&store.conn, &store.schema)?;
        Ok(store)
    }

    fn from_connection(conn: Connection, variant: SchemaVariant) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(SqliteWarehouse {
            conn,
            schema: WarehouseSchema::for_variant(variant),
        })
    }

    pub fn create_schema(&self) -> Result<()> {
        self.schema.versioned.create(&self.conn)
    }

    pub fn drop_schema(&self) -> Result<()> {
        self.schema.versioned.drop(&self.conn)
    }

    /// Drop and recreate every table of the variant. Refuses to touch a
    /// database holding any table outside the variant, such as the other
    /// variant's layout.
    pub fn reset(&self) -> Result<()> {
        let foreign: Vec<String> = user_tables(&self.conn)?
            .into_iter()
            .filter(|name| {
                !self
                    .schema
                    .versioned
                    .tables
                    .iter()
                    .any(|t| t.name == name.as_str())
            })
            .collect();
        if !foreign.is_empty() {
            bail!(
                "Refusing to reset: database holds tables outside the {:?} schema variant: {}",
                self.schema.variant,
                foreign.join(", ")
            );
        }
        info!("Resetting warehouse schema ({:?} variant)", self.schema.variant);
        self.drop_schema()?;
        self.create_schema()
    }

    pub fn validate_schema(&self) -> Result<()> {
        self.schema.versioned.validate(&self.conn)
    }

    pub fn counts(&self) -> Result<WarehouseCounts> {
        let count = |entity| self.schema.table(entity).count_rows(&self.conn);
        Ok(WarehouseCounts {
            songs: count(Entity::Song)?,
            artists: count(Entity::Artist)?,
            users: count(Entity::User)?,
            times: count(Entity::Time)?,
            song_plays: count(Entity::SongPlay)?,
        })
    }

    // =========================================================================
    // Read helpers
    // =========================================================================

    pub fn get_song(&self, song_id: &str) -> Result<Option<Song>> {
        let sql = format!(
            "SELECT song_id, title, artist_id, year, duration FROM {} WHERE song_id = ?1",
            self.schema.table_name(Entity::Song)
        );
        let song = self
            .conn
            .query_row(&sql, params![song_id], |row| {
                Ok(Song {
                    song_id: row.get(0)?,
                    title: row.get(1)?,
                    artist_id: row.get(2)?,
                    year: row.get(3)?,
                    duration: row.get(4)?,
                })
            })
            .optional()?;
        Ok(song)
    }

    pub fn get_artist(&self, artist_id: &str) -> Result<Option<Artist>> {
        let sql = format!(
            "SELECT artist_id, name, location, latitude, longitude FROM {} WHERE artist_id = ?1",
            self.schema.table_name(Entity::Artist)
        );
        let artist = self
            .conn
            .query_row(&sql, params![artist_id], |row| {
                Ok(Artist {
                    artist_id: row.get(0)?,
                    name: row.get(1)?,
                    location: row.get(2)?,
                    latitude: row.get(3)?,
                    longitude: row.get(4)?,
                })
            })
            .optional()?;
        Ok(artist)
    }

    pub fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        let sql = format!(
            "SELECT user_id, first_name, last_name, gender, level FROM {} WHERE user_id = ?1",
            self.schema.table_name(Entity::User)
        );
        let row = self
            .conn
            .query_row(&sql, params![user_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })
            .optional()?;

        match row {
            None => Ok(None),
            Some((user_id, first_name, last_name, gender, level_str)) => {
                let Some(level) = Level::from_db_str(&level_str) else {
                    bail!("User {} has unknown level '{}'", user_id, level_str);
                };
                Ok(Some(User {
                    user_id,
                    first_name,
                    last_name,
                    gender,
                    level,
                }))
            }
        }
    }

    pub fn get_times(&self, start_time: i64) -> Result<Vec<PlayTime>> {
        let sql = format!(
            "SELECT start_time, hour, day, week, month, year, weekday FROM {} WHERE start_time = ?1",
            self.schema.table_name(Entity::Time)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let times = stmt
            .query_map(params![start_time], |row| {
                Ok(PlayTime {
                    start_time: row.get(0)?,
                    hour: row.get(1)?,
                    day: row.get(2)?,
                    week: row.get(3)?,
                    month: row.get(4)?,
                    year: row.get(5)?,
                    weekday: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(times)
    }

    /// All song plays in surrogate key order.
    pub fn list_song_plays(&self) -> Result<Vec<StoredSongPlay>> {
        let sql = format!(
            "SELECT songplay_id, start_time, user_id, level, song_id, artist_id, session_id, location, user_agent
             FROM {} ORDER BY songplay_id",
            self.schema.table_name(Entity::SongPlay)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, i64>(6)?,
                    row.get::<_, Option<String>>(7)?,
                    row.get::<_, Option<String>>(8)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut plays = Vec::with_capacity(rows.len());
        for row in rows {
            let (songplay_id, start_time, user_id, level_str, song_id, artist_id, session_id) =
                (row.0, row.1, row.2, row.3, row.4, row.5, row.6);
            let Some(level) = Level::from_db_str(&level_str) else {
                bail!("Song play {} has unknown level '{}'", songplay_id, level_str);
            };
            let song = match (song_id, artist_id) {
                (Some(song_id), Some(artist_id)) => Some(SongMatch { song_id, artist_id }),
                (None, None) => None,
                _ => bail!("Song play {} has only one of song_id/artist_id", songplay_id),
            };
            plays.push(StoredSongPlay {
                songplay_id,
                play: SongPlay {
                    start_time,
                    user_id,
                    level,
                    song,
                    session_id,
                    location: row.7,
                    user_agent: row.8,
                },
            });
        }
        Ok(plays)
    }

    /// Run a keyed insert and report whether the row was written or skipped.
    fn execute_keyed(&self, entity: Entity, params: &[&dyn rusqlite::ToSql]) -> Result<InsertOutcome> {
        let mut stmt = self.conn.prepare_cached(&self.schema.insert_sql(entity))?;
        let changed = stmt.execute(params)?;
        Ok(if changed == 0 {
            InsertOutcome::Ignored
        } else {
            InsertOutcome::Inserted
        })
    }
}

impl WarehouseStore for SqliteWarehouse {
    fn schema(&self) -> &WarehouseSchema {
        &self.schema
    }

    fn insert_song(&self, song: &Song) -> Result<InsertOutcome> {
        self.execute_keyed(
            Entity::Song,
            params![
                &song.song_id,
                &song.title,
                &song.artist_id,
                song.year,
                song.duration
            ],
        )
        .with_context(|| format!("Failed to insert song {}", song.song_id))
    }

    fn insert_artist(&self, artist: &Artist) -> Result<InsertOutcome> {
        self.execute_keyed(
            Entity::Artist,
            params![
                &artist.artist_id,
                &artist.name,
                &artist.location,
                artist.latitude,
                artist.longitude
            ],
        )
        .with_context(|| format!("Failed to insert artist {}", artist.artist_id))
    }

    fn upsert_user(&self, user: &User) -> Result<InsertOutcome> {
        let mut stmt = self
            .conn
            .prepare_cached(&self.schema.insert_sql(Entity::User))?;
        stmt.execute(params![
            user.user_id,
            &user.first_name,
            &user.last_name,
            &user.gender,
            user.level.to_db_str()
        ])
        .with_context(|| format!("Failed to upsert user {}", user.user_id))?;
        Ok(InsertOutcome::Upserted)
    }

    fn insert_time(&self, time: &PlayTime) -> Result<InsertOutcome> {
        self.execute_keyed(
            Entity::Time,
            params![
                time.start_time,
                time.hour,
                time.day,
                time.week,
                time.month,
                time.year,
                time.weekday
            ],
        )
        .with_context(|| format!("Failed to insert time {}", time.start_time))
    }

    fn insert_song_play(&self, play: &SongPlay) -> Result<i64> {
        let (song_id, artist_id) = match &play.song {
            Some(song) => (Some(song.song_id.as_str()), Some(song.artist_id.as_str())),
            None => (None, None),
        };
        let mut stmt = self
            .conn
            .prepare_cached(&self.schema.insert_sql(Entity::SongPlay))?;
        stmt.execute(params![
            play.start_time,
            play.user_id,
            play.level.to_db_str(),
            song_id,
            artist_id,
            play.session_id,
            &play.location,
            &play.user_agent
        ])
        .with_context(|| {
            format!(
                "Failed to insert song play for user {} at {}",
                play.user_id, play.start_time
            )
        })?;
        Ok(self.conn.last_insert_rowid())
    }

    fn find_song_candidates(
        &self,
        title: &str,
        artist_name: &str,
        duration: f64,
    ) -> Result<Vec<SongMatch>> {
        let mut stmt = self.conn.prepare_cached(&self.schema.song_lookup_sql())?;
        let matches = stmt
            .query_map(params![title, artist_name, duration], |row| {
                Ok(SongMatch {
                    song_id: row.get(0)?,
                    artist_id: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(matches)
    }

    fn begin(&self) -> Result<()> {
        debug!("BEGIN");
        self.conn.execute("BEGIN IMMEDIATE", [])?;
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        debug!("COMMIT");
        self.conn.execute("COMMIT", [])?;
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        debug!("ROLLBACK");
        self.conn.execute("ROLLBACK", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(song_id: &str, title: &str, artist_id: &str, duration: f64) -> Song {
        Song {
            song_id: song_id.to_string(),
            title: title.to_string(),
            artist_id: artist_id.to_string(),
            year: 1999,
            duration,
        }
    }

    fn artist(artist_id: &str, name: &str) -> Artist {
        Artist {
            artist_id: artist_id.to_string(),
            name: name.to_string(),
            location: Some("Morris Plains, NJ".to_string()),
            latitude: Some(40.82624),
            longitude: Some(-74.47995),
        }
    }

    fn user(user_id: i64, level: Level) -> User {
        User {
            user_id,
            first_name: "Lily".to_string(),
            last_name: "Koch".to_string(),
            gender: "F".to_string(),
            level,
        }
    }

    fn play(user_id: i64, song: Option<SongMatch>) -> SongPlay {
        SongPlay {
            start_time: 1542837407796,
            user_id,
            level: Level::Paid,
            song,
            session_id: 818,
            location: Some("Chicago-Naperville-Elgin, IL-IN-WI".to_string()),
            user_agent: None,
        }
    }

    fn time(start_time: i64) -> PlayTime {
        PlayTime {
            start_time,
            hour: 2,
            day: 11,
            week: 45,
            month: 11,
            year: 2018,
            weekday: 6,
        }
    }

    #[test]
    fn test_song_and_artist_ignore_on_conflict() {
        let store = SqliteWarehouse::open_in_memory(SchemaVariant::Ledger).unwrap();
        let first = song("S1", "Larger Than Life", "A1", 236.25098);
        assert_eq!(store.insert_song(&first).unwrap(), InsertOutcome::Inserted);

        let mut changed = first.clone();
        changed.title = "Something Else".to_string();
        assert_eq!(store.insert_song(&changed).unwrap(), InsertOutcome::Ignored);
        assert_eq!(store.get_song("S1").unwrap(), Some(first));

        assert_eq!(
            store.insert_artist(&artist("A1", "X")).unwrap(),
            InsertOutcome::Inserted
        );
        assert_eq!(
            store.insert_artist(&artist("A1", "Y")).unwrap(),
            InsertOutcome::Ignored
        );
        assert_eq!(store.get_artist("A1").unwrap().unwrap().name, "X");

        let counts = store.counts().unwrap();
        assert_eq!(counts.songs, 1);
        assert_eq!(counts.artists, 1);
    }

    #[test]
    fn test_user_upsert_overwrites_level_only() {
        let store = SqliteWarehouse::open_in_memory(SchemaVariant::Keyed).unwrap();
        store.upsert_user(&user(15, Level::Free)).unwrap();

        let mut renamed = user(15, Level::Paid);
        renamed.first_name = "Someone".to_string();
        store.upsert_user(&renamed).unwrap();

        let stored = store.get_user(15).unwrap().unwrap();
        assert_eq!(stored.level, Level::Paid);
        assert_eq!(stored.first_name, "Lily");
        assert_eq!(store.counts().unwrap().users, 1);
    }

    #[test]
    fn test_time_policy_per_variant() {
        let ledger = SqliteWarehouse::open_in_memory(SchemaVariant::Ledger).unwrap();
        assert_eq!(ledger.insert_time(&time(1)).unwrap(), InsertOutcome::Inserted);
        assert_eq!(ledger.insert_time(&time(1)).unwrap(), InsertOutcome::Inserted);
        assert_eq!(ledger.get_times(1).unwrap().len(), 2);

        let keyed = SqliteWarehouse::open_in_memory(SchemaVariant::Keyed).unwrap();
        assert_eq!(keyed.insert_time(&time(1)).unwrap(), InsertOutcome::Inserted);
        assert_eq!(keyed.insert_time(&time(1)).unwrap(), InsertOutcome::Ignored);
        assert_eq!(keyed.get_times(1).unwrap(), vec![time(1)]);
    }

    #[test]
    fn test_song_play_requires_user() {
        let store = SqliteWarehouse::open_in_memory(SchemaVariant::Ledger).unwrap();
        assert!(store.insert_song_play(&play(15, None)).is_err());

        store.upsert_user(&user(15, Level::Paid)).unwrap();
        let first = store.insert_song_play(&play(15, None)).unwrap();
        let second = store.insert_song_play(&play(15, None)).unwrap();
        assert!(second > first);

        let plays = store.list_song_plays().unwrap();
        assert_eq!(plays.len(), 2);
        assert_eq!(plays[0].songplay_id, first);
        assert_eq!(plays[0].play.song, None);
    }

    #[test]
    fn test_song_play_requires_known_song() {
        let store = SqliteWarehouse::open_in_memory(SchemaVariant::Ledger).unwrap();
        store.upsert_user(&user(15, Level::Paid)).unwrap();
        let unknown = Some(SongMatch {
            song_id: "S404".to_string(),
            artist_id: "A404".to_string(),
        });
        assert!(store.insert_song_play(&play(15, unknown)).is_err());
    }

    #[test]
    fn test_find_song_candidates_exact_match() {
        let store = SqliteWarehouse::open_in_memory(SchemaVariant::Ledger).unwrap();
        assert!(store
            .find_song_candidates("Money$", "Artist", 200.0)
            .unwrap()
            .is_empty());

        store.insert_artist(&artist("A1", "Artist")).unwrap();
        store
            .insert_song(&song("S1", "Money$", "A1", 200.0))
            .unwrap();

        let found = store.find_song_candidates("Money$", "Artist", 200.0).unwrap();
        assert_eq!(
            found,
            vec![SongMatch {
                song_id: "S1".to_string(),
                artist_id: "A1".to_string(),
            }]
        );
        assert!(store
            .find_song_candidates("Money$", "Artist", 200.0001)
            .unwrap()
            .is_empty());
        assert!(store
            .find_song_candidates("money$", "Artist", 200.0)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_rollback_discards_writes() {
        let store = SqliteWarehouse::open_in_memory(SchemaVariant::Ledger).unwrap();
        store.begin().unwrap();
        store.insert_song(&song("S1", "T", "A1", 1.0)).unwrap();
        store.rollback().unwrap();
        assert_eq!(store.counts().unwrap().songs, 0);

        store.begin().unwrap();
        store.insert_song(&song("S1", "T", "A1", 1.0)).unwrap();
        store.commit().unwrap();
        assert_eq!(store.counts().unwrap().songs, 1);
    }

    #[test]
    fn test_open_rejects_other_variant() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let db_path = temp_dir.path().join("sparkify.db");
        SqliteWarehouse::open(&db_path, SchemaVariant::Ledger).unwrap();
        SqliteWarehouse::open(&db_path, SchemaVariant::Ledger).unwrap();
        assert!(SqliteWarehouse::open(&db_path, SchemaVariant::Keyed).is_err());
    }

    #[test]
    fn test_reset_refuses_other_variant_layout() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let db_path = temp_dir.path().join("sparkify.db");
        let ledger = SqliteWarehouse::open(&db_path, SchemaVariant::Ledger).unwrap();
        ledger.upsert_user(&user(1, Level::Free)).unwrap();
        drop(ledger);

        let keyed = SqliteWarehouse::connect(&db_path, SchemaVariant::Keyed).unwrap();
        let err = keyed.reset().unwrap_err();
        assert!(format!("{:#}", err).contains("song_play"));
        drop(keyed);

        let ledger = SqliteWarehouse::open(&db_path, SchemaVariant::Ledger).unwrap();
        assert_eq!(ledger.counts().unwrap().users, 1);
    }

    #[test]
    fn test_reset_on_fresh_database() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let db_path = temp_dir.path().join("sparkify.db");
        let store = SqliteWarehouse::connect(&db_path, SchemaVariant::Keyed).unwrap();
        store.reset().unwrap();
        store.validate_schema().unwrap();
    }

    #[test]
    fn test_debug_names_variant() {
        let store = SqliteWarehouse::open_in_memory(SchemaVariant::Keyed).unwrap();
        assert!(format!("{:?}", store).contains("Keyed"));
    }

    #[test]
    fn test_reset_empties_tables() {
        let store = SqliteWarehouse::open_in_memory(SchemaVariant::Keyed).unwrap();
        store.upsert_user(&user(1, Level::Free)).unwrap();
        store.reset().unwrap();
        store.validate_schema().unwrap();
        assert_eq!(store.counts().unwrap(), WarehouseCounts::default());
    }
}
