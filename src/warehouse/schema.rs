//! SQLite schema definitions for the play-analytics warehouse.
//!
//! Two variants of the same star schema exist. They differ in table names and
//! in how the `time` dimension treats a timestamp it has already seen:
//!
//! * `ledger` keeps one `time` row per play event (no key on `start_time`).
//! * `keyed` keeps one `time` row per distinct `start_time`.
//!
//! A `WarehouseSchema` bundles the chosen variant's tables with the conflict
//! policy of every entity, and is handed to the store when it is opened.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, ForeignKey, SqlType, Table, VersionedSchema};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

// =============================================================================
// Ledger variant
// =============================================================================

const LEDGER_SONG_TABLE: Table = Table {
    name: "song",
    columns: &[
        sqlite_column!("song_id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("artist_id", &SqlType::Text, non_null = true),
        sqlite_column!("year", &SqlType::Integer, non_null = true),
        sqlite_column!("duration", &SqlType::Real, non_null = true),
    ],
    indices: &[("idx_song_title", "title")],
};

const LEDGER_ARTIST_TABLE: Table = Table {
    name: "artist",
    columns: &[
        sqlite_column!("artist_id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("location", &SqlType::Text),
        sqlite_column!("latitude", &SqlType::Real),
        sqlite_column!("longitude", &SqlType::Real),
    ],
    indices: &[("idx_artist_name", "name")],
};

const LEDGER_USER_TABLE: Table = Table {
    name: "app_user",
    columns: &[
        sqlite_column!("user_id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("first_name", &SqlType::Text),
        sqlite_column!("last_name", &SqlType::Text),
        sqlite_column!("gender", &SqlType::Text),
        sqlite_column!("level", &SqlType::Text, non_null = true), // 'free', 'paid'
    ],
    indices: &[],
};

const LEDGER_TIME_TABLE: Table = Table {
    name: "time",
    columns: &[
        sqlite_column!("start_time", &SqlType::Integer, non_null = true), // epoch millis
        sqlite_column!("hour", &SqlType::Integer, non_null = true),
        sqlite_column!("day", &SqlType::Integer, non_null = true),
        sqlite_column!("week", &SqlType::Integer, non_null = true),
        sqlite_column!("month", &SqlType::Integer, non_null = true),
        sqlite_column!("year", &SqlType::Integer, non_null = true),
        sqlite_column!("weekday", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_time_start_time", "start_time")],
};

const LEDGER_USER_FK: ForeignKey = ForeignKey {
    foreign_table: "app_user",
    foreign_column: "user_id",
};

const LEDGER_SONG_FK: ForeignKey = ForeignKey {
    foreign_table: "song",
    foreign_column: "song_id",
};

const LEDGER_ARTIST_FK: ForeignKey = ForeignKey {
    foreign_table: "artist",
    foreign_column: "artist_id",
};

const LEDGER_SONG_PLAY_TABLE: Table = Table {
    name: "song_play",
    columns: &[
        sqlite_column!("songplay_id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("start_time", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&LEDGER_USER_FK)
        ),
        sqlite_column!("level", &SqlType::Text, non_null = true),
        sqlite_column!("song_id", &SqlType::Text, foreign_key = Some(&LEDGER_SONG_FK)),
        sqlite_column!(
            "artist_id",
            &SqlType::Text,
            foreign_key = Some(&LEDGER_ARTIST_FK)
        ),
        sqlite_column!("session_id", &SqlType::Integer, non_null = true),
        sqlite_column!("location", &SqlType::Text),
        sqlite_column!("user_agent", &SqlType::Text),
    ],
    indices: &[
        ("idx_song_play_user", "user_id"),
        ("idx_song_play_start_time", "start_time"),
    ],
};

static LEDGER_SCHEMA: VersionedSchema = VersionedSchema {
    version: 0,
    tables: &[
        LEDGER_USER_TABLE,
        LEDGER_SONG_TABLE,
        LEDGER_ARTIST_TABLE,
        LEDGER_TIME_TABLE,
        LEDGER_SONG_PLAY_TABLE,
    ],
};

// =============================================================================
// Keyed variant
// =============================================================================

const KEYED_SONG_TABLE: Table = Table {
    name: "songs",
    columns: &[
        sqlite_column!("song_id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("artist_id", &SqlType::Text, non_null = true),
        sqlite_column!("year", &SqlType::Integer, non_null = true),
        sqlite_column!("duration", &SqlType::Real, non_null = true),
    ],
    indices: &[("idx_songs_title", "title")],
};

const KEYED_ARTIST_TABLE: Table = Table {
    name: "artists",
    columns: &[
        sqlite_column!("artist_id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("location", &SqlType::Text),
        sqlite_column!("latitude", &SqlType::Real),
        sqlite_column!("longitude", &SqlType::Real),
    ],
    indices: &[("idx_artists_name", "name")],
};

const KEYED_USER_TABLE: Table = Table {
    name: "users",
    columns: &[
        sqlite_column!("user_id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("first_name", &SqlType::Text),
        sqlite_column!("last_name", &SqlType::Text),
        sqlite_column!("gender", &SqlType::Text),
        sqlite_column!("level", &SqlType::Text, non_null = true),
    ],
    indices: &[],
};

const KEYED_TIME_TABLE: Table = Table {
    name: "time",
    columns: &[
        sqlite_column!("start_time", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("hour", &SqlType::Integer, non_null = true),
        sqlite_column!("day", &SqlType::Integer, non_null = true),
        sqlite_column!("week", &SqlType::Integer, non_null = true),
        sqlite_column!("month", &SqlType::Integer, non_null = true),
        sqlite_column!("year", &SqlType::Integer, non_null = true),
        sqlite_column!("weekday", &SqlType::Integer, non_null = true),
    ],
    indices: &[],
};

const KEYED_USER_FK: ForeignKey = ForeignKey {
    foreign_table: "users",
    foreign_column: "user_id",
};

const KEYED_SONG_FK: ForeignKey = ForeignKey {
    foreign_table: "songs",
    foreign_column: "song_id",
};

const KEYED_ARTIST_FK: ForeignKey = ForeignKey {
    foreign_table: "artists",
    foreign_column: "artist_id",
};

const KEYED_SONG_PLAY_TABLE: Table = Table {
    name: "songplays",
    columns: &[
        sqlite_column!("songplay_id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("start_time", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&KEYED_USER_FK)
        ),
        sqlite_column!("level", &SqlType::Text, non_null = true),
        sqlite_column!("song_id", &SqlType::Text, foreign_key = Some(&KEYED_SONG_FK)),
        sqlite_column!("artist_id", &SqlType::Text, foreign_key = Some(&KEYED_ARTIST_FK)),
        sqlite_column!("session_id", &SqlType::Integer, non_null = true),
        sqlite_column!("location", &SqlType::Text),
        sqlite_column!("user_agent", &SqlType::Text),
    ],
    indices: &[
        ("idx_songplays_user", "user_id"),
        ("idx_songplays_start_time", "start_time"),
    ],
};

static KEYED_SCHEMA: VersionedSchema = VersionedSchema {
    version: 0,
    tables: &[
        KEYED_USER_TABLE,
        KEYED_SONG_TABLE,
        KEYED_ARTIST_TABLE,
        KEYED_TIME_TABLE,
        KEYED_SONG_PLAY_TABLE,
    ],
};

// =============================================================================
// Load protocol
// =============================================================================

/// What happens when a row's primary key already exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Keep the existing row untouched.
    Ignore,
    /// Overwrite the entity's mutable columns.
    Upsert,
    /// No key to conflict on; every submission is a new row.
    AlwaysInsert,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Entity {
    Song,
    Artist,
    User,
    Time,
    SongPlay,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVariant {
    /// Singular table names; one `time` row per play event.
    #[default]
    Ledger,
    /// Plural table names; one `time` row per distinct timestamp.
    Keyed,
}

/// The tables and per-entity conflict policies of one schema variant.
#[derive(Clone, Copy)]
pub struct WarehouseSchema {
    pub variant: SchemaVariant,
    pub versioned: &'static VersionedSchema,
    time_policy: ConflictPolicy,
}

impl std::fmt::Debug for WarehouseSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WarehouseSchema")
            .field("variant", &self.variant)
            .field("time_policy", &self.time_policy)
            .finish()
    }
}

impl WarehouseSchema {
    pub fn for_variant(variant: SchemaVariant) -> Self {
        match variant {
            SchemaVariant::Ledger => WarehouseSchema {
                variant,
                versioned: &LEDGER_SCHEMA,
                time_policy: ConflictPolicy::AlwaysInsert,
            },
            SchemaVariant::Keyed => WarehouseSchema {
                variant,
                versioned: &KEYED_SCHEMA,
                time_policy: ConflictPolicy::Ignore,
            },
        }
    }

    pub fn policy(&self, entity: Entity) -> ConflictPolicy {
        match entity {
            Entity::Song | Entity::Artist => ConflictPolicy::Ignore,
            Entity::User => ConflictPolicy::Upsert,
            Entity::Time => self.time_policy,
            Entity::SongPlay => ConflictPolicy::AlwaysInsert,
        }
    }

    pub fn table(&self, entity: Entity) -> &'static Table {
        // Tables are declared users, songs, artists, time, song plays.
        let index = match entity {
            Entity::User => 0,
            Entity::Song => 1,
            Entity::Artist => 2,
            Entity::Time => 3,
            Entity::SongPlay => 4,
        };
        &self.versioned.tables[index]
    }

    pub fn table_name(&self, entity: Entity) -> &'static str {
        self.table(entity).name
    }

    /// Builds the single parameterized statement used to submit one row of
    /// `entity`. Parameters are bound positionally in table column order,
    /// skipping the surrogate key of song plays.
    pub fn insert_sql(&self, entity: Entity) -> String {
        let table = self.table(entity);
        let columns: Vec<&str> = table
            .columns
            .iter()
            .filter(|c| !(entity == Entity::SongPlay && c.is_primary_key))
            .map(|c| c.name)
            .collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table.name,
            columns.join(", "),
            placeholders.join(", ")
        );

        let key = table
            .columns
            .iter()
            .find(|c| c.is_primary_key)
            .map(|c| c.name);
        match (self.policy(entity), key) {
            (ConflictPolicy::Ignore, Some(key)) => {
                sql.push_str(&format!(" ON CONFLICT({}) DO NOTHING", key));
            }
            (ConflictPolicy::Upsert, Some(key)) => {
                sql.push_str(&format!(
                    " ON CONFLICT({}) DO UPDATE SET level = excluded.level",
                    key
                ));
            }
            _ => {}
        }
        sql
    }

    /// Exact-match candidates for a play event, in tie-break order.
    pub fn song_lookup_sql(&self) -> String {
        let songs = self.table_name(Entity::Song);
        let artists = self.table_name(Entity::Artist);
        format!(
            "SELECT {songs}.song_id, {songs}.artist_id FROM {songs} \
             JOIN {artists} ON {songs}.artist_id = {artists}.artist_id \
             WHERE {songs}.title = ?1 AND {artists}.name = ?2 AND {songs}.duration = ?3 \
             ORDER BY {songs}.song_id, {songs}.artist_id",
        )
    }
}
