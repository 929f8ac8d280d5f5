//! Loading user-activity log files.

use super::reader::read_log_events;
use super::resolver::LookupResolver;
use super::stats::LoadStats;
use super::transform::SongPlayEvent;
use crate::warehouse::WarehouseStore;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;

/// Load one activity file: every `NextSong` event becomes a time row, a user
/// upsert and a song play.
///
/// All events are validated before anything is written. Rows are then
/// submitted per entity in source order: times first, then users, then song
/// plays, so every song play finds its user already present.
pub fn load_log_file<S: WarehouseStore + ?Sized>(store: &S, path: &Path) -> Result<LoadStats> {
    let lines = read_log_events(path)?;
    let mut stats = LoadStats::default();

    let mut events = Vec::new();
    for log_line in &lines {
        if !log_line.event.is_song_play() {
            stats.events_skipped += 1;
            continue;
        }
        events.push(SongPlayEvent::from_log_line(path, log_line)?);
    }

    for event in &events {
        let outcome = store
            .insert_time(&event.time)
            .with_context(|| format!("Failed to insert time at line {}", event.line))?;
        stats.record_time(outcome);
    }

    for event in &events {
        store
            .upsert_user(&event.user)
            .with_context(|| format!("Failed to upsert user at line {}", event.line))?;
        stats.users_upserted += 1;
    }

    let resolver = LookupResolver::new(store);
    for event in &events {
        let song = resolver.resolve(&event.song_title, &event.artist_name, event.length)?;
        if song.is_some() {
            stats.song_plays_resolved += 1;
        }
        let songplay_id = store
            .insert_song_play(&event.to_song_play(song))
            .with_context(|| format!("Failed to insert song play at line {}", event.line))?;
        debug!("Song play {} from line {}", songplay_id, event.line);
        stats.song_plays_inserted += 1;
    }

    Ok(stats)
}
