use crate::warehouse::InsertOutcome;
use std::ops::AddAssign;

/// Row-level counters accumulated while loading files.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub songs_inserted: usize,
    pub songs_ignored: usize,
    pub artists_inserted: usize,
    pub artists_ignored: usize,
    pub users_upserted: usize,
    pub times_inserted: usize,
    pub times_ignored: usize,
    pub song_plays_inserted: usize,
    pub song_plays_resolved: usize,
    /// Events of any page other than `NextSong`.
    pub events_skipped: usize,
}

impl LoadStats {
    pub fn record_song(&mut self, outcome: InsertOutcome) {
        match outcome {
            InsertOutcome::Ignored => self.songs_ignored += 1,
            _ => self.songs_inserted += 1,
        }
    }

    pub fn record_artist(&mut self, outcome: InsertOutcome) {
        match outcome {
            InsertOutcome::Ignored => self.artists_ignored += 1,
            _ => self.artists_inserted += 1,
        }
    }

    pub fn record_time(&mut self, outcome: InsertOutcome) {
        match outcome {
            InsertOutcome::Ignored => self.times_ignored += 1,
            _ => self.times_inserted += 1,
        }
    }

    pub fn song_plays_unresolved(&self) -> usize {
        self.song_plays_inserted - self.song_plays_resolved
    }
}

impl AddAssign<&LoadStats> for LoadStats {
    fn add_assign(&mut self, other: &LoadStats) {
        self.songs_inserted += other.songs_inserted;
        self.songs_ignored += other.songs_ignored;
        self.artists_inserted += other.artists_inserted;
        self.artists_ignored += other.artists_ignored;
        self.users_upserted += other.users_upserted;
        self.times_inserted += other.times_inserted;
        self.times_ignored += other.times_ignored;
        self.song_plays_inserted += other.song_plays_inserted;
        self.song_plays_resolved += other.song_plays_resolved;
        self.events_skipped += other.events_skipped;
    }
}
