//! Walking a data set and loading it one file at a time.
//!
//! Each file is loaded inside its own transaction. A file that fails is rolled
//! back as a whole; files committed before it stay committed.

use super::activity_loader::load_log_file;
use super::discovery::discover_files;
use super::metadata_loader::load_song_file;
use super::stats::LoadStats;
use crate::warehouse::WarehouseStore;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub const DEFAULT_EXTENSION: &str = "json";

#[derive(Clone, Debug)]
pub struct PipelineOptions {
    /// Extension of the files to load, without the dot.
    pub extension: String,
    /// Roll back a failing file and move on instead of aborting the run.
    pub continue_on_error: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            extension: DEFAULT_EXTENSION.to_string(),
            continue_on_error: false,
        }
    }
}

/// Outcome of loading every file under one root.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DatasetSummary {
    pub files_found: usize,
    pub files_loaded: usize,
    pub failed_files: Vec<PathBuf>,
    pub stats: LoadStats,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunSummary {
    pub song_data: DatasetSummary,
    pub log_data: DatasetSummary,
}

impl RunSummary {
    pub fn files_failed(&self) -> usize {
        self.song_data.failed_files.len() + self.log_data.failed_files.len()
    }

    pub fn log(&self) {
        let songs = &self.song_data.stats;
        let logs = &self.log_data.stats;
        info!("ETL Summary");
        info!("===========");
        info!(
            "Song files loaded: {}/{}",
            self.song_data.files_loaded, self.song_data.files_found
        );
        info!(
            "Log files loaded: {}/{}",
            self.log_data.files_loaded, self.log_data.files_found
        );
        info!(
            "Songs inserted: {} (ignored {})",
            songs.songs_inserted, songs.songs_ignored
        );
        info!(
            "Artists inserted: {} (ignored {})",
            songs.artists_inserted, songs.artists_ignored
        );
        info!("User upserts: {}", logs.users_upserted);
        info!(
            "Time rows inserted: {} (ignored {})",
            logs.times_inserted, logs.times_ignored
        );
        info!(
            "Song plays inserted: {} ({} resolved, {} unresolved)",
            logs.song_plays_inserted,
            logs.song_plays_resolved,
            logs.song_plays_unresolved()
        );
        info!("Events skipped: {}", logs.events_skipped);
        for path in self
            .song_data
            .failed_files
            .iter()
            .chain(&self.log_data.failed_files)
        {
            error!("Failed file: {}", path.display());
        }
    }
}

/// Load every matching file under `root` with `load`, in sorted path order.
pub fn process_data<S, F>(
    store: &S,
    root: &Path,
    options: &PipelineOptions,
    load: F,
) -> Result<DatasetSummary>
where
    S: WarehouseStore + ?Sized,
    F: Fn(&S, &Path) -> Result<LoadStats>,
{
    let files = discover_files(root, &options.extension)?;
    let total = files.len();
    info!("{} files found in {}", total, root.display());

    let mut summary = DatasetSummary {
        files_found: total,
        ..Default::default()
    };

    for (i, path) in files.iter().enumerate() {
        match load_in_transaction(store, path, &load) {
            Ok(stats) => {
                summary.stats += &stats;
                summary.files_loaded += 1;
            }
            Err(e) => {
                if !options.continue_on_error {
                    return Err(e.context(format!("Failed to load {}", path.display())));
                }
                error!("Failed to load {}: {:#}", path.display(), e);
                summary.failed_files.push(path.clone());
            }
        }
        info!("{}/{} files processed.", i + 1, total);
    }

    Ok(summary)
}

fn load_in_transaction<S, F>(store: &S, path: &Path, load: &F) -> Result<LoadStats>
where
    S: WarehouseStore + ?Sized,
    F: Fn(&S, &Path) -> Result<LoadStats>,
{
    store.begin()?;
    let result = load(store, path).and_then(|stats| {
        store.commit().context("Commit failed")?;
        Ok(stats)
    });
    if let Err(e) = &result {
        store
            .rollback()
            .with_context(|| format!("Rollback failed after error: {:#}", e))?;
    }
    result
}

/// Load the song metadata under `song_root`, then the activity logs under
/// `log_root`. Song plays can only resolve against songs loaded beforehand.
pub fn run<S: WarehouseStore + ?Sized>(
    store: &S,
    song_root: &Path,
    log_root: &Path,
    options: &PipelineOptions,
) -> Result<RunSummary> {
    let song_data = process_data(store, song_root, options, load_song_file)
        .context("Song data processing failed")?;
    let log_data = process_data(store, log_root, options, load_log_file)
        .context("Log data processing failed")?;
    Ok(RunSummary {
        song_data,
        log_data,
    })
}
