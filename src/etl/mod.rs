//! Extracting the Sparkify JSON data sets and loading them into the warehouse.

mod activity_loader;
mod discovery;
mod metadata_loader;
mod pipeline;
mod reader;
mod records;
mod resolver;
mod stats;
mod transform;

pub use activity_loader::load_log_file;
pub use discovery::{discover_files, DiscoveryError};
pub use metadata_loader::load_song_file;
pub use pipeline::{
    process_data, run, DatasetSummary, PipelineOptions, RunSummary, DEFAULT_EXTENSION,
};
pub use reader::{read_log_events, read_song_record, RecordError};
pub use records::{LogEvent, LogLine, SongRecord, NEXT_SONG_PAGE};
pub use resolver::LookupResolver;
pub use stats::LoadStats;
pub use transform::{artist_from_record, decompose_timestamp, song_from_record, SongPlayEvent};
