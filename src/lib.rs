//! Sparkify ETL Library
//!
//! Loads the Sparkify song-metadata and user-activity JSON data sets into a
//! SQLite warehouse. The binaries are thin wrappers around these modules.

pub mod config;
pub mod etl;
pub mod sqlite_persistence;
pub mod warehouse;

// Re-export commonly used types for convenience
pub use config::{AppConfig, CliConfig, FileConfig};
pub use etl::{run, PipelineOptions, RunSummary};
pub use warehouse::{SchemaVariant, SqliteWarehouse, WarehouseStore};
