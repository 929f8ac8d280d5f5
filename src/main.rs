use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli_style;
use cli_style::get_styles;

use sparkify_etl::config::{parse_path, AppConfig, CliConfig, FileConfig};
use sparkify_etl::etl;
use sparkify_etl::warehouse::{SchemaVariant, SqliteWarehouse};

#[derive(Parser, Debug)]
#[command(name = "sparkify-etl", version, styles = get_styles())]
#[command(about = "Load the Sparkify song and log data sets into a SQLite warehouse")]
struct CliArgs {
    /// Path to the SQLite warehouse database file.
    #[clap(long, value_parser = parse_path)]
    pub db_path: Option<PathBuf>,

    /// Root directory of the song metadata files.
    #[clap(long, value_parser = parse_path, default_value = "data/song_data")]
    pub song_data: PathBuf,

    /// Root directory of the user activity log files.
    #[clap(long, value_parser = parse_path, default_value = "data/log_data")]
    pub log_data: PathBuf,

    /// Table layout of the warehouse.
    #[clap(long, value_enum, default_value_t = SchemaVariant::Ledger)]
    pub schema_variant: SchemaVariant,

    /// Extension of the data files to load.
    #[clap(long, default_value = etl::DEFAULT_EXTENSION)]
    pub extension: String,

    /// Roll back a failing file and continue with the next one.
    #[clap(long, default_value_t = false)]
    pub continue_on_error: bool,

    /// Drop and recreate every warehouse table before loading.
    #[clap(long, default_value_t = false)]
    pub reset: bool,

    /// Path to a TOML config file. Values in it override command line values.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db_path: self.db_path.clone(),
            song_data: Some(self.song_data.clone()),
            log_data: Some(self.log_data.clone()),
            schema_variant: self.schema_variant,
            extension: Some(self.extension.clone()),
            continue_on_error: self.continue_on_error,
        }
    }
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    info!(
        "Sparkify ETL {}-{}",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH")
    );

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config file {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    info!(
        "Opening {:?} warehouse at {:?}...",
        config.schema_variant, config.db_path
    );
    let store = if cli_args.reset {
        warn!("Resetting warehouse, all loaded rows will be dropped");
        let store = SqliteWarehouse::connect(&config.db_path, config.schema_variant)?;
        store.reset()?;
        store
    } else {
        SqliteWarehouse::open(&config.db_path, config.schema_variant)?
    };

    let summary = etl::run(
        &store,
        &config.song_data,
        &config.log_data,
        &config.pipeline_options(),
    )?;
    summary.log();

    let counts = store.counts()?;
    info!("");
    info!("Warehouse contains:");
    info!("  {} songs", counts.songs);
    info!("  {} artists", counts.artists);
    info!("  {} users", counts.users);
    info!("  {} time rows", counts.times);
    info!("  {} song plays", counts.song_plays);

    if summary.files_failed() > 0 {
        warn!("ETL completed with {} failed files", summary.files_failed());
    } else {
        info!("ETL completed successfully!");
    }
    Ok(())
}
