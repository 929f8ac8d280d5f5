use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli_style;
use cli_style::get_styles;

use sparkify_etl::config::parse_path;
use sparkify_etl::warehouse::{SchemaVariant, SqliteWarehouse};

#[derive(Parser, Debug)]
#[command(name = "sparkify-schema", version, styles = get_styles())]
#[command(about = "Manage the tables of a Sparkify warehouse")]
struct CliArgs {
    /// Path to the SQLite warehouse database file.
    #[clap(value_parser = parse_path)]
    pub db_path: PathBuf,

    /// Table layout of the warehouse.
    #[clap(long, value_enum, default_value_t = SchemaVariant::Ledger)]
    pub schema_variant: SchemaVariant,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Creates every table and index of the variant if missing.
    Create,

    /// Drops every table of the variant.
    Drop,

    /// Drops and recreates every table of the variant.
    Reset,

    /// Checks that the database matches the variant's table definitions.
    Validate,

    /// Shows the number of rows of each table.
    Counts,
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

    let store = SqliteWarehouse::connect(&cli_args.db_path, cli_args.schema_variant)?;
    let variant = cli_args.schema_variant;

    match cli_args.command {
        Command::Create => {
            store.create_schema()?;
            info!("Created {:?} schema in {:?}", variant, cli_args.db_path);
        }
        Command::Drop => {
            store.drop_schema()?;
            info!("Dropped {:?} schema from {:?}", variant, cli_args.db_path);
        }
        Command::Reset => {
            store.reset()?;
        }
        Command::Validate => {
            store
                .validate_schema()
                .with_context(|| format!("{:?} is not a valid {:?} warehouse", cli_args.db_path, variant))?;
            info!("{:?} matches the {:?} schema", cli_args.db_path, variant);
        }
        Command::Counts => {
            let counts = store.counts()?;
            println!("songs:      {}", counts.songs);
            println!("artists:    {}", counts.artists);
            println!("users:      {}", counts.users);
            println!("time:       {}", counts.times);
            println!("song plays: {}", counts.song_plays);
        }
    }
    Ok(())
}
