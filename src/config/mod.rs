mod file_config;

pub use file_config::FileConfig;

use crate::etl::{PipelineOptions, DEFAULT_EXTENSION};
use crate::warehouse::SchemaVariant;
use anyhow::{anyhow, bail, Context, Result};
use clap::ValueEnum;
use std::path::{Path, PathBuf};

/// Resolve a path given on the command line: canonical when it exists,
/// otherwise joined onto the working directory.
pub fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub song_data: Option<PathBuf>,
    pub log_data: Option<PathBuf>,
    pub schema_variant: SchemaVariant,
    pub extension: Option<String>,
    pub continue_on_error: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub song_data: PathBuf,
    pub log_data: PathBuf,
    pub schema_variant: SchemaVariant,
    pub extension: String,
    pub continue_on_error: bool,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .ok_or_else(|| anyhow!("db_path must be specified via --db-path or in config file"))?;
        if db_path.is_dir() {
            bail!("db_path is a directory: {:?}", db_path);
        }
        let db_parent = db_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        if !db_parent.is_dir() {
            bail!("Database directory does not exist: {:?}", db_parent);
        }

        let song_data = resolve_data_dir("song_data", file.song_data, &cli.song_data)?;
        let log_data = resolve_data_dir("log_data", file.log_data, &cli.log_data)?;

        let schema_variant = match file.schema_variant {
            Some(s) => parse_schema_variant(&s)?,
            None => cli.schema_variant,
        };

        let extension = file
            .extension
            .or_else(|| cli.extension.clone())
            .map(|e| e.trim_start_matches('.').to_string())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());

        let continue_on_error = file.continue_on_error.unwrap_or(cli.continue_on_error);

        Ok(Self {
            db_path,
            song_data,
            log_data,
            schema_variant,
            extension,
            continue_on_error,
        })
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            extension: self.extension.clone(),
            continue_on_error: self.continue_on_error,
        }
    }
}

fn resolve_data_dir(
    name: &str,
    from_file: Option<String>,
    from_cli: &Option<PathBuf>,
) -> Result<PathBuf> {
    let dir = from_file
        .map(PathBuf::from)
        .or_else(|| from_cli.clone())
        .ok_or_else(|| anyhow!("{} must be specified via the command line or in config file", name))?;
    if !dir.exists() {
        bail!("{} directory does not exist: {:?}", name, dir);
    }
    if !dir.is_dir() {
        bail!("{} is not a directory: {:?}", name, dir);
    }
    Ok(dir)
}

fn parse_schema_variant(s: &str) -> Result<SchemaVariant> {
    SchemaVariant::from_str(s, true).map_err(|_| anyhow!("Invalid schema_variant: {:?}", s))
}
