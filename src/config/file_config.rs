use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Settings read from an optional TOML file. Every field is optional; present
/// fields override the matching command-line value.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    pub db_path: Option<String>,
    pub song_data: Option<String>,
    pub log_data: Option<String>,
    /// "ledger" or "keyed"
    pub schema_variant: Option<String>,
    pub extension: Option<String>,
    pub continue_on_error: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
