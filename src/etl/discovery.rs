//! Finding the source files of a data set.

use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Data directory does not exist: {0:?}")]
    MissingRoot(PathBuf),

    #[error("Data path is not a directory: {0:?}")]
    NotADirectory(PathBuf),

    #[error("Failed to walk {root:?}: {source}")]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// All files below `root` whose extension matches `extension`
/// (case-insensitive, without the dot), as absolute paths in sorted order.
pub fn discover_files(root: &Path, extension: &str) -> Result<Vec<PathBuf>, DiscoveryError> {
    if !root.exists() {
        return Err(DiscoveryError::MissingRoot(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(DiscoveryError::NotADirectory(root.to_path_buf()));
    }
    let root = root.canonicalize()?;
    let extension = extension.trim_start_matches('.');

    let mut files = Vec::new();
    for entry in WalkDir::new(&root).follow_links(true) {
        let entry = entry.map_err(|source| DiscoveryError::Walk {
            root: root.clone(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension));
        if matches {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}
