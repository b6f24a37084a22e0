//! Directory-of-fragments configuration source.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::merge::merge;
use crate::tree::Tree;

use super::file::load_config_file;
use super::source::ConfigSource;
use super::ConfigError;

const CONFIG_EXTENSIONS: [&str; 3] = ["json", "conf", "toml"];

/// Loads every config file in a directory.
///
/// Files are applied in file-name order, each one overriding the files before
/// it. With `recursive`, sub-directories are applied first (also in name
/// order), so a directory's own files override its sub-directories.
/// Files without a `json`, `conf` or `toml` extension are ignored.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    path: PathBuf,
    recursive: bool,
}

impl DirectorySource {
    pub fn new(path: impl AsRef<Path>, recursive: bool) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            recursive,
        }
    }
}

impl ConfigSource for DirectorySource {
    fn load(&self) -> Result<Option<Tree>, ConfigError> {
        if !self.path.is_dir() {
            return Err(ConfigError::DirectoryNotFound(self.path.clone()));
        }
        apply_directory(&self.path, Tree::new(), self.recursive).map(Some)
    }
}

/// Merges the directory's files on top of `config`.
pub(crate) fn apply_directory(
    dir: &Path,
    mut config: Tree,
    recursive: bool,
) -> Result<Tree, ConfigError> {
    let read_error = |source| ConfigError::ReadError {
        path: dir.to_path_buf(),
        source,
    };

    let mut subdirs = Vec::new();
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_error)? {
        let path = entry.map_err(read_error)?.path();
        if path.is_dir() {
            subdirs.push(path);
        } else if is_config_file(&path) {
            files.push(path);
        } else {
            debug!(path = %path.display(), "skipping non-config file");
        }
    }
    subdirs.sort();
    files.sort();

    if recursive {
        for subdir in subdirs {
            debug!(dir = %subdir.display(), "reading config directory");
            config = apply_directory(&subdir, config, true)?;
        }
    }

    for file in files {
        if let Some(overlay) = load_config_file(&file, true)? {
            config = merge(&overlay, &config)?;
        }
    }

    Ok(config)
}

fn is_config_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| CONFIG_EXTENSIONS.iter().any(|c| ext.eq_ignore_ascii_case(c)))
}
