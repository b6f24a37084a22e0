//! Locating well-known configuration files.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::tree::Tree;

use super::file::load_config_file;
use super::source::ConfigSource;
use super::ConfigError;

/// File stem of the user override file (`settings.conf`, `settings.json`, ...).
pub const USER_CONFIG_STEM: &str = "settings";

const USER_CONFIG_SUFFIXES: [&str; 4] = [".conf", ".json", ".conf.json", ".json.conf"];

const DEFAULT_CONFIG_NAMES: [&str; 3] = ["default.conf", "default.json", "default.conf.json"];

/// Finds the user override file for `stem` in `dir`.
///
/// Candidates are tried in the order `.conf`, `.json`, `.conf.json`,
/// `.json.conf`; the first existing file wins.
pub fn find_user_config(dir: &Path, stem: &str) -> Option<PathBuf> {
    USER_CONFIG_SUFFIXES
        .iter()
        .map(|suffix| dir.join(format!("{stem}{suffix}")))
        .find(|path| path.is_file())
}

/// Finds a defaults file (`default.conf`, `default.json`, `default.conf.json`)
/// in `dir`, ignoring case. Earlier names in that list win.
pub fn find_default_config(dir: &Path) -> Option<PathBuf> {
    let files: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();

    DEFAULT_CONFIG_NAMES.iter().find_map(|name| {
        files
            .iter()
            .find(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.eq_ignore_ascii_case(name))
            })
            .cloned()
    })
}

/// The defaults file of a directory, located with [`find_default_config`]
/// each time the source is loaded.
///
/// A directory without a defaults file contributes nothing.
#[derive(Debug, Clone)]
pub struct DefaultFileSource {
    dir: PathBuf,
}

impl DefaultFileSource {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

impl ConfigSource for DefaultFileSource {
    fn load(&self) -> Result<Option<Tree>, ConfigError> {
        match find_default_config(&self.dir) {
            Some(path) => load_config_file(&path, true),
            None => {
                debug!(dir = %self.dir.display(), "no defaults file found");
                Ok(None)
            }
        }
    }
}
