use std::path::Path;

use serde::de::DeserializeOwned;

use crate::merge::merge;
use crate::tree::Tree;

use super::dir::{apply_directory, DirectorySource};
use super::discover::DefaultFileSource;
use super::env::EnvSource;
use super::file::{load_config_file, FileSource};
use super::parse::parse_str;
use super::source::{ConfigSource, JsonSource, TreeSource};
use super::ConfigError;

/// Builder for loading configuration from multiple sources.
///
/// Sources are merged in registration order, with later sources overriding
/// earlier ones. Nested objects are merged recursively, arrays are
/// concatenated (later source's elements first) and scalars are replaced.
/// Colliding keys of different types fail the build.
///
/// ## Comment lines
///
/// JSON sources may contain lines starting with `#`; they are dropped before
/// parsing:
///
/// ```json
/// # shipped defaults
/// {
///     "server": { "host": "localhost", "port": 8080 }
/// }
/// ```
///
/// ## Example
///
/// ```no_run
/// use layerconf::Config;
///
/// let config = Config::builder()
///     .with_json(r#"{"server": {"host": "localhost", "port": 8080}}"#)
///     .with_dir("config/conf.d", false)
///     .with_file("config/local.json", false)
///     .with_env("MYAPP", "__")
///     .build()?;
///
/// let port = config.get("server").get("port").as_i32();
/// # Ok::<(), layerconf::ConfigError>(())
/// ```
#[derive(Debug, Default)]
#[must_use = "builders do nothing until .build() is called"]
pub struct Config {
    sources: Vec<Box<dyn ConfigSource>>,
}

impl Config {
    /// Creates a new configuration builder.
    pub fn builder() -> Self {
        Self::default()
    }

    /// Adds an in-memory tree, usually the compiled-in defaults.
    pub fn with_defaults(self, tree: Tree) -> Self {
        self.with_source(TreeSource::new(tree))
    }

    /// Adds an inline JSON document.
    ///
    /// Combine with `include_str!` to ship defaults inside the binary.
    pub fn with_json(self, text: impl Into<String>) -> Self {
        self.with_source(JsonSource::new(text))
    }

    /// Adds the `default.conf`, `default.json` or `default.conf.json` file
    /// found in `dir` (names compared without case). Skipped when there is none.
    pub fn with_default_file_in(self, dir: impl AsRef<Path>) -> Self {
        self.with_source(DefaultFileSource::new(dir))
    }

    /// Adds a JSON or TOML file (TOML when the extension is `.toml`).
    ///
    /// If `required` is `true`, the build will fail if the file doesn't exist.
    /// Optional files that are missing are silently skipped.
    pub fn with_file(self, path: impl AsRef<Path>, required: bool) -> Self {
        self.with_source(FileSource::new(path, required))
    }

    /// Adds every config file in a directory. See [`DirectorySource`].
    ///
    /// The build fails if the directory doesn't exist.
    pub fn with_dir(self, path: impl AsRef<Path>, recursive: bool) -> Self {
        self.with_source(DirectorySource::new(path, recursive))
    }

    /// Loads configuration from environment variables with the given prefix.
    ///
    /// Environment variables are mapped to config paths by:
    /// 1. Removing the prefix and separator
    /// 2. Splitting remaining segments on the separator
    /// 3. Converting path segments to lowercase
    ///
    /// Values are coerced from strings to the most specific type:
    /// integer, float, boolean, or string (fallback).
    ///
    /// ```no_run
    /// # use layerconf::Config;
    /// // defaults -> env overrides -> local file overrides env
    /// let config = Config::builder()
    ///     .with_file("config/default.json", true)
    ///     .with_env("MYAPP", "__")
    ///     .with_file("config/local.json", false)
    ///     .build()?;
    /// # Ok::<(), layerconf::ConfigError>(())
    /// ```
    pub fn with_env(self, prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        self.with_source(EnvSource::new(prefix, separator))
    }

    /// Adds a custom source.
    pub fn with_source(mut self, source: impl ConfigSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Loads every source and merges them into the effective tree.
    pub fn build(self) -> Result<Tree, ConfigError> {
        let mut merged = Tree::new();

        for source in &self.sources {
            if let Some(layer) = source.load()? {
                merged = merge(&layer, &merged)?;
            }
        }

        Ok(merged)
    }

    /// Builds the effective tree and deserializes it into `T`.
    pub fn build_as<T: DeserializeOwned>(self) -> Result<T, ConfigError> {
        let tree = self.build()?;
        serde_json::from_value(tree.to_json()).map_err(ConfigError::DeserializeError)
    }
}

/// Parses `json` and merges it on top of `config`.
pub fn apply_json(json: &str, config: &Tree) -> Result<Tree, ConfigError> {
    let overlay = parse_str(json)?;
    Ok(merge(&overlay, config)?)
}

/// Loads the file at `path` and merges it on top of `config`.
pub fn apply_file(path: impl AsRef<Path>, config: &Tree) -> Result<Tree, ConfigError> {
    let overlay = load_config_file(path.as_ref(), true)?;
    Ok(merge(overlay.as_ref(), config)?)
}

/// Merges every config file under `path` on top of `config`.
pub fn apply_dir(path: impl AsRef<Path>, config: &Tree, recursive: bool) -> Result<Tree, ConfigError> {
    let path = path.as_ref();
    if !path.is_dir() {
        return Err(ConfigError::DirectoryNotFound(path.to_path_buf()));
    }
    apply_directory(path, config.clone(), recursive)
}
