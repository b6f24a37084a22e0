use std::path::PathBuf;
use thiserror::Error;

use crate::merge::MergeError;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("required config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to parse TOML config file '{path}': {source}")]
    TomlParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to parse JSON config: {0}")]
    InvalidJson(serde_json::Error),

    #[error("config document is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("config document {origin} must be an object at the top level")]
    NotAnObject { origin: String },

    #[error("failed to merge config sources: {0}")]
    Merge(#[from] MergeError),

    #[error("failed to deserialize config: {0}")]
    DeserializeError(serde_json::Error),
}
