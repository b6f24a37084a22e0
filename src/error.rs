use crate::config::ConfigError;
use crate::merge::MergeError;
use thiserror::Error;

/// Top-level error type for the layerconf library.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("merge error: {0}")]
    Merge(#[from] MergeError),

    #[error("failed to watch user configuration: {0}")]
    Watch(#[from] notify::Error),
}
