use crate::tree::Tree;

use super::parse::parse_str;
use super::ConfigError;

/// Produces one configuration layer for the [`Config`](super::Config) builder.
pub trait ConfigSource: Send + Sync + std::fmt::Debug {
    /// Returns `Ok(None)` when the source has nothing to contribute,
    /// such as an optional file that does not exist.
    fn load(&self) -> Result<Option<Tree>, ConfigError>;
}

/// An in-memory tree, typically compiled-in defaults.
#[derive(Debug, Clone)]
pub struct TreeSource {
    tree: Tree,
}

impl TreeSource {
    pub fn new(tree: Tree) -> Self {
        Self { tree }
    }
}

impl ConfigSource for TreeSource {
    fn load(&self) -> Result<Option<Tree>, ConfigError> {
        Ok(Some(self.tree.clone()))
    }
}

/// An inline JSON document, e.g. one embedded with `include_str!`.
#[derive(Debug, Clone)]
pub struct JsonSource {
    text: String,
}

impl JsonSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl ConfigSource for JsonSource {
    fn load(&self) -> Result<Option<Tree>, ConfigError> {
        parse_str(&self.text).map(Some)
    }
}
