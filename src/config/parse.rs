//! Turning raw document text into a [`Tree`].
//!
//! JSON documents may contain comment lines: any line whose first non-blank
//! character is `#` is dropped before decoding.

use std::path::Path;

use crate::tree::Tree;

use super::ConfigError;

/// Document syntax, chosen from a file's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Toml,
}

impl Format {
    /// `.toml` files are TOML; everything else (`.json`, `.conf`, ...) is JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Format::Toml,
            _ => Format::Json,
        }
    }
}

/// Removes `#` comment lines.
pub fn strip_comments(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parses a JSON document from raw bytes.
pub fn parse(bytes: &[u8]) -> Result<Tree, ConfigError> {
    parse_str(std::str::from_utf8(bytes)?)
}

/// Parses a JSON document. The top level must be an object.
pub fn parse_str(text: &str) -> Result<Tree, ConfigError> {
    let value: serde_json::Value =
        serde_json::from_str(&strip_comments(text)).map_err(ConfigError::InvalidJson)?;
    into_document(Tree::from(value), "<inline>")
}

/// Parses a TOML document.
pub fn parse_toml(text: &str) -> Result<Tree, ConfigError> {
    parse_document(text, Format::Toml, Path::new("<inline>"))
}

/// Reads `text` as `format`, attributing failures to `path`.
pub(crate) fn parse_document(text: &str, format: Format, path: &Path) -> Result<Tree, ConfigError> {
    match format {
        Format::Json => {
            let value: serde_json::Value = serde_json::from_str(&strip_comments(text)).map_err(
                |e| ConfigError::ParseError {
                    path: path.to_path_buf(),
                    source: e,
                },
            )?;
            into_document(Tree::from(value), &path.display().to_string())
        }
        Format::Toml => {
            let table: toml::Table =
                toml::from_str(text).map_err(|e| ConfigError::TomlParseError {
                    path: path.to_path_buf(),
                    source: e,
                })?;
            Ok(Tree::from(toml::Value::Table(table)))
        }
    }
}

fn into_document(tree: Tree, origin: &str) -> Result<Tree, ConfigError> {
    match tree {
        Tree::Object(_) => Ok(tree),
        _ => Err(ConfigError::NotAnObject {
            origin: origin.to_string(),
        }),
    }
}
