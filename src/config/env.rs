use tracing::debug;

use crate::tree::{Object, Tree};

use super::source::ConfigSource;
use super::ConfigError;

/// Environment variables as a configuration layer.
///
/// `PREFIX<sep>DATABASE<sep>PORT=5432` becomes `{"database": {"port": 5432}}`.
/// Path segments are lowercased; values are coerced to the most specific
/// scalar: boolean, integer, float, then string.
#[derive(Debug, Clone)]
pub struct EnvSource {
    prefix: String,
    separator: String,
}

impl EnvSource {
    /// # Panics
    ///
    /// Panics if `separator` is empty.
    pub fn new(prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        let separator = separator.into();
        assert!(!separator.is_empty(), "separator must not be empty");
        Self {
            prefix: prefix.into(),
            separator,
        }
    }

    fn tree_from_vars<I>(&self, vars: I) -> Option<Tree>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let prefix_with_sep = format!("{}{}", self.prefix, self.separator);
        let mut matching: Vec<(String, String)> = vars
            .into_iter()
            .filter(|(key, _)| key.len() > prefix_with_sep.len() && key.starts_with(&prefix_with_sep))
            .collect();
        if matching.is_empty() {
            return None;
        }
        matching.sort();

        let mut object = Object::new();
        for (key, value) in matching {
            let path: Vec<String> = key[prefix_with_sep.len()..]
                .split(self.separator.as_str())
                .filter(|segment| !segment.is_empty())
                .map(str::to_lowercase)
                .collect();
            if path.is_empty() {
                continue;
            }
            debug!(var = %key, "applying environment override");
            object.insert_path(&path, coerce_value(&value));
        }
        Some(Tree::Object(object))
    }
}

impl ConfigSource for EnvSource {
    fn load(&self) -> Result<Option<Tree>, ConfigError> {
        Ok(self.tree_from_vars(std::env::vars()))
    }
}

/// Reads an environment value as the most specific scalar it spells.
///
/// Only values containing a `.` become floats, so `inf` or `1e3` stay strings.
fn coerce_value(raw: &str) -> Tree {
    if let Some(flag) = parse_flag(raw) {
        return Tree::from(flag);
    }
    if let Ok(int) = raw.parse::<i64>() {
        return Tree::from(int);
    }
    match raw.contains('.').then(|| raw.parse::<f64>()) {
        Some(Ok(float)) => Tree::from(float),
        _ => Tree::from(raw),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    if raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}
