//! Configuration sources, parsing and the layering builder.

mod builder;
mod dir;
mod discover;
mod env;
mod error;
mod file;
mod parse;
mod source;

pub use builder::{apply_dir, apply_file, apply_json, Config};
pub use dir::DirectorySource;
pub use discover::{find_default_config, DefaultFileSource, find_user_config, USER_CONFIG_STEM};
pub use env::EnvSource;
pub use error::ConfigError;
pub use file::FileSource;
pub use parse::{parse, parse_str, parse_toml, strip_comments, Format};
pub use source::{ConfigSource, JsonSource, TreeSource};

pub(crate) use file::load_config_file;
