//! Layered JSON configuration.
//!
//! Documents from several sources (compiled-in defaults, user override files,
//! directories of fragments, the environment) are merged by precedence into a
//! single effective [`Tree`]. Reading the tree never fails: a lookup of an
//! absent path yields [`Node::Missing`], which converts to the zero value of
//! whatever type is asked for.
//!
//! ```
//! use layerconf::{Config, ConfigManager};
//!
//! let defaults = Config::builder()
//!     .with_json(r#"{"http": {"port": 8080, "allow": ["127.0.0.1"]}}"#)
//!     .build()?;
//! let user = layerconf::parse_str(r#"{"http": {"allow": ["10.0.0.1"]}}"#)?;
//!
//! let manager = ConfigManager::new(defaults).with_user(user);
//! let config = manager.effective()?;
//!
//! assert_eq!(config.lookup(["http", "port"]).as_i32(), 8080);
//! assert_eq!(
//!     config.lookup(["http", "allow"]).as_string_vec(),
//!     vec!["10.0.0.1", "127.0.0.1"]
//! );
//! assert!(!config.lookup(["http", "tls", "enabled"]).as_bool());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
mod error;
pub mod manager;
pub mod merge;
pub mod tree;

pub use config::{parse, parse_str, Config, ConfigError};
pub use error::Error;
pub use manager::ConfigManager;
pub use merge::{merge, merge_all, Layer, MergeError};
pub use tree::{Kind, Node, Object, Scalar, Tree};
