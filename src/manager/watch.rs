//! Following edits to the user configuration file.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Weak;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{info, warn};

use super::ConfigManager;

/// Keeps a file-system watcher alive for as long as it is held.
///
/// The parent directory is watched rather than the file itself so that
/// editors replacing the file through a rename are still noticed.
pub(super) struct UserConfigWatcher {
    _watcher: RecommendedWatcher,
}

impl UserConfigWatcher {
    pub(super) fn start(
        manager: Weak<ConfigManager>,
        path: &Path,
        generation: u64,
    ) -> Result<Self, notify::Error> {
        let target = path.to_path_buf();
        let file_name = path.file_name().map(OsString::from);
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if !touches_file(&event, file_name.as_deref()) {
                    return;
                }
                let Some(manager) = manager.upgrade() else {
                    return;
                };
                if let Err(e) = manager.reload_watched(&target, generation) {
                    warn!(path = %target.display(), error = %e, "updating user config failed");
                }
            }
            Err(e) => warn!(error = %e, "user config watcher error"),
        })?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        info!(path = %path.display(), "watching user configuration");

        Ok(Self { _watcher: watcher })
    }
}

fn touches_file(event: &Event, file_name: Option<&std::ffi::OsStr>) -> bool {
    matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
        && event.paths.iter().any(|p| p.file_name() == file_name)
}
