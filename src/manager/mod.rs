//! Ownership of the effective configuration.

mod watch;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock, RwLockUpgradableReadGuard};
use tracing::{debug, info};

use crate::config::{find_user_config, load_config_file, ConfigError, USER_CONFIG_STEM};
use crate::merge::{merge, Layer, MergeError};
use crate::tree::Tree;
use crate::Error;

use watch::UserConfigWatcher;

const RELOAD_RETRY_DELAY: Duration = Duration::from_millis(100);

type Listener = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Default)]
struct Layers {
    defaults: Arc<Tree>,
    user: Option<Arc<Tree>>,
    user_path: Option<PathBuf>,
    overlay: Option<Arc<Tree>>,
    effective: Option<Arc<Tree>>,
    // Bumped whenever a watcher is started or stopped; reloads from an
    // older watcher are discarded.
    watch_generation: u64,
}

impl Layers {
    fn compute(&self) -> Result<Tree, MergeError> {
        let user = self.user.as_deref().map_or(Layer::Missing, Layer::Tree);
        let merged = merge(user, self.defaults.as_ref())?;
        match &self.overlay {
            Some(overlay) => merge(overlay.as_ref(), &merged),
            None => Ok(merged),
        }
    }
}

/// Holds the configuration layers and a lazily computed effective tree.
///
/// The effective tree is `user` merged over `defaults`, with an optional
/// runtime overlay on top. A missing user layer contributes nothing. Any
/// change to a layer invalidates the cached tree; the next
/// [`effective`](Self::effective) call recomputes it.
///
/// Readers get an `Arc` to an immutable tree, so they see either the old or
/// the fully recomputed configuration, never a partial merge.
///
/// ## Example
///
/// ```
/// use layerconf::{parse_str, ConfigManager};
///
/// let defaults = parse_str(r#"{"log": {"level": "info"}, "workers": 4}"#)?;
/// let manager = ConfigManager::new(defaults)
///     .with_user(parse_str(r#"{"log": {"level": "debug"}}"#)?);
///
/// let config = manager.effective()?;
/// assert_eq!(config.lookup(["log", "level"]).as_str(), "debug");
/// assert_eq!(config.get("workers").as_i32(), 4);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct ConfigManager {
    layers: RwLock<Layers>,
    listeners: Mutex<Vec<Listener>>,
    watcher: Mutex<Option<UserConfigWatcher>>,
}

impl fmt::Debug for ConfigManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let watching = self.is_watching();
        f.debug_struct("ConfigManager")
            .field("layers", &*self.layers.read())
            .field("listeners", &self.listeners.lock().len())
            .field("watching", &watching)
            .finish()
    }
}

impl ConfigManager {
    pub fn new(defaults: Tree) -> Self {
        Self {
            layers: RwLock::new(Layers {
                defaults: Arc::new(defaults),
                ..Layers::default()
            }),
            listeners: Mutex::new(Vec::new()),
            watcher: Mutex::new(None),
        }
    }

    /// Sets the user layer while constructing the manager.
    pub fn with_user(self, user: Tree) -> Self {
        self.layers.write().user = Some(Arc::new(user));
        self
    }

    /// Creates a manager whose user layer comes from the `settings.*` file
    /// in `dir`, if there is one.
    ///
    /// Call [`watch_user_config`](Self::watch_user_config) with
    /// [`user_config_path`](Self::user_config_path) to follow later edits.
    pub fn load(defaults: Tree, dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let manager = Self::new(defaults);

        if let Some(path) = find_user_config(dir.as_ref(), USER_CONFIG_STEM) {
            let user = load_config_file(&path, true)?;
            debug!(path = %path.display(), "loaded user configuration");
            let mut layers = manager.layers.write();
            layers.user = user.map(Arc::new);
            layers.user_path = Some(path);
        }

        Ok(manager)
    }

    /// Returns the effective configuration, recomputing it if invalidated.
    ///
    /// Concurrent callers after an invalidation share one recomputation.
    pub fn effective(&self) -> Result<Arc<Tree>, MergeError> {
        if let Some(tree) = &self.layers.read().effective {
            return Ok(Arc::clone(tree));
        }

        let layers = self.layers.upgradable_read();
        if let Some(tree) = &layers.effective {
            return Ok(Arc::clone(tree));
        }

        debug!("recomputing effective configuration");
        let tree = Arc::new(layers.compute()?);
        let mut layers = RwLockUpgradableReadGuard::upgrade(layers);
        layers.effective = Some(Arc::clone(&tree));
        Ok(tree)
    }

    /// A deep copy of the effective configuration that will not follow
    /// later changes.
    pub fn current_scope(&self) -> Result<Tree, MergeError> {
        Ok(self.effective()?.as_ref().clone())
    }

    /// Drops the cached effective tree; the next read recomputes it.
    pub fn invalidate(&self) {
        self.layers.write().effective = None;
        debug!("effective configuration invalidated");
    }

    pub fn defaults(&self) -> Arc<Tree> {
        Arc::clone(&self.layers.read().defaults)
    }

    pub fn user(&self) -> Option<Arc<Tree>> {
        self.layers.read().user.clone()
    }

    pub fn user_config_path(&self) -> Option<PathBuf> {
        self.layers.read().user_path.clone()
    }

    pub fn set_defaults(&self, defaults: Tree) {
        let mut layers = self.layers.write();
        layers.defaults = Arc::new(defaults);
        layers.effective = None;
    }

    /// Replaces the user layer and stops watching the user file.
    pub fn set_user(&self, user: Option<Tree>) {
        self.stop_watching();
        let mut layers = self.layers.write();
        layers.user = user.map(Arc::new);
        layers.user_path = None;
        layers.effective = None;
    }

    /// Applies `overlay` on top of user and defaults until cleared.
    pub fn set_overlay(&self, overlay: Tree) {
        let mut layers = self.layers.write();
        layers.overlay = Some(Arc::new(overlay));
        layers.effective = None;
    }

    pub fn clear_overlay(&self) {
        let mut layers = self.layers.write();
        layers.overlay = None;
        layers.effective = None;
    }

    /// Registers a callback run after the user file is reloaded.
    ///
    /// Callbacks run on the thread that performed the reload.
    pub fn on_user_config_changed(&self, listener: impl Fn() + Send + Sync + 'static) {
        self.listeners.lock().push(Arc::new(listener));
    }

    /// Re-reads the user file at `path` and makes it the user layer.
    ///
    /// A read failure is retried once after a short delay, since editors
    /// may still hold the file. On error the previous user layer is kept.
    pub fn reload_user_config(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        self.reload(path.as_ref(), None)
    }

    /// Reload triggered by the watcher started at `generation`.
    fn reload_watched(&self, path: &Path, generation: u64) -> Result<(), ConfigError> {
        self.reload(path, Some(generation))
    }

    fn reload(&self, path: &Path, generation: Option<u64>) -> Result<(), ConfigError> {
        let user = match load_config_file(path, true) {
            Err(ConfigError::ReadError { .. }) => {
                std::thread::sleep(RELOAD_RETRY_DELAY);
                load_config_file(path, true)?
            }
            loaded => loaded?,
        };

        {
            let mut layers = self.layers.write();
            if generation.is_some_and(|g| g != layers.watch_generation) {
                debug!(path = %path.display(), "discarding reload from a stopped watcher");
                return Ok(());
            }
            layers.user = user.map(Arc::new);
            layers.user_path = Some(path.to_path_buf());
            layers.effective = None;
        }
        info!(path = %path.display(), "user configuration changed, updating config information");

        let listeners = self.listeners.lock().clone();
        for listener in listeners {
            listener();
        }
        Ok(())
    }

    /// Reloads the user layer whenever the file at `path` changes.
    ///
    /// Replaces any previous watcher, which stays stopped if the new one
    /// fails to start. [`set_user`](Self::set_user) stops it.
    pub fn watch_user_config(self: &Arc<Self>, path: impl AsRef<Path>) -> Result<(), Error> {
        let mut current = self.watcher.lock();
        current.take();
        let generation = self.bump_watch_generation();
        *current = Some(UserConfigWatcher::start(Arc::downgrade(self), path.as_ref(), generation)?);
        Ok(())
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.lock().is_some()
    }

    pub fn stop_watching(&self) {
        let mut current = self.watcher.lock();
        self.bump_watch_generation();
        if current.take().is_some() {
            debug!("stopped watching user configuration");
        }
    }

    fn bump_watch_generation(&self) -> u64 {
        let mut layers = self.layers.write();
        layers.watch_generation += 1;
        layers.watch_generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_str;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use tempfile::TempDir;

    fn tree(json: &str) -> Tree {
        parse_str(json).unwrap()
    }

    #[test]
    fn test_missing_user_layer_yields_defaults() {
        let defaults = tree(r#"{"a": 1}"#);
        let manager = ConfigManager::new(defaults.clone());
        assert_eq!(*manager.effective().unwrap(), defaults);
    }

    #[test]
    fn test_effective_is_cached_until_invalidated() {
        let manager = ConfigManager::new(tree(r#"{"a": 1}"#));
        let first = manager.effective().unwrap();
        let second = manager.effective().unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        manager.invalidate();
        let third = manager.effective().unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(first, third);
    }

    #[test]
    fn test_layer_changes_recompute() {
        let manager = ConfigManager::new(tree(r#"{"level": "info", "tags": ["d"]}"#));
        assert_eq!(manager.effective().unwrap().get("level").as_str(), "info");

        manager.set_user(Some(tree(r#"{"level": "debug", "tags": ["u"]}"#)));
        let config = manager.effective().unwrap();
        assert_eq!(config.get("level").as_str(), "debug");
        assert_eq!(config.get("tags").as_string_vec(), vec!["u", "d"]);

        manager.set_overlay(tree(r#"{"level": "trace"}"#));
        assert_eq!(manager.effective().unwrap().get("level").as_str(), "trace");

        manager.clear_overlay();
        manager.set_defaults(tree(r#"{"extra": true}"#));
        let config = manager.effective().unwrap();
        assert_eq!(config.get("level").as_str(), "debug");
        assert!(config.get("extra").as_bool());
        assert!(config.get("tags").exists());
    }

    #[test]
    fn test_snapshot_does_not_follow_changes() {
        let manager = ConfigManager::new(tree(r#"{"a": 1}"#));
        let snapshot = manager.current_scope().unwrap();

        manager.set_user(Some(tree(r#"{"a": 2}"#)));

        assert_eq!(snapshot.get("a").as_i32(), 1);
        assert_eq!(manager.effective().unwrap().get("a").as_i32(), 2);
    }

    #[test]
    fn test_mismatch_surfaces_and_recovers() {
        let manager = ConfigManager::new(tree(r#"{"port": 80}"#))
            .with_user(tree(r#"{"port": "eighty"}"#));
        assert!(matches!(
            manager.effective(),
            Err(MergeError::TypeMismatch { .. })
        ));

        manager.set_user(None);
        assert_eq!(manager.effective().unwrap().get("port").as_i32(), 80);
    }

    #[test]
    fn test_concurrent_readers_share_one_recomputation() {
        let manager = Arc::new(ConfigManager::new(tree(r#"{"a": {"b": [1, 2, 3]}}"#)));
        manager.invalidate();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = Arc::clone(&manager);
                thread::spawn(move || manager.effective().unwrap())
            })
            .collect();
        let results: Vec<Arc<Tree>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
    }

    #[test]
    fn test_load_discovers_user_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("settings.conf"),
            "# local overrides\n{\"name\": \"user\"}",
        )
        .unwrap();

        let manager = ConfigManager::load(tree(r#"{"name": "default", "port": 1}"#), dir.path())
            .unwrap();
        let config = manager.effective().unwrap();

        assert_eq!(config.get("name").as_str(), "user");
        assert_eq!(config.get("port").as_i32(), 1);
        assert_eq!(
            manager.user_config_path(),
            Some(dir.path().join("settings.conf"))
        );
    }

    #[test]
    fn test_load_without_user_file() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::load(tree(r#"{"a": 1}"#), dir.path()).unwrap();
        assert!(manager.user().is_none());
        assert_eq!(manager.effective().unwrap().get("a").as_i32(), 1);
    }

    #[test]
    fn test_reload_replaces_user_and_notifies() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"mode": "first"}"#).unwrap();

        let manager = ConfigManager::load(tree(r#"{"mode": "default"}"#), dir.path()).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        manager.on_user_config_changed(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(manager.effective().unwrap().get("mode").as_str(), "first");

        fs::write(&path, r#"{"mode": "second"}"#).unwrap();
        manager.reload_user_config(&path).unwrap();

        assert_eq!(manager.effective().unwrap().get("mode").as_str(), "second");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_reload_keeps_previous_user() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"mode": "good"}"#).unwrap();
        let manager = ConfigManager::load(Tree::new(), dir.path()).unwrap();

        fs::write(&path, "{ half written").unwrap();
        assert!(manager.reload_user_config(&path).is_err());
        assert_eq!(manager.effective().unwrap().get("mode").as_str(), "good");
    }

    #[test]
    fn test_reload_from_stopped_watcher_is_discarded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"mode": "file"}"#).unwrap();
        let manager = ConfigManager::load(Tree::new(), dir.path()).unwrap();

        let stale = manager.bump_watch_generation();
        manager.set_user(Some(tree(r#"{"mode": "runtime"}"#)));
        fs::write(&path, r#"{"mode": "edited"}"#).unwrap();
        manager.reload_watched(&path, stale).unwrap();

        assert_eq!(manager.effective().unwrap().get("mode").as_str(), "runtime");
        assert_eq!(manager.user_config_path(), None);

        let live = manager.bump_watch_generation();
        manager.reload_watched(&path, live).unwrap();
        assert_eq!(manager.effective().unwrap().get("mode").as_str(), "edited");
    }

    #[test]
    fn test_listener_can_register_listeners() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{}").unwrap();
        let manager = Arc::new(ConfigManager::load(Tree::new(), dir.path()).unwrap());

        let calls = Arc::new(AtomicUsize::new(0));
        let weak = Arc::downgrade(&manager);
        let counter = Arc::clone(&calls);
        manager.on_user_config_changed(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            if let Some(manager) = weak.upgrade() {
                let counter = Arc::clone(&counter);
                manager.on_user_config_changed(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                });
            }
        });

        manager.reload_user_config(&path).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        manager.reload_user_config(&path).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
