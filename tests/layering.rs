//! End-to-end layering: defaults, fragment directories, user files and the
//! environment folded into one effective tree.

use std::fs;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use layerconf::config::{find_user_config, USER_CONFIG_STEM};
use layerconf::{Config, ConfigError, ConfigManager, Tree};
use tempfile::TempDir;

const DEFAULTS: &str = r#"
# shipped with the application
{
    "service": {
        "name": "inventory",
        "port": 8080,
        "endpoints": ["/health"]
    },
    "features": {
        "audit": { "enabled": false }
    }
}
"#;

#[test]
fn full_stack_precedence() {
    let dir = TempDir::new().unwrap();
    let fragments = dir.path().join("conf.d");
    fs::create_dir(&fragments).unwrap();
    fs::write(
        fragments.join("10-metrics.json"),
        r#"{"service": {"endpoints": ["/metrics"]}, "metrics": {"interval": 15}}"#,
    )
    .unwrap();
    fs::write(
        fragments.join("20-audit.toml"),
        "[features.audit]\nenabled = true\nsink = \"syslog\"\n",
    )
    .unwrap();
    let local = dir.path().join("local.json");
    fs::write(&local, r#"{"service": {"port": 9090}}"#).unwrap();

    std::env::set_var("LAYERCONF_IT__SERVICE__NAME", "inventory-staging");
    let tree = Config::builder()
        .with_json(DEFAULTS)
        .with_dir(&fragments, false)
        .with_file(&local, true)
        .with_file(dir.path().join("missing.json"), false)
        .with_env("LAYERCONF_IT", "__")
        .build()
        .unwrap();
    std::env::remove_var("LAYERCONF_IT__SERVICE__NAME");

    let service = tree.get("service");
    assert_eq!(service.get("name").as_str(), "inventory-staging");
    assert_eq!(service.get("port").as_i32(), 9090);
    assert_eq!(
        service.get("endpoints").as_string_vec(),
        vec!["/metrics", "/health"]
    );
    assert!(tree.lookup(["features", "audit", "enabled"]).as_bool());
    assert_eq!(tree.lookup(["features", "audit", "sink"]).as_str(), "syslog");
    assert_eq!(tree.lookup(["metrics", "interval"]).as_i64(), 15);
    assert!(!tree.lookup(["features", "tracing", "enabled"]).as_bool());
    assert!(!tree.node().lookup(["features", "tracing"]).exists());
}

#[test]
fn conflicting_sources_fail_before_startup() {
    let result = Config::builder()
        .with_json(DEFAULTS)
        .with_json(r#"{"service": {"port": "9090"}}"#)
        .build();

    match result {
        Err(ConfigError::Merge(err)) => assert!(err.to_string().contains("service.port")),
        other => panic!("expected merge error, got {other:?}"),
    }
}

#[test]
fn required_file_missing() {
    let result = Config::builder()
        .with_json(DEFAULTS)
        .with_file("/nonexistent/settings.json", true)
        .build();
    assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
}

#[test]
fn merged_tree_serializes_as_json_object() {
    let tree = Config::builder()
        .with_json(DEFAULTS)
        .with_json(r#"{"service": {"port": 1}}"#)
        .build()
        .unwrap();

    let text = tree.to_string();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["service"]["port"], 1);
    assert_eq!(Tree::from(value), tree);
}

#[test]
fn manager_follows_user_file_edits() {
    let dir = TempDir::new().unwrap();
    let settings = dir.path().join("settings.json");
    fs::write(&settings, r#"{"service": {"port": 7000}}"#).unwrap();

    let defaults = layerconf::parse_str(DEFAULTS).unwrap();
    let manager = Arc::new(ConfigManager::load(defaults, dir.path()).unwrap());
    assert_eq!(
        find_user_config(dir.path(), USER_CONFIG_STEM),
        manager.user_config_path()
    );
    assert_eq!(
        manager.effective().unwrap().lookup(["service", "port"]).as_i32(),
        7000
    );

    let (tx, rx) = mpsc::channel();
    manager.on_user_config_changed(move || {
        let _ = tx.send(());
    });
    manager.watch_user_config(&settings).unwrap();
    assert!(manager.is_watching());

    fs::write(&settings, r#"{"service": {"port": 7001}}"#).unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    let mut port = 7000;
    while Instant::now() < deadline && port != 7001 {
        let _ = rx.recv_timeout(Duration::from_millis(200));
        port = manager.effective().unwrap().lookup(["service", "port"]).as_i32();
    }
    assert_eq!(port, 7001);

    manager.set_user(None);
    assert!(!manager.is_watching());
    assert_eq!(
        manager.effective().unwrap().lookup(["service", "port"]).as_i32(),
        8080
    );
}
