use layerconf::{Config, ConfigManager};

const DEFAULTS: &str = r#"
# compiled-in defaults
{
    "app": { "name": "demo", "debug": false },
    "database": { "host": "localhost", "port": 5432, "replicas": ["db-a"] }
}
"#;

fn main() -> Result<(), layerconf::Error> {
    let defaults = Config::builder().with_json(DEFAULTS).build()?;
    let user = layerconf::parse_str(r#"{"app": {"debug": true}, "database": {"replicas": ["db-b"]}}"#)?;

    let manager = ConfigManager::new(defaults).with_user(user);
    let config = manager.effective()?;

    println!("App: {} (debug={})", config.lookup(["app", "name"]).as_str(), config.lookup(["app", "debug"]).as_bool());
    println!(
        "Database: {}:{} replicas={:?}",
        config.lookup(["database", "host"]).as_str(),
        config.lookup(["database", "port"]).as_i32(),
        config.lookup(["database", "replicas"]).as_string_vec()
    );
    println!("Cache TTL (unset): {}", config.lookup(["cache", "ttl"]).as_i64());
    println!("Effective: {config}");

    Ok(())
}
