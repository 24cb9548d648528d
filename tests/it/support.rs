use dataroma_screener::config::StorageSettings;
use dataroma_screener::context::AppContext;
use dataroma_screener::routes::routes;
use tempfile::TempDir;

/// Builds a router backed by a scratch `TempDir` standing in for the cache
/// and session directories, so tests never touch the real filesystem state.
pub struct TestApp {
    pub router: axum::Router,
    _dir: TempDir,
}

pub fn spawn_app() -> TestApp {
    let dir = TempDir::new().expect("create temp dir");
    let storage = StorageSettings {
        cache_dir: dir.path().join(".cache"),
        session_dir: dir.path().join(".sessions"),
        settings_file: dir.path().join(".config").join("settings.json"),
    };

    let ctx = AppContext::new(storage, "eodhd".to_string(), Some("demo".to_string()));
    TestApp {
        router: routes(ctx),
        _dir: dir,
    }
}
