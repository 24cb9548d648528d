//! Process bootstrap configuration: host/port, storage directories, and CORS
//! policy. Distinct from [`crate::models::settings::AppSettings`], the
//! user-editable document served at `/api/settings`.

use std::path::PathBuf;

use once_cell::sync::OnceCell;
use serde::Deserialize;

mod app_env;

pub use app_env::app_env;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub storage: StorageSettings,
    pub provider: ProviderSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    pub cors: CorsSettings,
}

impl ApplicationSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsSettings {
    pub allowed_origins: Vec<String>,
}

impl CorsSettings {
    pub fn allowed_origins(&self) -> &[String] {
        &self.allowed_origins
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    pub cache_dir: PathBuf,
    pub session_dir: PathBuf,
    pub settings_file: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSettings {
    pub default_provider: String,
    #[serde(default)]
    pub eodhd_api_token: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        let base_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            application: ApplicationSettings {
                host: "0.0.0.0".to_string(),
                port: 8787,
                cors: CorsSettings {
                    allowed_origins: vec!["*".to_string()],
                },
            },
            storage: StorageSettings {
                cache_dir: base_dir.join(".cache"),
                session_dir: base_dir.join(".dataroma-screener-sessions"),
                settings_file: base_dir.join(".config").join("settings.json"),
            },
            provider: ProviderSettings {
                default_provider: "eodhd".to_string(),
                eodhd_api_token: None,
            },
        }
    }
}

static SETTINGS: OnceCell<Settings> = OnceCell::new();

/// Returns the process-wide settings, loading them on first access.
pub fn settings() -> &'static Settings {
    SETTINGS.get_or_init(|| load_settings().expect("failed to load settings"))
}

/// Loads settings from defaults, optionally a config file, and then
/// `DATAROMA_SCREENER_`-prefixed environment variables. Intended to be called
/// once before [`settings`] is first accessed (tests may call this via
/// [`settings_for_test`] instead).
fn load_settings() -> Result<Settings, config::ConfigError> {
    let defaults = Settings::default();

    let builder = config::Config::builder()
        .set_default("application.host", defaults.application.host.clone())?
        .set_default("application.port", defaults.application.port as i64)?
        .set_default(
            "application.cors.allowed_origins",
            defaults.application.cors.allowed_origins.clone(),
        )?
        .set_default(
            "storage.cache_dir",
            defaults.storage.cache_dir.to_string_lossy().to_string(),
        )?
        .set_default(
            "storage.session_dir",
            defaults.storage.session_dir.to_string_lossy().to_string(),
        )?
        .set_default(
            "storage.settings_file",
            defaults.storage.settings_file.to_string_lossy().to_string(),
        )?
        .set_default("provider.default_provider", defaults.provider.default_provider.clone())?
        .add_source(
            config::Environment::with_prefix("DATAROMA_SCREENER")
                .separator("__")
                .try_parsing(true),
        );

    let builder = if let Ok(token) = std::env::var("EODHD_API_TOKEN") {
        builder.set_override("provider.eodhd_api_token", token)?
    } else {
        builder
    };

    builder.build()?.try_deserialize()
}

#[cfg(test)]
pub fn settings_for_test(cache_dir: PathBuf, session_dir: PathBuf, settings_file: PathBuf) -> Settings {
    let mut settings = Settings::default();
    settings.storage.cache_dir = cache_dir;
    settings.storage.session_dir = session_dir;
    settings.storage.settings_file = settings_file;
    settings
}
