use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named provider API key, as managed through `GET`/`PUT /api/settings`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderKey {
    pub provider: String,
    pub api_key: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachePreferences {
    pub dataroma_scrape: bool,
    pub stock_universe: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettingsPreferences {
    pub default_provider: String,
    pub cache: CachePreferences,
}

/// The settings document exchanged by `GET`/`PUT /api/settings`. Distinct
/// from process-bootstrap configuration (host/port/directories), which only
/// seeds this value's defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    pub provider_keys: Vec<ProviderKey>,
    pub preferences: AppSettingsPreferences,
}

impl AppSettings {
    pub fn defaults(default_provider: impl Into<String>) -> Self {
        Self {
            provider_keys: Vec::new(),
            preferences: AppSettingsPreferences {
                default_provider: default_provider.into(),
                cache: CachePreferences {
                    dataroma_scrape: true,
                    stock_universe: true,
                },
            },
        }
    }

    /// The API key configured for `provider`, if any.
    pub fn provider_api_key(&self, provider: &str) -> Option<&str> {
        self.provider_keys
            .iter()
            .find(|k| k.provider == provider)
            .map(|k| k.api_key.as_str())
    }
}
