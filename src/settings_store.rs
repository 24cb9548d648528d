//! Settings document persistence, backing `GET`/`PUT /api/settings`.

use std::path::PathBuf;

use tracing::instrument;

use crate::error::AppError;
use crate::fsutil::atomic_write;
use crate::models::settings::AppSettings;

#[derive(Debug, Clone)]
pub struct SettingsStore {
    file_path: PathBuf,
    default_provider: String,
}

impl SettingsStore {
    pub fn new(file_path: impl Into<PathBuf>, default_provider: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            default_provider: default_provider.into(),
        }
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn load(&self) -> Result<AppSettings, AppError> {
        let raw = match tokio::fs::read(&self.file_path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(AppSettings::defaults(self.default_provider.clone()))
            }
            Err(err) => return Err(AppError::storage("reading settings", err)),
        };

        Ok(serde_json::from_slice(&raw).unwrap_or_else(|_| AppSettings::defaults(self.default_provider.clone())))
    }

    #[instrument(level = "debug", skip(self, settings))]
    pub async fn save(&self, settings: &AppSettings) -> Result<(), AppError> {
        if let Some(parent) = self.file_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| AppError::storage("creating settings directory", err))?;
        }

        let body = serde_json::to_vec_pretty(settings).map_err(AppError::internal)?;
        atomic_write(&self.file_path, &body)
            .await
            .map_err(|err| AppError::storage("writing settings", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_returns_defaults() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json"), "eodhd");
        let settings = store.load().await.unwrap();
        assert_eq!(settings.preferences.default_provider, "eodhd");
        assert!(settings.provider_keys.is_empty());
    }

    #[tokio::test]
    async fn round_trips_settings() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json"), "eodhd");
        let mut settings = store.load().await.unwrap();
        settings.preferences.cache.dataroma_scrape = false;
        store.save(&settings).await.unwrap();

        let reloaded = store.load().await.unwrap();
        assert!(!reloaded.preferences.cache.dataroma_scrape);
    }
}
