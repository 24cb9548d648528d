//! Process-wide application state: the lazily-built screener pipeline, the
//! file-backed stores behind it, and the most recently touched session kept
//! in memory for the `GET /session/latest` shortcut.
//!
//! Mirrors the upstream service's module-level `_service` / `_latest_session`
//! singletons, generalized into an explicit struct with an explicit
//! [`AppContext::reset_pipeline`] instead of relying on process globals.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::cache::CacheStore;
use crate::config::StorageSettings;
use crate::error::AppError;
use crate::matcher::AdvancedMatchEngine;
use crate::models::session::Session;
use crate::models::settings::AppSettings;
use crate::pipeline::ScreenerPipeline;
use crate::provider::EodhdProvider;
use crate::scrape::DataromaScraper;
use crate::session_store::SessionStore;
use crate::settings_store::SettingsStore;

#[derive(Clone)]
pub struct AppContext {
    storage: StorageSettings,
    default_provider: String,
    fallback_api_token: Option<String>,
    settings_store: SettingsStore,
    session_store: SessionStore,
    dataroma_cache: CacheStore,
    pipeline: Arc<RwLock<Option<Arc<ScreenerPipeline>>>>,
    latest_session: Arc<RwLock<Option<Session>>>,
}

impl AppContext {
    pub fn new(storage: StorageSettings, default_provider: String, fallback_api_token: Option<String>) -> Self {
        let settings_store = SettingsStore::new(storage.settings_file.clone(), default_provider.clone());
        let session_store = SessionStore::new(storage.session_dir.clone());
        let dataroma_cache = CacheStore::new(storage.cache_dir.join("dataroma"));

        Self {
            storage,
            default_provider,
            fallback_api_token,
            settings_store,
            session_store,
            dataroma_cache,
            pipeline: Arc::new(RwLock::new(None)),
            latest_session: Arc::new(RwLock::new(None)),
        }
    }

    pub fn settings_store(&self) -> &SettingsStore {
        &self.settings_store
    }

    pub fn session_store(&self) -> &SessionStore {
        &self.session_store
    }

    pub async fn latest_session(&self) -> Option<Session> {
        self.latest_session.read().await.clone()
    }

    pub async fn set_latest_session(&self, session: Session) {
        *self.latest_session.write().await = Some(session);
    }

    /// Drops the cached pipeline and latest-session pointer. Called after a
    /// settings update (e.g. a new provider API key) so the next request
    /// rebuilds the pipeline from the fresh settings.
    pub async fn reset_pipeline(&self) {
        *self.pipeline.write().await = None;
        *self.latest_session.write().await = None;
    }

    /// Returns the screener pipeline, building it from the current settings
    /// document on first use (or after a reset).
    pub async fn pipeline(&self) -> Result<Arc<ScreenerPipeline>, AppError> {
        if let Some(pipeline) = self.pipeline.read().await.as_ref() {
            return Ok(pipeline.clone());
        }

        let mut guard = self.pipeline.write().await;
        if let Some(pipeline) = guard.as_ref() {
            return Ok(pipeline.clone());
        }

        let settings = self.settings_store.load().await?;
        let api_token = self.resolve_api_token(&settings);

        let eodhd_cache = CacheStore::new(self.storage.cache_dir.join("eodhd"));
        let scraper = Arc::new(DataromaScraper::new(self.dataroma_cache.clone()));
        let provider = Arc::new(EodhdProvider::new(api_token, eodhd_cache));
        let match_engine = Arc::new(AdvancedMatchEngine::new());

        let pipeline = Arc::new(ScreenerPipeline::new(
            scraper,
            provider,
            match_engine,
            self.session_store.clone(),
            self.dataroma_cache.clone(),
        ));

        *guard = Some(pipeline.clone());
        Ok(pipeline)
    }

    fn resolve_api_token(&self, settings: &AppSettings) -> String {
        settings
            .provider_api_key(&self.default_provider)
            .map(ToString::to_string)
            .or_else(|| self.fallback_api_token.clone())
            .unwrap_or_else(|| "demo".to_string())
    }
}
