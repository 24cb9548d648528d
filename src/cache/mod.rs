//! File-backed cache store for provider and scrape payloads (component C1).
//!
//! Entries live at `<base_dir>/<provider>/<scope>/<url-encoded key>.json`, each
//! holding a [`CachedPayload`] envelope. A read past `expiresAt` deletes the
//! file and reports a miss rather than surfacing stale data.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::instrument;

use crate::error::AppError;
use crate::fsutil::atomic_write;
use crate::models::cache::{CacheDescriptor, CachedPayload};

const KEEP_CHARS: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789._-";

fn sanitize_segment(segment: &str) -> String {
    let trimmed = segment.trim();
    if trimmed.is_empty() {
        return "default".to_string();
    }
    trimmed
        .chars()
        .map(|c| if KEEP_CHARS.contains(&(c as u8)) && c.is_ascii() { c } else { '_' })
        .collect()
}

/// A disk-backed, TTL-bounded cache keyed by `(provider, scope, key)`.
#[derive(Debug, Clone)]
pub struct CacheStore {
    base_dir: PathBuf,
}

impl CacheStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn file_path(&self, descriptor: &CacheDescriptor) -> PathBuf {
        self.base_dir
            .join(sanitize_segment(&descriptor.provider))
            .join(sanitize_segment(&descriptor.scope))
            .join(format!("{}.json", urlencoding::encode(&descriptor.key)))
    }

    /// Reads a cached payload, deleting and reporting a miss if it has expired
    /// or fails to parse.
    #[instrument(level = "debug", skip(self))]
    pub async fn read<T>(&self, descriptor: &CacheDescriptor) -> Result<Option<CachedPayload<T>>, AppError>
    where
        T: DeserializeOwned,
    {
        let path = self.file_path(descriptor);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(AppError::storage("reading cache entry", err)),
        };

        let parsed: CachedPayload<T> = match serde_json::from_slice(&raw) {
            Ok(parsed) => parsed,
            Err(_) => {
                self.unlink(&path).await;
                return Ok(None);
            }
        };

        if let Some(expires_at) = parsed.descriptor.expires_at {
            if expires_at < chrono::Utc::now() {
                self.unlink(&path).await;
                return Ok(None);
            }
        }

        Ok(Some(parsed))
    }

    /// Writes `payload` under `descriptor`, overwriting any existing entry.
    #[instrument(level = "debug", skip(self, payload))]
    pub async fn write<T>(
        &self,
        descriptor: CacheDescriptor,
        payload: T,
    ) -> Result<CachedPayload<T>, AppError>
    where
        T: Serialize,
    {
        let path = self.file_path(&descriptor);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| AppError::storage("creating cache directory", err))?;
        }

        let cached = CachedPayload::new(descriptor, payload);
        let body = serde_json::to_vec(&cached).map_err(AppError::internal)?;
        atomic_write(&path, &body)
            .await
            .map_err(|err| AppError::storage("writing cache entry", err))?;

        Ok(cached)
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn clear(&self, descriptor: &CacheDescriptor) -> Result<(), AppError> {
        self.unlink(&self.file_path(descriptor)).await;
        Ok(())
    }

    async fn unlink(&self, path: &Path) {
        if let Err(err) = tokio::fs::remove_file(path).await {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(error = %err, path = %path.display(), "failed to remove cache entry");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn round_trips_a_payload() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path());
        let descriptor = CacheDescriptor::new("exchanges", "eodhd", "all");

        store.write(descriptor.clone(), vec!["AAPL", "MSFT"]).await.unwrap();
        let read: CachedPayload<Vec<String>> = store.read(&descriptor).await.unwrap().unwrap();
        assert_eq!(read.payload, vec!["AAPL".to_string(), "MSFT".to_string()]);
    }

    #[tokio::test]
    async fn expired_entries_are_evicted_on_read() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path());
        let descriptor = CacheDescriptor::new("symbols", "eodhd", "US").with_ttl(Duration::seconds(-1));

        store.write(descriptor.clone(), vec![1, 2, 3]).await.unwrap();
        let read: Option<CachedPayload<Vec<i32>>> = store.read(&descriptor).await.unwrap();
        assert!(read.is_none());

        let path = store.file_path(&descriptor);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn missing_entries_are_a_plain_miss() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path());
        let descriptor = CacheDescriptor::new("exchanges", "eodhd", "none");
        let read: Option<CachedPayload<Vec<String>>> = store.read(&descriptor).await.unwrap();
        assert!(read.is_none());
    }

    #[test]
    fn sanitizes_path_segments() {
        assert_eq!(sanitize_segment("US Equities"), "US_Equities");
        assert_eq!(sanitize_segment("  "), "default");
        assert_eq!(sanitize_segment("eodhd"), "eodhd");
    }
}
