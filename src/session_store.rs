//! Whole-document session persistence (component C2).

use std::path::PathBuf;

use tracing::instrument;

use crate::error::AppError;
use crate::fsutil::atomic_write;
use crate::models::session::Session;

#[derive(Debug, Clone)]
pub struct SessionStore {
    base_dir: PathBuf,
}

impl SessionStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn file_path(&self, session_id: &str) -> PathBuf {
        self.base_dir.join(format!("{session_id}.json"))
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn load(&self, session_id: &str) -> Result<Option<Session>, AppError> {
        let path = self.file_path(session_id);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(AppError::storage("reading session", err)),
        };

        match serde_json::from_slice(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(_) => Ok(None),
        }
    }

    #[instrument(level = "debug", skip(self, session))]
    pub async fn save(&self, session: &Session) -> Result<(), AppError> {
        tokio::fs::create_dir_all(&self.base_dir)
            .await
            .map_err(|err| AppError::storage("creating session directory", err))?;

        let body = serde_json::to_vec_pretty(session).map_err(AppError::internal)?;
        atomic_write(&self.file_path(&session.id), &body)
            .await
            .map_err(|err| AppError::storage("writing session", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::session::Session;
    use tempfile::TempDir;

    #[tokio::test]
    async fn round_trips_a_session() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path());
        let session = Session::new("abc-123".to_string());

        store.save(&session).await.unwrap();
        let loaded = store.load(&session.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, session.id);
    }

    #[tokio::test]
    async fn missing_session_is_none() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path());
        assert!(store.load("nope").await.unwrap().is_none());
    }
}
