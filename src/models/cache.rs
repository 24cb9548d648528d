use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of a cache entry. Two descriptors collide iff their sanitized
/// `(scope, provider, key)` tuples are equal — see [`crate::cache::CacheStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheDescriptor {
    pub scope: String,
    pub provider: String,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "expiresAt")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl CacheDescriptor {
    pub fn new(scope: impl Into<String>, provider: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            provider: provider.into(),
            key: key.into(),
            expires_at: None,
        }
    }

    pub fn with_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.expires_at = Some(Utc::now() + ttl);
        self
    }
}

/// A payload written through the cache store, tagged with the descriptor it
/// was written against and when it was written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedPayload<T> {
    pub descriptor: CacheDescriptor,
    pub payload: T,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl<T> CachedPayload<T> {
    pub fn new(descriptor: CacheDescriptor, payload: T) -> Self {
        Self {
            descriptor,
            payload,
            created_at: Utc::now(),
        }
    }
}
