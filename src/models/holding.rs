use serde::{Deserialize, Serialize};

/// One row of the upstream aggregated portfolio: an upstream ticker plus a
/// company name. `(symbol, stock)` is unique within a single scrape result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldingEntry {
    pub symbol: String,
    pub stock: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,
}

/// Inputs to a scrape, as accepted by [`crate::scrape::ScrapeAdapter::scrape`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeOptions {
    #[serde(default = "default_true")]
    pub use_cache: bool,
    #[serde(default)]
    pub cache_token: Option<String>,
    #[serde(default)]
    pub min_percent: Option<f64>,
    #[serde(default)]
    pub max_entries: Option<i64>,
}

fn default_true() -> bool {
    true
}

impl ScrapeOptions {
    /// Non-positive `max_entries` is treated as absent.
    pub fn normalized(mut self) -> Self {
        if let Some(n) = self.max_entries {
            if n <= 0 {
                self.max_entries = None;
            }
        }
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeResult {
    pub entries: Vec<HoldingEntry>,
    /// `"live"` or `"cache"`.
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "cachedPayload")]
    pub cached_payload: Option<super::cache::CachedPayload<Vec<HoldingEntry>>>,
}
