//! Dataroma aggregated-portfolio scraper (component C3).

mod parser;

use std::collections::HashSet;

use async_trait::async_trait;
use rand::Rng;
use tracing::instrument;

use crate::cache::CacheStore;
use crate::error::AppError;
use crate::models::cache::CacheDescriptor;
use crate::models::holding::{HoldingEntry, ScrapeOptions, ScrapeResult};

pub const DATAROMA_PROVIDER_ID: &str = "dataroma";
const DEFAULT_URL: &str = "https://www.dataroma.com/m/g/portfolio.php";

#[async_trait]
pub trait ScrapeAdapter: Send + Sync {
    async fn scrape_grand_portfolio(&self, opts: ScrapeOptions) -> Result<ScrapeResult, AppError>;
}

pub struct DataromaScraper {
    client: reqwest::Client,
    base_url: String,
    cache: CacheStore,
}

impl DataromaScraper {
    pub fn new(cache: CacheStore) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_URL.to_string(),
            cache,
        }
    }

    fn descriptor(opts: &ScrapeOptions) -> CacheDescriptor {
        let key = opts
            .cache_token
            .clone()
            .unwrap_or_else(|| build_cache_key(opts));
        CacheDescriptor::new("scrape", DATAROMA_PROVIDER_ID, key)
    }

    fn query_params(opts: &ScrapeOptions, page: Option<u32>) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(pct) = opts.min_percent {
            if pct > 0.0 {
                params.push(("pct", pct.to_string()));
            }
        }
        if let Some(page) = page {
            if page > 1 {
                params.push(("L", page.to_string()));
            }
        }
        params
    }

    async fn human_delay(&self) {
        let millis = if rand::thread_rng().gen_bool(0.5) { 100 } else { 200 };
        tokio::time::sleep(std::time::Duration::from_millis(millis)).await;
    }

    async fn get_text_with_delay(&self, params: &[(&'static str, String)]) -> Result<String, AppError> {
        self.human_delay().await;
        let response = self
            .client
            .get(&self.base_url)
            .query(params)
            .send()
            .await
            .map_err(|err| AppError::upstream(DATAROMA_PROVIDER_ID, err.to_string()))?
            .error_for_status()
            .map_err(|err| AppError::upstream(DATAROMA_PROVIDER_ID, err.to_string()))?;

        response
            .text()
            .await
            .map_err(|err| AppError::upstream(DATAROMA_PROVIDER_ID, err.to_string()))
    }

    async fn fetch_all_pages(&self, opts: &ScrapeOptions) -> Result<Vec<HoldingEntry>, AppError> {
        let first_html = self.get_text_with_delay(&Self::query_params(opts, None)).await?;
        let (first_entries, total_pages) = parser::parse_page(&first_html);

        let mut all_entries = first_entries;
        if let Some(max) = opts.max_entries {
            if all_entries.len() as i64 >= max {
                all_entries.truncate(max as usize);
                return Ok(all_entries);
            }
        }

        for page in 2..=total_pages {
            let html = self
                .get_text_with_delay(&Self::query_params(opts, Some(page)))
                .await?;
            let (entries, _) = parser::parse_page(&html);
            all_entries.extend(entries);

            if let Some(max) = opts.max_entries {
                if all_entries.len() as i64 >= max {
                    all_entries.truncate(max as usize);
                    return Ok(all_entries);
                }
            }
        }

        Ok(all_entries)
    }
}

fn build_cache_key(opts: &ScrapeOptions) -> String {
    let min_pct = opts.min_percent.unwrap_or(0.0);
    let max_entries = opts
        .max_entries
        .map(|n| n.to_string())
        .unwrap_or_else(|| "all".to_string());
    format!("grand-portfolio_v2_{min_pct}_max-{max_entries}")
}

fn deduplicate(entries: Vec<HoldingEntry>) -> Vec<HoldingEntry> {
    let mut seen = HashSet::new();
    let mut deduped = Vec::with_capacity(entries.len());
    for entry in entries {
        let key = format!("{}::{}", entry.symbol.to_uppercase(), entry.stock.to_uppercase());
        if seen.insert(key) {
            deduped.push(entry);
        }
    }
    deduped
}

#[async_trait]
impl ScrapeAdapter for DataromaScraper {
    #[instrument(level = "debug", skip(self))]
    async fn scrape_grand_portfolio(&self, opts: ScrapeOptions) -> Result<ScrapeResult, AppError> {
        let opts = opts.normalized();
        let descriptor = Self::descriptor(&opts);

        if opts.use_cache {
            if let Some(cached) = self.cache.read::<Vec<HoldingEntry>>(&descriptor).await? {
                let entries = deduplicate(cached.payload.clone());
                return Ok(ScrapeResult {
                    entries,
                    source: "cache".to_string(),
                    cached_payload: Some(cached),
                });
            }
        }

        let raw_entries = self.fetch_all_pages(&opts).await?;
        let entries = deduplicate(raw_entries);

        let cached_payload = if entries.is_empty() {
            None
        } else {
            Some(self.cache.write(descriptor, entries.clone()).await?)
        };

        Ok(ScrapeResult {
            entries,
            source: "live".to_string(),
            cached_payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedups_by_symbol_and_stock_case_insensitively() {
        let entries = vec![
            HoldingEntry { symbol: "AAPL".into(), stock: "Apple Inc".into(), exchange: None },
            HoldingEntry { symbol: "aapl".into(), stock: "APPLE INC".into(), exchange: None },
            HoldingEntry { symbol: "MSFT".into(), stock: "Microsoft".into(), exchange: None },
        ];
        let deduped = deduplicate(entries);
        assert_eq!(deduped.len(), 2);
    }

    #[test]
    fn builds_cache_key_from_options() {
        let opts = ScrapeOptions {
            use_cache: true,
            cache_token: None,
            min_percent: Some(2.5),
            max_entries: Some(50),
        };
        assert_eq!(build_cache_key(&opts), "grand-portfolio_v2_2.5_max-50");

        let opts_all = ScrapeOptions::default();
        assert_eq!(build_cache_key(&opts_all), "grand-portfolio_v2_0_max-all");
    }
}
