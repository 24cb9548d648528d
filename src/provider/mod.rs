//! Market-data provider adapter (component C4).

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use crate::cache::CacheStore;
use crate::error::AppError;
use crate::models::cache::{CacheDescriptor, CachedPayload};
use crate::models::fundamentals::{coerce_float, FundamentalsSnapshot};
use crate::models::symbol::{ExchangeSummary, SymbolRecord};

pub const PROVIDER_ID: &str = "eodhd";
const DEFAULT_BASE_URL: &str = "https://eodhd.com/api";
const EXCHANGE_TTL: i64 = 7 * 24 * 3600;
const SYMBOL_TTL: i64 = 24 * 3600;

/// A market-data provider capable of listing exchanges, symbols, and per-symbol
/// fundamentals. EODHD is the only implementation today; the trait exists so
/// additional providers can be wired in without touching the orchestrator.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    async fn get_exchanges(
        &self,
        use_cache: bool,
    ) -> Result<CachedPayload<Vec<ExchangeSummary>>, AppError>;

    async fn get_symbols(
        &self,
        exchange_code: &str,
        use_cache: bool,
        common_stock: bool,
    ) -> Result<CachedPayload<Vec<SymbolRecord>>, AppError>;

    async fn get_fundamentals(
        &self,
        stock_code: &str,
        exchange_code: &str,
    ) -> Result<FundamentalsSnapshot, AppError>;
}

#[derive(Debug, Deserialize)]
struct RawExchange {
    #[serde(rename = "Code", default)]
    code: String,
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "Country", default)]
    country: String,
    #[serde(rename = "Currency", default)]
    currency: String,
    #[serde(rename = "OperatingMIC", default)]
    operating_mic: String,
}

#[derive(Debug, Deserialize)]
struct RawSymbol {
    #[serde(rename = "Code", default)]
    code: String,
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "Exchange", default)]
    exchange: String,
    #[serde(rename = "Country", default)]
    country: String,
    #[serde(rename = "Currency", default)]
    currency: String,
    #[serde(rename = "Isin", default)]
    isin: Option<String>,
    #[serde(rename = "Type", default)]
    r#type: Option<String>,
}

pub struct EodhdProvider {
    client: reqwest::Client,
    api_token: String,
    base_url: String,
    cache: CacheStore,
}

impl EodhdProvider {
    pub fn new(api_token: impl Into<String>, cache: CacheStore) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_token: api_token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            cache,
        }
    }

    fn auth_params(&self) -> Vec<(&str, &str)> {
        vec![("api_token", self.api_token.as_str()), ("fmt", "json")]
    }

    fn descriptor(scope: &str, key: &str, ttl_seconds: i64) -> CacheDescriptor {
        CacheDescriptor::new(scope, PROVIDER_ID, key).with_ttl(Duration::seconds(ttl_seconds))
    }

    fn normalize_exchange(raw: RawExchange) -> ExchangeSummary {
        ExchangeSummary {
            code: raw.code,
            name: raw.name,
            country: raw.country,
            currency: raw.currency,
            operating_mic: raw.operating_mic,
        }
    }

    fn normalize_symbol(raw: RawSymbol) -> SymbolRecord {
        SymbolRecord {
            code: raw.code,
            name: raw.name,
            exchange: raw.exchange,
            country: raw.country,
            currency: raw.currency,
            isin: raw.isin,
            r#type: raw.r#type,
        }
    }

    fn map_fundamentals(stock_code: &str, exchange_code: &str, response: &Value) -> FundamentalsSnapshot {
        let general = response.get("General");
        let highlights = response.get("Highlights");

        let name = general
            .and_then(|g| g.get("Name"))
            .and_then(Value::as_str)
            .or_else(|| general.and_then(|g| g.get("Code")).and_then(Value::as_str))
            .unwrap_or(stock_code)
            .to_string();

        let trailing_pe = coerce_float(highlights.and_then(|h| h.get("PERatioTTM")));
        let forward_pe = coerce_float(highlights.and_then(|h| h.get("ForwardPE")));
        let forward_dividend_yield =
            coerce_float(highlights.and_then(|h| h.get("ForwardAnnualDividendYield")))
                .or_else(|| coerce_float(highlights.and_then(|h| h.get("DividendYield"))));

        FundamentalsSnapshot {
            stock_code: stock_code.to_string(),
            exchange_code: exchange_code.to_string(),
            name,
            trailing_pe,
            forward_pe,
            forward_dividend_yield,
            // The upstream service never computes this either; left as a documented gap.
            free_cash_flow_margin: None,
            as_of: Utc::now(),
            raw: response.clone(),
        }
    }
}

#[async_trait]
impl ProviderAdapter for EodhdProvider {
    #[instrument(level = "debug", skip(self))]
    async fn get_exchanges(
        &self,
        use_cache: bool,
    ) -> Result<CachedPayload<Vec<ExchangeSummary>>, AppError> {
        let descriptor = Self::descriptor("exchange-list", "all", EXCHANGE_TTL);

        if use_cache {
            if let Some(cached) = self.cache.read(&descriptor).await? {
                return Ok(cached);
            }
        }

        let response = self
            .client
            .get(format!("{}/exchanges-list", self.base_url))
            .query(&self.auth_params())
            .send()
            .await
            .map_err(|err| AppError::upstream(PROVIDER_ID, err.to_string()))?
            .error_for_status()
            .map_err(|err| AppError::upstream(PROVIDER_ID, err.to_string()))?;

        let raw: Vec<RawExchange> = response
            .json()
            .await
            .map_err(|err| AppError::upstream(PROVIDER_ID, err.to_string()))?;

        let normalized: Vec<ExchangeSummary> = raw.into_iter().map(Self::normalize_exchange).collect();
        self.cache.write(descriptor, normalized).await
    }

    #[instrument(level = "debug", skip(self))]
    async fn get_symbols(
        &self,
        exchange_code: &str,
        use_cache: bool,
        common_stock: bool,
    ) -> Result<CachedPayload<Vec<SymbolRecord>>, AppError> {
        let normalized_code = exchange_code.trim().to_uppercase();
        let cache_key = if common_stock {
            format!("{normalized_code}_common")
        } else {
            normalized_code.clone()
        };
        let descriptor = Self::descriptor("exchange-symbols", &cache_key, SYMBOL_TTL);

        if use_cache {
            if let Some(cached) = self.cache.read(&descriptor).await? {
                return Ok(cached);
            }
        }

        let mut params = self.auth_params();
        if common_stock {
            params.push(("type", "common_stock"));
        }

        let response = self
            .client
            .get(format!(
                "{}/exchange-symbol-list/{}",
                self.base_url, normalized_code
            ))
            .query(&params)
            .send()
            .await
            .map_err(|err| AppError::upstream(PROVIDER_ID, err.to_string()))?
            .error_for_status()
            .map_err(|err| AppError::upstream(PROVIDER_ID, err.to_string()))?;

        let raw: Vec<RawSymbol> = response
            .json()
            .await
            .map_err(|err| AppError::upstream(PROVIDER_ID, err.to_string()))?;

        let normalized: Vec<SymbolRecord> = raw.into_iter().map(Self::normalize_symbol).collect();
        self.cache.write(descriptor, normalized).await
    }

    #[instrument(level = "debug", skip(self))]
    async fn get_fundamentals(
        &self,
        stock_code: &str,
        exchange_code: &str,
    ) -> Result<FundamentalsSnapshot, AppError> {
        let symbol = stock_code.trim().to_uppercase();
        let exchange = exchange_code.trim().to_uppercase();

        let response = self
            .client
            .get(format!("{}/fundamentals/{}.{}", self.base_url, symbol, exchange))
            .query(&self.auth_params())
            .send()
            .await
            .map_err(|err| AppError::upstream(PROVIDER_ID, err.to_string()))?
            .error_for_status()
            .map_err(|err| AppError::upstream(PROVIDER_ID, err.to_string()))?;

        let data: Value = response
            .json()
            .await
            .map_err(|err| AppError::upstream(PROVIDER_ID, err.to_string()))?;

        Ok(Self::map_fundamentals(&symbol, &exchange, &data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_fundamentals_with_fallback_dividend_yield() {
        let response = json!({
            "General": {"Name": "Acme Corp", "Code": "ACME"},
            "Highlights": {"PERatioTTM": "18.2", "DividendYield": 0.013, "ForwardPE": "nan"},
        });

        let snapshot = EodhdProvider::map_fundamentals("ACME", "US", &response);
        assert_eq!(snapshot.name, "Acme Corp");
        assert_eq!(snapshot.trailing_pe, Some(18.2));
        assert_eq!(snapshot.forward_pe, None);
        assert_eq!(snapshot.forward_dividend_yield, Some(0.013));
    }
}
