//! Session orchestrator (component C6): drives the scrape → universe →
//! match step sequence and persists the session after each transition.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use serde_json::json;
use tracing::instrument;

use crate::error::AppError;
use crate::matcher::MatchEngine;
use crate::models::cache::CacheDescriptor;
use crate::models::holding::ScrapeOptions;
use crate::models::matches::MatchCandidate;
use crate::models::session::{ProviderUniverse, Session, StepKind, StepStatus};
use crate::models::new_session_id;
use crate::provider::ProviderAdapter;
use crate::scrape::ScrapeAdapter;
use crate::session_store::SessionStore;
use crate::cache::CacheStore;

/// Default bound on concurrent per-exchange provider requests, per spec's
/// 8-16 fan-out suggestion.
const MAX_CONCURRENT_EXCHANGE_FETCHES: usize = 16;

pub struct ScreenerPipeline {
    scraper: Arc<dyn ScrapeAdapter>,
    provider: Arc<dyn ProviderAdapter>,
    match_engine: Arc<dyn MatchEngine>,
    session_store: SessionStore,
    cache: CacheStore,
    fetch_semaphore: Arc<tokio::sync::Semaphore>,
}

impl ScreenerPipeline {
    pub fn new(
        scraper: Arc<dyn ScrapeAdapter>,
        provider: Arc<dyn ProviderAdapter>,
        match_engine: Arc<dyn MatchEngine>,
        session_store: SessionStore,
        cache: CacheStore,
    ) -> Self {
        Self {
            scraper,
            provider,
            match_engine,
            session_store,
            cache,
            fetch_semaphore: Arc::new(tokio::sync::Semaphore::new(MAX_CONCURRENT_EXCHANGE_FETCHES)),
        }
    }

    #[instrument(level = "info", skip(self, opts))]
    pub async fn start_session(&self, opts: ScrapeOptions) -> Result<Session, AppError> {
        let mut session = Session::new(new_session_id());

        let min_percent = opts.min_percent.unwrap_or(0.0);
        session
            .step_mut(StepKind::Scrape)
            .status = StepStatus::Running;
        session.step_mut(StepKind::Scrape).context = Some(json!({ "minPercent": min_percent }));
        self.session_store.save(&session).await?;

        match self.scraper.scrape_grand_portfolio(opts).await {
            Ok(result) => {
                let entry_count = result.entries.len();
                let source = result.source.clone();
                session.dataroma = Some(result);
                let step = session.step_mut(StepKind::Scrape);
                step.status = StepStatus::Complete;
                step.context = Some(json!({ "source": source, "entryCount": entry_count }));
                self.session_store.save(&session).await?;
                Ok(session)
            }
            Err(err) => {
                let step = session.step_mut(StepKind::Scrape);
                step.status = StepStatus::Blocked;
                step.context = Some(json!({ "error": err.to_string() }));
                self.session_store.save(&session).await?;
                Err(err)
            }
        }
    }

    #[instrument(level = "info", skip(self))]
    pub async fn run_universe_step(
        &self,
        session_id: &str,
        use_cache: bool,
        common_stock: bool,
    ) -> Result<Session, AppError> {
        let mut session = self.load_session_or_error(session_id).await?;
        if session.dataroma.is_none() {
            return Err(AppError::precondition("Dataroma scrape not completed."));
        }

        session.step_mut(StepKind::Universe).status = StepStatus::Running;
        session.step_mut(StepKind::Universe).context = None;
        self.session_store.save(&session).await?;

        match self.build_universe(use_cache, common_stock).await {
            Ok(universe) => {
                let exchange_count = universe.exchanges.payload.len();
                let symbol_batches = universe.symbols.len();
                session.provider_universe = Some(universe);
                let step = session.step_mut(StepKind::Universe);
                step.status = StepStatus::Complete;
                step.context = Some(json!({
                    "exchanges": exchange_count,
                    "symbolBatches": symbol_batches,
                }));
                self.session_store.save(&session).await?;
                Ok(session)
            }
            Err(err) => {
                let step = session.step_mut(StepKind::Universe);
                step.status = StepStatus::Blocked;
                step.context = Some(json!({ "error": err.to_string() }));
                self.session_store.save(&session).await?;
                Err(err)
            }
        }
    }

    #[instrument(level = "info", skip(self))]
    pub async fn run_match_step(
        &self,
        session_id: &str,
        use_cache: bool,
        common_stock: bool,
    ) -> Result<Session, AppError> {
        let mut session = self.load_session_or_error(session_id).await?;
        if session.dataroma.is_none() {
            return Err(AppError::precondition("Dataroma scrape not completed."));
        }
        if session.provider_universe.is_none() {
            return Err(AppError::precondition("Provider universe not available."));
        }

        session.step_mut(StepKind::Match).status = StepStatus::Running;
        session.step_mut(StepKind::Match).context = None;
        self.session_store.save(&session).await?;

        match self.generate_matches(&session, use_cache, common_stock).await {
            Ok(matches) => {
                let match_count = matches.len();
                session.matches = Some(matches);
                let step = session.step_mut(StepKind::Match);
                step.status = StepStatus::Complete;
                step.context = Some(json!({ "matches": match_count }));
                self.session_store.save(&session).await?;
                Ok(session)
            }
            Err(err) => {
                let step = session.step_mut(StepKind::Match);
                step.status = StepStatus::Blocked;
                step.context = Some(json!({ "error": err.to_string() }));
                self.session_store.save(&session).await?;
                Err(err)
            }
        }
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Option<Session>, AppError> {
        self.session_store.load(session_id).await
    }

    async fn load_session_or_error(&self, session_id: &str) -> Result<Session, AppError> {
        self.session_store
            .load(session_id)
            .await?
            .ok_or_else(|| AppError::not_found("Session"))
    }

    async fn build_universe(&self, use_cache: bool, common_stock: bool) -> Result<ProviderUniverse, AppError> {
        let exchanges = self.provider.get_exchanges(use_cache).await?;

        let fetches = exchanges.payload.iter().map(|exchange| {
            let code = exchange.code.clone();
            let provider = self.provider.clone();
            let semaphore = self.fetch_semaphore.clone();
            async move {
                let _permit = semaphore.acquire().await.expect("semaphore not closed");
                let payload = provider.get_symbols(&code, use_cache, common_stock).await?;
                Ok::<_, AppError>((code, payload))
            }
        });

        let mut symbols = BTreeMap::new();
        for result in join_all(fetches).await {
            let (code, payload) = result?;
            symbols.insert(code, payload);
        }

        Ok(ProviderUniverse { exchanges, symbols })
    }

    /// Runs one match-engine invocation per exchange batch on the blocking
    /// thread pool (CPU-bound string work), then aggregates and records any
    /// holding left unmatched by every exchange.
    async fn generate_matches(
        &self,
        session: &Session,
        use_cache: bool,
        common_stock: bool,
    ) -> Result<Vec<MatchCandidate>, AppError> {
        let dataroma_entries = &session.dataroma.as_ref().expect("checked by caller").entries;
        let universe = session.provider_universe.as_ref().expect("checked by caller");

        let cache_key = format!(
            "matches-{}-{}-{}-{}",
            dataroma_entries.len(),
            universe.symbols.len(),
            if common_stock { "common" } else { "all" },
            holdings_content_hash(dataroma_entries)
        );
        let descriptor = CacheDescriptor::new("matches", "system", cache_key);

        if use_cache {
            if let Some(cached) = self.cache.read::<Vec<MatchCandidate>>(&descriptor).await? {
                return Ok(cached.payload);
            }
        }

        let tasks = universe.symbols.values().filter_map(|payload| {
            let mut provider_symbols = payload.payload.clone();
            if common_stock {
                provider_symbols.retain(|s| s.r#type.as_deref() == Some("Common Stock"));
            }
            if provider_symbols.is_empty() {
                return None;
            }

            let engine = self.match_engine.clone();
            let entries = dataroma_entries.clone();
            Some(tokio::task::spawn_blocking(move || {
                engine.generate_candidates(&entries, &provider_symbols)
            }))
        });

        let mut flat_results = Vec::new();
        for task in join_all(tasks).await {
            flat_results.extend(task.map_err(AppError::internal)?);
        }

        let successful: Vec<MatchCandidate> = flat_results.into_iter().filter(|m| m.is_matched()).collect();
        let matched_symbols: std::collections::HashSet<&str> =
            successful.iter().map(|m| m.dataroma_symbol.as_str()).collect();

        let mut all_matches = successful;
        for entry in dataroma_entries {
            if !matched_symbols.contains(entry.symbol.as_str()) {
                all_matches.push(MatchCandidate {
                    dataroma_symbol: entry.symbol.clone(),
                    dataroma_name: entry.stock.clone(),
                    provider_symbol: None,
                    confidence: 0.0,
                    reasons: vec!["No match found across all exchanges".to_string()],
                    not_available: Some(true),
                });
            }
        }

        self.cache.write(descriptor, all_matches.clone()).await?;
        Ok(all_matches)
    }
}

/// Folds a holdings list into a short, order-independent content hash so that
/// two sessions scraping the same holdings (in whatever order) share a match
/// cache entry, while any change to the holdings set misses.
fn holdings_content_hash(entries: &[crate::models::holding::HoldingEntry]) -> String {
    let mut pairs: Vec<String> = entries
        .iter()
        .map(|e| format!("{}::{}", e.symbol.to_uppercase(), e.stock.to_uppercase()))
        .collect();
    pairs.sort_unstable();
    let digest = blake3::hash(pairs.join("\n").as_bytes());
    digest.to_hex()[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::holding::HoldingEntry;

    fn holding(symbol: &str, stock: &str) -> HoldingEntry {
        HoldingEntry {
            symbol: symbol.to_string(),
            stock: stock.to_string(),
            exchange: None,
        }
    }

    #[test]
    fn content_hash_is_order_independent() {
        let a = vec![holding("AAPL", "Apple Inc"), holding("MSFT", "Microsoft")];
        let b = vec![holding("MSFT", "Microsoft"), holding("AAPL", "Apple Inc")];
        assert_eq!(holdings_content_hash(&a), holdings_content_hash(&b));
    }

    #[test]
    fn content_hash_changes_with_holdings() {
        let a = vec![holding("AAPL", "Apple Inc")];
        let b = vec![holding("AAPL", "Apple Inc"), holding("MSFT", "Microsoft")];
        assert_ne!(holdings_content_hash(&a), holdings_content_hash(&b));
    }

    use async_trait::async_trait;
    use tempfile::TempDir;

    use crate::matcher::AdvancedMatchEngine;
    use crate::models::cache::CachedPayload;
    use crate::models::holding::ScrapeResult;
    use crate::models::symbol::{ExchangeSummary, SymbolRecord};

    struct StubScraper(Vec<HoldingEntry>);

    #[async_trait]
    impl ScrapeAdapter for StubScraper {
        async fn scrape_grand_portfolio(&self, _opts: ScrapeOptions) -> Result<ScrapeResult, AppError> {
            Ok(ScrapeResult {
                entries: self.0.clone(),
                source: "live".to_string(),
                cached_payload: None,
            })
        }
    }

    struct StubProvider;

    #[async_trait]
    impl ProviderAdapter for StubProvider {
        async fn get_exchanges(&self, _use_cache: bool) -> Result<CachedPayload<Vec<ExchangeSummary>>, AppError> {
            let exchanges = vec![ExchangeSummary {
                code: "US".to_string(),
                name: "USA Stocks".to_string(),
                country: "USA".to_string(),
                currency: "USD".to_string(),
                operating_mic: String::new(),
            }];
            Ok(CachedPayload::new(CacheDescriptor::new("exchange-list", "eodhd", "all"), exchanges))
        }

        async fn get_symbols(
            &self,
            exchange_code: &str,
            _use_cache: bool,
            _common_stock: bool,
        ) -> Result<CachedPayload<Vec<SymbolRecord>>, AppError> {
            let symbols = vec![SymbolRecord {
                code: "AAPL".to_string(),
                name: "Apple Inc".to_string(),
                exchange: exchange_code.to_string(),
                country: "USA".to_string(),
                currency: "USD".to_string(),
                isin: None,
                r#type: Some("Common Stock".to_string()),
            }];
            Ok(CachedPayload::new(
                CacheDescriptor::new("exchange-symbols", "eodhd", exchange_code),
                symbols,
            ))
        }

        async fn get_fundamentals(
            &self,
            _stock_code: &str,
            _exchange_code: &str,
        ) -> Result<crate::models::fundamentals::FundamentalsSnapshot, AppError> {
            unimplemented!("not exercised by the orchestrator")
        }
    }

    fn test_pipeline(dir: &TempDir, entries: Vec<HoldingEntry>) -> ScreenerPipeline {
        let cache = CacheStore::new(dir.path().join("cache"));
        let session_store = SessionStore::new(dir.path().join("sessions"));
        ScreenerPipeline::new(
            Arc::new(StubScraper(entries)),
            Arc::new(StubProvider),
            Arc::new(AdvancedMatchEngine::new()),
            session_store,
            cache,
        )
    }

    #[tokio::test]
    async fn drives_a_session_through_scrape_universe_and_match() {
        let dir = TempDir::new().unwrap();
        let entries = vec![holding("AAPL", "Apple Inc"), holding("ZZZZ", "Nonexistent Co")];
        let pipeline = test_pipeline(&dir, entries);

        let session = pipeline.start_session(ScrapeOptions::default()).await.unwrap();
        assert_eq!(session.steps[0].status, StepStatus::Complete);
        assert_eq!(session.dataroma.as_ref().unwrap().entries.len(), 2);

        let session = pipeline.run_universe_step(&session.id, true, false).await.unwrap();
        let universe = session.provider_universe.as_ref().unwrap();
        assert_eq!(universe.symbols.len(), 1);

        let session = pipeline.run_match_step(&session.id, true, false).await.unwrap();
        let matches = session.matches.as_ref().unwrap();
        assert_eq!(matches.len(), 2);
        assert!(matches.iter().any(|m| m.dataroma_symbol == "AAPL" && m.is_matched()));
        assert!(matches.iter().any(|m| m.dataroma_symbol == "ZZZZ" && !m.is_matched()));
    }

    #[tokio::test]
    async fn match_step_requires_universe_first() {
        let dir = TempDir::new().unwrap();
        let pipeline = test_pipeline(&dir, vec![holding("AAPL", "Apple Inc")]);

        let session = pipeline.start_session(ScrapeOptions::default()).await.unwrap();
        let err = pipeline.run_match_step(&session.id, true, false).await.unwrap_err();
        assert!(matches!(err, AppError::Precondition(_)));
    }
}
