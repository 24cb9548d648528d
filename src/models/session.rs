use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::cache::CachedPayload;
use super::holding::ScrapeResult;
use super::matches::MatchCandidate;
use super::symbol::{ExchangeSummary, SymbolRecord};
use super::JsonValue;

/// One node in the session's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Scrape,
    Universe,
    Match,
    Validate,
    Screener,
}

/// Lifecycle of a single step: `idle -> running -> {complete | blocked}`. A
/// step may be re-entered from `complete` or `blocked` back to `running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Idle,
    Running,
    Blocked,
    Complete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepState {
    pub step: StepKind,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<JsonValue>,
}

impl StepState {
    pub fn new(step: StepKind, status: StepStatus) -> Self {
        Self {
            step,
            status,
            context: None,
        }
    }

    pub fn with_context(mut self, context: JsonValue) -> Self {
        self.context = Some(context);
        self
    }
}

/// The set of tradable symbols known to the provider, organized by exchange.
/// A missing key in `symbols` means "not fetched", distinct from "fetched but
/// empty".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderUniverse {
    pub exchanges: CachedPayload<Vec<ExchangeSummary>>,
    pub symbols: BTreeMap<String, CachedPayload<Vec<SymbolRecord>>>,
}

/// The single aggregate persisted by the session store. `matches` presence
/// requires `provider_universe` presence requires `dataroma` presence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub steps: Vec<StepState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataroma: Option<ScrapeResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_universe: Option<ProviderUniverse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matches: Option<Vec<MatchCandidate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screener_rows: Option<Vec<super::fundamentals::FundamentalsSnapshot>>,
}

impl Session {
    pub fn new(id: String) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            steps: Vec::new(),
            dataroma: None,
            provider_universe: None,
            matches: None,
            screener_rows: None,
        }
    }

    /// Finds the step state for `kind`, or appends a fresh `idle` one.
    pub fn step_mut(&mut self, kind: StepKind) -> &mut StepState {
        if let Some(idx) = self.steps.iter().position(|s| s.step == kind) {
            return &mut self.steps[idx];
        }
        self.steps.push(StepState::new(kind, StepStatus::Idle));
        self.steps.last_mut().expect("just pushed")
    }
}
