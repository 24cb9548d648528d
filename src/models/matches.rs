use serde::{Deserialize, Serialize};

use super::symbol::SymbolRecord;

/// The match engine's belief about which provider symbol corresponds to a
/// holding, with confidence and rationale.
///
/// Invariant: if `provider_symbol` is set then `not_available` is `false` and
/// `confidence > 0`; if `not_available` is `true` then `provider_symbol` is
/// absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchCandidate {
    pub dataroma_symbol: String,
    pub dataroma_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_symbol: Option<SymbolRecord>,
    pub confidence: f64,
    pub reasons: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_available: Option<bool>,
}

impl MatchCandidate {
    pub fn is_matched(&self) -> bool {
        self.provider_symbol.is_some()
    }

    /// Manually confirm the candidate against a chosen symbol, or mark it
    /// unavailable when `symbol` is `None`. Mirrors `confirm_match` from the
    /// upstream matcher service.
    pub fn confirm(&mut self, symbol: Option<SymbolRecord>) {
        match symbol {
            Some(symbol) => {
                self.provider_symbol = Some(symbol);
                self.confidence = 1.0;
                self.reasons = vec!["Manually confirmed".to_string()];
                self.not_available = Some(false);
            }
            None => {
                self.provider_symbol = None;
                self.not_available = Some(true);
                self.confidence = 1.0;
                self.reasons = vec!["Manually marked as not available".to_string()];
            }
        }
    }
}
