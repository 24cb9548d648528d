//! Fuzzy match engine that reconciles aggregated-portfolio holdings against a
//! provider's symbol universe (component C5).

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::holding::HoldingEntry;
use crate::models::matches::MatchCandidate;
use crate::models::symbol::SymbolRecord;

const FUZZY_SCORE_CUTOFF: f64 = 0.85;

static SUFFIX_WORD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+(inc|corp|ltd|plc|co|group|holdings|hldgs)\b").expect("valid regex")
});
static CLASS_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+cl\s+[a-z]\b").expect("valid regex"));

pub trait MatchEngine: Send + Sync {
    fn generate_candidates(
        &self,
        entries: &[HoldingEntry],
        provider_symbols: &[SymbolRecord],
    ) -> Vec<MatchCandidate>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AdvancedMatchEngine;

impl AdvancedMatchEngine {
    pub fn new() -> Self {
        Self
    }
}

impl MatchEngine for AdvancedMatchEngine {
    fn generate_candidates(
        &self,
        entries: &[HoldingEntry],
        provider_symbols: &[SymbolRecord],
    ) -> Vec<MatchCandidate> {
        let valid_symbols: Vec<&SymbolRecord> = provider_symbols
            .iter()
            .filter(|s| !s.code.is_empty() && !s.name.is_empty())
            .collect();

        let mut symbol_map: HashMap<&str, HashMap<&str, &SymbolRecord>> = HashMap::new();
        let mut name_map: HashMap<String, Vec<&SymbolRecord>> = HashMap::new();
        // Preserves first-seen order of provider_symbols so fuzzy-match tie
        // breaking is stable across runs (HashMap key iteration is not).
        let mut name_order: Vec<String> = Vec::new();

        for sym in &valid_symbols {
            symbol_map
                .entry(sym.exchange.as_str())
                .or_default()
                .insert(sym.code.as_str(), sym);

            let key = normalize_name(&sym.name);
            if !name_map.contains_key(&key) {
                name_order.push(key.clone());
            }
            name_map.entry(key).or_default().push(sym);
        }

        let choices: Vec<&String> = name_order.iter().collect();

        entries
            .iter()
            .map(|entry| generate_candidate(entry, &symbol_map, &name_map, &choices))
            .collect()
    }
}

fn generate_candidate(
    entry: &HoldingEntry,
    symbol_map: &HashMap<&str, HashMap<&str, &SymbolRecord>>,
    name_map: &HashMap<String, Vec<&SymbolRecord>>,
    choices: &[&String],
) -> MatchCandidate {
    let target_exchange = eodhd_exchange_code(&entry.symbol);
    let clean_symbol = strip_suffix(&entry.symbol);

    let mut matched: Option<SymbolRecord> = None;
    let mut confidence = 0.0;
    let mut reasons = Vec::new();
    let mut matched_at_all = false;

    // Strategy 1: direct symbol match, with a dot-to-hyphen fallback for US tickers.
    if let Some(exchange_symbols) = symbol_map.get(target_exchange.as_str()) {
        if let Some(sym) = exchange_symbols.get(clean_symbol.as_str()) {
            matched = Some((*sym).clone());
            confidence = 1.0;
            reasons.push("Direct symbol match".to_string());
            matched_at_all = true;
        } else if target_exchange == "US" && entry.symbol.contains('.') {
            let hyphenated = entry.symbol.replace('.', "-");
            if let Some(sym) = exchange_symbols.get(hyphenated.as_str()) {
                matched = Some((*sym).clone());
                confidence = 1.0;
                reasons.push("Symbol match with dot-to-hyphen conversion".to_string());
                matched_at_all = true;
            }
        }
    }

    // Strategy 2: exact normalized-name match.
    if !matched_at_all {
        let norm_name = normalize_name(&entry.stock);
        if let Some(candidates) = name_map.get(&norm_name) {
            let best = candidates
                .iter()
                .find(|s| s.exchange == target_exchange)
                .or_else(|| candidates.first())
                .expect("non-empty bucket");
            matched = Some((*best).clone());
            confidence = 0.9;
            reasons.push("Exact normalized name match".to_string());
            matched_at_all = true;
        }
    }

    // Strategy 3: fuzzy name match via token-sort ratio.
    if !matched_at_all {
        let norm_name = normalize_name(&entry.stock);
        if let Some((best_name, score)) = best_fuzzy_match(&norm_name, choices) {
            if score >= FUZZY_SCORE_CUTOFF {
                let candidates = &name_map[best_name];
                let best = candidates
                    .iter()
                    .find(|s| s.exchange == target_exchange)
                    .or_else(|| candidates.first())
                    .expect("non-empty bucket");
                matched = Some((*best).clone());
                confidence = score;
                reasons.push(format!("Fuzzy name match (score: {:.0})", score * 100.0));
                matched_at_all = true;
            }
        }
    }

    if !matched_at_all {
        if matches!(target_exchange.as_str(), "HK" | "T" | "KO") && !symbol_map.contains_key(target_exchange.as_str()) {
            reasons.push(format!("Exchange {target_exchange} data not available in EODHD files."));
        } else {
            reasons.push("No match found".to_string());
        }
    }

    MatchCandidate {
        dataroma_symbol: entry.symbol.clone(),
        dataroma_name: entry.stock.clone(),
        provider_symbol: matched,
        confidence,
        reasons,
        not_available: Some(!matched_at_all),
    }
}

/// Token-sort ratio: normalize each side's tokens alphabetically, then score
/// by relative edit distance. Mirrors rapidfuzz's `token_sort_ratio` (0-1 here
/// instead of 0-100).
fn token_sort_ratio(a: &str, b: &str) -> f64 {
    let sort_tokens = |s: &str| -> String {
        let mut tokens: Vec<&str> = s.split_whitespace().collect();
        tokens.sort_unstable();
        tokens.join(" ")
    };
    strsim::normalized_levenshtein(&sort_tokens(a), &sort_tokens(b))
}

/// Returns the first choice achieving the highest score. Ties keep the
/// earliest entry in `choices` so repeated runs over the same inputs produce
/// the same candidate, matching the list-order tie-break of the original
/// implementation.
fn best_fuzzy_match<'a>(query: &str, choices: &[&'a String]) -> Option<(&'a String, f64)> {
    let mut best: Option<(&'a String, f64)> = None;
    for choice in choices {
        let score = token_sort_ratio(query, choice);
        let is_better = match best {
            Some((_, best_score)) => score > best_score,
            None => true,
        };
        if is_better {
            best = Some((*choice, score));
        }
    }
    best
}

fn normalize_name(name: &str) -> String {
    if name.is_empty() {
        return String::new();
    }
    let lower = name.to_lowercase().replace(['.', ','], "");
    let without_suffixes = SUFFIX_WORD_RE.replace_all(&lower, "");
    let without_class = CLASS_SUFFIX_RE.replace_all(&without_suffixes, "");
    without_class.trim().to_string()
}

/// Maps a Dataroma ticker's dotted exchange suffix to an EODHD exchange code.
/// Unknown or absent suffixes default to `"US"`.
fn eodhd_exchange_code(symbol: &str) -> String {
    let Some(suffix) = symbol.rsplit('.').next().filter(|_| symbol.contains('.')) else {
        return "US".to_string();
    };
    match suffix {
        "KS" => "KO",
        "SZ" => "SHE",
        "SS" => "SHG",
        "L" => "LSE",
        "TO" => "TO",
        "V" => "V",
        "DE" => "XETRA",
        "HK" => "HK",
        "T" => "T",
        _ => "US",
    }
    .to_string()
}

fn strip_suffix(symbol: &str) -> String {
    symbol.split('.').next().unwrap_or(symbol).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol(code: &str, name: &str, exchange: &str) -> SymbolRecord {
        SymbolRecord {
            code: code.to_string(),
            name: name.to_string(),
            exchange: exchange.to_string(),
            country: String::new(),
            currency: String::new(),
            isin: None,
            r#type: Some("Common Stock".to_string()),
        }
    }

    fn entry(symbol: &str, stock: &str) -> HoldingEntry {
        HoldingEntry {
            symbol: symbol.to_string(),
            stock: stock.to_string(),
            exchange: None,
        }
    }

    #[test]
    fn matches_direct_symbol() {
        let engine = AdvancedMatchEngine::new();
        let symbols = vec![symbol("AAPL", "Apple Inc", "US")];
        let candidates = engine.generate_candidates(&[entry("AAPL", "Apple Inc")], &symbols);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].confidence, 1.0);
        assert_eq!(candidates[0].provider_symbol.as_ref().unwrap().code, "AAPL");
    }

    #[test]
    fn matches_dot_to_hyphen_for_us_tickers() {
        let engine = AdvancedMatchEngine::new();
        let symbols = vec![symbol("BRK-B", "Berkshire Hathaway", "US")];
        let candidates = engine.generate_candidates(&[entry("BRK.B", "Berkshire Hathaway")], &symbols);
        assert!(candidates[0].is_matched());
        assert!(candidates[0].reasons[0].contains("dot-to-hyphen"));
    }

    #[test]
    fn maps_korean_suffix_to_ko_exchange() {
        assert_eq!(eodhd_exchange_code("005930.KS"), "KO");
        assert_eq!(eodhd_exchange_code("AAPL"), "US");
        assert_eq!(eodhd_exchange_code("VOD.L"), "LSE");
    }

    #[test]
    fn falls_back_to_fuzzy_match_on_near_miss_names() {
        let engine = AdvancedMatchEngine::new();
        let symbols = vec![symbol("ICE", "Intercontinental Exchange Inc", "US")];
        let candidates = engine.generate_candidates(&[entry("IC", "Intercontinental Exchang")], &symbols);
        assert!(candidates[0].is_matched());
        assert!(candidates[0].reasons[0].starts_with("Fuzzy name match"));
    }

    #[test]
    fn reports_unmatched_with_no_candidates() {
        let engine = AdvancedMatchEngine::new();
        let candidates = engine.generate_candidates(&[entry("ZZZZ", "Nonexistent Co")], &[]);
        assert!(!candidates[0].is_matched());
        assert_eq!(candidates[0].reasons, vec!["No match found".to_string()]);
    }

    #[test]
    fn normalizes_corporate_suffixes_and_share_classes() {
        assert_eq!(normalize_name("Alphabet Inc Cl A"), "alphabet");
        assert_eq!(normalize_name("Acme Holdings"), "acme");
    }
}
