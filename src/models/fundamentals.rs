use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::JsonValue;

/// A best-effort snapshot of a provider's fundamentals response for one
/// symbol. Numeric fields are coerced defensively: a value that doesn't
/// parse as a finite float becomes `None` rather than failing the whole
/// snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundamentalsSnapshot {
    pub stock_code: String,
    pub exchange_code: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trailing_pe: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forward_pe: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forward_dividend_yield: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_cash_flow_margin: Option<f64>,
    pub as_of: DateTime<Utc>,
    pub raw: JsonValue,
}

/// Parses a JSON value as an `f64`, treating anything non-finite (including
/// NaN and unparsable strings) as absent.
pub fn coerce_float(value: Option<&JsonValue>) -> Option<f64> {
    let value = value?;
    let parsed = if let Some(n) = value.as_f64() {
        n
    } else if let Some(s) = value.as_str() {
        s.parse::<f64>().ok()?
    } else {
        return None;
    };
    parsed.is_finite().then_some(parsed)
}
