use serde::{Deserialize, Serialize};

/// A tradable instrument known to the market-data provider. `code` is unique
/// within `exchange`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub code: String,
    pub name: String,
    pub exchange: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
}

/// A tradable market known to the provider, independent of any particular
/// symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeSummary {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub currency: String,
    #[serde(rename = "operatingMic", default)]
    pub operating_mic: String,
}
