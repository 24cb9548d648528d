pub mod cache;
pub mod fundamentals;
pub mod holding;
pub mod matches;
pub mod session;
pub mod settings;
pub mod symbol;

pub type JsonObject = serde_json::value::Map<String, serde_json::Value>;
pub type JsonValue = serde_json::Value;

/// A freshly minted session id. Sessions are identified by opaque strings
/// (v4 UUIDs rendered as text), matching the upstream implementation this
/// service replaces.
pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
