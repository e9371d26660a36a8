//! Data model for market listings, pagination and snapshots
//!
//! # Design Principles
//! 1. Records are open maps: no field is guaranteed across the Gamma and CLOB APIs
//! 2. Every field access goes through an `Option`-returning accessor
//! 3. Unknown fields are preserved verbatim in the snapshot
//!
//! # Sources
//! - Gamma Structure: https://docs.polymarket.com/developers/gamma-markets-api/gamma-structure
//! - CLOB Markets: https://docs.polymarket.com/developers/CLOB/markets/get-markets

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Market Records
// ============================================================================

/// Fields tried, in order, when deriving a human-readable title
const TITLE_FIELDS: [&str; 6] = ["question", "title", "name", "description", "market_slug", "slug"];

/// One market listing as returned by either API
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarketRecord(Map<String, Value>);

impl MarketRecord {
    /// Build from a JSON value, dropping anything that is not an object
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field).filter(|v| !v.is_null())
    }

    /// Non-blank string field, trimmed
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty())
    }

    /// First non-blank string among several spellings of the same field
    fn first_str(&self, fields: &[&str]) -> Option<&str> {
        fields.iter().find_map(|f| self.get_str(f))
    }

    pub fn get_bool(&self, field: &str) -> Option<bool> {
        self.get(field).and_then(Value::as_bool)
    }

    /// Deduplication key
    ///
    /// condition id, then market/question id, then question + slug.
    /// Records carrying none of these are keyed by their full JSON text.
    pub fn identity(&self) -> RecordIdentity {
        if let Some(id) = self.first_str(&["condition_id", "conditionId"]) {
            return RecordIdentity::Condition(id.to_string());
        }
        if let Some(id) = self.first_str(&["id", "question_id", "questionID"]) {
            return RecordIdentity::Id(id.to_string());
        }
        // Gamma serves numeric ids
        if let Some(n) = self.get("id").filter(|v| v.is_number()) {
            return RecordIdentity::Id(n.to_string());
        }

        let question = self.get_str("question");
        let slug = self.first_str(&["market_slug", "slug"]);
        if question.is_some() || slug.is_some() {
            return RecordIdentity::Composite {
                question: question.unwrap_or_default().to_string(),
                slug: slug.unwrap_or_default().to_string(),
            };
        }

        RecordIdentity::Content(Value::Object(self.0.clone()).to_string())
    }

    /// Human-readable title used for the names projection
    pub fn title(&self) -> Option<&str> {
        self.first_str(&TITLE_FIELDS)
    }

    /// CLOB token ids: `tokens[].token_id` (CLOB) or `clobTokenIds` (Gamma)
    pub fn asset_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .get("tokens")
            .and_then(Value::as_array)
            .map(|tokens| {
                tokens
                    .iter()
                    .filter_map(|t| t.get("token_id"))
                    .filter_map(value_to_id)
                    .collect()
            })
            .unwrap_or_default();

        match self.get("clobTokenIds") {
            Some(Value::Array(items)) => ids.extend(items.iter().filter_map(value_to_id)),
            // Gamma returns this as a stringified JSON array
            Some(Value::String(raw)) => {
                if let Ok(items) = serde_json::from_str::<Vec<Value>>(raw) {
                    ids.extend(items.iter().filter_map(value_to_id));
                }
            }
            _ => {}
        }

        ids
    }

    /// Active and not closed. Missing `active` counts as inactive and
    /// missing `closed` as closed.
    pub fn is_open(&self) -> bool {
        self.get_bool("active").unwrap_or(false) && !self.get_bool("closed").unwrap_or(true)
    }
}

fn value_to_id(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Deduplication key derived from the most stable identifier available
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RecordIdentity {
    Condition(String),
    Id(String),
    Composite { question: String, slug: String },
    Content(String),
}

// ============================================================================
// Pagination
// ============================================================================

/// Where the next page begins
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageDescriptor {
    /// Opaque server-issued token
    Cursor(String),
    /// Client-tracked record offset
    Offset(u64),
}

impl PageDescriptor {
    /// Descriptor for page 1
    pub fn initial() -> Self {
        PageDescriptor::Offset(0)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PageDescriptor::Cursor(_) => "cursor",
            PageDescriptor::Offset(_) => "offset",
        }
    }
}

/// Resolver output for one fetched page
#[derive(Clone, Debug)]
pub struct PageOutcome {
    pub records: Vec<MarketRecord>,
    /// `None` means the stream is exhausted
    pub next: Option<PageDescriptor>,
}

impl PageOutcome {
    pub fn is_last(&self) -> bool {
        self.next.is_none()
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// Why a fetch session ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The resolver signalled the last page
    Exhausted,
    /// `max_pages` was reached with more data possibly remaining
    PageCeiling,
    /// A page failed after earlier pages succeeded
    FetchFailed,
    /// Shutdown was requested between pages
    Interrupted,
}

impl StopReason {
    pub fn is_partial(&self) -> bool {
        !matches!(self, StopReason::Exhausted)
    }
}

/// Persisted output of one fetch run. Written once, never mutated.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Snapshot {
    /// Unix seconds
    pub timestamp: f64,
    pub mode: String,
    pub only_open_markets: bool,
    pub total_markets: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_original_markets: Option<usize>,
    pub total_asset_ids: usize,
    pub partial: bool,
    pub stop_reason: StopReason,
    pub pages_fetched: u32,
    pub duplicates_skipped: usize,
    /// RFC 3339
    pub started_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub markets: Vec<MarketRecord>,
}

impl Snapshot {
    /// Titles, order-aligned with `markets` (blank when a record has none)
    pub fn names(&self) -> Vec<String> {
        self.markets.iter().map(|m| m.title().unwrap_or_default().to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> MarketRecord {
        MarketRecord::from_value(value).unwrap()
    }

    #[test]
    fn test_identity_prefers_condition_id() {
        let clob = record(json!({"condition_id": "0xabc", "question_id": "q1"}));
        let gamma = record(json!({"conditionId": "0xabc", "id": "512"}));
        assert_eq!(clob.identity(), RecordIdentity::Condition("0xabc".into()));
        assert_eq!(clob.identity(), gamma.identity());
    }

    #[test]
    fn test_identity_fallback_chain() {
        let by_id = record(json!({"id": 512, "question": "Will it rain?"}));
        assert_eq!(by_id.identity(), RecordIdentity::Id("512".into()));

        let composite = record(json!({"question": "Will it rain?", "market_slug": "rain"}));
        assert_eq!(
            composite.identity(),
            RecordIdentity::Composite { question: "Will it rain?".into(), slug: "rain".into() }
        );

        let blank_ids = record(json!({"condition_id": "  ", "id": null, "slug": "rain"}));
        assert!(matches!(blank_ids.identity(), RecordIdentity::Composite { .. }));

        let bare = record(json!({"volume": 3}));
        assert!(matches!(bare.identity(), RecordIdentity::Content(_)));
        assert_eq!(bare.identity(), record(json!({"volume": 3})).identity());
    }

    #[test]
    fn test_title_fallback() {
        assert_eq!(record(json!({"question": "  Q?  ", "title": "T"})).title(), Some("Q?"));
        assert_eq!(record(json!({"question": "", "market_slug": "slug-1"})).title(), Some("slug-1"));
        assert_eq!(record(json!({"question": 5})).title(), None);
    }

    #[test]
    fn test_asset_ids_from_both_shapes() {
        let clob = record(json!({"tokens": [{"token_id": "1"}, {"token_id": ""}, {"outcome": "No"}]}));
        assert_eq!(clob.asset_ids(), vec!["1".to_string()]);

        let gamma = record(json!({"clobTokenIds": "[\"11\", \"22\"]"}));
        assert_eq!(gamma.asset_ids(), vec!["11".to_string(), "22".to_string()]);

        let malformed = record(json!({"clobTokenIds": "not json"}));
        assert!(malformed.asset_ids().is_empty());
    }

    #[test]
    fn test_is_open_defaults() {
        assert!(record(json!({"active": true, "closed": false})).is_open());
        assert!(!record(json!({"active": true})).is_open());
        assert!(!record(json!({"closed": false})).is_open());
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        assert!(MarketRecord::from_value(json!("x")).is_none());
        assert!(MarketRecord::from_value(json!([1])).is_none());
    }

    #[test]
    fn test_stop_reason_serialization() {
        assert_eq!(serde_json::to_string(&StopReason::PageCeiling).unwrap(), "\"page_ceiling\"");
        assert!(StopReason::Interrupted.is_partial());
        assert!(!StopReason::Exhausted.is_partial());
    }
}
