//! Fetch session - the accumulator owned by one orchestrator run

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::mode::FetchMode;
use crate::types::{MarketRecord, RecordIdentity, Snapshot, StopReason};

/// Records, seen identities and page counter for a single run
#[derive(Debug)]
pub struct FetchSession {
    records: Vec<MarketRecord>,
    seen: HashSet<RecordIdentity>,
    pages: u32,
    duplicates: usize,
    started_at: DateTime<Utc>,
    stop_reason: Option<StopReason>,
    error: Option<String>,
}

impl FetchSession {
    pub(crate) fn new() -> Self {
        Self {
            records: Vec::new(),
            seen: HashSet::new(),
            pages: 0,
            duplicates: 0,
            started_at: Utc::now(),
            stop_reason: None,
            error: None,
        }
    }

    /// Count one consumed page and append its unseen records in order.
    /// Returns how many were new.
    pub(crate) fn absorb(&mut self, records: Vec<MarketRecord>) -> usize {
        self.pages += 1;
        let before = self.records.len();

        for record in records {
            if self.seen.insert(record.identity()) {
                self.records.push(record);
            } else {
                self.duplicates += 1;
            }
        }

        self.records.len() - before
    }

    pub(crate) fn finish(&mut self, reason: StopReason, error: Option<String>) {
        self.stop_reason = Some(reason);
        self.error = error;
    }

    pub fn records(&self) -> &[MarketRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Pages actually consumed
    pub fn pages(&self) -> u32 {
        self.pages
    }

    pub fn duplicates_skipped(&self) -> usize {
        self.duplicates
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// `None` while the run is still in progress
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_partial(&self) -> bool {
        self.stop_reason.map_or(true, |r| r.is_partial())
    }

    /// Freeze the session into its output artifact
    ///
    /// With `only_open_filter`, records that are not active-and-open are
    /// dropped and the pre-filter count is kept in `total_original_markets`.
    pub fn into_snapshot(self, mode: FetchMode, only_open_filter: bool) -> Snapshot {
        let stop_reason = self.stop_reason.unwrap_or(StopReason::Interrupted);
        let total_original = self.records.len();

        let markets: Vec<MarketRecord> = if only_open_filter {
            self.records.into_iter().filter(MarketRecord::is_open).collect()
        } else {
            self.records
        };

        let total_asset_ids = markets.iter().map(|m| m.asset_ids().len()).sum();
        let now = Utc::now();

        Snapshot {
            timestamp: now.timestamp_micros() as f64 / 1_000_000.0,
            mode: mode.label().to_string(),
            only_open_markets: mode.only_open() || only_open_filter,
            total_markets: markets.len(),
            total_original_markets: only_open_filter.then_some(total_original),
            total_asset_ids,
            partial: stop_reason.is_partial(),
            stop_reason,
            pages_fetched: self.pages,
            duplicates_skipped: self.duplicates,
            started_at: self.started_at.to_rfc3339(),
            error: self.error,
            markets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> MarketRecord {
        MarketRecord::from_value(value).unwrap()
    }

    #[test]
    fn test_absorb_drops_later_duplicates() {
        let mut session = FetchSession::new();
        let added = session.absorb(vec![
            record(json!({"condition_id": "a", "question": "first"})),
            record(json!({"condition_id": "b"})),
        ]);
        assert_eq!(added, 2);

        let added = session.absorb(vec![
            record(json!({"condition_id": "a", "question": "second"})),
            record(json!({"condition_id": "c"})),
        ]);
        assert_eq!(added, 1);
        assert_eq!(session.pages(), 2);
        assert_eq!(session.duplicates_skipped(), 1);
        assert_eq!(session.records()[0].get_str("question"), Some("first"));
        assert_eq!(session.records()[2].get_str("condition_id"), Some("c"));
    }

    #[test]
    fn test_empty_page_still_counts() {
        let mut session = FetchSession::new();
        assert_eq!(session.absorb(Vec::new()), 0);
        assert_eq!(session.pages(), 1);
    }

    #[test]
    fn test_unfinished_session_is_partial() {
        let session = FetchSession::new();
        assert!(session.is_partial());
        assert!(session.stop_reason().is_none());
    }

    #[test]
    fn test_snapshot_metadata() {
        let mut session = FetchSession::new();
        session.absorb(vec![record(json!({
            "condition_id": "a",
            "tokens": [{"token_id": "1"}, {"token_id": "2"}]
        }))]);
        session.finish(StopReason::Exhausted, None);

        let snapshot = session.into_snapshot(FetchMode::Current, false);
        assert_eq!(snapshot.mode, "open");
        assert!(snapshot.only_open_markets);
        assert_eq!(snapshot.total_markets, 1);
        assert_eq!(snapshot.total_asset_ids, 2);
        assert_eq!(snapshot.pages_fetched, 1);
        assert!(!snapshot.partial);
        assert!(snapshot.total_original_markets.is_none());
        assert!(snapshot.timestamp > 0.0);
    }

    #[test]
    fn test_snapshot_only_open_filter() {
        let mut session = FetchSession::new();
        session.absorb(vec![
            record(json!({"condition_id": "a", "active": true, "closed": false})),
            record(json!({"condition_id": "b", "active": true, "closed": true})),
            record(json!({"condition_id": "c"})),
        ]);
        session.finish(StopReason::PageCeiling, None);

        let snapshot = session.into_snapshot(FetchMode::Clob, true);
        assert_eq!(snapshot.total_markets, 1);
        assert_eq!(snapshot.total_original_markets, Some(3));
        assert!(snapshot.only_open_markets);
        assert!(snapshot.partial);
        assert_eq!(snapshot.stop_reason, StopReason::PageCeiling);
    }
}
