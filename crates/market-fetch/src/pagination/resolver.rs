//! Page Cursor Resolver - next-page decision for heterogeneous pagination
//!
//! # Algorithm (priority order)
//! 1. Empty page: done, whatever the cursor says
//! 2. Non-empty `next_cursor`: continue by cursor, and stay in cursor mode
//!    for the rest of the session
//! 3. No cursor, full page, cursor never seen: continue at `offset + page_size`
//! 4. Otherwise: done
//!
//! A session that has confirmed cursor mode never falls back to offsets: a
//! later response without a cursor is the last page.

use serde_json::Value;
use tracing::{debug, warn};

use crate::types::{MarketRecord, PageDescriptor, PageOutcome};

/// CLOB cursor marking the end of the stream (base64 of "-1")
pub const END_CURSOR: &str = "LTE=";

/// Continuation contract of an API
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaginationStrategy {
    /// Gamma: cursor when the server supplies one (`cursor=`), offset otherwise
    CursorPreferred,
    /// CLOB: offset continuation unless the body carries `next_cursor`,
    /// echoed back as `next_cursor=`
    OffsetFallback,
}

impl PaginationStrategy {
    /// Query parameter carrying the cursor on the next request
    pub fn cursor_param(&self) -> &'static str {
        match self {
            PaginationStrategy::CursorPreferred => "cursor",
            PaginationStrategy::OffsetFallback => "next_cursor",
        }
    }

    /// Pagination query parameters for a descriptor
    pub fn params_for(&self, descriptor: &PageDescriptor) -> Vec<(String, String)> {
        match descriptor {
            PageDescriptor::Offset(offset) => vec![("offset".to_string(), offset.to_string())],
            PageDescriptor::Cursor(cursor) => vec![(self.cursor_param().to_string(), cursor.clone())],
        }
    }
}

/// Split a response body into `(raw item count, records, cursor)`
///
/// Accepts a bare array or an object with `data` and optional `next_cursor`.
/// Anything else reads as an empty page. Non-object items are dropped but
/// still counted towards the batch size.
pub fn split_body(body: &Value) -> (usize, Vec<MarketRecord>, Option<String>) {
    let (items, cursor) = match body {
        Value::Array(items) => (items.as_slice(), None),
        Value::Object(map) => {
            let items = map.get("data").and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[]);
            let cursor = map
                .get("next_cursor")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string);
            (items, cursor)
        }
        _ => (&[][..], None),
    };

    let records = items.iter().cloned().filter_map(MarketRecord::from_value).collect();
    (items.len(), records, cursor)
}

/// Per-session resolver. Create one per fetch run.
#[derive(Debug)]
pub struct PageCursorResolver {
    page_size: u32,
    cursor_confirmed: bool,
}

impl PageCursorResolver {
    pub fn new(page_size: u32) -> Self {
        Self { page_size, cursor_confirmed: false }
    }

    /// Whether a server cursor has been seen in this session
    pub fn cursor_confirmed(&self) -> bool {
        self.cursor_confirmed
    }

    /// Decide how to continue after the page fetched at `current`
    pub fn resolve(&mut self, body: &Value, current: &PageDescriptor) -> PageOutcome {
        let (returned, records, cursor) = split_body(body);

        if returned == 0 {
            debug!("Empty page at {:?}, stream complete", current);
            return PageOutcome { records, next: None };
        }

        let next = match cursor {
            Some(cursor) if cursor == END_CURSOR => {
                self.cursor_confirmed = true;
                None
            }
            Some(cursor) if matches!(current, PageDescriptor::Cursor(c) if *c == cursor) => {
                warn!("Server repeated cursor {}, stopping", cursor);
                None
            }
            Some(cursor) => {
                if !self.cursor_confirmed {
                    debug!("Server cursor seen, switching to cursor pagination");
                }
                self.cursor_confirmed = true;
                Some(PageDescriptor::Cursor(cursor))
            }
            None if self.cursor_confirmed => None,
            None if returned >= self.page_size as usize => match current {
                PageDescriptor::Offset(offset) => {
                    Some(PageDescriptor::Offset(offset + u64::from(self.page_size)))
                }
                PageDescriptor::Cursor(_) => None,
            },
            None => None,
        };

        PageOutcome { records, next }
    }
}
