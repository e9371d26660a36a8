//! Polymarket market listing fetcher
//!
//! Enumerates every market exposed by the Gamma API (filterable, cursor or
//! offset paginated) or the CLOB API (full detail, unfiltered), deduplicates
//! them and persists a JSON snapshot plus a names projection.
//!
//! # Pipeline
//! `FetchConfig` (mode selector) -> `Fetcher` (page loop) -> `MarketsClient`
//! (throttled GET) -> `PageCursorResolver` (next page) -> `FetchSession`
//! (dedup) -> `Snapshot` -> `SnapshotWriter`
//!
//! # Official Documentation
//! - Endpoints: https://docs.polymarket.com/quickstart/reference/endpoints
//! - Gamma Markets: https://docs.polymarket.com/developers/gamma-markets-api/get-markets
//! - CLOB Markets: https://docs.polymarket.com/developers/CLOB/markets/get-markets

pub mod error;
pub mod fetch;
pub mod http;
pub mod mode;
pub mod pagination;
pub mod snapshot;
pub mod types;

pub use error::{ConfigError, FetchError, WriteError};
pub use fetch::{FetchSession, Fetcher};
pub use http::{ClientConfig, MarketsClient};
pub use mode::{Endpoints, FetchConfig, FetchMode};
pub use pagination::{PageCursorResolver, PaginationStrategy};
pub use snapshot::{SnapshotWriter, WriteReport};
pub use types::*;

/// Official CLOB REST API base URL (full-detail market listings)
/// Source: https://docs.polymarket.com/quickstart/reference/endpoints
pub const CLOB_REST_BASE: &str = "https://clob.polymarket.com";

/// Official Gamma API base URL (filterable market listings)
/// Source: https://docs.polymarket.com/quickstart/reference/endpoints
pub const GAMMA_API_BASE: &str = "https://gamma-api.polymarket.com";
