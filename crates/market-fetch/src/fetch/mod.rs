//! Fetch orchestration
//!
//! # Components
//! - `Fetcher`: drives the page loop for one run
//! - `FetchSession`: deduplicated, ordered accumulator produced by a run

mod orchestrator;
mod session;

pub use orchestrator::Fetcher;
pub use session::FetchSession;
