//! HTTP client adapter
//!
//! reqwest-based GET client with a fixed inter-request throttle,
//! bounded retries with exponential backoff, and 4xx passthrough.

pub mod client;
pub mod throttle;

pub use client::*;
pub use throttle::Throttle;
