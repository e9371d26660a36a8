//! Error taxonomy for the fetch pipeline
//!
//! - `ConfigError`: rejected before any network call is made
//! - `FetchError`: raised by the HTTP client adapter, absorbed by the
//!   orchestrator unless no page was ever fetched
//! - `WriteError`: raised per artifact by the snapshot writer

use std::path::PathBuf;

use thiserror::Error;

/// Invalid mode, URL or output path
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown fetch mode '{0}' (expected current, active, closed, all or default)")]
    UnknownMode(String),

    #[error("Invalid API URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Invalid output path '{}': {reason}", .path.display())]
    InvalidOutputPath { path: PathBuf, reason: String },

    #[error("Page size must be between 1 and {max}, got {got}")]
    InvalidPageSize { got: u32, max: u32 },
}

/// Failure while fetching a single page
#[derive(Error, Debug)]
pub enum FetchError {
    /// Timeout, connection failure or 5xx. Retried inside the client.
    #[error("Transient failure{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Transient { status: Option<u16>, message: String },

    /// Non-retryable API error (4xx)
    #[error("HTTP {status} for {url}: {body}")]
    Status { status: u16, url: String, body: String },

    #[error("Giving up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<FetchError> },

    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("HTTP client setup failed: {0}")]
    Client(#[source] reqwest::Error),

    /// Shutdown was requested before the request went out
    #[error("Interrupted before sending request")]
    Interrupted,

    /// The very first page failed, so there is nothing to persist
    #[error("No page could be fetched: {source}")]
    NothingFetched {
        #[source]
        source: Box<FetchError>,
    },
}

impl FetchError {
    /// Whether the client should retry after this error
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Transient { .. })
    }

    /// HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Transient { status, .. } => *status,
            FetchError::Status { status, .. } => Some(*status),
            FetchError::RetriesExhausted { last, .. } => last.status(),
            FetchError::NothingFetched { source } => source.status(),
            _ => None,
        }
    }
}

/// Failure persisting one artifact
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("Failed to serialize {artifact}: {source}")]
    Serialize {
        artifact: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing here would overwrite another artifact of the same snapshot
    #[error("Refusing to write {artifact} over '{}', already used by the markets snapshot", .path.display())]
    PathConflict { artifact: &'static str, path: PathBuf },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let err = FetchError::Transient { status: Some(503), message: "unavailable".into() };
        assert!(err.is_transient());
        assert_eq!(err.status(), Some(503));

        let err = FetchError::Status { status: 404, url: "u".into(), body: String::new() };
        assert!(!err.is_transient());
    }

    #[test]
    fn test_exhausted_carries_last_status() {
        let last = FetchError::Transient { status: Some(502), message: "bad gateway".into() };
        let err = FetchError::RetriesExhausted { attempts: 4, last: Box::new(last) };
        assert_eq!(err.status(), Some(502));
        assert!(err.to_string().contains("4 attempts"));
    }

    #[test]
    fn test_unknown_mode_message() {
        let err = ConfigError::UnknownMode("open-ish".into());
        assert!(err.to_string().contains("open-ish"));
    }
}
