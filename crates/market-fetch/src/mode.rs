//! Mode Selector - maps a fetch mode to endpoint, filters and pagination
//!
//! | mode      | API         | filters                    | page size |
//! |-----------|-------------|----------------------------|-----------|
//! | `current` | Gamma       | `active=true&closed=false` | 500       |
//! | `active`  | Gamma       | `active=true`              | 500       |
//! | `closed`  | Gamma       | `closed=true`              | 500       |
//! | `all`     | Gamma       | none                       | 500       |
//! | default   | CLOB        | none (not supported)       | 1000      |

use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::error::ConfigError;
use crate::pagination::PaginationStrategy;
use crate::{CLOB_REST_BASE, GAMMA_API_BASE};

/// Page size ceiling of the Gamma `/markets` endpoint
pub const GAMMA_MAX_PAGE_SIZE: u32 = 500;

/// Page size ceiling of the CLOB `/markets` endpoint
pub const CLOB_MAX_PAGE_SIZE: u32 = 1000;

pub const DEFAULT_OUTPUT_FILENAME: &str = "markets.json";
pub const DEFAULT_NAMES_OUTPUT_FILENAME: &str = "market_names.json";
pub const CURRENT_OUTPUT_FILENAME: &str = "current_markets.json";
pub const CURRENT_NAMES_OUTPUT_FILENAME: &str = "current_market_names.json";

/// User-selectable fetch mode
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FetchMode {
    /// Currently trading: active and not closed
    Current,
    /// Active, may include closed
    Active,
    /// Resolved markets
    Closed,
    /// Everything, via Gamma
    All,
    /// Everything, via CLOB (full detail, no server-side filtering)
    #[default]
    Clob,
}

impl FetchMode {
    /// Parse an optional mode name; `None` selects the default (CLOB) mode
    pub fn parse(name: Option<&str>) -> Result<Self, ConfigError> {
        match name {
            None => Ok(FetchMode::default()),
            Some(s) => s.parse(),
        }
    }

    /// Label written to the snapshot's `mode` field
    pub fn label(&self) -> &'static str {
        match self {
            FetchMode::Current => "open",
            FetchMode::Active => "active",
            FetchMode::Closed => "closed",
            FetchMode::All => "all",
            FetchMode::Clob => "clob_api",
        }
    }

    /// Human-readable description for log lines
    pub fn description(&self) -> &'static str {
        match self {
            FetchMode::Current => "current/open",
            FetchMode::Active => "active",
            FetchMode::Closed => "closed",
            FetchMode::All => "all (Gamma API)",
            FetchMode::Clob => "all (CLOB API)",
        }
    }

    /// Server-side filters sent as query parameters
    pub fn filters(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            FetchMode::Current => &[("active", "true"), ("closed", "false")],
            FetchMode::Active => &[("active", "true")],
            FetchMode::Closed => &[("closed", "true")],
            FetchMode::All | FetchMode::Clob => &[],
        }
    }

    /// Whether the snapshot is restricted to open markets by the server
    pub fn only_open(&self) -> bool {
        matches!(self, FetchMode::Current)
    }

    pub fn uses_gamma(&self) -> bool {
        !matches!(self, FetchMode::Clob)
    }
}

impl FromStr for FetchMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "current" | "open" => Ok(FetchMode::Current),
            "active" => Ok(FetchMode::Active),
            "closed" => Ok(FetchMode::Closed),
            "all" => Ok(FetchMode::All),
            "" | "default" | "clob" | "clob_api" => Ok(FetchMode::Clob),
            other => Err(ConfigError::UnknownMode(other.to_string())),
        }
    }
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Base URLs of both APIs
#[derive(Clone, Debug)]
pub struct Endpoints {
    pub gamma_base: String,
    pub clob_base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self { gamma_base: GAMMA_API_BASE.to_string(), clob_base: CLOB_REST_BASE.to_string() }
    }
}

impl Endpoints {
    /// Validate and normalize both base URLs
    pub fn new(gamma_base: &str, clob_base: &str) -> Result<Self, ConfigError> {
        Ok(Self { gamma_base: normalize_base(gamma_base)?, clob_base: normalize_base(clob_base)? })
    }
}

fn normalize_base(raw: &str) -> Result<String, ConfigError> {
    Url::parse(raw).map_err(|source| ConfigError::InvalidUrl { url: raw.to_string(), source })?;
    Ok(raw.trim_end_matches('/').to_string())
}

/// Default artifact file names for a mode
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputNames {
    pub markets: &'static str,
    pub names: &'static str,
}

/// Everything the orchestrator needs to run one fetch session
#[derive(Clone, Debug)]
pub struct FetchConfig {
    pub mode: FetchMode,
    /// Full URL of the `/markets` endpoint
    pub endpoint: String,
    pub filters: Vec<(String, String)>,
    pub page_size: u32,
    pub strategy: PaginationStrategy,
    pub output: OutputNames,
}

impl FetchConfig {
    /// Resolve a mode into a fetch configuration. No side effects.
    pub fn for_mode(mode: FetchMode, endpoints: &Endpoints) -> Self {
        let (base, page_size, strategy) = if mode.uses_gamma() {
            (&endpoints.gamma_base, GAMMA_MAX_PAGE_SIZE, PaginationStrategy::CursorPreferred)
        } else {
            (&endpoints.clob_base, CLOB_MAX_PAGE_SIZE, PaginationStrategy::OffsetFallback)
        };

        let output = if mode == FetchMode::Current {
            OutputNames { markets: CURRENT_OUTPUT_FILENAME, names: CURRENT_NAMES_OUTPUT_FILENAME }
        } else {
            OutputNames { markets: DEFAULT_OUTPUT_FILENAME, names: DEFAULT_NAMES_OUTPUT_FILENAME }
        };

        Self {
            mode,
            endpoint: format!("{}/markets", base),
            filters: mode.filters().iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            page_size,
            strategy,
            output,
        }
    }

    /// Parse a mode name and resolve it in one step
    pub fn from_name(name: Option<&str>, endpoints: &Endpoints) -> Result<Self, ConfigError> {
        Ok(Self::for_mode(FetchMode::parse(name)?, endpoints))
    }

    /// Override the page size, bounded by the selected API's ceiling
    pub fn with_page_size(mut self, page_size: u32) -> Result<Self, ConfigError> {
        let max = self.max_page_size();
        if page_size == 0 || page_size > max {
            return Err(ConfigError::InvalidPageSize { got: page_size, max });
        }
        self.page_size = page_size;
        Ok(self)
    }

    pub fn max_page_size(&self) -> u32 {
        if self.mode.uses_gamma() {
            GAMMA_MAX_PAGE_SIZE
        } else {
            CLOB_MAX_PAGE_SIZE
        }
    }
}
