//! Moto-Harvest: a vehicle listing harvester
//!
//! This crate walks the paginated search results of a vehicle marketplace,
//! visits every listing it finds and turns each detail page into a
//! canonical record, revealing the VIN through a scripted browser session
//! when the static markup hides it.

pub mod config;
pub mod crawler;
pub mod identity;
pub mod output;
pub mod pricing;
pub mod record;
pub mod reveal;
pub mod site;
pub mod state;

use thiserror::Error;

/// Main error type for harvest operations
///
/// Only infrastructure failures surface here. Problems with a single page
/// or a single field are logged and absorbed by the pipeline.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Browser unavailable: {0}")]
    Browser(#[from] InteractionError),

    #[error("Site adapter error: {0}")]
    Site(#[from] ParseError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors raised while building a record from one detail page
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Empty document for {url}")]
    EmptyDocument { url: String },

    #[error("Invalid selector '{selector}'")]
    Selector { selector: String },
}

/// Errors raised by one attempt of the interactive reveal
#[derive(Debug, Error)]
pub enum InteractionError {
    #[error("Failed to launch browser session: {0}")]
    Launch(String),

    #[error("Navigation failed for {url}: {message}")]
    Navigation { url: String, message: String },

    #[error("Timed out after {timeout_ms}ms: {what}")]
    Timeout { what: String, timeout_ms: u64 },

    #[error("Browser session error: {0}")]
    Session(String),

    #[error("Interactive sessions are not available in this build")]
    Unavailable,

    #[error("Invalid reveal transition: {from} -> {to}")]
    InvalidTransition {
        from: state::RevealState,
        to: state::RevealState,
    },
}

impl InteractionError {
    /// Returns true if another attempt could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Unavailable | Self::InvalidTransition { .. })
    }
}

/// Result type alias for harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{harvest, Harvester};
pub use output::{transform, HarvestSummary, OutputListing};
pub use pricing::estimate;
pub use record::{EstimatedRange, ListingDraft, ListingRecord, PriceIndicator};
pub use state::RevealState;
