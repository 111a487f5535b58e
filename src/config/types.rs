use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Moto-Harvest
///
/// Every section is optional; a missing section takes the defaults the
/// harvester was tuned with.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub crawler: CrawlerConfig,
    pub fetch: FetchConfig,
    pub browser: BrowserConfig,
    pub identity: IdentityConfig,
    pub output: OutputConfig,
}

/// Target marketplace configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Search results root; listing pages are `{base-url}/?page={n}`
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Path fragment every detail link must contain
    #[serde(rename = "listing-marker")]
    pub listing_marker: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.otomoto.pl/osobowe".to_string(),
            listing_marker: "/oferta/".to_string(),
        }
    }
}

/// Pagination and batching configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Number of search result pages to walk
    #[serde(rename = "max-pages")]
    pub max_pages: u32,

    /// Pause before each search result page (milliseconds)
    #[serde(rename = "page-delay-ms")]
    pub page_delay_ms: u64,

    /// Detail pages processed concurrently per batch
    #[serde(rename = "chunk-size")]
    pub chunk_size: usize,

    /// Pause between batches (milliseconds)
    #[serde(rename = "chunk-delay-ms")]
    pub chunk_delay_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: 1,
            page_delay_ms: 500,
            chunk_size: 8,
            chunk_delay_ms: 500,
        }
    }
}

impl CrawlerConfig {
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn chunk_delay(&self) -> Duration {
        Duration::from_millis(self.chunk_delay_ms)
    }
}

/// HTTP retry configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Attempts allowed for transport errors and non-403 statuses
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Wait after a failed attempt (milliseconds)
    #[serde(rename = "base-delay-ms")]
    pub base_delay_ms: u64,

    /// Flat wait after an HTTP 403 (milliseconds)
    #[serde(rename = "blocked-cooldown-ms")]
    pub blocked_cooldown_ms: u64,

    /// Upper bound on 403 retries, counted separately from `max-retries`
    #[serde(rename = "max-blocked-retries")]
    pub max_blocked_retries: u32,

    /// Whole-request timeout (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 1000,
            blocked_cooldown_ms: 5000,
            max_blocked_retries: 3,
            request_timeout_secs: 30,
        }
    }
}

/// Scripted browser configuration for the VIN reveal
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Disable to rely on static VIN sources only
    pub enabled: bool,

    pub headless: bool,

    /// Chrome/Chromium executable; searched in common locations when unset
    #[serde(rename = "chrome-path")]
    pub chrome_path: Option<String>,

    #[serde(rename = "load-timeout-ms")]
    pub load_timeout_ms: u64,

    /// How long to wait for the VIN after activating the reveal button
    #[serde(rename = "reveal-timeout-ms")]
    pub reveal_timeout_ms: u64,

    /// Additional attempts after the first one fails
    pub retries: u32,

    #[serde(rename = "retry-cooldown-ms")]
    pub retry_cooldown_ms: u64,

    #[serde(rename = "viewport-width")]
    pub viewport_width: u32,

    #[serde(rename = "viewport-height")]
    pub viewport_height: u32,

    /// Pause after dismissing the consent overlay (milliseconds)
    #[serde(rename = "consent-settle-ms")]
    pub consent_settle_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            headless: true,
            chrome_path: None,
            load_timeout_ms: 30_000,
            reveal_timeout_ms: 10_000,
            retries: 2,
            retry_cooldown_ms: 5000,
            viewport_width: 1920,
            viewport_height: 1080,
            consent_settle_ms: 1000,
        }
    }
}

impl BrowserConfig {
    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    pub fn reveal_timeout(&self) -> Duration {
        Duration::from_millis(self.reveal_timeout_ms)
    }

    pub fn retry_cooldown(&self) -> Duration {
        Duration::from_millis(self.retry_cooldown_ms)
    }

    pub fn consent_settle(&self) -> Duration {
        Duration::from_millis(self.consent_settle_ms)
    }
}

/// Request identity configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// User agents to rotate through; the built-in pool is used when unset
    #[serde(rename = "user-agents")]
    pub user_agents: Option<Vec<String>>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path of the JSON file written by the CLI
    pub path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: "listings.json".to_string(),
        }
    }
}
