//! Crawler module for listing discovery and record building
//!
//! This module contains the core harvesting logic, including:
//! - HTTP fetching with retry logic and identity rotation
//! - Sequential walking of the search result pages
//! - Chunked, bounded-concurrency detail processing
//! - Building one record per detail page
//! - Overall harvest coordination

mod coordinator;
mod detail;
mod discovery;
mod fetcher;
pub mod retry;
mod scheduler;

pub use coordinator::{harvest, Harvester};
pub use detail::{DetailBuilder, StaticListing};
pub use discovery::{discover_links, Discovery};
pub use fetcher::{build_http_client, FetchError, FetchOutcome, Fetcher};
pub use retry::{run_with_retry, Attempt, RetryPolicy, RetryReport};
pub use scheduler::{BatchReport, BatchScheduler};
