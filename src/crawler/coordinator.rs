//! Harvest coordinator - main orchestration logic
//!
//! This module wires the pipeline together:
//! - Building the fetcher, site adapter and reveal extractor from config
//! - Walking the search result pages for links
//! - Running the detail builder over every link in batches
//! - Collecting the run statistics

use crate::config::{validate, Config};
use crate::crawler::detail::DetailBuilder;
use crate::crawler::discovery::discover_links;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::scheduler::BatchScheduler;
use crate::identity::IdentityPool;
use crate::output::HarvestSummary;
use crate::record::{is_unknown, ListingRecord};
use crate::reveal::{RevealExtractor, RevealOptions, SessionLauncher};
use crate::site::{OtomotoAdapter, SiteAdapter};
use crate::HarvestError;
use std::sync::Arc;
use std::time::Instant;
use url::Url;

/// Main harvest coordinator structure
pub struct Harvester<L> {
    config: Config,
    fetcher: Fetcher,
    adapter: Arc<dyn SiteAdapter>,
    builder: Arc<DetailBuilder<L>>,
    scheduler: BatchScheduler,
}

impl<L: SessionLauncher + 'static> Harvester<L> {
    /// Creates a new harvester
    ///
    /// # Arguments
    ///
    /// * `config` - The harvester configuration
    /// * `launcher` - Opens the browser sessions used for the VIN reveal
    ///
    /// # Returns
    ///
    /// * `Ok(Harvester)` - Ready to run
    /// * `Err(HarvestError)` - Invalid configuration, or the HTTP client could not be built
    pub fn new(config: Config, launcher: L) -> Result<Self, HarvestError> {
        validate(&config)?;

        let identities = IdentityPool::from_config(&config.identity)?;
        let fetcher = Fetcher::from_config(&config.fetch, identities.clone())?;

        let base_url = Url::parse(&config.site.base_url)?;
        let marker = config.site.listing_marker.clone();
        let adapter: Arc<dyn SiteAdapter> = Arc::new(OtomotoAdapter::new(base_url, marker)?);

        let reveal = RevealExtractor::new(
            launcher,
            adapter.reveal_target(),
            identities,
            RevealOptions::from_config(&config.browser),
        );
        let builder = Arc::new(DetailBuilder::new(fetcher.clone(), adapter.clone(), reveal));
        let scheduler = BatchScheduler::from_config(&config.crawler);

        Ok(Self {
            config,
            fetcher,
            adapter,
            builder,
            scheduler,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn launcher(&self) -> &L {
        self.builder.reveal().launcher()
    }

    /// Runs one full harvest
    ///
    /// Never fails: pages and records that cannot be used are logged and
    /// left out of the result.
    pub async fn run(&self) -> (Vec<ListingRecord>, HarvestSummary) {
        let start_time = Instant::now();
        tracing::info!(
            "Starting harvest of {} ({} page(s))",
            self.config.site.base_url,
            self.config.crawler.max_pages
        );

        let discovery =
            discover_links(&self.fetcher, self.adapter.as_ref(), &self.config.crawler).await;

        let (records, report) = self
            .scheduler
            .run(&discovery.links, |link: String| {
                let builder = self.builder.clone();
                async move { builder.build(&link).await }
            })
            .await;

        let summary = HarvestSummary {
            pages_walked: discovery.pages_walked,
            empty_pages: discovery.empty_pages,
            links_discovered: discovery.links.len(),
            chunks: report.chunks,
            records_built: report.succeeded,
            records_dropped: report.dropped,
            records_without_vin: records.iter().filter(|r| is_unknown(r.vin())).count(),
            elapsed: start_time.elapsed(),
        };

        tracing::info!(
            "Harvest completed: {} of {} listings in {:?}",
            summary.records_built,
            summary.links_discovered,
            summary.elapsed
        );

        (records, summary)
    }
}

#[cfg(feature = "browser")]
impl Harvester<crate::reveal::ChromeLauncher> {
    /// Creates a harvester that reveals VINs in a local Chrome
    ///
    /// # Returns
    ///
    /// * `Err(HarvestError::Browser)` - No usable browser executable was found
    pub fn with_chrome(config: Config) -> Result<Self, HarvestError> {
        let launcher = crate::reveal::ChromeLauncher::new(&config.browser)?;
        Self::new(config, launcher)
    }
}

/// Runs a complete harvest operation
///
/// This is the main entry point. It will:
/// 1. Validate the configuration and build the HTTP client
/// 2. Walk the search result pages and collect listing links
/// 3. Build a record for every link, in batches
/// 4. Return the records with the run statistics
///
/// # Example
///
/// ```no_run
/// use moto_harvest::config::load_config;
/// use moto_harvest::harvest;
/// use moto_harvest::reveal::DisabledLauncher;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("harvest.toml"))?;
/// let (records, summary) = harvest(config, DisabledLauncher).await?;
/// println!("{} records, {} dropped", records.len(), summary.records_dropped);
/// # Ok(())
/// # }
/// ```
pub async fn harvest<L>(
    config: Config,
    launcher: L,
) -> Result<(Vec<ListingRecord>, HarvestSummary), HarvestError>
where
    L: SessionLauncher + 'static,
{
    let harvester = Harvester::new(config, launcher)?;
    Ok(harvester.run().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reveal::DisabledLauncher;
    use crate::ConfigError;

    #[test]
    fn test_harvester_creation() {
        assert!(Harvester::new(Config::default(), DisabledLauncher).is_ok());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = Config::default();
        config.crawler.chunk_size = 0;

        let err = Harvester::new(config, DisabledLauncher).err().unwrap();
        assert!(matches!(err, HarvestError::Config(ConfigError::Validation(_))));
    }

    #[cfg(feature = "browser")]
    #[test]
    fn test_missing_browser_is_a_browser_error() {
        let mut config = Config::default();
        config.browser.chrome_path = Some("/definitely/not/a/browser".to_string());

        let err = Harvester::with_chrome(config).err().unwrap();
        assert!(matches!(
            err,
            HarvestError::Browser(crate::InteractionError::Launch(_))
        ));
    }

    #[test]
    fn test_empty_identity_pool_is_rejected() {
        let mut config = Config::default();
        config.identity.user_agents = Some(Vec::new());

        assert!(Harvester::new(config, DisabledLauncher).is_err());
    }
}
