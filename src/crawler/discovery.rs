//! Paginated link discovery
//!
//! Walks the search result pages one at a time and collects the detail
//! links each page lists.

use crate::config::CrawlerConfig;
use crate::crawler::fetcher::Fetcher;
use crate::site::SiteAdapter;
use scraper::Html;

/// Links found by one discovery walk
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Page order, then document order; duplicates are kept
    pub links: Vec<String>,
    pub pages_walked: u32,
    /// Pages whose fetch gave up or that listed nothing
    pub empty_pages: u32,
}

/// Walks pages `1..=max_pages` sequentially
///
/// Each page is preceded by the page delay. A page that cannot be fetched
/// or lists no links is logged and skipped; the walk always continues.
pub async fn discover_links(
    fetcher: &Fetcher,
    adapter: &dyn SiteAdapter,
    config: &CrawlerConfig,
) -> Discovery {
    let mut discovery = Discovery::default();

    for page in 1..=config.max_pages {
        tokio::time::sleep(config.page_delay()).await;

        let url = adapter.listing_url(page);
        let body = fetcher.fetch(&url).await.into_text();
        discovery.pages_walked += 1;

        let links = links_on_page(adapter, &body);
        if links.is_empty() {
            tracing::warn!("No listings found on page {} ({})", page, url);
            discovery.empty_pages += 1;
            continue;
        }

        tracing::info!("Page {}: {} listings", page, links.len());
        discovery.links.extend(links);
    }

    tracing::info!(
        "Discovered {} listing links across {} pages",
        discovery.links.len(),
        discovery.pages_walked
    );

    discovery
}

// Html is not Send, keep it out of the async body
fn links_on_page(adapter: &dyn SiteAdapter, body: &str) -> Vec<String> {
    if body.trim().is_empty() {
        return Vec::new();
    }
    let document = Html::parse_document(body);
    adapter.extract_links(&document)
}
