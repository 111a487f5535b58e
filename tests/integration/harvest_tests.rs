//! Integration tests for the harvester
//!
//! These tests use wiremock to serve search result and detail pages and a
//! scripted in-memory browser to exercise the full harvest end-to-end.

use moto_harvest::config::{BrowserConfig, Config, CrawlerConfig, FetchConfig, SiteConfig};
use moto_harvest::output::{transform_all, write_json};
use moto_harvest::record::UNKNOWN;
use moto_harvest::reveal::{DisabledLauncher, PageScript, ScriptedLauncher};
use moto_harvest::{harvest, Harvester, ListingRecord};
use std::collections::HashMap;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DETAIL_PAGE: &str = include_str!("../fixtures/detail_page.html");
const STATIC_VIN: &str = "WAUZZZ8K9GA123456";

/// Creates a test configuration pointing at the mock server
fn create_test_config(server: &MockServer, max_pages: u32) -> Config {
    Config {
        site: SiteConfig {
            base_url: format!("{}/osobowe", server.uri()),
            listing_marker: "/oferta/".to_string(),
        },
        crawler: CrawlerConfig {
            max_pages,
            page_delay_ms: 1,
            chunk_size: 8,
            chunk_delay_ms: 1,
        },
        fetch: FetchConfig {
            max_retries: 2,
            base_delay_ms: 1,
            blocked_cooldown_ms: 1,
            max_blocked_retries: 1,
            request_timeout_secs: 5,
        },
        browser: BrowserConfig {
            retry_cooldown_ms: 1,
            consent_settle_ms: 1,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn results_page(hrefs: &[String]) -> String {
    let articles: String = hrefs
        .iter()
        .map(|href| {
            format!(
                r#"<article><a href="{}">Ogłoszenie</a><p>Cena</p></article>"#,
                href
            )
        })
        .collect();
    format!(
        "<html><body><div data-testid=\"search-results\">{}</div></body></html>",
        articles
    )
}

async fn mount_results(server: &MockServer, page: u32, hrefs: &[String]) {
    Mock::given(method("GET"))
        .and(path("/osobowe/"))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page(hrefs)))
        .mount(server)
        .await;
}

async fn mount_detail(server: &MockServer, slug: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/osobowe/oferta/{}.html", slug)))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.to_string()))
        .mount(server)
        .await;
}

fn detail_url(server: &MockServer, slug: &str) -> String {
    format!("{}/osobowe/oferta/{}.html", server.uri(), slug)
}

fn by_link<'a>(records: &'a [ListingRecord], link: &str) -> &'a ListingRecord {
    records
        .iter()
        .find(|r| r.link() == link)
        .unwrap_or_else(|| panic!("no record for {}", link))
}

#[tokio::test]
async fn test_full_harvest_single_page() {
    let server = MockServer::start().await;

    mount_results(
        &server,
        1,
        &[
            "/osobowe/oferta/audi-a4-ID1.html".to_string(),
            "/osobowe/oferta/audi-a4-ID2.html".to_string(),
            // Not a listing, filtered out by the marker
            "/dealer/auto-centrum".to_string(),
        ],
    )
    .await;
    mount_detail(&server, "audi-a4-ID1", DETAIL_PAGE).await;
    mount_detail(&server, "audi-a4-ID2", DETAIL_PAGE).await;

    let revealed = detail_url(&server, "audi-a4-ID1");
    let mut pages = HashMap::new();
    pages.insert(
        revealed.clone(),
        PageScript {
            has_consent_overlay: true,
            ..PageScript::revealing("WAUZZZ8K0GA999999")
        },
    );
    let unrevealed = detail_url(&server, "audi-a4-ID2");
    pages.insert(unrevealed.clone(), PageScript::without_control());

    let config = create_test_config(&server, 1);
    let harvester = Harvester::new(config, ScriptedLauncher::new(pages)).unwrap();
    let (records, summary) = harvester.run().await;

    assert_eq!(summary.pages_walked, 1);
    assert_eq!(summary.links_discovered, 2);
    assert_eq!(summary.chunks, 1);
    assert_eq!(summary.records_built, 2);
    assert_eq!(summary.records_dropped, 0);
    assert_eq!(records.len(), 2);

    // The revealed VIN wins over the differing static one
    assert_eq!(by_link(&records, &revealed).vin(), "WAUZZZ8K0GA999999");
    assert_eq!(by_link(&records, &unrevealed).vin(), STATIC_VIN);

    // Every session that was opened was closed again
    assert_eq!(harvester.launcher().opened(), 2);
    assert_eq!(harvester.launcher().closed(), 2);

    let record = by_link(&records, &revealed);
    assert_eq!(record.make(), "Audi");
    assert_eq!(record.price(), 89900);
    assert_eq!(record.price_range(), "80910-98890 PLN");
}

#[tokio::test]
async fn test_bad_detail_pages_are_dropped() {
    let server = MockServer::start().await;

    mount_results(
        &server,
        1,
        &[
            "/osobowe/oferta/ok-ID1.html".to_string(),
            "/osobowe/oferta/broken-ID2.html".to_string(),
            "/osobowe/oferta/blank-ID3.html".to_string(),
        ],
    )
    .await;
    mount_detail(&server, "ok-ID1", DETAIL_PAGE).await;
    mount_detail(&server, "blank-ID3", "   ").await;
    Mock::given(method("GET"))
        .and(path("/osobowe/oferta/broken-ID2.html"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let (records, summary) = harvest(create_test_config(&server, 1), ScriptedLauncher::default())
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].link(), detail_url(&server, "ok-ID1"));
    assert_eq!(summary.records_built, 1);
    assert_eq!(summary.records_dropped, 2);
}

#[tokio::test]
async fn test_many_links_run_in_chunks() {
    let server = MockServer::start().await;

    let slugs: Vec<String> = (1..=17).map(|i| format!("car-ID{}", i)).collect();
    let hrefs: Vec<String> = slugs
        .iter()
        .map(|s| format!("/osobowe/oferta/{}.html", s))
        .collect();
    let (first, second) = hrefs.split_at(10);
    mount_results(&server, 1, first).await;
    mount_results(&server, 2, second).await;
    for slug in &slugs {
        mount_detail(&server, slug, DETAIL_PAGE).await;
    }

    let mut config = create_test_config(&server, 2);
    config.browser.enabled = false;

    let (records, summary) = harvest(config, DisabledLauncher).await.unwrap();

    assert_eq!(summary.pages_walked, 2);
    assert_eq!(summary.links_discovered, 17);
    assert_eq!(summary.chunks, 3);
    assert_eq!(records.len(), 17);
    assert!(records.iter().all(|r| r.vin() == STATIC_VIN));
}

#[tokio::test]
async fn test_blocked_results_page_still_continues() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/osobowe/"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    mount_results(&server, 2, &["/osobowe/oferta/late-ID9.html".to_string()]).await;
    mount_detail(&server, "late-ID9", DETAIL_PAGE).await;

    let mut config = create_test_config(&server, 2);
    config.browser.enabled = false;

    let (records, summary) = harvest(config, DisabledLauncher).await.unwrap();

    assert_eq!(summary.pages_walked, 2);
    assert_eq!(summary.empty_pages, 1);
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn test_sparse_listing_gets_defaults_and_json_output() {
    let server = MockServer::start().await;

    mount_results(&server, 1, &["/osobowe/oferta/bare-ID5.html".to_string()]).await;
    mount_detail(
        &server,
        "bare-ID5",
        "<html><body><h1>Polonez Caro</h1><span class=\"offer-price__number\">7 500</span></body></html>",
    )
    .await;

    let mut config = create_test_config(&server, 1);
    config.browser.enabled = false;
    let (records, summary) = harvest(config, DisabledLauncher).await.unwrap();

    assert_eq!(summary.records_without_vin, 1);
    let record = &records[0];
    assert_eq!(record.full_name(), "Polonez Caro");
    assert_eq!(record.price(), 7500);
    assert_eq!(record.vin(), UNKNOWN);
    assert_eq!(record.year(), 0);
    assert_eq!(record.new_used(), "used");

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("listings.json");
    write_json(&transform_all(&records), &output).unwrap();

    let text = std::fs::read_to_string(&output).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    let listing = &json[0];
    assert_eq!(listing["title"], "Polonez Caro");
    assert_eq!(listing["category_id"], 29);
    assert_eq!(listing["params"]["country_origin"], "pl");
    assert_eq!(listing["params"]["price"]["1"], "7500");
    assert!(listing["params"]["metallic"].is_null());
}

#[tokio::test]
async fn test_flaky_browser_is_retried() {
    let server = MockServer::start().await;

    mount_results(&server, 1, &["/osobowe/oferta/bmw-ID7.html".to_string()]).await;
    mount_detail(&server, "bmw-ID7", DETAIL_PAGE).await;

    let url = detail_url(&server, "bmw-ID7");
    let mut pages = HashMap::new();
    pages.insert(
        url.clone(),
        PageScript {
            failing_navigations: 2,
            ..PageScript::revealing("WBA8E9C50GK123456")
        },
    );

    let config = create_test_config(&server, 1);
    let harvester = Harvester::new(config, ScriptedLauncher::new(pages)).unwrap();
    let (records, _) = harvester.run().await;

    assert_eq!(records[0].vin(), "WBA8E9C50GK123456");
    assert_eq!(harvester.launcher().navigations(&url), 3);
    assert_eq!(harvester.launcher().opened(), 3);
    assert_eq!(harvester.launcher().closed(), 3);
}
