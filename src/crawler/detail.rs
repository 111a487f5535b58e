//! Detail record builder
//!
//! Turns one listing link into a `ListingRecord`:
//! 1. Fetch the detail page
//! 2. Read every static field through the adapter's fallback chains
//! 3. Try the interactive VIN reveal
//! 4. Estimate the price band from the price indicator
//!
//! Any failure drops the record; it never reaches the batch.

use crate::crawler::fetcher::Fetcher;
use crate::pricing::estimate;
use crate::record::{ListingDraft, ListingRecord, PriceIndicator};
use crate::reveal::{RevealExtractor, SessionLauncher};
use crate::site::{
    extract_price_range_text, first_digit_run, first_success, first_year, parse_amount,
    DetailDocument, Field, SiteAdapter,
};
use crate::ParseError;
use scraper::Html;
use std::sync::Arc;

/// Everything a detail page yields without a browser
#[derive(Debug, Clone, Default)]
pub struct StaticListing {
    pub draft: ListingDraft,
    /// First hit of the static VIN chain
    pub static_vin: Option<String>,
    pub indicator: Option<PriceIndicator>,
    /// Price band printed in the page text, if any
    pub printed_range: Option<String>,
}

impl StaticListing {
    /// Parses a detail page body
    ///
    /// # Returns
    ///
    /// * `Err(ParseError::EmptyDocument)` - The fetch gave up or the body is blank
    pub fn parse(adapter: &dyn SiteAdapter, url: &str, body: &str) -> Result<Self, ParseError> {
        if body.trim().is_empty() {
            return Err(ParseError::EmptyDocument {
                url: url.to_string(),
            });
        }

        let html = Html::parse_document(body);
        let doc = DetailDocument::new(adapter, &html);
        let spec = adapter.spec_summary(&html);
        let indicator = adapter.price_indicator(&html);

        let draft = ListingDraft {
            full_name: adapter.title(&html),
            description: adapter.description(&html),
            year: doc.resolve_with(Field::Year, first_year),
            mileage: spec.mileage,
            engine_capacity: spec.engine_capacity,
            fuel_type: spec.fuel_type,
            price: adapter.price_text(&html).map(|p| parse_amount(&p)),
            make: doc.resolve(Field::Make),
            model: doc.resolve(Field::Model),
            door_count: doc.resolve(Field::DoorCount),
            vin: None,
            body_type: doc.resolve(Field::BodyType),
            color: doc.resolve(Field::Color),
            gearbox: doc.resolve(Field::Gearbox),
            engine_power: doc.resolve_with(Field::EnginePower, first_digit_run),
            date_registration: doc.resolve(Field::DateRegistration),
            transmission: doc.resolve(Field::Transmission),
            price_indicator: indicator.as_ref().map(|(label, _)| label.clone()),
            price_range: None,
            no_accident: doc.resolve(Field::NoAccident),
            country_origin: doc.resolve(Field::CountryOrigin),
            new_used: doc.resolve(Field::NewUsed),
            registration_date_history: doc.resolve(Field::RegistrationDateHistory),
        };

        Ok(Self {
            draft,
            static_vin: doc.resolve(Field::Vin),
            indicator: indicator.map(|(_, kind)| kind),
            printed_range: extract_price_range_text(&html),
        })
    }

    /// Merges the revealed VIN and the price band, then freezes the record
    ///
    /// A revealed VIN always beats the static chain.
    pub fn finish(self, link: &str, revealed_vin: Option<String>) -> ListingRecord {
        let mut draft = self.draft;
        draft.vin = first_success([revealed_vin, self.static_vin]);

        let estimated = match (draft.price, self.indicator) {
            (Some(price), Some(indicator)) => estimate(price, indicator),
            _ => None,
        };
        draft.price_range = estimated
            .map(|range| range.to_string())
            .or(self.printed_range);

        draft.finish(link)
    }
}

/// Builds one record per link
pub struct DetailBuilder<L> {
    fetcher: Fetcher,
    adapter: Arc<dyn SiteAdapter>,
    reveal: RevealExtractor<L>,
}

impl<L: SessionLauncher> DetailBuilder<L> {
    pub fn new(
        fetcher: Fetcher,
        adapter: Arc<dyn SiteAdapter>,
        reveal: RevealExtractor<L>,
    ) -> Self {
        Self {
            fetcher,
            adapter,
            reveal,
        }
    }

    pub fn reveal(&self) -> &RevealExtractor<L> {
        &self.reveal
    }

    /// Builds the record for `url`, `None` if the page could not be used
    pub async fn build(&self, url: &str) -> Option<ListingRecord> {
        match self.try_build(url).await {
            Ok(record) => {
                tracing::debug!("Built record for {}", url);
                Some(record)
            }
            Err(e) => {
                tracing::error!("Dropping {}: {}", url, e);
                None
            }
        }
    }

    async fn try_build(&self, url: &str) -> Result<ListingRecord, ParseError> {
        let body = self.fetcher.fetch(url).await.into_text();
        let listing = StaticListing::parse(self.adapter.as_ref(), url, &body)?;

        let revealed_vin = self.reveal.reveal(url).await;

        Ok(listing.finish(url, revealed_vin))
    }
}
