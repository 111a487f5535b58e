//! Site adapters
//!
//! The harvesting pipeline never hard-codes selectors. Everything it needs
//! to know about one marketplace's markup goes through `SiteAdapter`:
//! - where the search result pages live and how to pull detail links out
//! - keyed lookups and the legacy label/value table on detail pages
//! - the ordered sources each record field is read from
//! - the selectors driving the interactive VIN reveal
//!
//! Adapters are synchronous and operate on an already parsed `scraper::Html`.

mod otomoto;

pub use otomoto::OtomotoAdapter;

use crate::record::PriceIndicator;
use regex::Regex;
use scraper::{ElementRef, Html};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Label → value pairs from the older markup shape, labels lower-cased
pub type LegacyTable = HashMap<String, String>;

/// Record fields that are resolved through a fallback chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Make,
    Model,
    DoorCount,
    BodyType,
    Color,
    Gearbox,
    DateRegistration,
    Transmission,
    NoAccident,
    CountryOrigin,
    NewUsed,
    RegistrationDateHistory,
    EnginePower,
    Year,
    Vin,
}

impl Field {
    /// Every chained field
    pub const ALL: [Field; 15] = [
        Field::Make,
        Field::Model,
        Field::DoorCount,
        Field::BodyType,
        Field::Color,
        Field::Gearbox,
        Field::DateRegistration,
        Field::Transmission,
        Field::NoAccident,
        Field::CountryOrigin,
        Field::NewUsed,
        Field::RegistrationDateHistory,
        Field::EnginePower,
        Field::Year,
        Field::Vin,
    ];
}

/// One place a field value can be read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Block whose identifying attribute equals the key
    Keyed(&'static str),
    /// Entry of the legacy table under this (lower-case) label
    Legacy(&'static str),
    /// The dedicated static VIN block
    StaticVin,
}

/// Spec-list values that are recognized by their text rather than a key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecSummary {
    pub mileage: Option<String>,
    pub engine_capacity: Option<String>,
    pub fuel_type: Option<String>,
}

/// Selectors and labels driving the interactive VIN reveal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealTarget {
    /// Cookie-consent button, clicked when present
    pub consent_selector: String,
    /// Where the value sits when it is rendered without interaction
    pub visible_selector: String,
    /// Elements searched for the reveal control
    pub control_selector: String,
    /// Visible text of the reveal control
    pub control_label: String,
    /// Where the value appears after activation
    pub revealed_selector: String,
}

/// Site-specific extraction primitives consumed by the pipeline
pub trait SiteAdapter: Send + Sync {
    /// Search result page `page` (1-based)
    fn listing_url(&self, page: u32) -> String;

    /// Detail links on a search result page, in document order
    fn extract_links(&self, doc: &Html) -> Vec<String>;

    /// Keyed lookup: value of the block identified by `key`
    fn lookup_by_key(&self, doc: &Html, key: &str) -> Option<String>;

    /// Legacy label/value table
    fn legacy_table(&self, doc: &Html) -> LegacyTable;

    /// Value of the dedicated static VIN block
    fn static_vin(&self, doc: &Html) -> Option<String>;

    fn title(&self, doc: &Html) -> Option<String>;

    fn description(&self, doc: &Html) -> Option<String>;

    /// Raw text of the primary price element
    fn price_text(&self, doc: &Html) -> Option<String>;

    fn spec_summary(&self, doc: &Html) -> SpecSummary;

    /// Indicator label text together with the parsed indicator
    fn price_indicator(&self, doc: &Html) -> Option<(String, PriceIndicator)>;

    /// Ordered sources for a field; the first one yielding a value wins
    fn chain(&self, field: Field) -> &'static [Source];

    fn reveal_target(&self) -> RevealTarget;
}

/// A parsed detail page bound to the adapter that understands it
///
/// Builds the legacy table once so every chain can consult it cheaply.
pub struct DetailDocument<'a> {
    adapter: &'a dyn SiteAdapter,
    doc: &'a Html,
    legacy: LegacyTable,
}

impl<'a> DetailDocument<'a> {
    pub fn new(adapter: &'a dyn SiteAdapter, doc: &'a Html) -> Self {
        let legacy = adapter.legacy_table(doc);
        Self {
            adapter,
            doc,
            legacy,
        }
    }

    /// Reads a single source
    pub fn read(&self, source: Source) -> Option<String> {
        let value = match source {
            Source::Keyed(key) => self.adapter.lookup_by_key(self.doc, key),
            Source::Legacy(label) => self.legacy.get(label).cloned(),
            Source::StaticVin => self.adapter.static_vin(self.doc),
        };
        value.filter(|v| !v.trim().is_empty())
    }

    /// Walks the field's chain and returns the first value found
    pub fn resolve(&self, field: Field) -> Option<String> {
        let chain = self.adapter.chain(field);
        first_success(chain.iter().map(|source| self.read(*source)))
    }

    /// Walks the field's chain and returns the first value that parses
    ///
    /// A source whose text does not parse does not end the chain.
    pub fn resolve_with<T, F>(&self, field: Field, parse: F) -> Option<T>
    where
        F: Fn(&str) -> Option<T>,
    {
        self.adapter
            .chain(field)
            .iter()
            .filter_map(|source| self.read(*source))
            .find_map(|text| parse(&text))
    }
}

/// First present, non-blank candidate
///
/// Candidates are produced lazily, so later strategies are not evaluated
/// once one succeeds.
pub fn first_success<I>(candidates: I) -> Option<String>
where
    I: IntoIterator<Item = Option<String>>,
{
    candidates
        .into_iter()
        .flatten()
        .find(|value| !value.trim().is_empty())
}

/// Concatenated, trimmed text of an element
pub fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn digit_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("valid digit pattern"))
}

fn year_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{4}").expect("valid year pattern"))
}

fn price_range_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d[\d\s]*\d)\s*-\s*(\d[\d\s]*\d)\s*PLN").expect("valid price range pattern")
    })
}

/// First run of digits, parsed
pub fn first_digit_run(text: &str) -> Option<u32> {
    digit_run().find(text)?.as_str().parse().ok()
}

/// First run of four digits, parsed as a year
pub fn first_year(text: &str) -> Option<u32> {
    year_run().find(text)?.as_str().parse().ok()
}

/// Keeps only the ASCII digits of `text`
pub fn strip_non_digits(text: &str) -> String {
    text.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Parses an amount such as `"125 900 PLN"`; 0 when there are no digits
pub fn parse_amount(text: &str) -> u64 {
    strip_non_digits(text).parse().unwrap_or(0)
}

fn without_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Price band rendered in the static page text, e.g. `"85 000 - 95 000 PLN"`
///
/// Most pages only render the band client-side, so this usually finds
/// nothing.
pub fn extract_price_range_text(doc: &Html) -> Option<String> {
    let pattern = price_range_pattern();

    doc.root_element().text().find_map(|node| {
        let captures = pattern.captures(node)?;
        Some(format!(
            "{}-{} PLN",
            without_whitespace(&captures[1]),
            without_whitespace(&captures[2])
        ))
    })
}
