//! Adapter for otomoto.pl listing markup

use super::{element_text, Field, LegacyTable, RevealTarget, SiteAdapter, Source, SpecSummary};
use crate::record::PriceIndicator;
use crate::ParseError;
use scraper::{Html, Selector};
use url::Url;

/// Fuel names recognized among the parameter labels
const FUEL_TYPES: &[&str] = &["benzyna", "diesel", "hybryda", "elektryczny", "lpg", "cng"];

const INDICATOR_PREFIX: &str = "price-indicator-label-";

struct Selectors {
    article: Selector,
    anchor: Selector,
    paragraph: Selector,
    title: Selector,
    description: Selector,
    price_primary: Selector,
    price_secondary: Selector,
    spec_label: Selector,
    legacy_item: Selector,
    legacy_label: Selector,
    legacy_value: Selector,
    static_vin: Selector,
    price_indicator: Selector,
}

fn parse(css: &str) -> Result<Selector, ParseError> {
    Selector::parse(css).map_err(|_| ParseError::Selector {
        selector: css.to_string(),
    })
}

impl Selectors {
    fn new() -> Result<Self, ParseError> {
        Ok(Self {
            article: parse("article")?,
            anchor: parse("a[href]")?,
            paragraph: parse("p")?,
            title: parse("h1")?,
            description: parse(r#"div[data-testid="content-description-section"]"#)?,
            price_primary: parse("span.offer-price__number")?,
            price_secondary: parse(".offer-price")?,
            spec_label: parse(r#"p[class*="ooa-11fwepm"]"#)?,
            legacy_item: parse("div.offer-params__item")?,
            legacy_label: parse("span.offer-params__label")?,
            legacy_value: parse("div.offer-params__value")?,
            static_vin: parse(r#"div[data-testid="advert-vin"]"#)?,
            price_indicator: parse(r#"p[data-testid^="price-indicator-label-"]"#)?,
        })
    }
}

/// otomoto.pl search results and detail pages
pub struct OtomotoAdapter {
    base_url: Url,
    listing_marker: String,
    selectors: Selectors,
}

impl OtomotoAdapter {
    /// Creates an adapter for the given search root
    ///
    /// # Arguments
    ///
    /// * `base_url` - Search results root, e.g. `https://www.otomoto.pl/osobowe`
    /// * `listing_marker` - Path fragment every detail link contains
    pub fn new(base_url: Url, listing_marker: impl Into<String>) -> Result<Self, ParseError> {
        Ok(Self {
            base_url,
            listing_marker: listing_marker.into(),
            selectors: Selectors::new()?,
        })
    }

    /// Resolves an href against the site and keeps it only if it is a listing
    fn resolve_listing_link(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty() {
            return None;
        }

        let link = if href.starts_with("http") {
            href.to_string()
        } else {
            self.base_url.join(href).ok()?.to_string()
        };

        link.contains(&self.listing_marker).then_some(link)
    }
}

impl SiteAdapter for OtomotoAdapter {
    fn listing_url(&self, page: u32) -> String {
        format!(
            "{}/?page={}",
            self.base_url.as_str().trim_end_matches('/'),
            page
        )
    }

    fn extract_links(&self, doc: &Html) -> Vec<String> {
        doc.select(&self.selectors.article)
            .filter_map(|article| article.select(&self.selectors.anchor).next())
            .filter_map(|anchor| anchor.value().attr("href"))
            .filter_map(|href| self.resolve_listing_link(href))
            .collect()
    }

    fn lookup_by_key(&self, doc: &Html, key: &str) -> Option<String> {
        let block_selector = Selector::parse(&format!(r#"div[data-testid="{}"]"#, key)).ok()?;
        let block = doc.select(&block_selector).next()?;

        // The first paragraph is the label, the last one holds the value
        let paragraphs: Vec<_> = block.select(&self.selectors.paragraph).collect();
        if paragraphs.len() < 2 {
            return None;
        }

        paragraphs.last().map(|p| element_text(*p))
    }

    fn legacy_table(&self, doc: &Html) -> LegacyTable {
        let mut table = LegacyTable::new();

        for item in doc.select(&self.selectors.legacy_item) {
            let label = item.select(&self.selectors.legacy_label).next();
            let value = item.select(&self.selectors.legacy_value).next();

            if let (Some(label), Some(value)) = (label, value) {
                table.insert(element_text(label).to_lowercase(), element_text(value));
            }
        }

        table
    }

    fn static_vin(&self, doc: &Html) -> Option<String> {
        let block = doc.select(&self.selectors.static_vin).next()?;
        let paragraph = block.select(&self.selectors.paragraph).next()?;
        Some(element_text(paragraph)).filter(|vin| !vin.is_empty())
    }

    fn title(&self, doc: &Html) -> Option<String> {
        doc.select(&self.selectors.title)
            .next()
            .map(element_text)
            .filter(|s| !s.is_empty())
    }

    fn description(&self, doc: &Html) -> Option<String> {
        let section = doc.select(&self.selectors.description).next()?;
        let text = section
            .select(&self.selectors.paragraph)
            .map(element_text)
            .collect::<Vec<_>>()
            .join("\n");
        Some(text)
    }

    fn price_text(&self, doc: &Html) -> Option<String> {
        doc.select(&self.selectors.price_primary)
            .next()
            .or_else(|| doc.select(&self.selectors.price_secondary).next())
            .map(element_text)
    }

    fn spec_summary(&self, doc: &Html) -> SpecSummary {
        let mut summary = SpecSummary::default();

        for label in doc.select(&self.selectors.spec_label) {
            let text: String = label.text().map(str::trim).collect();

            if text.contains("km") {
                summary.mileage = Some(text);
            } else if text.contains("cm3") {
                summary.engine_capacity = Some(text);
            } else if FUEL_TYPES.contains(&text.to_lowercase().as_str()) {
                summary.fuel_type = Some(text);
            }
        }

        summary
    }

    fn price_indicator(&self, doc: &Html) -> Option<(String, PriceIndicator)> {
        let tag = doc.select(&self.selectors.price_indicator).next()?;
        let label = element_text(tag);

        let indicator = tag
            .value()
            .attr("data-testid")
            .and_then(|id| id.strip_prefix(INDICATOR_PREFIX))
            .map(|suffix| {
                let word: String = suffix
                    .chars()
                    .take_while(|c| c.is_alphanumeric() || *c == '_')
                    .collect();
                PriceIndicator::from_label(&word)
            })
            .unwrap_or(PriceIndicator::None);

        Some((label, indicator))
    }

    fn chain(&self, field: Field) -> &'static [Source] {
        use Source::{Keyed, Legacy, StaticVin};

        match field {
            Field::Make => &[Keyed("make")],
            Field::Model => &[Keyed("model")],
            Field::DoorCount => &[Keyed("door_count"), Legacy("liczba drzwi")],
            Field::BodyType => &[Keyed("body_type"), Legacy("nadwozie")],
            Field::Color => &[Keyed("color"), Legacy("kolor")],
            Field::Gearbox => &[Keyed("gearbox"), Legacy("skrzynia biegów")],
            Field::DateRegistration => {
                &[Keyed("first_registration"), Legacy("pierwsza rejestracja")]
            }
            Field::Transmission => &[Keyed("transmission"), Legacy("napęd")],
            Field::NoAccident => &[Keyed("no_accident")],
            Field::CountryOrigin => &[Keyed("country_origin")],
            Field::NewUsed => &[Keyed("new_used")],
            Field::RegistrationDateHistory => &[Keyed("date_registration")],
            Field::EnginePower => &[Keyed("engine_power"), Legacy("moc")],
            Field::Year => &[Keyed("year"), Legacy("rok produkcji")],
            Field::Vin => &[StaticVin, Keyed("vin"), Legacy("vin")],
        }
    }

    fn reveal_target(&self) -> RevealTarget {
        RevealTarget {
            consent_selector: "button#onetrust-accept-btn-handler".to_string(),
            visible_selector: "div[data-testid='vin'] div[data-testid='advert-vin'] p".to_string(),
            control_selector: "button".to_string(),
            control_label: "Wyświetl VIN".to_string(),
            revealed_selector: "div[data-testid='advert-vin'] p".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::DetailDocument;

    fn adapter() -> OtomotoAdapter {
        OtomotoAdapter::new(
            Url::parse("https://www.otomoto.pl/osobowe").unwrap(),
            "/oferta/",
        )
        .unwrap()
    }

    fn doc(body: &str) -> Html {
        Html::parse_document(&format!("<html><body>{}</body></html>", body))
    }

    #[test]
    fn test_listing_url() {
        assert_eq!(
            adapter().listing_url(3),
            "https://www.otomoto.pl/osobowe/?page=3"
        );
    }

    #[test]
    fn test_extract_links_resolves_and_filters() {
        let html = doc(r#"
            <article><a href="/osobowe/oferta/audi-a4-ID1.html">Audi</a><a href="/other">x</a></article>
            <article><a href="https://www.otomoto.pl/osobowe/oferta/bmw-ID2.html">BMW</a></article>
            <article><a href="/promo/banner">Promo</a></article>
            <article><span>no anchor</span></article>
            <a href="/osobowe/oferta/outside-article.html">Outside</a>
        "#);

        let links = adapter().extract_links(&html);
        assert_eq!(
            links,
            vec![
                "https://www.otomoto.pl/osobowe/oferta/audi-a4-ID1.html".to_string(),
                "https://www.otomoto.pl/osobowe/oferta/bmw-ID2.html".to_string(),
            ]
        );
    }

    #[test]
    fn test_extract_links_keeps_duplicates() {
        let html = doc(r#"
            <article><a href="/oferta/a">A</a></article>
            <article><a href="/oferta/a">A again</a></article>
        "#);

        assert_eq!(adapter().extract_links(&html).len(), 2);
    }

    #[test]
    fn test_lookup_by_key_takes_last_paragraph() {
        let html = doc(r#"
            <div data-testid="make"><p>Marka pojazdu</p><div><p>Skoda</p></div></div>
            <div data-testid="model"><p>Octavia</p></div>
        "#);

        let adapter = adapter();
        assert_eq!(
            adapter.lookup_by_key(&html, "make"),
            Some("Skoda".to_string())
        );
        // A single paragraph is only the label
        assert_eq!(adapter.lookup_by_key(&html, "model"), None);
        assert_eq!(adapter.lookup_by_key(&html, "color"), None);
    }

    #[test]
    fn test_legacy_table_lowercases_labels() {
        let html = doc(r#"
            <div class="offer-params__item">
                <span class="offer-params__label">Kolor</span>
                <div class="offer-params__value"> Czarny </div>
            </div>
            <div class="offer-params__item">
                <span class="offer-params__label">Rok produkcji</span>
                <div class="offer-params__value">2016</div>
            </div>
            <div class="offer-params__item"><span class="offer-params__label">Orphan</span></div>
        "#);

        let table = adapter().legacy_table(&html);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("kolor"), Some(&"Czarny".to_string()));
        assert_eq!(table.get("rok produkcji"), Some(&"2016".to_string()));
    }

    #[test]
    fn test_static_vin() {
        let html = doc(r#"<div data-testid="advert-vin"><p>WVWZZZ1JZXW000001</p></div>"#);
        assert_eq!(
            adapter().static_vin(&html),
            Some("WVWZZZ1JZXW000001".to_string())
        );

        let empty = doc(r#"<div data-testid="advert-vin"><p>  </p></div>"#);
        assert_eq!(adapter().static_vin(&empty), None);
    }

    #[test]
    fn test_price_text_fallback() {
        let primary = doc(
            r#"<span class="offer-price__number">89 900</span><div class="offer-price">1</div>"#,
        );
        assert_eq!(adapter().price_text(&primary), Some("89 900".to_string()));

        let secondary = doc(r#"<div class="offer-price">45 000 PLN</div>"#);
        assert_eq!(
            adapter().price_text(&secondary),
            Some("45 000 PLN".to_string())
        );

        assert_eq!(adapter().price_text(&doc("")), None);
    }

    #[test]
    fn test_spec_summary() {
        let html = doc(r#"
            <p class="ooa-11fwepm e1">120 000 km</p>
            <p class="ooa-11fwepm">1 598 cm3</p>
            <p class="x ooa-11fwepm">Diesel</p>
            <p class="ooa-11fwepm">Sedan</p>
        "#);

        let summary = adapter().spec_summary(&html);
        assert_eq!(summary.mileage, Some("120 000 km".to_string()));
        assert_eq!(summary.engine_capacity, Some("1 598 cm3".to_string()));
        assert_eq!(summary.fuel_type, Some("Diesel".to_string()));
    }

    #[test]
    fn test_price_indicator() {
        let html = doc(r#"<p data-testid="price-indicator-label-BELOW">Poniżej średniej</p>"#);
        assert_eq!(
            adapter().price_indicator(&html),
            Some(("Poniżej średniej".to_string(), PriceIndicator::Below))
        );

        let odd = doc(r#"<p data-testid="price-indicator-label-">Brak</p>"#);
        assert_eq!(
            adapter().price_indicator(&odd),
            Some(("Brak".to_string(), PriceIndicator::None))
        );

        assert_eq!(adapter().price_indicator(&doc("")), None);
    }

    #[test]
    fn test_every_field_has_a_chain() {
        let adapter = adapter();
        for field in Field::ALL {
            assert!(
                !adapter.chain(field).is_empty(),
                "{:?} has no sources",
                field
            );
        }
        assert_eq!(adapter.chain(Field::Vin)[0], Source::StaticVin);
    }

    #[test]
    fn test_chain_falls_back_to_legacy_table() {
        let html = doc(r#"
            <div data-testid="color"><p>Kolor</p></div>
            <div class="offer-params__item">
                <span class="offer-params__label">Kolor</span>
                <div class="offer-params__value">Srebrny</div>
            </div>
            <div data-testid="body_type"><p>Typ nadwozia</p><p>Kombi</p></div>
            <div class="offer-params__item">
                <span class="offer-params__label">Nadwozie</span>
                <div class="offer-params__value">Sedan</div>
            </div>
        "#);

        let adapter = adapter();
        let detail = DetailDocument::new(&adapter, &html);
        assert_eq!(detail.resolve(Field::Color), Some("Srebrny".to_string()));
        assert_eq!(detail.resolve(Field::BodyType), Some("Kombi".to_string()));
        assert_eq!(detail.resolve(Field::Gearbox), None);
    }

    #[test]
    fn test_vin_chain_order() {
        let html = doc(r#"
            <div data-testid="vin"><p>VIN</p><p>KEYEDVIN000000000</p></div>
            <div class="offer-params__item">
                <span class="offer-params__label">VIN</span>
                <div class="offer-params__value">LEGACYVIN00000000</div>
            </div>
        "#);

        let adapter = adapter();
        let detail = DetailDocument::new(&adapter, &html);
        assert_eq!(
            detail.resolve(Field::Vin),
            Some("KEYEDVIN000000000".to_string())
        );
    }
}
