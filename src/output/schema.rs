//! Output wire schema
//!
//! Maps a `ListingRecord` onto the fixed-key document the listing importer
//! consumes. The mapping is pure: the same record always produces the same
//! document.

use crate::record::{is_unknown, ListingRecord};
use crate::site::strip_non_digits;
use serde::Serialize;

/// Vehicle category of passenger cars in the importer's taxonomy
pub const CATEGORY_ID: u32 = 29;

/// Country code used when the origin is not known
pub const DEFAULT_COUNTRY: &str = "pl";

const AFFIRMATIVE: &str = "tak";
const NEW_TOKEN: &str = "nowy";

/// One listing in the output schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputListing {
    pub params: OutputParams,
    pub title: String,
    pub description: String,
    pub new_used: String,
    pub category_id: u32,
    pub url: String,
    pub price_indicator: String,
    pub price_range: String,
}

/// Vehicle parameters block
///
/// Feature flags without evidence on the page (`antilock_brake_system`,
/// `apple_carplay`, `metallic`) stay `None` and serialize as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputParams {
    pub door_count: String,
    pub vin: String,
    pub make: String,
    pub model: String,
    pub is_imported_car: u8,
    pub fuel_type: String,
    pub no_accident: u8,
    pub body_type: String,
    pub mileage: String,
    pub color: String,
    pub year: String,
    pub price: OutputPrice,
    pub engine_capacity: String,
    pub engine_power: u32,
    pub gearbox: String,
    pub transmission: String,
    pub antilock_brake_system: Option<u8>,
    pub apple_carplay: Option<u8>,
    pub metallic: Option<u8>,
    pub country_origin: String,
    pub date_registration: String,
    pub has_registration: u8,
    pub cepik_authorization: u8,
}

/// Price block, serialized as `{"0": "price", "1": "<amount>", ...}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputPrice {
    #[serde(rename = "0")]
    pub kind: String,
    #[serde(rename = "1")]
    pub amount: String,
    pub currency: String,
    pub gross_net: String,
}

/// Lower-cased value, empty for the sentinel
fn lowered(value: &str) -> String {
    if is_unknown(value) {
        String::new()
    } else {
        value.to_lowercase()
    }
}

/// Digits only, empty for the sentinel
fn digits(value: &str) -> String {
    if is_unknown(value) {
        String::new()
    } else {
        strip_non_digits(value)
    }
}

/// Maps a record to the output schema
pub fn transform(record: &ListingRecord) -> OutputListing {
    let country_origin = if is_unknown(record.country_origin()) {
        DEFAULT_COUNTRY.to_string()
    } else {
        record.country_origin().to_lowercase()
    };

    let date_registration = if is_unknown(record.registration_date_history()) {
        record.date_registration()
    } else {
        record.registration_date_history()
    };

    let no_accident = u8::from(record.no_accident().eq_ignore_ascii_case(AFFIRMATIVE));

    let new_used = if record.new_used().to_lowercase() == NEW_TOKEN {
        "new"
    } else {
        "used"
    };

    OutputListing {
        params: OutputParams {
            door_count: record.door_count().to_string(),
            vin: record.vin().to_string(),
            make: lowered(record.make()),
            model: lowered(record.model()),
            is_imported_car: 0,
            fuel_type: lowered(record.fuel_type()),
            no_accident,
            body_type: record.body_type().to_string(),
            mileage: digits(record.mileage()),
            color: record.color().to_string(),
            year: record.year().to_string(),
            price: OutputPrice {
                kind: "price".to_string(),
                amount: record.price().to_string(),
                currency: "PLN".to_string(),
                gross_net: "gross".to_string(),
            },
            engine_capacity: digits(record.engine_capacity()),
            engine_power: record.engine_power(),
            gearbox: record.gearbox().to_string(),
            transmission: record.transmission().to_string(),
            antilock_brake_system: None,
            apple_carplay: None,
            metallic: None,
            country_origin,
            date_registration: date_registration.to_string(),
            has_registration: 1,
            cepik_authorization: 1,
        },
        title: record.full_name().to_string(),
        description: record.description().to_string(),
        new_used: new_used.to_string(),
        category_id: CATEGORY_ID,
        url: record.link().to_string(),
        price_indicator: record.price_indicator().to_string(),
        price_range: record.price_range().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ListingDraft;

    const LINK: &str = "https://www.otomoto.pl/osobowe/oferta/skoda-octavia-ID6Fq1.html";

    fn record(draft: ListingDraft) -> ListingRecord {
        draft.finish(LINK)
    }

    fn full_draft() -> ListingDraft {
        ListingDraft {
            full_name: Some("Skoda Octavia 1.5 TSI Style".to_string()),
            description: Some("Pierwszy właściciel.".to_string()),
            year: Some(2021),
            mileage: Some("54 300 km".to_string()),
            engine_capacity: Some("1 498 cm3".to_string()),
            fuel_type: Some("Benzyna".to_string()),
            price: Some(94_900),
            make: Some("Skoda".to_string()),
            model: Some("Octavia".to_string()),
            engine_power: Some(150),
            no_accident: Some("Tak".to_string()),
            country_origin: Some("Polska".to_string()),
            new_used: Some("Używane".to_string()),
            date_registration: Some("2021-03-01".to_string()),
            registration_date_history: Some("2021-03-15".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_transform_normalizes_values() {
        let output = transform(&record(full_draft()));

        assert_eq!(output.params.make, "skoda");
        assert_eq!(output.params.model, "octavia");
        assert_eq!(output.params.fuel_type, "benzyna");
        assert_eq!(output.params.country_origin, "polska");
        assert_eq!(output.params.mileage, "54300");
        assert_eq!(output.params.engine_capacity, "1498");
        assert_eq!(output.params.year, "2021");
        assert_eq!(output.params.price.amount, "94900");
        assert_eq!(output.params.engine_power, 150);
        assert_eq!(output.params.no_accident, 1);
        assert_eq!(output.params.date_registration, "2021-03-15");
        assert_eq!(output.new_used, "used");
        assert_eq!(output.category_id, 29);
    }

    #[test]
    fn test_no_accident_encoding() {
        for (value, expected) in [("Tak", 1), ("TAK", 1), ("Nie", 0), ("", 0)] {
            let draft = ListingDraft {
                no_accident: Some(value.to_string()),
                ..Default::default()
            };
            let output = transform(&record(draft));
            assert_eq!(output.params.no_accident, expected, "{:?}", value);
        }
    }

    #[test]
    fn test_new_used_classification() {
        let draft = ListingDraft {
            new_used: Some("Nowy".to_string()),
            ..Default::default()
        };
        assert_eq!(transform(&record(draft)).new_used, "new");

        assert_eq!(transform(&record(ListingDraft::default())).new_used, "used");
    }

    #[test]
    fn test_sentinels_map_to_output_defaults() {
        let output = transform(&record(ListingDraft::default()));

        assert_eq!(output.params.make, "");
        assert_eq!(output.params.model, "");
        assert_eq!(output.params.fuel_type, "");
        assert_eq!(output.params.mileage, "");
        assert_eq!(output.params.engine_capacity, "");
        assert_eq!(output.params.country_origin, DEFAULT_COUNTRY);
        assert_eq!(output.params.no_accident, 0);
        assert_eq!(output.params.date_registration, "unknown");
        assert_eq!(output.params.vin, "unknown");
        assert_eq!(output.params.year, "0");
    }

    #[test]
    fn test_registration_falls_back_to_first_registration() {
        let draft = ListingDraft {
            date_registration: Some("05/2018".to_string()),
            ..Default::default()
        };
        let output = transform(&record(draft));
        assert_eq!(output.params.date_registration, "05/2018");
    }

    #[test]
    fn test_evidence_free_flags_are_null() {
        let json = serde_json::to_value(transform(&record(full_draft()))).unwrap();
        let params = &json["params"];

        assert!(params["antilock_brake_system"].is_null());
        assert!(params["apple_carplay"].is_null());
        assert!(params["metallic"].is_null());
        assert_eq!(params["has_registration"], 1);
        assert_eq!(params["price"]["0"], "price");
        assert_eq!(params["price"]["1"], "94900");
        assert_eq!(params["price"]["currency"], "PLN");
        assert_eq!(json["url"], LINK);
    }

    #[test]
    fn test_transform_is_idempotent() {
        let record = record(full_draft());
        assert_eq!(transform(&record), transform(&record));
    }
}
