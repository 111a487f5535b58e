//! Canonical listing records
//!
//! A `ListingRecord` is assembled exactly once from a `ListingDraft`. The
//! draft collects whatever the detail page yielded; `finish` resolves every
//! missing attribute to its default so readers of a record never see an
//! absent value.

use std::fmt;

/// Stand-in for a string attribute the page did not provide
pub const UNKNOWN: &str = "unknown";

/// Default for `new_used` when the page does not say
pub const DEFAULT_NEW_USED: &str = "used";

/// Where the listing price sits relative to the marketplace estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceIndicator {
    Above,
    Below,
    In,
    None,
}

impl PriceIndicator {
    /// Parses the indicator suffix used in the markup (`ABOVE`, `BELOW`, `IN`)
    ///
    /// Anything unrecognized maps to `PriceIndicator::None`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "ABOVE" => Self::Above,
            "BELOW" => Self::Below,
            "IN" => Self::In,
            _ => Self::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Above => "ABOVE",
            Self::Below => "BELOW",
            Self::In => "IN",
            Self::None => "NONE",
        }
    }
}

impl fmt::Display for PriceIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Estimated price band derived from a price indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EstimatedRange {
    pub lower: u64,
    pub upper: u64,
}

impl fmt::Display for EstimatedRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{} PLN", self.lower, self.upper)
    }
}

/// Partially known listing, filled in field by field by the record builder
#[derive(Debug, Clone, Default)]
pub struct ListingDraft {
    pub full_name: Option<String>,
    pub description: Option<String>,
    pub year: Option<u32>,
    pub mileage: Option<String>,
    pub engine_capacity: Option<String>,
    pub fuel_type: Option<String>,
    pub price: Option<u64>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub door_count: Option<String>,
    pub vin: Option<String>,
    pub body_type: Option<String>,
    pub color: Option<String>,
    pub gearbox: Option<String>,
    pub engine_power: Option<u32>,
    pub date_registration: Option<String>,
    pub transmission: Option<String>,
    pub price_indicator: Option<String>,
    pub price_range: Option<String>,
    pub no_accident: Option<String>,
    pub country_origin: Option<String>,
    pub new_used: Option<String>,
    pub registration_date_history: Option<String>,
}

fn or_unknown(value: Option<String>) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

impl ListingDraft {
    /// Resolves every missing attribute and freezes the record
    pub fn finish(self, link: impl Into<String>) -> ListingRecord {
        ListingRecord {
            link: link.into(),
            full_name: or_unknown(self.full_name),
            description: self.description.unwrap_or_default(),
            year: self.year.unwrap_or(0),
            mileage: or_unknown(self.mileage),
            engine_capacity: or_unknown(self.engine_capacity),
            fuel_type: or_unknown(self.fuel_type),
            price: self.price.unwrap_or(0),
            make: or_unknown(self.make),
            model: or_unknown(self.model),
            door_count: or_unknown(self.door_count),
            vin: or_unknown(self.vin),
            body_type: or_unknown(self.body_type),
            color: or_unknown(self.color),
            gearbox: or_unknown(self.gearbox),
            engine_power: self.engine_power.unwrap_or(0),
            date_registration: or_unknown(self.date_registration),
            transmission: or_unknown(self.transmission),
            price_indicator: or_unknown(self.price_indicator),
            price_range: or_unknown(self.price_range),
            no_accident: or_unknown(self.no_accident),
            country_origin: or_unknown(self.country_origin),
            new_used: self
                .new_used
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_NEW_USED.to_string()),
            registration_date_history: or_unknown(self.registration_date_history),
        }
    }
}

/// One harvested listing, keyed by its source link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRecord {
    link: String,
    full_name: String,
    description: String,
    year: u32,
    mileage: String,
    engine_capacity: String,
    fuel_type: String,
    price: u64,
    make: String,
    model: String,
    door_count: String,
    vin: String,
    body_type: String,
    color: String,
    gearbox: String,
    engine_power: u32,
    date_registration: String,
    transmission: String,
    price_indicator: String,
    price_range: String,
    no_accident: String,
    country_origin: String,
    new_used: String,
    registration_date_history: String,
}

macro_rules! accessors {
    ($($name:ident: $ty:ty),* $(,)?) => {
        $(
            pub fn $name(&self) -> $ty {
                &self.$name
            }
        )*
    };
}

impl ListingRecord {
    accessors! {
        link: &str,
        full_name: &str,
        description: &str,
        mileage: &str,
        engine_capacity: &str,
        fuel_type: &str,
        make: &str,
        model: &str,
        door_count: &str,
        vin: &str,
        body_type: &str,
        color: &str,
        gearbox: &str,
        date_registration: &str,
        transmission: &str,
        price_indicator: &str,
        price_range: &str,
        no_accident: &str,
        country_origin: &str,
        new_used: &str,
        registration_date_history: &str,
    }

    /// Production year, 0 when unknown
    pub fn year(&self) -> u32 {
        self.year
    }

    /// Price in whole currency units, 0 when unknown
    pub fn price(&self) -> u64 {
        self.price
    }

    /// Engine power in horsepower, 0 when unknown
    pub fn engine_power(&self) -> u32 {
        self.engine_power
    }
}

/// Returns true if a string attribute holds the "absent" sentinel
pub fn is_unknown(value: &str) -> bool {
    value == UNKNOWN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_draft_resolves_defaults() {
        let record = ListingDraft::default().finish("https://example.com/oferta/1");

        assert_eq!(record.link(), "https://example.com/oferta/1");
        assert_eq!(record.full_name(), UNKNOWN);
        assert_eq!(record.year(), 0);
        assert_eq!(record.price(), 0);
        assert_eq!(record.engine_power(), 0);
        assert_eq!(record.new_used(), "used");

        for value in [
            record.mileage(),
            record.engine_capacity(),
            record.fuel_type(),
            record.make(),
            record.model(),
            record.door_count(),
            record.vin(),
            record.body_type(),
            record.color(),
            record.gearbox(),
            record.date_registration(),
            record.transmission(),
            record.price_indicator(),
            record.price_range(),
            record.no_accident(),
            record.country_origin(),
            record.registration_date_history(),
        ] {
            assert_eq!(value, UNKNOWN);
        }
    }

    #[test]
    fn test_supplied_values_are_kept() {
        let draft = ListingDraft {
            make: Some("Toyota".to_string()),
            year: Some(2019),
            price: Some(55_000),
            new_used: Some("Nowy".to_string()),
            ..Default::default()
        };
        let record = draft.finish("https://example.com/oferta/2");

        assert_eq!(record.make(), "Toyota");
        assert_eq!(record.year(), 2019);
        assert_eq!(record.price(), 55_000);
        assert_eq!(record.new_used(), "Nowy");
    }

    #[test]
    fn test_blank_strings_count_as_missing() {
        let draft = ListingDraft {
            color: Some("   ".to_string()),
            new_used: Some(String::new()),
            ..Default::default()
        };
        let record = draft.finish("https://example.com/oferta/3");

        assert_eq!(record.color(), UNKNOWN);
        assert_eq!(record.new_used(), DEFAULT_NEW_USED);
    }

    #[test]
    fn test_price_indicator_from_label() {
        assert_eq!(PriceIndicator::from_label("ABOVE"), PriceIndicator::Above);
        assert_eq!(PriceIndicator::from_label("below"), PriceIndicator::Below);
        assert_eq!(PriceIndicator::from_label("IN"), PriceIndicator::In);
        assert_eq!(PriceIndicator::from_label("NONE"), PriceIndicator::None);
        assert_eq!(PriceIndicator::from_label("garbage"), PriceIndicator::None);
    }

    #[test]
    fn test_estimated_range_display() {
        let range = EstimatedRange {
            lower: 90_000,
            upper: 110_000,
        };
        assert_eq!(range.to_string(), "90000-110000 PLN");
    }
}
