//! Price range estimation
//!
//! The marketplace only says whether a price is above, below or inside its
//! market estimate. The band itself is inferred from fixed offsets around
//! the listing price.

use crate::record::{EstimatedRange, PriceIndicator};

/// Estimates the market price band for a listing
///
/// | Indicator | Band |
/// |-----------|------|
/// | ABOVE | `[0.85 * price, price]` |
/// | BELOW | `[price, 1.15 * price]` |
/// | IN | `[0.90 * price, 1.10 * price]` |
/// | NONE | none |
///
/// A zero price means the page had no usable price, so no band is produced.
/// Percentages are applied in integer arithmetic and truncated.
pub fn estimate(price: u64, indicator: PriceIndicator) -> Option<EstimatedRange> {
    if price == 0 {
        return None;
    }

    let percent = |p: u64| price.saturating_mul(p) / 100;

    match indicator {
        PriceIndicator::Above => Some(EstimatedRange {
            lower: percent(85),
            upper: price,
        }),
        PriceIndicator::Below => Some(EstimatedRange {
            lower: price,
            upper: percent(115),
        }),
        PriceIndicator::In => Some(EstimatedRange {
            lower: percent(90),
            upper: percent(110),
        }),
        PriceIndicator::None => None,
    }
}
