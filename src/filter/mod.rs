//! Turns the accumulated dataset into the short list worth reading:
//! threshold filtering, derived price-per-m², price-sorted output.

use crate::config::FilterConfig;
use crate::models::Listing;

/// Keep only rows meeting every configured threshold. A row missing a value
/// a threshold needs is dropped rather than given the benefit of the doubt.
pub fn filter_listings(rows: &[Listing], config: &FilterConfig) -> Vec<Listing> {
    rows.iter()
        .filter(|row| {
            row.price.is_some_and(|p| p <= config.max_price)
                && row.nr_rooms.is_some_and(|n| n >= config.min_rooms)
                && row.size_m2.is_some_and(|s| s >= config.min_size_m2)
                && row
                    .dist_to_station
                    .is_some_and(|d| d <= config.max_dist_to_station_km)
        })
        .cloned()
        .collect()
}

/// Final touches before the report is written: derive price per m² where
/// both inputs exist and order by price, cheapest first, priceless rows last.
pub fn finalize(mut rows: Vec<Listing>) -> Vec<Listing> {
    for row in &mut rows {
        // full-precision quotient; rounding is for display only
        row.price_per_m2 = match (row.price, row.size_m2) {
            (Some(price), Some(size)) if size > 0 => {
                Some(f64::from(price) / f64::from(size))
            }
            _ => None,
        };
    }
    rows.sort_by_key(|row| (row.price.is_none(), row.price));
    rows
}

// ── Tests ─────────────────────────────────────────────────────────────────────
