//! Raw listing to canonical record transformation

use crate::{
    constants::LOGO_URL_TEMPLATE,
    format::{format_currency, format_price, format_supply, round_percent},
    types::{CanonicalRecord, ChangeEstimate, RawListing, WindowValues},
};
use std::collections::HashMap;

/// Maps listings to canonical records, preserving input order
///
/// Short-window figures come from `estimates[symbol]`; when a symbol has no
/// estimate they are derived from the listing's own 1h/24h quote with the
/// same formulas. `index` is `start_index + position`.
pub fn transform(
    listings: &[RawListing],
    estimates: &HashMap<String, ChangeEstimate>,
    start_index: u64,
    convert: &str,
) -> Vec<CanonicalRecord> {
    listings
        .iter()
        .enumerate()
        .map(|(position, listing)| {
            let estimate = estimates.get(&listing.symbol.to_uppercase()).copied();
            to_record(listing, estimate, start_index + position as u64, convert)
        })
        .collect()
}

/// Logo URL for an upstream id
pub fn logo_url(id: u64) -> String {
    LOGO_URL_TEMPLATE.replace("{id}", &id.to_string())
}

fn to_record(
    listing: &RawListing,
    estimate: Option<ChangeEstimate>,
    index: u64,
    convert: &str,
) -> CanonicalRecord {
    let quote = listing.quote_in(convert);

    let estimate = estimate.unwrap_or_else(|| {
        ChangeEstimate::from_observed(
            quote.percent_change_1h.unwrap_or_default(),
            quote.percent_change_24h.unwrap_or_default(),
        )
    });

    let raw = WindowValues {
        m5: estimate.m5,
        h1: estimate.h1,
        h6: estimate.h6,
        h24: estimate.h24,
        d7: quote.percent_change_7d.unwrap_or_default(),
        d30: quote.percent_change_30d.unwrap_or_default(),
    };

    let price = quote.price.unwrap_or_default();
    let market_cap = quote.market_cap.unwrap_or_default();
    let volume_24h = quote.volume_24h.unwrap_or_default();
    let circulating_supply = listing.circulating_supply.unwrap_or_default();

    CanonicalRecord {
        id: listing.id,
        name: listing.name.clone(),
        symbol: listing.symbol.clone(),
        slug: listing.slug.clone(),
        logo: logo_url(listing.id),
        price,
        price_formatted: format_price(price),
        market_cap,
        market_cap_formatted: format_currency(market_cap),
        volume_24h,
        volume_24h_formatted: format_currency(volume_24h),
        circulating_supply,
        circulating_supply_formatted: format_supply(circulating_supply, &listing.symbol),
        total_supply: listing.total_supply.unwrap_or_default(),
        max_supply: listing.max_supply,
        percent_change: raw.map(round_percent),
        raw_percent_change: raw,
        index,
    }
}
