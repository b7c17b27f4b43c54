//! Numeric coercion of the harvested raw fields.
//!
//! Cleaning order for a present value: drop sentinel text, drop the currency
//! prefix, drop the "m²" and "m" unit suffixes, drop any colon left by the
//! ceiling-height split, resolve pt-BR separators ("1.234,56" → "1234.56"),
//! then parse. Anything that still does not parse as a finite float is `None`;
//! there is no zero default and no partially-cleaned output.

use regex::Regex;
use std::sync::OnceLock;
use tracing::info;

use crate::core::types::{
    DetailField, EnrichedListing, FieldValue, NormalizedRecord, COLLECTION_ERROR_TEXT,
    LOCATION_NOT_FOUND_TEXT, UNAVAILABLE_TEXT,
};
use crate::core::ScoutError;

const CURRENCY_PREFIX: &str = "R$";

static THOUSANDS_ONLY: OnceLock<Regex> = OnceLock::new();

/// "2.839" / "1.250.000": dot-grouped integers with no decimal comma.
fn thousands_only() -> &'static Regex {
    THOUSANDS_ONLY.get_or_init(|| {
        Regex::new(r"^\d{1,3}(\.\d{3})+$").expect("valid thousands pattern")
    })
}

/// Values that can be coerced into a normalized numeric cell.
pub trait ToNumeric {
    fn to_numeric(&self) -> Option<f64>;
}

impl ToNumeric for str {
    fn to_numeric(&self) -> Option<f64> {
        parse_locale_number(self)
    }
}

impl ToNumeric for String {
    fn to_numeric(&self) -> Option<f64> {
        parse_locale_number(self)
    }
}

impl ToNumeric for f64 {
    fn to_numeric(&self) -> Option<f64> {
        self.is_finite().then_some(*self)
    }
}

impl ToNumeric for Option<f64> {
    fn to_numeric(&self) -> Option<f64> {
        self.and_then(|v| v.to_numeric())
    }
}

impl ToNumeric for FieldValue {
    fn to_numeric(&self) -> Option<f64> {
        match self {
            FieldValue::Present(text) => parse_locale_number(text),
            FieldValue::Unavailable | FieldValue::CollectionError => None,
        }
    }
}

/// Resolve pt-BR separators on an already unit- and currency-free string.
fn normalize_separators(s: &str) -> String {
    if s.contains(',') {
        s.replace('.', "").replace(',', ".")
    } else if thousands_only().is_match(s) {
        s.replace('.', "")
    } else {
        s.to_string()
    }
}

/// Clean one raw cell and parse it. `None` for anything that isn't a finite number.
pub fn parse_locale_number(raw: &str) -> Option<f64> {
    let mut s = raw.replace('\u{a0}', " ");
    for sentinel in [UNAVAILABLE_TEXT, COLLECTION_ERROR_TEXT, LOCATION_NOT_FOUND_TEXT] {
        s = s.replace(sentinel, "");
    }
    let s = s.replace(CURRENCY_PREFIX, "");
    let s = s.trim();
    let s = s.strip_suffix("m²").unwrap_or(s).trim();
    let s = s.strip_suffix('m').unwrap_or(s).trim();
    let s = s.replace(':', "");
    let s = normalize_separators(s.trim());
    let s = s.trim();

    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Convert one enriched listing into its output row.
///
/// Listings never visited by the detail stage get `None` for every
/// detail-only number and an unavailable address. A listing without an
/// identifier is rejected with [`ScoutError::MissingIdentifier`].
pub fn normalize_listing(listing: &EnrichedListing) -> Result<NormalizedRecord, ScoutError> {
    let s = &listing.summary;
    let id = listing
        .id
        .ok_or_else(|| ScoutError::MissingIdentifier(s.title.clone()))?;
    let detail = |field: DetailField| {
        listing
            .details
            .as_ref()
            .and_then(|d| d.get(field).to_numeric())
    };

    let (full_address, city, state) = match &listing.location {
        Some(loc) if !loc.is_not_found() => (
            FieldValue::present(&loc.full_address),
            Some(loc.city.clone()),
            Some(loc.state.clone()),
        ),
        Some(_) => (unresolved(listing.address()), None, None),
        None => (listing.address().clone(), None, None),
    };

    Ok(NormalizedRecord {
        id,
        title: s.title.clone(),
        price: s.price.to_numeric(),
        condo_fee: s.condo_fee.to_numeric(),
        floor_area: s.floor_area.to_numeric(),
        detail_url: s.detail_url.clone(),
        leasable_area: detail(DetailField::LeasableArea),
        property_tax: detail(DetailField::PropertyTax),
        total_monthly_value: detail(DetailField::TotalMonthlyValue),
        ceiling_height: detail(DetailField::CeilingHeight),
        full_address,
        city: city.filter(|c| c.trim() != LOCATION_NOT_FOUND_TEXT),
        state: state.filter(|c| c.trim() != LOCATION_NOT_FOUND_TEXT),
    })
}

/// Address kept when inference found nothing: a collection error stays one.
pub fn unresolved(address: &FieldValue) -> FieldValue {
    match address {
        FieldValue::CollectionError => FieldValue::CollectionError,
        _ => FieldValue::Unavailable,
    }
}

/// Batch transform of the full collection, preserving order.
pub fn normalize_all(listings: &[EnrichedListing]) -> Result<Vec<NormalizedRecord>, ScoutError> {
    info!("Starting data cleaning and conversion for {} listings", listings.len());
    let records = listings
        .iter()
        .map(normalize_listing)
        .collect::<Result<Vec<_>, _>>()?;
    info!("Data cleaning and conversion finished");
    Ok(records)
}

/// Re-normalize an already normalized record; numeric cells pass through.
pub fn renormalize(record: &NormalizedRecord) -> NormalizedRecord {
    NormalizedRecord {
        price: record.price.to_numeric(),
        condo_fee: record.condo_fee.to_numeric(),
        floor_area: record.floor_area.to_numeric(),
        leasable_area: record.leasable_area.to_numeric(),
        property_tax: record.property_tax.to_numeric(),
        total_monthly_value: record.total_monthly_value.to_numeric(),
        ceiling_height: record.ceiling_height.to_numeric(),
        ..record.clone()
    }
}
