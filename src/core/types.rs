use serde::{Deserialize, Serialize};
use std::fmt;

/// Text written in place of a field the page does not show ("on request").
pub const UNAVAILABLE_TEXT: &str = "Sob consulta";
/// Text written in place of a field whose page could not be collected at all.
pub const COLLECTION_ERROR_TEXT: &str = "Erro na coleta";
/// Answer the location service gives for inputs it cannot resolve.
pub const LOCATION_NOT_FOUND_TEXT: &str = "nao_encontrado";

// ── Field outcome ────────────────────────────────────────────────────────────

/// Outcome of extracting one raw field.
///
/// `Unavailable` means the page was read but the label/value was absent;
/// `CollectionError` means the page itself could not be read (navigation
/// failure, timeout, dead session). The two are kept apart so a dataset can
/// tell "the site doesn't publish this" from "we failed to look".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum FieldValue {
    Present(String),
    #[default]
    Unavailable,
    CollectionError,
}

impl FieldValue {
    /// Wrap trimmed text; empty text counts as unavailable.
    pub fn present(text: impl AsRef<str>) -> Self {
        let trimmed = text.as_ref().trim();
        if trimmed.is_empty() {
            FieldValue::Unavailable
        } else {
            FieldValue::Present(trimmed.to_string())
        }
    }

    /// Map sentinel text (as found in previously exported data) back to the tagged form.
    pub fn from_text(text: &str) -> Self {
        match text.trim() {
            UNAVAILABLE_TEXT | LOCATION_NOT_FOUND_TEXT => FieldValue::Unavailable,
            COLLECTION_ERROR_TEXT => FieldValue::CollectionError,
            other => FieldValue::present(other),
        }
    }

    pub fn as_present(&self) -> Option<&str> {
        match self {
            FieldValue::Present(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, FieldValue::Present(_))
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::from_text(&value)
    }
}

impl From<FieldValue> for String {
    fn from(value: FieldValue) -> Self {
        value.to_string()
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Present(s) => f.write_str(s),
            FieldValue::Unavailable => f.write_str(UNAVAILABLE_TEXT),
            FieldValue::CollectionError => f.write_str(COLLECTION_ERROR_TEXT),
        }
    }
}

// ── Grid stage ───────────────────────────────────────────────────────────────

/// One card of the listing grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingSummary {
    pub title: String,
    pub price: FieldValue,
    pub condo_fee: FieldValue,
    pub floor_area: FieldValue,
    /// Absolute URL of the detail page; `None` when the card carried no link.
    pub detail_url: Option<String>,
}

impl ListingSummary {
    pub fn has_detail_url(&self) -> bool {
        self.detail_url
            .as_deref()
            .is_some_and(|u| !u.trim().is_empty())
    }
}

/// Grid columns read from each card, keyed by their on-page label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridField {
    Price,
    CondoFee,
    FloorArea,
}

impl ListingSummary {
    pub fn set(&mut self, field: GridField, value: FieldValue) {
        match field {
            GridField::Price => self.price = value,
            GridField::CondoFee => self.condo_fee = value,
            GridField::FloorArea => self.floor_area = value,
        }
    }
}

// ── Detail stage ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailField {
    LeasableArea,
    PropertyTax,
    TotalMonthlyValue,
    CeilingHeight,
    Address,
}

/// Fields only shown on the per-listing detail page.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DetailFields {
    pub leasable_area: FieldValue,
    pub property_tax: FieldValue,
    pub total_monthly_value: FieldValue,
    pub ceiling_height: FieldValue,
    pub address: FieldValue,
}

impl DetailFields {
    /// Every field marked as a collection failure.
    pub fn collection_error() -> Self {
        Self {
            leasable_area: FieldValue::CollectionError,
            property_tax: FieldValue::CollectionError,
            total_monthly_value: FieldValue::CollectionError,
            ceiling_height: FieldValue::CollectionError,
            address: FieldValue::CollectionError,
        }
    }

    pub fn set(&mut self, field: DetailField, value: FieldValue) {
        match field {
            DetailField::LeasableArea => self.leasable_area = value,
            DetailField::PropertyTax => self.property_tax = value,
            DetailField::TotalMonthlyValue => self.total_monthly_value = value,
            DetailField::CeilingHeight => self.ceiling_height = value,
            DetailField::Address => self.address = value,
        }
    }

    pub fn get(&self, field: DetailField) -> &FieldValue {
        match field {
            DetailField::LeasableArea => &self.leasable_area,
            DetailField::PropertyTax => &self.property_tax,
            DetailField::TotalMonthlyValue => &self.total_monthly_value,
            DetailField::CeilingHeight => &self.ceiling_height,
            DetailField::Address => &self.address,
        }
    }
}

/// A grid summary plus whatever the detail stage managed to add.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedListing {
    /// 1-based, assigned once the whole collection is known.
    pub id: Option<u32>,
    pub summary: ListingSummary,
    /// `None` until the detail page has been visited.
    pub details: Option<DetailFields>,
    /// Filled only when location resolution ran for this listing.
    pub location: Option<Location>,
}

impl From<ListingSummary> for EnrichedListing {
    fn from(summary: ListingSummary) -> Self {
        Self {
            id: None,
            summary,
            details: None,
            location: None,
        }
    }
}

impl EnrichedListing {
    pub fn address(&self) -> &FieldValue {
        static UNAVAILABLE: FieldValue = FieldValue::Unavailable;
        self.details
            .as_ref()
            .map(|d| &d.address)
            .unwrap_or(&UNAVAILABLE)
    }
}

// ── Location inference ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "cidade")]
    pub city: String,
    #[serde(rename = "estado")]
    pub state: String,
    #[serde(rename = "endereco_completo")]
    pub full_address: String,
}

impl Location {
    pub fn not_found() -> Self {
        Self {
            city: LOCATION_NOT_FOUND_TEXT.to_string(),
            state: LOCATION_NOT_FOUND_TEXT.to_string(),
            full_address: LOCATION_NOT_FOUND_TEXT.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.full_address.trim() == LOCATION_NOT_FOUND_TEXT
    }
}

// ── Normalized output ────────────────────────────────────────────────────────

/// Final tabular row. Numeric columns are finite floats or `None`; text
/// columns keep their tagged value. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedRecord {
    pub id: u32,
    pub title: String,
    pub price: Option<f64>,
    pub condo_fee: Option<f64>,
    pub floor_area: Option<f64>,
    pub detail_url: Option<String>,
    pub leasable_area: Option<f64>,
    pub property_tax: Option<f64>,
    pub total_monthly_value: Option<f64>,
    pub ceiling_height: Option<f64>,
    pub full_address: FieldValue,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}
