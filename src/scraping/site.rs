//! Selectors and labels of the WebIndustrial warehouse directory.
//!
//! Everything that ties the core to this one site's markup lives here, so a
//! markup change is a data change.

use crate::core::types::{DetailField, GridField};

/// Responsive two-column grid that holds the listing cards.
pub const GRID_SELECTOR: &str = "div[class*='grid-cols-1 md:grid-cols-2']";
/// Each card is an anchor inside the grid.
pub const CARD_SELECTOR: &str = "div[class*='grid-cols-1 md:grid-cols-2'] a";
/// Pagination control, located by its accessible label.
pub const NEXT_PAGE_SELECTOR: &str = "button[aria-label='next']";

/// Stable container on detail pages; also the detail readiness signal.
pub const DETAIL_CONTAINER_SELECTOR: &str = "div#scroll-div";
/// Paragraphs read live when scanning for colon-delimited values.
pub const DETAIL_TEXT_SELECTOR: &str = "p";

/// Any paragraph; labels are matched by text among these.
pub const LABEL_SELECTOR: &str = "p";
/// Value paragraph of a detail-page label/value pair.
pub const VALUE_SELECTOR: &str = "p.font-semibold";
/// Card title.
pub const CARD_TITLE_SELECTOR: &str = "h3";
/// Card anchor carrying the detail link.
pub const CARD_LINK_SELECTOR: &str = "a[href]";

/// How a detail field is located on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Paragraph containing the label; value is the sibling `p.font-semibold`.
    LabeledValue(&'static str),
    /// Single rendered paragraph `"<label>: <value>"`, read from the live page.
    ColonSplit(&'static str),
    /// First heading matched inside a container anchored by id, read live.
    AnchoredHeading(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec<F> {
    pub field: F,
    pub strategy: Strategy,
}

/// Card label → summary column. Value is the second paragraph of the label's parent.
pub const GRID_FIELDS: &[(GridField, &str)] = &[
    (GridField::Price, "Preço de Locação /m²"),
    (GridField::CondoFee, "Condomínio /m²"),
    (GridField::FloorArea, "Metragem"),
];

pub const DETAIL_FIELDS: &[FieldSpec<DetailField>] = &[
    FieldSpec {
        field: DetailField::LeasableArea,
        strategy: Strategy::LabeledValue("Área locável m²"),
    },
    FieldSpec {
        field: DetailField::PropertyTax,
        strategy: Strategy::LabeledValue("IPTU por m²"),
    },
    FieldSpec {
        field: DetailField::TotalMonthlyValue,
        strategy: Strategy::LabeledValue("Valor total mensal"),
    },
    FieldSpec {
        field: DetailField::CeilingHeight,
        strategy: Strategy::ColonSplit("Pé Direito"),
    },
    FieldSpec {
        field: DetailField::Address,
        strategy: Strategy::AnchoredHeading("div#scroll-div h3[class*='font-semibold']"),
    },
];
