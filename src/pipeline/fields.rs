//! Label → value lookup over parsed markup.
//!
//! Listing and detail pages render their attributes as two-part UI elements:
//! a paragraph naming the field next to a paragraph holding the value. Every
//! lookup here degrades to [`FieldValue::Unavailable`] instead of failing;
//! the one exception is [`paired_value`], which reports a missing label so the
//! grid stage can skip a malformed card.

use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;
use tracing::warn;

use crate::core::types::FieldValue;
use crate::core::ScoutError;
use crate::scraping::site::{
    CARD_LINK_SELECTOR, CARD_TITLE_SELECTOR, LABEL_SELECTOR, VALUE_SELECTOR,
};

static LABEL: OnceLock<Selector> = OnceLock::new();
static VALUE: OnceLock<Selector> = OnceLock::new();
static CARD_TITLE: OnceLock<Selector> = OnceLock::new();
static CARD_LINK: OnceLock<Selector> = OnceLock::new();

fn cached(cell: &'static OnceLock<Selector>, css: &'static str) -> &'static Selector {
    cell.get_or_init(|| Selector::parse(css).expect("valid site selector"))
}

pub fn label_selector() -> &'static Selector {
    cached(&LABEL, LABEL_SELECTOR)
}

pub fn value_selector() -> &'static Selector {
    cached(&VALUE, VALUE_SELECTOR)
}

pub fn card_title_selector() -> &'static Selector {
    cached(&CARD_TITLE, CARD_TITLE_SELECTOR)
}

pub fn card_link_selector() -> &'static Selector {
    cached(&CARD_LINK, CARD_LINK_SELECTOR)
}

/// Collapse runs of whitespace (including NBSP) into single spaces and trim.
pub fn clean_text(raw: &str) -> String {
    raw.split(|c: char| c.is_whitespace() || c == '\u{a0}')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn element_text(el: ElementRef<'_>) -> String {
    clean_text(&el.text().collect::<String>())
}

/// First paragraph whose text contains `label`.
///
/// Substring match tolerates decorations such as a trailing "/m²".
pub fn find_label<'a>(doc: &'a Html, label: &str) -> Option<ElementRef<'a>> {
    let label = clean_text(label);
    doc.select(label_selector()).find(|el| element_text(*el).contains(&label))
}

fn parent_element(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    el.parent().and_then(ElementRef::wrap)
}

/// Detail-page lookup: the value is the `p.font-semibold` sharing the label's parent.
pub fn labeled_value(doc: &Html, label: &str) -> FieldValue {
    let Some(label_el) = find_label(doc, label) else {
        warn!("label `{}` not found on page", label);
        return FieldValue::Unavailable;
    };
    let Some(parent) = parent_element(label_el) else {
        return FieldValue::Unavailable;
    };
    parent
        .select(value_selector())
        .find(|el| *el != label_el)
        .map(|el| FieldValue::present(element_text(el)))
        .unwrap_or_else(|| {
            warn!("label `{}` has no value paragraph", label);
            FieldValue::Unavailable
        })
}

/// Grid-card lookup: the value is the second paragraph under the label's parent.
///
/// A missing label is a structural error (the card is not the expected shape);
/// a label without a value paragraph is just an absent value.
pub fn paired_value(doc: &Html, label: &'static str) -> Result<FieldValue, ScoutError> {
    let label_el = find_label(doc, label).ok_or(ScoutError::MissingLabel(label))?;
    let Some(parent) = parent_element(label_el) else {
        return Ok(FieldValue::Unavailable);
    };
    Ok(parent
        .select(label_selector())
        .nth(1)
        .map(|el| FieldValue::present(element_text(el)))
        .unwrap_or(FieldValue::Unavailable))
}

/// Split a `"<label>: <value>m"` text node and keep the bare value.
pub fn colon_split(text: &str, label: &str) -> FieldValue {
    let text = clean_text(text);
    if !text.contains(&clean_text(label)) {
        return FieldValue::Unavailable;
    }
    let Some((_, value)) = text.split_once(':') else {
        return FieldValue::Unavailable;
    };
    let value = value
        .split(':')
        .next()
        .unwrap_or_default()
        .trim()
        .trim_end_matches(|c: char| c == 'm' || c == '²' || c.is_whitespace());
    FieldValue::present(value)
}

/// First text among `texts` carrying `label`, colon-split.
pub fn first_colon_split(texts: &[String], label: &str) -> FieldValue {
    let label_clean = clean_text(label);
    texts
        .iter()
        .find(|t| clean_text(t).contains(&label_clean))
        .map(|t| colon_split(t, label))
        .unwrap_or(FieldValue::Unavailable)
}

/// First non-empty heading text.
pub fn first_heading(texts: &[String]) -> FieldValue {
    texts
        .iter()
        .map(|t| clean_text(t))
        .find(|t| !t.is_empty())
        .map(FieldValue::Present)
        .unwrap_or(FieldValue::Unavailable)
}
