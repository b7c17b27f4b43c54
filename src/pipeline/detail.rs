use scraper::Html;
use tracing::{debug, error, info, warn};

use super::fields::{first_colon_split, first_heading, labeled_value};
use crate::core::config::CrawlOptions;
use crate::core::types::{DetailFields, EnrichedListing, FieldValue};
use crate::core::ScoutError;
use crate::scraping::browser::{wait_for_change, BrowserSession, WaitPolicy};
use crate::scraping::site::{Strategy, DETAIL_CONTAINER_SELECTOR, DETAIL_FIELDS, DETAIL_TEXT_SELECTOR};

/// Per-run tally of the detail stage.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EnrichReport {
    pub visited: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Visits each listing's detail page and fills in the detail-only fields.
pub struct DetailEnricher<'a> {
    session: &'a mut dyn BrowserSession,
    options: &'a CrawlOptions,
}

impl<'a> DetailEnricher<'a> {
    pub fn new(session: &'a mut dyn BrowserSession, options: &'a CrawlOptions) -> Self {
        Self { session, options }
    }

    /// Enrich `listings` in place, in order.
    ///
    /// A listing whose page cannot be loaded gets every detail field set to
    /// [`FieldValue::CollectionError`]; the batch always continues.
    pub async fn enrich(&mut self, listings: &mut [EnrichedListing]) -> EnrichReport {
        let total = listings.len();
        let mut report = EnrichReport::default();
        info!("Starting detail collection for {} listings", total);

        for (i, listing) in listings.iter_mut().enumerate() {
            let Some(url) = listing
                .summary
                .detail_url
                .clone()
                .filter(|u| !u.trim().is_empty())
            else {
                warn!("Listing at index {} has no detail URL, skipping", i);
                report.skipped += 1;
                continue;
            };

            info!("[{}/{}] Visiting {}", i + 1, total, url);
            match self.visit(&url).await {
                Ok(details) => {
                    debug!("Extracted details for {}: {:?}", url, details);
                    listing.details = Some(details);
                    report.visited += 1;
                }
                Err(e) => {
                    error!("Failed to process listing at {}: {}", url, e);
                    listing.details = Some(DetailFields::collection_error());
                    report.failed += 1;
                }
            }
        }

        info!(
            "Detail collection finished: {} visited, {} failed, {} skipped",
            report.visited, report.failed, report.skipped
        );
        report
    }

    async fn visit(&mut self, url: &str) -> Result<DetailFields, ScoutError> {
        // The previous listing's container stays mounted until the new one renders.
        let previous = self.session.outer_html_all(DETAIL_CONTAINER_SELECTOR).await?;
        self.session.navigate(url).await?;

        let policy = WaitPolicy::new(self.options.detail_timeout, self.options.poll_interval);
        if !wait_for_change(self.session, DETAIL_CONTAINER_SELECTOR, &previous, policy).await? {
            warn!("Detail page {} did not settle within {:?}", url, policy.timeout);
        }

        let html = self.session.content().await?;
        let mut details = DetailFields::default();
        {
            let doc = Html::parse_document(&html);
            for entry in DETAIL_FIELDS {
                if let Strategy::LabeledValue(label) = entry.strategy {
                    details.set(entry.field, labeled_value(&doc, label));
                }
            }
        }

        for entry in DETAIL_FIELDS {
            let value = match entry.strategy {
                Strategy::LabeledValue(_) => continue,
                Strategy::ColonSplit(label) => self.live_colon_split(label).await,
                Strategy::AnchoredHeading(selector) => self.live_heading(selector).await,
            };
            details.set(entry.field, value);
        }

        Ok(details)
    }

    /// Read paragraphs from the live page; errors here only cost this field.
    async fn live_colon_split(&mut self, label: &str) -> FieldValue {
        match self.session.texts(DETAIL_TEXT_SELECTOR).await {
            Ok(texts) => first_colon_split(&texts, label),
            Err(e) => {
                error!("Error extracting `{}`: {}", label, e);
                FieldValue::Unavailable
            }
        }
    }

    async fn live_heading(&mut self, selector: &str) -> FieldValue {
        match self.session.texts(selector).await {
            Ok(texts) => first_heading(&texts),
            Err(e) => {
                error!("Error extracting address heading: {}", e);
                FieldValue::Unavailable
            }
        }
    }
}
