//! Sequences the stages of one harvesting run: grid crawl, detail
//! enrichment, identifier assignment, optional location inference and
//! normalization. Everything runs on one browser session, one awaited call
//! at a time.

use anyhow::{Context, Result};
use tracing::{error, info, info_span, warn, Instrument};

use super::detail::DetailEnricher;
use super::grid::GridCrawler;
use super::location::{resolve_listings, LocationService};
use super::normalize::normalize_all;
use crate::core::config::{CrawlOptions, LocationOptions};
use crate::core::types::{EnrichedListing, ListingSummary, NormalizedRecord};
use crate::core::ScoutError;
use crate::scraping::browser::BrowserSession;

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    /// The grid produced nothing; no file should be written.
    Empty,
    Completed(Vec<NormalizedRecord>),
}

impl PipelineOutcome {
    pub fn records(&self) -> &[NormalizedRecord] {
        match self {
            PipelineOutcome::Empty => &[],
            PipelineOutcome::Completed(records) => records,
        }
    }
}

pub struct Pipeline {
    crawl: CrawlOptions,
    location: LocationOptions,
    locator: Option<Box<dyn LocationService>>,
}

impl Pipeline {
    pub fn new(crawl: CrawlOptions, location: LocationOptions) -> Self {
        Self {
            crawl,
            location,
            locator: None,
        }
    }

    /// Enable location inference through `service` for placeholder addresses.
    pub fn with_locator(mut self, service: Box<dyn LocationService>) -> Self {
        self.locator = Some(service);
        self
    }

    /// Run every stage on `session`. The session is left open.
    pub async fn run(
        &self,
        session: &mut dyn BrowserSession,
        max_pages: usize,
    ) -> Result<PipelineOutcome> {
        let summaries = GridCrawler::new(session, &self.crawl)
            .collect(max_pages)
            .await
            .context("listing grid could not be loaded")?;

        if summaries.is_empty() {
            warn!("No listings collected from the grid; nothing to enrich");
            return Ok(PipelineOutcome::Empty);
        }

        let mut listings = keep_linked(summaries);
        if listings.is_empty() {
            warn!("No collected listing carries a detail URL; nothing to enrich");
            return Ok(PipelineOutcome::Empty);
        }

        let report = DetailEnricher::new(session, &self.crawl)
            .enrich(&mut listings)
            .await;
        if report.failed > 0 {
            warn!("{} of {} detail pages failed", report.failed, listings.len());
        }

        assign_identifiers(&mut listings)?;

        if let Some(locator) = &self.locator {
            resolve_listings(
                &mut listings,
                locator.as_ref(),
                &self.location.placeholder_addresses,
            )
            .await;
        }

        let records = normalize_all(&listings).context("normalization failed")?;
        Ok(PipelineOutcome::Completed(records))
    }

    /// [`Pipeline::run`] inside a per-run span, closing the session on every path.
    pub async fn run_scoped(
        &self,
        session: &mut dyn BrowserSession,
        max_pages: usize,
    ) -> Result<PipelineOutcome> {
        let run_id = chrono::Local::now().format("%Y%m%d-%H%M%S").to_string();
        let span = info_span!("pipeline", run = %run_id);

        async {
            info!("Starting harvesting pipeline");
            let outcome = self.run(session, max_pages).await;
            match session.close().await {
                Ok(()) => info!("Browser session closed"),
                Err(e) => error!("Failed to close browser session: {}", e),
            }
            match &outcome {
                Ok(o) => info!("Pipeline finished with {} records", o.records().len()),
                Err(e) => error!("Pipeline failed: {:#}", e),
            }
            outcome
        }
        .instrument(span)
        .await
    }
}

/// Drop summaries without a detail URL; they cannot be enriched.
fn keep_linked(summaries: Vec<ListingSummary>) -> Vec<EnrichedListing> {
    let total = summaries.len();
    let kept: Vec<EnrichedListing> = summaries
        .into_iter()
        .filter(|s| {
            if !s.has_detail_url() {
                warn!("Dropping listing `{}`: card has no detail link", s.title);
            }
            s.has_detail_url()
        })
        .map(EnrichedListing::from)
        .collect();
    if kept.len() < total {
        info!("Kept {} of {} listings with a detail URL", kept.len(), total);
    }
    kept
}

/// Sequential 1-based identifiers in collection order.
pub fn assign_identifiers(listings: &mut [EnrichedListing]) -> Result<(), ScoutError> {
    let total = listings.len();
    for (i, listing) in listings.iter_mut().enumerate() {
        let id = u32::try_from(i + 1).map_err(|_| ScoutError::IdentifierOverflow(total))?;
        listing.id = Some(id);
    }
    Ok(())
}
