use scraper::Html;
use tracing::{error, info, warn};
use url::Url;

use super::fields::{card_link_selector, card_title_selector, element_text, paired_value};
use crate::core::config::CrawlOptions;
use crate::core::types::{FieldValue, ListingSummary};
use crate::core::ScoutError;
use crate::scraping::browser::{wait_for_change, wait_for_selector, BrowserSession, WaitPolicy};
use crate::scraping::site::{CARD_SELECTOR, GRID_FIELDS, GRID_SELECTOR, NEXT_PAGE_SELECTOR};

/// Walks the paginated listing grid through client-side "next" clicks.
pub struct GridCrawler<'a> {
    session: &'a mut dyn BrowserSession,
    options: &'a CrawlOptions,
}

impl<'a> GridCrawler<'a> {
    pub fn new(session: &'a mut dyn BrowserSession, options: &'a CrawlOptions) -> Self {
        Self { session, options }
    }

    /// Collect summaries from up to `max_pages` grid pages, in page order.
    ///
    /// Only the initial navigation is fatal. A missing grid, a session error
    /// while paging, or a vanished "next" control ends the walk and returns
    /// what was gathered so far.
    pub async fn collect(&mut self, max_pages: usize) -> Result<Vec<ListingSummary>, ScoutError> {
        let max_pages = max_pages.max(1);
        let options = self.options;
        let grid_url = options.grid_url.as_str();
        let base = Url::parse(grid_url).map_err(|e| ScoutError::Navigation {
            url: grid_url.to_string(),
            msg: e.to_string(),
        })?;

        info!("Starting grid collection at {} (max_pages: {})", grid_url, max_pages);
        self.session.navigate(grid_url).await?;

        let mut collected = Vec::new();
        let mut previous_cards: Vec<String> = Vec::new();
        let mut page = 1usize;

        loop {
            info!("📄 Collecting grid page {}...", page);
            match self.read_page(page, &previous_cards, &base).await {
                Ok(Some((cards, summaries))) => {
                    info!("Page {}: {} listings parsed", page, summaries.len());
                    collected.extend(summaries);
                    previous_cards = cards;
                }
                Ok(None) => break,
                Err(e) => {
                    error!("Grid page {} failed, keeping {} listings: {}", page, collected.len(), e);
                    break;
                }
            }

            if page >= max_pages {
                info!("Page limit of {} reached, finishing collection", max_pages);
                break;
            }

            match self.session.click(NEXT_PAGE_SELECTOR).await {
                Ok(true) => {
                    info!("Next-page control found, advancing");
                    page += 1;
                }
                Ok(false) => {
                    info!("Last page reached, finishing collection");
                    break;
                }
                Err(e) => {
                    error!("Next-page click failed on page {}: {}", page, e);
                    break;
                }
            }
        }

        info!("Grid collection done: {} listings", collected.len());
        Ok(collected)
    }

    /// Wait for the page's grid, then parse every card. `Ok(None)` when there is no grid.
    async fn read_page(
        &mut self,
        page: usize,
        previous_cards: &[String],
        base: &Url,
    ) -> Result<Option<(Vec<String>, Vec<ListingSummary>)>, ScoutError> {
        let policy = WaitPolicy::new(self.options.grid_timeout, self.options.poll_interval);

        let ready = if page == 1 {
            wait_for_selector(self.session, GRID_SELECTOR, policy).await?
        } else {
            wait_for_change(self.session, CARD_SELECTOR, previous_cards, policy).await?
        };
        if !ready {
            warn!("Grid on page {} did not settle within {:?}", page, policy.timeout);
        }

        if !self.session.exists(GRID_SELECTOR).await? {
            error!("Listing grid not found on page {}; check the grid selector", page);
            return Ok(None);
        }

        let cards = self.session.outer_html_all(CARD_SELECTOR).await?;
        info!("Found {} listing cards on page {}", cards.len(), page);

        let mut summaries = Vec::with_capacity(cards.len());
        for (i, card) in cards.iter().enumerate() {
            match parse_card(card, base) {
                Ok(summary) => summaries.push(summary),
                Err(e) => warn!("Skipping card {} on page {}: {}", i + 1, page, e),
            }
        }
        Ok(Some((cards, summaries)))
    }
}

/// Parse one grid card (the anchor's outer HTML) into a summary.
///
/// Fails when the card has no title heading or lacks one of the grid labels.
pub fn parse_card(card_html: &str, base: &Url) -> Result<ListingSummary, ScoutError> {
    let doc = Html::parse_fragment(card_html);

    let title = doc
        .select(card_title_selector())
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
        .ok_or(ScoutError::MissingHeading)?;

    let mut summary = ListingSummary {
        title,
        price: FieldValue::Unavailable,
        condo_fee: FieldValue::Unavailable,
        floor_area: FieldValue::Unavailable,
        detail_url: None,
    };
    for &(field, label) in GRID_FIELDS {
        summary.set(field, paired_value(&doc, label)?);
    }

    summary.detail_url = doc
        .select(card_link_selector())
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(|href| match base.join(href) {
            Ok(url) => url.to_string(),
            Err(_) => href.to_string(),
        });

    Ok(summary)
}
