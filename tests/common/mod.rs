#![allow(dead_code)]

//! In-memory browser for driving the pipeline without Chromium.
//!
//! Pages are plain HTML strings evaluated with `scraper`, so the real CSS
//! selectors used by the crawler are exercised. The grid URL serves a list of
//! pages that advance when the "next" button is clicked; any other URL serves
//! a detail page. Rendering delay is simulated by answering the first N
//! queries after a navigation or click with the previous (stale) document.

use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use listing_scout::core::config::CrawlOptions;
use listing_scout::scraping::browser::{BrowserResult, BrowserSession};
use listing_scout::ScoutError;

pub const GRID_URL: &str = "https://www.webindustrial.com.br/alugar/galpao";
pub const SITE: &str = "https://www.webindustrial.com.br";

const BLANK: &str = "<html><head></head><body></body></html>";

pub fn init_logger() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Fast polling so readiness waits finish in milliseconds.
pub fn options() -> CrawlOptions {
    CrawlOptions {
        grid_url: GRID_URL.to_string(),
        max_pages: 8,
        grid_timeout: Duration::from_secs(2),
        detail_timeout: Duration::from_secs(2),
        poll_interval: Duration::from_millis(1),
        headless: true,
        user_agent: None,
    }
}

// ── Markup builders ──────────────────────────────────────────────────────────

pub struct Card<'a> {
    pub title: Option<&'a str>,
    pub price: Option<&'a str>,
    pub condo_fee: Option<&'a str>,
    pub floor_area: Option<&'a str>,
    pub href: &'a str,
}

impl<'a> Card<'a> {
    pub fn complete(title: &'a str, href: &'a str) -> Self {
        Self {
            title: Some(title),
            price: Some("R$ 25,00"),
            condo_fee: Some("R$ 4,50"),
            floor_area: Some("2.839,00 m²"),
            href,
        }
    }

    pub fn html(&self) -> String {
        let mut out = format!(r#"<a href="{}" class="rounded shadow">"#, self.href);
        if let Some(t) = self.title {
            out.push_str(&format!(r#"<h3 class="text-lg">{}</h3>"#, t));
        }
        for (label, value) in [
            ("Preço de Locação /m²", self.price),
            ("Condomínio /m²", self.condo_fee),
            ("Metragem", self.floor_area),
        ] {
            if let Some(v) = value {
                out.push_str(&format!(
                    r#"<div class="flex"><p class="text-xs">{}</p><p class="font-bold">{}</p></div>"#,
                    label, v
                ));
            }
        }
        out.push_str("</a>");
        out
    }
}

pub fn grid_page(cards: &[Card<'_>], has_next: bool) -> String {
    let cards: String = cards.iter().map(Card::html).collect();
    let next = if has_next {
        r#"<button aria-label="next">›</button>"#
    } else {
        ""
    };
    format!(
        r#"<html><body><main><div class="grid grid-cols-1 md:grid-cols-2 gap-4">{}</div><nav>{}</nav></main></body></html>"#,
        cards, next
    )
}

#[derive(Clone)]
pub struct Detail<'a> {
    pub address: Option<&'a str>,
    pub leasable_area: Option<&'a str>,
    pub property_tax: Option<&'a str>,
    pub total_monthly_value: Option<&'a str>,
    pub ceiling_height: Option<&'a str>,
}

impl<'a> Detail<'a> {
    pub fn complete() -> Self {
        Self {
            address: Some("Rua das Indústrias, 100 - Cajamar/SP"),
            leasable_area: Some("2.839,00 m²"),
            property_tax: Some("R$ 1,20"),
            total_monthly_value: Some("R$ 83.670,50"),
            ceiling_height: Some("12.00"),
        }
    }

    pub fn html(&self) -> String {
        let mut out = String::from(r#"<html><body><header><h3 class="font-semibold">Menu</h3></header><div id="scroll-div">"#);
        if let Some(a) = self.address {
            out.push_str(&format!(r#"<h3 class="text-2xl font-semibold">{}</h3>"#, a));
        }
        for (label, value) in [
            ("Área locável m²", self.leasable_area),
            ("IPTU por m²", self.property_tax),
            ("Valor total mensal", self.total_monthly_value),
        ] {
            if let Some(v) = value {
                out.push_str(&format!(
                    r#"<div><p class="text-sm">{}</p><p class="font-semibold">{}</p></div>"#,
                    label, v
                ));
            }
        }
        if let Some(h) = self.ceiling_height {
            out.push_str(&format!("<ul><li><p>Pé Direito: {}m</p></li></ul>", h));
        }
        out.push_str("</div></body></html>");
        out
    }
}

// ── Fake session ─────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeBrowser {
    grid_pages: Vec<String>,
    grid_index: usize,
    details: HashMap<String, String>,
    failing: HashSet<String>,

    current: String,
    stale: String,
    pending_stale_reads: usize,
    render_delay: usize,

    pub navigations: Vec<String>,
    pub clicks: usize,
    pub closes: usize,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self {
            current: BLANK.to_string(),
            stale: BLANK.to_string(),
            ..Self::default()
        }
    }

    pub fn with_grid_pages(mut self, pages: Vec<String>) -> Self {
        self.grid_pages = pages;
        self
    }

    pub fn with_detail(mut self, url: &str, html: String) -> Self {
        self.details.insert(url.to_string(), html);
        self
    }

    /// Navigation to `url` fails with a session error.
    pub fn failing_on(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    /// Number of queries answered with the stale document after each transition.
    pub fn with_render_delay(mut self, reads: usize) -> Self {
        self.render_delay = reads;
        self
    }

    fn transition(&mut self, next: String) {
        self.stale = std::mem::replace(&mut self.current, next);
        self.pending_stale_reads = self.render_delay;
    }

    fn visible(&mut self) -> Html {
        if self.pending_stale_reads > 0 {
            self.pending_stale_reads -= 1;
            Html::parse_document(&self.stale)
        } else {
            Html::parse_document(&self.current)
        }
    }

    fn parse_selector(selector: &str) -> BrowserResult<Selector> {
        Selector::parse(selector).map_err(|e| ScoutError::InvalidSelector {
            selector: selector.to_string(),
            msg: e.to_string(),
        })
    }
}

#[async_trait]
impl BrowserSession for FakeBrowser {
    async fn navigate(&mut self, url: &str) -> BrowserResult<()> {
        self.navigations.push(url.to_string());
        if self.failing.contains(url) {
            return Err(ScoutError::Navigation {
                url: url.to_string(),
                msg: "net::ERR_CONNECTION_RESET".to_string(),
            });
        }
        let next = if url == GRID_URL {
            self.grid_index = 0;
            self.grid_pages.first().cloned().unwrap_or_else(|| BLANK.to_string())
        } else {
            self.details.get(url).cloned().unwrap_or_else(|| BLANK.to_string())
        };
        self.transition(next);
        Ok(())
    }

    async fn content(&mut self) -> BrowserResult<String> {
        Ok(self.visible().root_element().html())
    }

    async fn exists(&mut self, selector: &str) -> BrowserResult<bool> {
        let sel = Self::parse_selector(selector)?;
        Ok(self.visible().select(&sel).next().is_some())
    }

    async fn outer_html_all(&mut self, selector: &str) -> BrowserResult<Vec<String>> {
        let sel = Self::parse_selector(selector)?;
        Ok(self.visible().select(&sel).map(|el| el.html()).collect())
    }

    async fn texts(&mut self, selector: &str) -> BrowserResult<Vec<String>> {
        let sel = Self::parse_selector(selector)?;
        Ok(self
            .visible()
            .select(&sel)
            .map(|el| el.text().collect::<String>())
            .collect())
    }

    async fn click(&mut self, selector: &str) -> BrowserResult<bool> {
        let sel = Self::parse_selector(selector)?;
        let present = Html::parse_document(&self.current).select(&sel).next().is_some();
        if !present {
            return Ok(false);
        }
        self.clicks += 1;
        if self.grid_index + 1 < self.grid_pages.len() {
            self.grid_index += 1;
            let next = self.grid_pages[self.grid_index].clone();
            self.transition(next);
        }
        Ok(true)
    }

    async fn close(&mut self) -> BrowserResult<()> {
        self.closes += 1;
        Ok(())
    }
}

pub fn detail_url(n: u32) -> String {
    format!("{}/imovel/{}", SITE, n)
}
