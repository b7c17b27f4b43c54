//! Native browser session using `chromiumoxide`.
//!
//! This module is the single place that knows about Chromium:
//! * Finding a usable browser executable (env override → PATH → well-known paths).
//! * Building the launch config (crawl flags, configured or pooled user agent).
//! * [`ChromeSession`]: one browser process with one tab, implementing
//!   [`BrowserSession`] for the harvesting pipeline.
//!
//! The pipeline is strictly sequential, so a session owns exactly one `Page`
//! and every call is awaited before the next is issued.

use async_trait::async_trait;
use chromiumoxide::browser::BrowserConfig;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use rand::seq::IndexedRandom;
use std::path::Path;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::browser::{BrowserResult, BrowserSession};
use crate::core::config::{chrome_executable_override, CrawlOptions};
use crate::core::ScoutError;

// ── User agent ───────────────────────────────────────────────────────────────

/// Fallback pool when `crawl.user_agent` is not configured.
const DESKTOP_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36",
];

const WINDOW_WIDTH: u32 = 1366;
const WINDOW_HEIGHT: u32 = 900;

/// Returns a randomly-chosen desktop Chromium User-Agent string.
pub fn random_user_agent() -> &'static str {
    let mut rng = rand::rng();
    DESKTOP_USER_AGENTS
        .choose(&mut rng)
        .copied()
        .unwrap_or(DESKTOP_USER_AGENTS[0])
}

// ── Browser executable discovery ─────────────────────────────────────────────

/// Find a usable Chromium-family browser executable.
///
/// Resolution order:
/// 1. `CHROME_EXECUTABLE` env var (explicit override)
/// 2. PATH lookup via `which`
/// 3. OS-specific well-known install paths.
pub fn find_chrome_executable() -> Option<String> {
    if let Some(p) = chrome_executable_override() {
        return Some(p);
    }

    for exe in [
        "google-chrome",
        "chromium",
        "chromium-browser",
        "chrome",
        "brave-browser",
    ] {
        if let Ok(path) = which::which(exe) {
            return Some(path.to_string_lossy().to_string());
        }
    }

    #[cfg(target_os = "macos")]
    let candidates: &[&str] = &[
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        "/Applications/Brave Browser.app/Contents/MacOS/Brave Browser",
    ];

    #[cfg(target_os = "linux")]
    let candidates: &[&str] = &[
        "/usr/bin/google-chrome",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/usr/local/bin/chromium",
    ];

    #[cfg(target_os = "windows")]
    let candidates: &[&str] = &[
        r"C:\Program Files\Google\Chrome\Application\chrome.exe",
        r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
    ];

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    let candidates: &[&str] = &[];

    candidates
        .iter()
        .find(|c| Path::new(c).exists())
        .map(|c| c.to_string())
}

// ── Launch config ────────────────────────────────────────────────────────────

/// Configured user agent, or one from the pool.
pub fn user_agent_for(options: &CrawlOptions) -> String {
    options
        .user_agent
        .clone()
        .unwrap_or_else(|| random_user_agent().to_string())
}

/// Chromium flags for crawling the directory: pt-BR content, no images.
pub fn launch_args(options: &CrawlOptions) -> Vec<String> {
    vec![
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--disable-gpu".to_string(),
        "--lang=pt-BR".to_string(),
        "--blink-settings=imagesEnabled=false".to_string(),
        format!("--user-agent={}", user_agent_for(options)),
    ]
}

pub fn build_browser_config(exe: &str, options: &CrawlOptions) -> BrowserResult<BrowserConfig> {
    let mut builder = BrowserConfig::builder()
        .chrome_executable(exe)
        .viewport(Viewport {
            width: WINDOW_WIDTH,
            height: WINDOW_HEIGHT,
            device_scale_factor: Some(1.0),
            emulating_mobile: false,
            is_landscape: true,
            has_touch: false,
        })
        .window_size(WINDOW_WIDTH, WINDOW_HEIGHT)
        .args(launch_args(options));

    if !options.headless {
        builder = builder.with_head();
    }

    builder
        .build()
        .map_err(|e| ScoutError::Browser(format!("failed to build browser config: {}", e)))
}

// ── Session ──────────────────────────────────────────────────────────────────

/// One Chromium process with a single tab, driven sequentially.
pub struct ChromeSession {
    browser: Option<Browser>,
    page: Page,
    handler: JoinHandle<()>,
}

impl ChromeSession {
    /// Launch a browser and open a blank tab.
    pub async fn launch(options: &CrawlOptions) -> BrowserResult<Self> {
        let exe = find_chrome_executable().ok_or_else(|| {
            ScoutError::Browser(
                "No browser found. Install Chrome or Chromium, or set CHROME_EXECUTABLE."
                    .to_string(),
            )
        })?;

        info!("🚀 Launching browser ({}), headless={}", exe, options.headless);
        let config = build_browser_config(&exe, options)?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScoutError::Browser(format!("failed to launch ({}): {}", exe, e)))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!("CDP handler error: {}", e);
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                browser.close().await.ok();
                handler.abort();
                return Err(ScoutError::Browser(format!("failed to open tab: {}", e)));
            }
        };

        Ok(Self {
            browser: Some(browser),
            page,
            handler,
        })
    }

    async fn elements(&self, selector: &str) -> BrowserResult<Vec<chromiumoxide::Element>> {
        self.page
            .find_elements(selector)
            .await
            .map_err(|e| ScoutError::Browser(format!("query `{}` failed: {}", selector, e)))
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn navigate(&mut self, url: &str) -> BrowserResult<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| ScoutError::Navigation {
                url: url.to_string(),
                msg: e.to_string(),
            })?;
        Ok(())
    }

    async fn content(&mut self) -> BrowserResult<String> {
        self.page
            .content()
            .await
            .map_err(|e| ScoutError::Browser(format!("failed to get page content: {}", e)))
    }

    async fn exists(&mut self, selector: &str) -> BrowserResult<bool> {
        Ok(!self.elements(selector).await?.is_empty())
    }

    async fn outer_html_all(&mut self, selector: &str) -> BrowserResult<Vec<String>> {
        let mut out = Vec::new();
        for el in self.elements(selector).await? {
            let html = el
                .outer_html()
                .await
                .map_err(|e| ScoutError::Browser(format!("outerHTML failed: {}", e)))?;
            out.push(html.unwrap_or_default());
        }
        Ok(out)
    }

    async fn texts(&mut self, selector: &str) -> BrowserResult<Vec<String>> {
        let mut out = Vec::new();
        for el in self.elements(selector).await? {
            let text = el
                .inner_text()
                .await
                .map_err(|e| ScoutError::Browser(format!("innerText failed: {}", e)))?;
            out.push(text.unwrap_or_default());
        }
        Ok(out)
    }

    async fn click(&mut self, selector: &str) -> BrowserResult<bool> {
        let Some(el) = self.elements(selector).await?.into_iter().next() else {
            return Ok(false);
        };
        el.click()
            .await
            .map_err(|e| ScoutError::Browser(format!("click `{}` failed: {}", selector, e)))?;
        Ok(true)
    }

    async fn close(&mut self) -> BrowserResult<()> {
        let Some(mut browser) = self.browser.take() else {
            return Ok(());
        };
        let result = browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| ScoutError::Browser(format!("browser close failed: {}", e)));
        browser.wait().await.ok();
        self.handler.abort();
        info!("🛑 Browser closed");
        result
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        // Drop cannot await; close in the background when a runtime is available.
        let Some(mut browser) = self.browser.take() else {
            return;
        };
        self.handler.abort();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                let _ = browser.close().await;
            });
        }
    }
}
