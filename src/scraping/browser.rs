//! The browser collaborator the harvesting core drives.
//!
//! The core only needs a handful of capabilities: navigate, read the
//! rendered document, query it with CSS selectors, click, and close. Keeping
//! them behind [`BrowserSession`] lets the crawler run against the native
//! Chromium session in production and against a scripted fake in tests.
//!
//! Readiness is explicit: instead of sleeping a fixed interval after each
//! navigation, callers poll for a condition with a bounded timeout
//! ([`wait_for_selector`], [`wait_for_change`]).

use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::core::ScoutError;

pub type BrowserResult<T> = Result<T, ScoutError>;

#[async_trait]
pub trait BrowserSession: Send {
    /// Load `url` in the session's single tab.
    async fn navigate(&mut self, url: &str) -> BrowserResult<()>;

    /// Current rendered markup of the whole document.
    async fn content(&mut self) -> BrowserResult<String>;

    /// Whether at least one element matches `selector`.
    async fn exists(&mut self, selector: &str) -> BrowserResult<bool>;

    /// Outer HTML of every element matching `selector`, in document order.
    async fn outer_html_all(&mut self, selector: &str) -> BrowserResult<Vec<String>>;

    /// Rendered text of every element matching `selector`, in document order.
    async fn texts(&mut self, selector: &str) -> BrowserResult<Vec<String>>;

    /// Click the first element matching `selector`. `Ok(false)` when nothing matched.
    async fn click(&mut self, selector: &str) -> BrowserResult<bool>;

    /// Release the session. Called exactly once, on every exit path.
    async fn close(&mut self) -> BrowserResult<()>;
}

/// Bounded polling contract used in place of fixed settling delays.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaitPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl WaitPolicy {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval: poll_interval.max(Duration::from_millis(1)),
        }
    }
}

/// Poll until `selector` matches or the policy times out.
///
/// Returns `Ok(false)` on timeout; only session errors are propagated.
pub async fn wait_for_selector(
    session: &mut dyn BrowserSession,
    selector: &str,
    policy: WaitPolicy,
) -> BrowserResult<bool> {
    let start = Instant::now();
    loop {
        if session.exists(selector).await? {
            debug!(
                "wait_for_selector: `{}` ready after {}ms",
                selector,
                start.elapsed().as_millis()
            );
            return Ok(true);
        }
        if start.elapsed() >= policy.timeout {
            return Ok(false);
        }
        tokio::time::sleep(policy.poll_interval).await;
    }
}

/// Poll until the markup matched by `selector` is present and differs from
/// `previous`, or the policy times out.
///
/// Used after client-side pagination: the old grid stays in the DOM until the
/// framework swaps it, so presence alone is not a readiness signal.
pub async fn wait_for_change(
    session: &mut dyn BrowserSession,
    selector: &str,
    previous: &[String],
    policy: WaitPolicy,
) -> BrowserResult<bool> {
    let start = Instant::now();
    loop {
        let current = session.outer_html_all(selector).await?;
        if !current.is_empty() && current.as_slice() != previous {
            debug!(
                "wait_for_change: `{}` changed after {}ms",
                selector,
                start.elapsed().as_millis()
            );
            return Ok(true);
        }
        if start.elapsed() >= policy.timeout {
            return Ok(false);
        }
        tokio::time::sleep(policy.poll_interval).await;
    }
}
