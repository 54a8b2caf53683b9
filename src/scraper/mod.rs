//! Paginated page walking.
//!
//! Drives a `PageDriver` through a site's result pages: wait, scroll to the
//! bottom, extract the listing columns, then click through to the next page
//! until the control disappears. The next-page click is the only retried
//! operation in the tool, and the retry is strictly bounded.

pub mod cleaner;
pub mod extract;

use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::browser::{BrowserError, PageDriver};
use crate::config::ScraperConfig;
use crate::models::{ExtractError, RawTable};
use crate::sites::SiteProfile;

// ── Options ───────────────────────────────────────────────────────────────────

/// Knobs for one walk. All timing lives here so tests can zero it out.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Pause after landing on a page before reading it.
    pub page_delay: Duration,
    /// Pause after a next-click before checking where we landed, and between
    /// click attempts.
    pub click_wait: Duration,
    /// How long to wait for the next-control to become clickable.
    pub clickable_timeout: Duration,
    /// Consecutive failed click attempts tolerated before giving up.
    pub max_click_retries: u32,
    /// Stop after the first page.
    pub debug_mode: bool,
}

impl WalkOptions {
    pub fn from_config(config: &ScraperConfig, debug_override: bool) -> Self {
        Self {
            page_delay: Duration::from_secs(config.page_delay_secs),
            click_wait: Duration::from_secs(config.click_wait_secs),
            clickable_timeout: Duration::from_secs(config.clickable_timeout_secs),
            max_click_retries: config.max_click_retries,
            debug_mode: debug_override || config.debug_mode,
        }
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum NavError {
    #[error("page URL did not change after clicking next ({url})")]
    UrlUnchanged { url: Url },

    #[error("landed on foreign host `{got}` (expected `{expected}`)")]
    LeftSite { got: String, expected: String },

    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error("next-page click still failing after {attempts} attempts")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<NavError>,
    },
}

#[derive(Debug, Error)]
pub enum WalkError {
    #[error("extraction failed: {0}")]
    Extract(#[from] ExtractError),

    #[error("pagination failed: {0}")]
    Nav(#[from] NavError),

    #[error("browser failed: {0}")]
    Browser(#[from] BrowserError),
}

// ── Walker ────────────────────────────────────────────────────────────────────

/// Walk every results page of a site and accumulate the raw listing columns.
///
/// Terminates cleanly when the next-control is gone (last page) or after the
/// first page in debug mode. Extraction and navigation failures abort the
/// walk; partial tables are never returned.
pub async fn walk_pages<D: PageDriver>(
    driver: &D,
    profile: &SiteProfile,
    opts: &WalkOptions,
) -> Result<RawTable, WalkError> {
    info!("Walking {} from {}", profile.site, profile.start_url);
    driver.goto(profile.start_url).await?;

    let mut table = RawTable::new();
    let mut page_nr = 1u32;

    loop {
        tokio::time::sleep(opts.page_delay).await;
        driver.scroll_to_bottom().await?;

        let html = driver.page_source().await?;
        let page_url = driver.current_url().await?;
        let rows = extract::extract_page(&html, &page_url, profile)?;
        debug!("Page {}: {} ads", page_nr, rows.len());
        table.extend(rows)?;

        if opts.debug_mode {
            debug!("Debug mode — stopping after page {}", page_nr);
            break;
        }
        if !driver.has_element(profile.next_selector).await? {
            debug!("No next control on page {} — walk complete", page_nr);
            break;
        }

        click_next(driver, profile, opts).await?;
        page_nr += 1;
    }

    info!("{}: {} ads over {} page(s)", profile.site, table.len(), page_nr);
    Ok(table)
}

/// Click through to the next results page.
///
/// An attempt succeeds when the page URL changes and stays on the site's
/// host. Failed attempts are retried after `click_wait`, `max_click_retries`
/// attempts in total; exhausting the budget is fatal for the walk.
pub async fn click_next<D: PageDriver>(
    driver: &D,
    profile: &SiteProfile,
    opts: &WalkOptions,
) -> Result<(), NavError> {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match try_click_next(driver, profile, opts).await {
            Ok(()) => return Ok(()),
            Err(e) if attempt >= opts.max_click_retries => {
                return Err(NavError::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(e),
                });
            }
            Err(e) => {
                warn!(
                    "Next-page click failed (attempt {}/{}): {}",
                    attempt, opts.max_click_retries, e
                );
                tokio::time::sleep(opts.click_wait).await;
            }
        }
    }
}

async fn try_click_next<D: PageDriver>(
    driver: &D,
    profile: &SiteProfile,
    opts: &WalkOptions,
) -> Result<(), NavError> {
    let old_url = driver.current_url().await?;
    driver
        .click(profile.next_selector, opts.clickable_timeout)
        .await?;
    tokio::time::sleep(opts.click_wait).await;
    let new_url = driver.current_url().await?;
    verify_navigation(&old_url, &new_url, profile.host)
}

/// A click that leaves the URL alone (dead button) or dumps the session on
/// another host (interstitial, captcha redirect) did not navigate.
fn verify_navigation(old: &Url, new: &Url, expected_host: &str) -> Result<(), NavError> {
    if new == old {
        return Err(NavError::UrlUnchanged { url: new.clone() });
    }
    match new.host_str() {
        Some(host) if host == expected_host => Ok(()),
        other => Err(NavError::LeftSite {
            got: other.unwrap_or("<no host>").to_string(),
            expected: expected_host.to_string(),
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
