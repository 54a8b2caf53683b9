//! Pipeline orchestrator: ties browser → cleaner → distances → storage together.
//!
//! ## Run modes
//!
//! `run_scrape()` — the full evening run:
//!   1. Per site: walk every results page through one WebDriver session,
//!      snapshot the raw columns, clean into typed rows, enrich each address
//!      with its distance to the reference station, merge into the dataset.
//!   2. Rebuild the filtered report, pulling long descriptions for Jaap rows
//!      that made the cut (the results list on Jaap carries none).
//!   Re-running on the same listings appends 0 new rows.
//!
//! `run_report()` — offline: re-filter the accumulated dataset and rewrite the
//!   report without touching a browser. Useful after tweaking thresholds.

use crate::browser::{BrowserError, PageDriver, WebDriverSession};
use crate::config::AppConfig;
use crate::distance::DistanceMemo;
use crate::distance::cache::DistanceCache;
use crate::distance::geocode::NominatimClient;
use crate::filter::{filter_listings, finalize};
use crate::models::Listing;
use crate::scraper::cleaner::clean_table;
use crate::scraper::{WalkOptions, walk_pages};
use crate::sites::{Site, SiteProfile};
use crate::storage::{DataPaths, Dataset, write_listings, write_raw_table};
use crate::utils::{Timer, collapse_whitespace};
use anyhow::{Context, Result};
use chrono::Utc;
use rand::RngExt;
use std::time::Duration;
use tracing::{debug, info, warn};

const CONSENT_CLICK_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Pipeline {
    config: AppConfig,
}

impl Pipeline {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub async fn run_scrape(&self, sites: &[Site], debug_mode: bool) -> Result<ScrapeStats> {
        let paths = DataPaths::new(&self.config.storage.data_dir);
        let dataset = Dataset::open(paths.dataset())?;
        let cache = DistanceCache::open(paths.distance_cache())
            .context("Failed to open distance cache")?;
        let geocoder =
            NominatimClient::new(&self.config.geocoder).context("Failed to build geocoder")?;
        let mut memo = DistanceMemo::new(geocoder, self.config.geocoder.method, Some(cache));
        let opts = WalkOptions::from_config(&self.config.scraper, debug_mode);

        let session = WebDriverSession::connect(&self.config.scraper)
            .await
            .context("Failed to start WebDriver session")?;

        let result = self
            .scrape_all(&session, sites, &opts, &paths, &dataset, &mut memo)
            .await;

        if let Err(e) = session.close().await {
            warn!("WebDriver session did not close cleanly: {}", e);
        }
        result
    }

    /// Re-filter the dataset and rewrite the report, no browser involved.
    pub async fn run_report(&self) -> Result<usize> {
        self.report(None::<&WebDriverSession>).await
    }

    async fn scrape_all(
        &self,
        session: &WebDriverSession,
        sites: &[Site],
        opts: &WalkOptions,
        paths: &DataPaths,
        dataset: &Dataset,
        memo: &mut DistanceMemo<NominatimClient>,
    ) -> Result<ScrapeStats> {
        let mut stats = ScrapeStats {
            sites: sites.len(),
            ..ScrapeStats::default()
        };

        for (step, &site) in sites.iter().enumerate() {
            let profile = site.profile();
            info!("=== Step {}: Scraping {} ===", step + 1, site);
            let _timer = Timer::start(format!("{site} scrape"));

            accept_consent(session, profile, opts.page_delay).await;

            let table = walk_pages(session, profile, opts)
                .await
                .with_context(|| format!("Walking {site} failed"))?;
            stats.listings_found += table.len();

            let now = Utc::now().naive_utc();
            write_raw_table(&paths.raw_snapshot(site, now), &table)?;

            let mut rows = clean_table(site, &table, now);
            write_listings(&paths.cleaned_snapshot(site, now), &rows)?;

            stats.unresolved_addresses += enrich_distances(
                memo,
                &self.config.geocoder.station_address,
                &mut rows,
            )
            .await?;
            write_listings(&paths.enriched_snapshot(site, now), &rows)?;

            let appended = dataset.append_dedup(&rows, Some(&paths.backup(now)))?;
            stats.rows_appended += appended.appended;
            stats.duplicates_skipped += appended.skipped;
        }

        info!("=== Step {}: Filtered report ===", sites.len() + 1);
        let browser = sites.contains(&Site::Jaap).then_some(session);
        stats.report_rows = self.report(browser).await?;

        info!(
            "=== Done: {} site(s) | {} ads found | {} appended | {} duplicates | {} unresolved addresses ===",
            stats.sites,
            stats.listings_found,
            stats.rows_appended,
            stats.duplicates_skipped,
            stats.unresolved_addresses,
        );
        Ok(stats)
    }

    async fn report<D: PageDriver>(&self, browser: Option<&D>) -> Result<usize> {
        let paths = DataPaths::new(&self.config.storage.data_dir);
        let rows = Dataset::open(paths.dataset())?.load()?;

        let mut picked = filter_listings(&rows, &self.config.filter);
        info!("{} of {} rows pass the thresholds", picked.len(), rows.len());

        if let Some(driver) = browser {
            let fetched = add_jaap_descriptions(driver, &mut picked).await;
            if fetched > 0 {
                info!("Fetched {} Jaap description(s)", fetched);
            }
        }

        let picked = finalize(picked);
        write_listings(&paths.filtered(), &picked)?;
        info!("Wrote {:?} ({} rows)", paths.filtered(), picked.len());
        Ok(picked.len())
    }
}

/// Distance from every row's address to the reference station, via the memo.
/// Returns how many addresses the geocoder could not place; those rows keep
/// an empty distance and fall out of the filtered report.
async fn enrich_distances(
    memo: &mut DistanceMemo<NominatimClient>,
    station: &str,
    rows: &mut [Listing],
) -> Result<usize> {
    let mut unresolved = 0usize;
    for row in rows.iter_mut() {
        let Some(address) = &row.address else {
            continue;
        };
        match memo.distance_between(address, station).await? {
            Some(km) => row.dist_to_station = Some(km),
            None => unresolved += 1,
        }
    }
    if unresolved > 0 {
        warn!("{} address(es) could not be geocoded", unresolved);
    }
    Ok(unresolved)
}

/// Dismiss the site's consent banner if it has one. Best-effort: the banner
/// only shows on fresh sessions, so a failed click is logged and ignored.
async fn accept_consent<D: PageDriver>(driver: &D, profile: &SiteProfile, settle: Duration) {
    let Some(selector) = profile.consent_selector else {
        return;
    };
    let attempt = async {
        driver.goto(profile.start_url).await?;
        tokio::time::sleep(settle).await;
        driver.click(selector, CONSENT_CLICK_TIMEOUT).await
    };
    match attempt.await {
        Ok(()) => info!("Accepted consent banner on {}", profile.host),
        Err(e) => warn!("Consent banner on {} not dismissed: {}", profile.host, e),
    }
}

/// Jaap's results list has no description text; fetch it from each ad's own
/// page for the rows that survived filtering. Per-row failures are logged
/// and skipped so one dead ad page cannot sink the report.
async fn add_jaap_descriptions<D: PageDriver>(driver: &D, rows: &mut [Listing]) -> usize {
    let profile = Site::Jaap.profile();
    let Some(selector) = profile.detail_descr_selector else {
        return 0;
    };

    let mut fetched = 0usize;
    for row in rows.iter_mut() {
        if row.website != profile.host || row.ad_descr.is_some() {
            continue;
        }
        let Some(url) = row.ad_url.clone() else {
            continue;
        };
        match fetch_description(driver, &url, selector).await {
            Ok(Some(text)) => {
                row.ad_descr = Some(text);
                fetched += 1;
            }
            Ok(None) => debug!("No description block at {}", url),
            Err(e) => warn!("Description fetch for {} failed: {}", url, e),
        }
    }
    fetched
}

async fn fetch_description<D: PageDriver>(
    driver: &D,
    url: &str,
    selector: &str,
) -> Result<Option<String>, BrowserError> {
    driver.goto(url).await?;
    // jittered pause so the detail pages are not hammered in lockstep
    let jitter = Duration::from_millis(1000 + rand::rng().random_range(0..1000));
    tokio::time::sleep(jitter).await;

    Ok(driver
        .first_text(selector)
        .await?
        .map(|t| collapse_whitespace(&t))
        .filter(|t| !t.is_empty()))
}

#[derive(Debug, Default)]
pub struct ScrapeStats {
    pub sites: usize,
    pub listings_found: usize,
    pub rows_appended: usize,
    pub duplicates_skipped: usize,
    pub unresolved_addresses: usize,
    pub report_rows: usize,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
