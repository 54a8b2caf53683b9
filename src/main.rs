mod browser;
mod config;
mod distance;
mod filter;
mod models;
mod pipeline;
mod scraper;
mod sites;
mod storage;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::AppConfig;
use crate::distance::DistanceMemo;
use crate::distance::cache::DistanceCache;
use crate::distance::geo::DistanceMethod;
use crate::distance::geocode::NominatimClient;
use crate::pipeline::Pipeline;
use crate::sites::Site;
use crate::storage::{DataPaths, Dataset};

#[derive(Parser)]
#[command(name = "huurscout", about = "Dutch rental listing scraper", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape the listing sites, then rebuild the filtered report
    Scrape {
        /// Site to scrape (repeatable); default: pararius and jaap
        #[arg(long = "site", value_enum)]
        sites: Vec<Site>,

        /// Stop after the first results page (no pagination clicks)
        #[arg(long)]
        debug: bool,
    },

    /// Re-filter the accumulated dataset into the report, without a browser
    Filter,

    /// One-shot distance lookup between two addresses
    Distance {
        from: String,
        to: String,

        #[arg(long, value_enum, default_value = "geodesic")]
        method: DistanceMethod,

        /// Bypass the on-disk distance memo for this lookup
        #[arg(long)]
        no_cache: bool,
    },

    /// Show dataset statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "huurscout=info,warn",
        1 => "huurscout=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let config = AppConfig::load()?;

    match cli.command {
        Command::Scrape { sites, debug } => {
            let sites = if sites.is_empty() {
                Site::DEFAULT.to_vec()
            } else {
                sites
            };
            if sites.contains(&Site::Funda) {
                warn!("funda fronts its listings with bot detection; expect the walk to be cut short");
            }

            let _t = utils::Timer::start("Scrape run");
            let stats = Pipeline::new(config).run_scrape(&sites, debug).await?;
            info!(
                "Done: {} ads found, {} appended, {} in the report",
                stats.listings_found, stats.rows_appended, stats.report_rows
            );
        }

        Command::Filter => {
            let rows = Pipeline::new(config).run_report().await?;
            info!("Report rebuilt: {} rows", rows);
        }

        Command::Distance {
            from,
            to,
            method,
            no_cache,
        } => {
            let geocoder = NominatimClient::new(&config.geocoder)?;
            let cache = if no_cache {
                None
            } else {
                let paths = DataPaths::new(&config.storage.data_dir);
                Some(DistanceCache::open(paths.distance_cache())?)
            };

            let mut memo = DistanceMemo::new(geocoder, method, cache);
            match memo.distance_between(&from, &to).await? {
                Some(km) => println!("{:.2} km", km),
                None => println!("One of the addresses could not be geocoded."),
            }
        }

        Command::Stats => {
            let paths = DataPaths::new(&config.storage.data_dir);
            let rows = Dataset::open(paths.dataset())?.load()?;
            let cache = DistanceCache::open(paths.distance_cache())?;

            let mut per_site: BTreeMap<&str, usize> = BTreeMap::new();
            for row in &rows {
                *per_site.entry(row.website.as_str()).or_default() += 1;
            }
            let min = rows.iter().map(|r| r.scrape_date).min();
            let max = rows.iter().map(|r| r.scrape_date).max();

            println!("─────────────────────────────────");
            println!("  huurscout — Dataset Stats");
            println!("─────────────────────────────────");
            println!("  Listings : {}", rows.len());
            for (site, n) in &per_site {
                println!("    {:<16}: {}", site, n);
            }
            println!("  From     : {}", min.map(|d| d.to_string()).unwrap_or("—".into()));
            println!("  To       : {}", max.map(|d| d.to_string()).unwrap_or("—".into()));
            println!("  Distances: {} cached pair(s)", cache.len());
            println!("─────────────────────────────────");
        }
    }

    Ok(())
}
