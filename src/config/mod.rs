use crate::distance::geo::DistanceMethod;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub scraper: ScraperConfig,
    pub geocoder: GeocoderConfig,
    pub storage: StorageConfig,
    pub filter: FilterConfig,
}

/// Browser/walker configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScraperConfig {
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    #[serde(default = "default_page_delay_secs")]
    pub page_delay_secs: u64,

    #[serde(default = "default_click_wait_secs")]
    pub click_wait_secs: u64,

    #[serde(default = "default_clickable_timeout_secs")]
    pub clickable_timeout_secs: u64,

    #[serde(default = "default_max_click_retries")]
    pub max_click_retries: u32,

    /// Stop after the first results page; no pagination clicks.
    #[serde(default)]
    pub debug_mode: bool,

    #[serde(default)]
    pub headless: bool,
}

/// Nominatim + distance configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeocoderConfig {
    #[serde(default = "default_geocoder_base_url")]
    pub base_url: String,

    #[serde(default = "default_geocoder_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Nominatim asks for at most one request per second.
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,

    #[serde(default = "default_station_address")]
    pub station_address: String,

    #[serde(default = "default_method")]
    pub method: DistanceMethod,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// Report thresholds
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FilterConfig {
    #[serde(default = "default_max_price")]
    pub max_price: u32,

    #[serde(default = "default_min_rooms")]
    pub min_rooms: u32,

    #[serde(default = "default_min_size_m2")]
    pub min_size_m2: u32,

    #[serde(default = "default_max_dist_km")]
    pub max_dist_to_station_km: f64,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}
fn default_page_delay_secs() -> u64 {
    2
}
fn default_click_wait_secs() -> u64 {
    2
}
fn default_clickable_timeout_secs() -> u64 {
    20
}
fn default_max_click_retries() -> u32 {
    5
}
fn default_geocoder_base_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}
fn default_geocoder_user_agent() -> String {
    "huurscout/0.1 (personal rental search)".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_min_delay_ms() -> u64 {
    1000
}
fn default_station_address() -> String {
    "Utrecht Centraal Station".to_string()
}
fn default_method() -> DistanceMethod {
    DistanceMethod::Geodesic
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_max_price() -> u32 {
    1450
}
fn default_min_rooms() -> u32 {
    3
}
fn default_min_size_m2() -> u32 {
    60
}
fn default_max_dist_km() -> f64 {
    2.0
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("HUUR").separator("__"))
            .build()?;

        let app_cfg: AppConfig = cfg.try_deserialize().unwrap_or_else(|_| AppConfig::default());
        Ok(app_cfg)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scraper: ScraperConfig {
                webdriver_url: default_webdriver_url(),
                page_delay_secs: default_page_delay_secs(),
                click_wait_secs: default_click_wait_secs(),
                clickable_timeout_secs: default_clickable_timeout_secs(),
                max_click_retries: default_max_click_retries(),
                debug_mode: false,
                headless: false,
            },
            geocoder: GeocoderConfig {
                base_url: default_geocoder_base_url(),
                user_agent: default_geocoder_user_agent(),
                timeout_secs: default_timeout_secs(),
                min_delay_ms: default_min_delay_ms(),
                station_address: default_station_address(),
                method: default_method(),
            },
            storage: StorageConfig {
                data_dir: default_data_dir(),
            },
            filter: FilterConfig {
                max_price: default_max_price(),
                min_rooms: default_min_rooms(),
                min_size_m2: default_min_size_m2(),
                max_dist_to_station_km: default_max_dist_km(),
            },
        }
    }
}
