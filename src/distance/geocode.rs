//! Geocoding through Nominatim.
//!
//! One outbound request per second at most, per the service's usage policy
//! for anonymous clients. The `Geocoder` trait is the seam the distance memo
//! is written against; tests substitute a canned implementation.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use super::address::{NormalizedAddress, strip_housing_keywords};
use super::geo::GeoPoint;
use crate::config::GeocoderConfig;

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("geocoder request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("geocoder returned malformed coordinates: {0}")]
    Malformed(String),
}

/// What to ask the geocoder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GeoQuery {
    /// Free-text search.
    Free(String),
    /// Structured postal-code lookup, pinned to the Netherlands.
    Postal(String),
}

impl GeoQuery {
    /// Query for a normalized address: structured lookup for postal codes,
    /// keyword-stripped free text for everything else.
    pub fn for_address(addr: &NormalizedAddress) -> Self {
        match addr {
            NormalizedAddress::Postcode(code) => GeoQuery::Postal(code.clone()),
            NormalizedAddress::Street(s) => GeoQuery::Free(strip_housing_keywords(s)),
        }
    }
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve a query to a point; `Ok(None)` when the service has no match.
    async fn resolve(&self, query: &GeoQuery) -> Result<Option<GeoPoint>, GeocodeError>;
}

// ── Rate gate ─────────────────────────────────────────────────────────────────

/// Capacity-one gate: callers pass one at a time, spaced at least
/// `min_delay` apart.
pub struct RateGate {
    min_delay: Duration,
    last: Mutex<Option<Instant>>,
}

impl RateGate {
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            last: Mutex::new(None),
        }
    }

    pub async fn wait(&self) {
        let mut last = self.last.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_delay {
                tokio::time::sleep(self.min_delay - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

// ── Nominatim client ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

pub struct NominatimClient {
    http: Client,
    base_url: String,
    gate: RateGate,
}

impl NominatimClient {
    pub fn new(config: &GeocoderConfig) -> Result<Self, GeocodeError> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            gate: RateGate::new(Duration::from_millis(config.min_delay_ms)),
        })
    }

    fn search_request(&self, query: &GeoQuery) -> reqwest::RequestBuilder {
        let url = format!("{}/search", self.base_url);
        let mut params: Vec<(&str, &str)> = vec![("format", "jsonv2"), ("limit", "1")];
        match query {
            GeoQuery::Free(q) => params.push(("q", q)),
            GeoQuery::Postal(code) => {
                params.push(("postalcode", code));
                params.push(("country", "Netherlands"));
            }
        }
        self.http.get(&url).query(&params)
    }

    /// Nominatim serves coordinates as strings.
    fn parse_places(places: &[Place]) -> Result<Option<GeoPoint>, GeocodeError> {
        let Some(place) = places.first() else {
            return Ok(None);
        };
        match (place.lat.parse::<f64>(), place.lon.parse::<f64>()) {
            (Ok(lat), Ok(lng)) => Ok(Some(GeoPoint { lat, lng })),
            _ => Err(GeocodeError::Malformed(format!(
                "lat={} lon={}",
                place.lat, place.lon
            ))),
        }
    }
}

#[async_trait]
impl Geocoder for NominatimClient {
    async fn resolve(&self, query: &GeoQuery) -> Result<Option<GeoPoint>, GeocodeError> {
        self.gate.wait().await;

        debug!("Geocoding {:?}", query);
        let places: Vec<Place> = self
            .search_request(query)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Self::parse_places(&places)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
