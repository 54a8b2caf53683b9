//! Address-to-address distances with a persistent memo.
//!
//! The expensive step is geocoding, so pairs are normalized up front and
//! memoized under an order-insensitive key: once any ordering of a pair has
//! been resolved, neither ordering ever geocodes again. An address the
//! geocoder cannot place is a normal outcome, not an error.

pub mod address;
pub mod cache;
pub mod geo;
pub mod geocode;

use thiserror::Error;
use tracing::{debug, warn};

use self::address::NormalizedAddress;
use self::cache::{CacheError, DistanceCache, pair_key};
use self::geo::{DistanceMethod, GeoPoint};
use self::geocode::{GeoQuery, GeocodeError, Geocoder};

#[derive(Debug, Error)]
pub enum DistanceError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Geocode(#[from] GeocodeError),
}

/// Memoized distance oracle.
pub struct DistanceMemo<G> {
    geocoder: G,
    method: DistanceMethod,
    cache: Option<DistanceCache>,
}

impl<G: Geocoder> DistanceMemo<G> {
    pub fn new(geocoder: G, method: DistanceMethod, cache: Option<DistanceCache>) -> Self {
        Self {
            geocoder,
            method,
            cache,
        }
    }

    /// Kilometres between two addresses; `Ok(None)` when either side cannot
    /// be resolved. Argument order never matters.
    pub async fn distance_between(
        &mut self,
        addr1: &str,
        addr2: &str,
    ) -> Result<Option<f64>, DistanceError> {
        let a = NormalizedAddress::parse(addr1);
        let b = NormalizedAddress::parse(addr2);
        let key = pair_key(a.key(), b.key());

        if let Some(cache) = &self.cache {
            if let Some(km) = cache.get(&key) {
                debug!("Distance cache hit: {} → {:.2} km", key, km);
                return Ok(Some(km));
            }
        }

        let Some(p1) = self.resolve(&a).await? else {
            return Ok(None);
        };
        let Some(p2) = self.resolve(&b).await? else {
            return Ok(None);
        };

        let km = self.method.distance_km(p1, p2);
        debug!("Computed {}: {:.2} km", key, km);

        if let Some(cache) = &mut self.cache {
            cache.insert(key, km)?;
        }
        Ok(Some(km))
    }

    async fn resolve(&self, addr: &NormalizedAddress) -> Result<Option<GeoPoint>, DistanceError> {
        let query = GeoQuery::for_address(addr);
        match self.geocoder.resolve(&query).await? {
            Some(point) => Ok(Some(point)),
            None => {
                warn!("Could not geocode {:?}", addr.key());
                Ok(None)
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
