//! Great-circle and geodesic distance between coordinates.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Mean Earth radius in km, for the spherical model.
const EARTH_RADIUS_KM: f64 = 6371.0088;

/// WGS-84 ellipsoid, for the geodesic model.
const WGS84_A_KM: f64 = 6378.137;
const WGS84_F: f64 = 1.0 / 298.257_223_563;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMethod {
    /// Vincenty inverse on the WGS-84 ellipsoid.
    Geodesic,
    /// Haversine on a sphere of mean radius.
    GreatCircle,
}

impl DistanceMethod {
    pub fn distance_km(self, a: GeoPoint, b: GeoPoint) -> f64 {
        match self {
            DistanceMethod::Geodesic => geodesic_km(a, b),
            DistanceMethod::GreatCircle => haversine_km(a, b),
        }
    }
}

pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Vincenty inverse formula. Falls back to haversine for the near-antipodal
/// pairs where the iteration does not converge.
pub fn geodesic_km(p1: GeoPoint, p2: GeoPoint) -> f64 {
    let b_axis = WGS84_A_KM * (1.0 - WGS84_F);

    let u1 = ((1.0 - WGS84_F) * p1.lat.to_radians().tan()).atan();
    let u2 = ((1.0 - WGS84_F) * p2.lat.to_radians().tan()).atan();
    let l = (p2.lng - p1.lng).to_radians();

    let (sin_u1, cos_u1) = u1.sin_cos();
    let (sin_u2, cos_u2) = u2.sin_cos();

    let mut lambda = l;
    for _ in 0..200 {
        let (sin_lambda, cos_lambda) = lambda.sin_cos();
        let sin_sigma = ((cos_u2 * sin_lambda).powi(2)
            + (cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda).powi(2))
        .sqrt();
        if sin_sigma == 0.0 {
            // coincident points
            return 0.0;
        }

        let cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
        let sigma = sin_sigma.atan2(cos_sigma);
        let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
        let cos2_alpha = 1.0 - sin_alpha * sin_alpha;
        // equatorial lines have cos²α = 0
        let cos_2sigma_m = if cos2_alpha == 0.0 {
            0.0
        } else {
            cos_sigma - 2.0 * sin_u1 * sin_u2 / cos2_alpha
        };

        let c = WGS84_F / 16.0 * cos2_alpha * (4.0 + WGS84_F * (4.0 - 3.0 * cos2_alpha));
        let prev = lambda;
        lambda = l
            + (1.0 - c)
                * WGS84_F
                * sin_alpha
                * (sigma
                    + c * sin_sigma
                        * (cos_2sigma_m
                            + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)));

        if (lambda - prev).abs() < 1e-12 {
            let u_sq =
                cos2_alpha * (WGS84_A_KM * WGS84_A_KM - b_axis * b_axis) / (b_axis * b_axis);
            let a_coef = 1.0
                + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
            let b_coef = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));
            let delta_sigma = b_coef
                * sin_sigma
                * (cos_2sigma_m
                    + b_coef / 4.0
                        * (cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)
                            - b_coef / 6.0
                                * cos_2sigma_m
                                * (-3.0 + 4.0 * sin_sigma * sin_sigma)
                                * (-3.0 + 4.0 * cos_2sigma_m * cos_2sigma_m)));
            return b_axis * a_coef * (sigma - delta_sigma);
        }
    }

    haversine_km(p1, p2)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
