//! Core types for the traffic simulation
//!
//! These are standalone types that don't depend on Bevy.

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Mean Earth radius in meters, used for haversine distances
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Fallback center when the user's position can't be determined (Dakar)
pub const DEFAULT_CENTER: LatLng = LatLng {
    lat: 14.7167,
    lng: -17.4677,
};

/// A unique identifier for a simulated unit
///
/// Ids are never reused, even across restarts, so they double as route tickets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(pub u64);

/// A wrapper type for marker IDs handed out by a map view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(pub u64);

/// A geographic coordinate in degrees
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(from = "[f64; 2]")]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Shift by the given number of degrees on each axis
    pub fn offset(&self, d_lat: f64, d_lng: f64) -> LatLng {
        LatLng::new(self.lat + d_lat, self.lng + d_lng)
    }

    pub fn lerp(&self, other: &LatLng, t: f64) -> LatLng {
        LatLng {
            lat: self.lat + (other.lat - self.lat) * t,
            lng: self.lng + (other.lng - self.lng) * t,
        }
    }

    /// Great-circle distance in meters
    pub fn distance_m(&self, other: &LatLng) -> f64 {
        let phi1 = self.lat.to_radians();
        let phi2 = other.lat.to_radians();
        let d_phi = (other.lat - self.lat).to_radians();
        let d_lambda = (other.lng - self.lng).to_radians();

        let a = (d_phi / 2.0).sin().powi(2)
            + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
    }
}

impl From<[f64; 2]> for LatLng {
    fn from([lat, lng]: [f64; 2]) -> Self {
        LatLng::new(lat, lng)
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5},{:.5}", self.lat, self.lng)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseLatLngError {
    #[error("expected `LAT,LNG`, got `{0}`")]
    Format(String),
    #[error("invalid number `{0}`")]
    Number(String),
    #[error("coordinate out of range: {0}")]
    Range(String),
}

impl FromStr for LatLng {
    type Err = ParseLatLngError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lng) = s
            .split_once(',')
            .ok_or_else(|| ParseLatLngError::Format(s.to_string()))?;
        let parse = |part: &str| {
            part.trim()
                .parse::<f64>()
                .map_err(|_| ParseLatLngError::Number(part.trim().to_string()))
        };
        let (lat, lng) = (parse(lat)?, parse(lng)?);

        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(ParseLatLngError::Range(s.to_string()));
        }
        Ok(LatLng::new(lat, lng))
    }
}

/// A route between two points as returned by a routing backend
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Route {
    pub points: Vec<LatLng>,
    /// Total length in meters
    pub distance_m: f64,
    /// Expected travel time in seconds
    pub duration_s: f64,
}

/// Sum of great-circle distances between consecutive points
pub fn path_length_m(points: &[LatLng]) -> f64 {
    points.windows(2).map(|w| w[0].distance_m(&w[1])).sum()
}
