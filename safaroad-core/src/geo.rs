//! Geospatial helpers for the "nearby" filter

use crate::config::EARTH_RADIUS_KM;
use crate::database::Incident;
use serde::{Deserialize, Serialize};

/// A point on the globe in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Distance to an incident, infinite when the incident has no position
    pub fn distance_to_incident(&self, incident: &Incident) -> f64 {
        match (incident.lat, incident.lng) {
            (Some(lat), Some(lng)) => distance_km(self.lat, self.lng, lat, lng),
            _ => f64::INFINITY,
        }
    }
}

/// A coordinate counts as missing when it is zero or NaN
fn is_missing(value: f64) -> bool {
    value == 0.0 || value.is_nan()
}

/// Haversine great-circle distance in kilometers.
///
/// Returns `f64::INFINITY` if any coordinate is missing, so a point without
/// a usable position never satisfies a distance predicate. Note that this
/// also excludes points exactly on the equator or the prime meridian.
pub fn distance_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    if [lat1, lng1, lat2, lng2].into_iter().any(is_missing) {
        return f64::INFINITY;
    }

    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}
