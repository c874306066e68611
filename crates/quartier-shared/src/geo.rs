//! Geodesic distance engine.
//!
//! Closed-form great-circle math over WGS-ish spherical coordinates: the
//! Haversine distance, human-readable formatting, radius filtering, and
//! nearest-first sorting.  Pure functions; callers supply every coordinate.
//!
//! Inputs are total over the reals.  Out-of-range latitudes/longitudes
//! produce mathematically defined (if meaningless) results; no validation is
//! performed here.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::constants::EARTH_RADIUS_KM;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Anything that sits at a fixed geographic position.
pub trait Located {
    fn position(&self) -> GeoPoint;
}

impl Located for GeoPoint {
    fn position(&self) -> GeoPoint {
        *self
    }
}

/// Great-circle distance between two points in kilometers.
///
/// Half-angle Haversine in the `atan2` form, Earth radius 6371 km.
pub fn distance_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);

    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Render a distance for display.
///
/// Under one kilometer the value is shown in whole meters (`"450m"`); from
/// one to ten kilometers with a single decimal (`"3.2km"`); beyond that as a
/// whole number of kilometers (`"42km"`).
pub fn format_distance(km: f64) -> String {
    if km < 1.0 {
        format!("{}m", (km * 1000.0).round() as i64)
    } else if km < 10.0 {
        format!("{:.1}km", km)
    } else {
        format!("{}km", km.round() as i64)
    }
}

/// Return `items` sorted nearest-first relative to `origin`.
///
/// The sort is stable, so items at equal distance keep their input order.
pub fn sort_by_distance<T: Located>(items: Vec<T>, origin: GeoPoint) -> Vec<T> {
    let mut decorated: Vec<(f64, T)> = items
        .into_iter()
        .map(|item| (distance_km(origin, item.position()), item))
        .collect();

    decorated.sort_by(|(da, _), (db, _)| da.partial_cmp(db).unwrap_or(Ordering::Equal));

    decorated.into_iter().map(|(_, item)| item).collect()
}

/// Keep only the items within `radius_km` of `origin`.
///
/// The boundary is inclusive: an item at exactly `radius_km` is retained.
pub fn filter_within_radius<T: Located>(items: Vec<T>, origin: GeoPoint, radius_km: f64) -> Vec<T> {
    items
        .into_iter()
        .filter(|item| distance_km(origin, item.position()) <= radius_km)
        .collect()
}
