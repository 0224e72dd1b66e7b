//! Geographic utilities: great-circle distance, pace and search boxes.
//!
//! Everything here is pure and holds no state, so it is safe to call from
//! any thread.

use geo::{coord, Rect};
use rstar::AABB;
use serde::{Deserialize, Serialize};

use crate::{Coordinate, TrackPoint};

/// Mean Earth radius used by every distance computation, in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Guard against division by zero when scaling longitude near the poles.
const POLE_EPSILON: f64 = 1e-12;

/// Calculate haversine distance between two coordinates in meters.
///
/// # Example
/// ```
/// use activity_tracker::{haversine_distance, Coordinate};
///
/// let london = Coordinate::new(51.5074, -0.1278);
/// let paris = Coordinate::new(48.8566, 2.3522);
/// let meters = haversine_distance(&london, &paris);
/// assert!((meters - 343_556.0).abs() < 1.0);
/// ```
pub fn haversine_distance(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // Rounding can push h slightly outside [0, 1] for antipodal points
    let h = h.clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_METERS * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Sum the haversine distance between each consecutive pair of points.
///
/// Returns 0 for fewer than two points. GPS jitter is not filtered: every
/// sample contributes its raw displacement.
pub fn accumulate_distance(points: &[TrackPoint]) -> f64 {
    points
        .windows(2)
        .map(|w| haversine_distance(&w[0].coordinate(), &w[1].coordinate()))
        .sum()
}

/// Pace in seconds per kilometer, or `None` while there is no distance or
/// no elapsed time yet.
pub fn calculate_pace(distance_meters: f64, duration_ms: i64) -> Option<f64> {
    if distance_meters <= 0.0 || duration_ms <= 0 {
        return None;
    }
    Some((duration_ms as f64 / 1000.0) / (distance_meters / 1000.0))
}

/// Great-circle distance in kilometers.
pub fn distance_between_coordinates(a: &Coordinate, b: &Coordinate) -> f64 {
    haversine_distance(a, b) / 1000.0
}

/// Great-circle distance in meters.
pub fn distance_between_coordinates_meters(a: &Coordinate, b: &Coordinate) -> f64 {
    haversine_distance(a, b)
}

/// Axis-aligned lat/lon box used for proximity queries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct SearchBox {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl SearchBox {
    /// Check whether a coordinate lies inside the box (edges inclusive).
    pub fn contains(&self, c: &Coordinate) -> bool {
        c.latitude >= self.min_latitude
            && c.latitude <= self.max_latitude
            && c.longitude >= self.min_longitude
            && c.longitude <= self.max_longitude
    }

    /// Center point of the box.
    pub fn center(&self) -> Coordinate {
        Coordinate::new(
            (self.min_latitude + self.max_latitude) / 2.0,
            (self.min_longitude + self.max_longitude) / 2.0,
        )
    }

    /// The box as a `geo` rectangle (x = longitude, y = latitude).
    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            coord! { x: self.min_longitude, y: self.min_latitude },
            coord! { x: self.max_longitude, y: self.max_latitude },
        )
    }

    /// R-tree envelopes covering the box.
    ///
    /// A box that crosses the antimeridian is split into two envelopes so
    /// that points stored with longitudes in [-180, 180] are still found.
    pub fn envelopes(&self) -> Vec<AABB<[f64; 2]>> {
        let (min_lat, max_lat) = (self.min_latitude, self.max_latitude);

        if self.max_longitude - self.min_longitude >= 360.0 {
            return vec![AABB::from_corners([-180.0, min_lat], [180.0, max_lat])];
        }

        let mut envelopes = vec![AABB::from_corners(
            [self.min_longitude.max(-180.0), min_lat],
            [self.max_longitude.min(180.0), max_lat],
        )];
        if self.min_longitude < -180.0 {
            envelopes.push(AABB::from_corners(
                [self.min_longitude + 360.0, min_lat],
                [180.0, max_lat],
            ));
        }
        if self.max_longitude > 180.0 {
            envelopes.push(AABB::from_corners(
                [-180.0, min_lat],
                [self.max_longitude - 360.0, max_lat],
            ));
        }
        envelopes
    }
}

/// Approximate square search box of `radius_km` around a point.
///
/// Uses the equirectangular approximation: the latitude half-height is the
/// radius expressed as an arc, and the longitude half-width is that arc
/// divided by `cos(latitude)`. Latitude bounds are clamped to the poles and
/// the longitude half-width is capped at 180 degrees.
pub fn geohash_bounding_box(latitude: f64, longitude: f64, radius_km: f64) -> SearchBox {
    let radius_km = radius_km.max(0.0);
    let lat_delta = (radius_km * 1000.0 / EARTH_RADIUS_METERS).to_degrees();
    let cos_lat = latitude.to_radians().cos().abs().max(POLE_EPSILON);
    let lon_delta = (lat_delta / cos_lat).min(180.0);

    SearchBox {
        min_latitude: (latitude - lat_delta).max(-90.0),
        max_latitude: (latitude + lat_delta).min(90.0),
        min_longitude: longitude - lon_delta,
        max_longitude: longitude + lon_delta,
    }
}
