//! Spatial index for the nearby activity feed.
//!
//! Entries are stored as points in an R-tree keyed by `[longitude, latitude]`.
//! A query builds a spherical candidate box for the radius, collects
//! candidates from the tree, then keeps only those within the true haversine
//! distance.

use std::collections::HashMap;

use log::debug;
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};
use crate::geo_utils::{haversine_distance, SearchBox, EARTH_RADIUS_METERS};
use crate::geohash::encode_geohash;
use crate::session::ActivitySummary;
use crate::Coordinate;

/// Configuration for nearby queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyConfig {
    /// Radius used by `find_nearby_default`, in kilometers.
    /// Default: 10.0
    pub default_radius_km: f64,
    /// Maximum number of results returned by a query.
    /// Default: 50
    pub max_results: usize,
    /// Precision of the geohash stored with each entry.
    /// Default: 7 (~150 m cells)
    pub geohash_precision: usize,
}

impl Default for NearbyConfig {
    fn default() -> Self {
        Self {
            default_radius_km: 10.0,
            max_results: 50,
            geohash_precision: 7,
        }
    }
}

/// An activity listed in the nearby feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyEntry {
    pub id: String,
    pub activity_type: String,
    pub location: Coordinate,
    pub geohash: String,
}

impl RTreeObject for NearbyEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.location.longitude, self.location.latitude])
    }
}

/// A query hit with its distance from the query center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyMatch {
    pub entry: NearbyEntry,
    pub distance_meters: f64,
}

/// R-tree index of activity locations.
pub struct NearbyIndex {
    tree: RTree<NearbyEntry>,
    entries: HashMap<String, NearbyEntry>,
    config: NearbyConfig,
}

impl NearbyIndex {
    pub fn new() -> Self {
        Self::with_config(NearbyConfig::default())
    }

    pub fn with_config(config: NearbyConfig) -> Self {
        Self {
            tree: RTree::new(),
            entries: HashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &NearbyConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&NearbyEntry> {
        self.entries.get(id)
    }

    /// Add an activity, replacing any entry with the same id.
    ///
    /// Longitudes outside [-180, 180] are wrapped; latitude must be in range.
    pub fn insert(&mut self, id: &str, activity_type: &str, location: Coordinate) -> Result<()> {
        let location = normalize(location)?;
        self.remove(id);

        let entry = NearbyEntry {
            id: id.to_string(),
            activity_type: activity_type.to_string(),
            location,
            geohash: encode_geohash(
                location.latitude,
                location.longitude,
                self.config.geohash_precision,
            ),
        };
        debug!("[NearbyIndex] Insert {} at {}", id, entry.geohash);

        self.tree.insert(entry.clone());
        self.entries.insert(entry.id.clone(), entry);
        Ok(())
    }

    /// Add a finished activity at its first track point.
    ///
    /// Returns `Ok(false)` when the summary has no track points.
    pub fn insert_summary(&mut self, summary: &ActivitySummary) -> Result<bool> {
        let Some(start) = summary.track_points.first() else {
            return Ok(false);
        };
        self.insert(
            &summary.session_id,
            &summary.meta.activity_type,
            start.coordinate(),
        )?;
        Ok(true)
    }

    /// Remove an entry. Returns whether it existed.
    pub fn remove(&mut self, id: &str) -> bool {
        match self.entries.remove(id) {
            Some(entry) => {
                self.tree.remove(&entry);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.tree = RTree::new();
        self.entries.clear();
    }

    /// Entries within `radius_km` of `center`, nearest first (ties by id),
    /// capped at `max_results`.
    pub fn find_nearby(&self, center: Coordinate, radius_km: f64) -> Vec<NearbyMatch> {
        let radius_meters = radius_km.max(0.0) * 1000.0;
        let search = candidate_box(center, radius_meters);

        let mut matches: Vec<NearbyMatch> = search
            .envelopes()
            .iter()
            .flat_map(|envelope| self.tree.locate_in_envelope(envelope))
            .filter_map(|entry| {
                let distance_meters = haversine_distance(&center, &entry.location);
                (distance_meters <= radius_meters).then(|| NearbyMatch {
                    entry: entry.clone(),
                    distance_meters,
                })
            })
            .collect();

        matches.sort_by(|a, b| {
            a.distance_meters
                .total_cmp(&b.distance_meters)
                .then_with(|| a.entry.id.cmp(&b.entry.id))
        });
        matches.truncate(self.config.max_results);

        debug!(
            "[NearbyIndex] {} matches within {:.1}km of ({:.5}, {:.5})",
            matches.len(),
            radius_km,
            center.latitude,
            center.longitude
        );
        matches
    }

    /// `find_nearby` with the configured default radius.
    pub fn find_nearby_default(&self, center: Coordinate) -> Vec<NearbyMatch> {
        self.find_nearby(center, self.config.default_radius_km)
    }

    /// Entries whose stored geohash starts with `prefix` (case-insensitive),
    /// sorted by id.
    pub fn entries_in_cell(&self, prefix: &str) -> Vec<&NearbyEntry> {
        let prefix = prefix.to_ascii_lowercase();
        let mut found: Vec<&NearbyEntry> = self
            .entries
            .values()
            .filter(|e| e.geohash.starts_with(&prefix))
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        found
    }

    /// The `k` entries closest to `center` by haversine distance (ties by
    /// id), for map pins.
    pub fn nearest(&self, center: Coordinate, k: usize) -> Vec<&NearbyEntry> {
        let mut ranked: Vec<(f64, &NearbyEntry)> = self
            .entries
            .values()
            .map(|entry| (haversine_distance(&center, &entry.location), entry))
            .collect();
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.id.cmp(&b.1.id)));
        ranked.into_iter().take(k).map(|(_, entry)| entry).collect()
    }
}

impl Default for NearbyIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Box guaranteed to hold every point within `radius_meters` of `center`.
///
/// When the circle reaches a pole the box spans every longitude and runs to
/// that pole. Otherwise the half-width is the widest longitude offset on the
/// circle, `asin(sin d / cos lat)`.
fn candidate_box(center: Coordinate, radius_meters: f64) -> SearchBox {
    let angular = radius_meters / EARTH_RADIUS_METERS;
    let lat_delta = angular.to_degrees();
    let min_latitude = (center.latitude - lat_delta).max(-90.0);
    let max_latitude = (center.latitude + lat_delta).min(90.0);

    if center.latitude.abs() + lat_delta >= 90.0 {
        return SearchBox {
            min_latitude,
            max_latitude,
            min_longitude: -180.0,
            max_longitude: 180.0,
        };
    }

    let ratio = (angular.sin() / center.latitude.to_radians().cos()).min(1.0);
    let lon_delta = ratio.asin().to_degrees();
    SearchBox {
        min_latitude,
        max_latitude,
        min_longitude: center.longitude - lon_delta,
        max_longitude: center.longitude + lon_delta,
    }
}

fn normalize(location: Coordinate) -> Result<Coordinate> {
    let invalid = TrackerError::InvalidCoordinate {
        latitude: location.latitude,
        longitude: location.longitude,
    };
    if !location.latitude.is_finite() || !location.longitude.is_finite() {
        return Err(invalid);
    }
    if !(-90.0..=90.0).contains(&location.latitude) {
        return Err(invalid);
    }
    let longitude = if (-180.0..=180.0).contains(&location.longitude) {
        location.longitude
    } else {
        (location.longitude + 180.0).rem_euclid(360.0) - 180.0
    };
    Ok(Coordinate::new(location.latitude, longitude))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ActivitySessionMeta;
    use crate::TrackPoint;

    fn london_index() -> NearbyIndex {
        let mut index = NearbyIndex::new();
        index
            .insert("hyde-park", "run", Coordinate::new(51.5073, -0.1657))
            .unwrap();
        index
            .insert("regents-park", "run", Coordinate::new(51.5313, -0.1570))
            .unwrap();
        index
            .insert("richmond", "cycle", Coordinate::new(51.4613, -0.3037))
            .unwrap();
        index
            .insert("paris", "run", Coordinate::new(48.8566, 2.3522))
            .unwrap();
        index
    }

    #[test]
    fn test_find_nearby_sorted_by_distance() {
        let index = london_index();
        let center = Coordinate::new(51.5074, -0.1278); // Trafalgar Square

        let matches = index.find_nearby(center, 5.0);
        let ids: Vec<&str> = matches.iter().map(|m| m.entry.id.as_str()).collect();
        assert_eq!(ids, vec!["hyde-park", "regents-park"]);
        assert!(matches[0].distance_meters < matches[1].distance_meters);

        let wider = index.find_nearby(center, 20.0);
        assert_eq!(wider.len(), 3);
        assert_eq!(index.find_nearby_default(center).len(), 2);
    }

    #[test]
    fn test_find_nearby_respects_max_results() {
        let mut index = NearbyIndex::with_config(NearbyConfig {
            max_results: 2,
            ..NearbyConfig::default()
        });
        for i in 0..5 {
            index
                .insert(&format!("a{}", i), "run", Coordinate::new(0.0, i as f64 * 0.001))
                .unwrap();
        }
        let matches = index.find_nearby(Coordinate::new(0.0, 0.0), 1.0);
        let ids: Vec<&str> = matches.iter().map(|m| m.entry.id.as_str()).collect();
        assert_eq!(ids, vec!["a0", "a1"]);
    }

    #[test]
    fn test_find_nearby_across_antimeridian() {
        let mut index = NearbyIndex::new();
        index
            .insert("west", "run", Coordinate::new(0.0, -179.99))
            .unwrap();
        let matches = index.find_nearby(Coordinate::new(0.0, 179.99), 5.0);
        assert_eq!(matches.len(), 1);
        assert!(matches[0].distance_meters < 2_300.0);
    }

    #[test]
    fn test_find_nearby_across_pole() {
        let mut index = NearbyIndex::new();
        index
            .insert("far-side", "ski", Coordinate::new(89.5, 180.0))
            .unwrap();
        let matches = index.find_nearby(Coordinate::new(89.0, 0.0), 200.0);
        assert_eq!(matches.len(), 1);
        assert!((matches[0].distance_meters - 166_792.0).abs() < 5.0);
    }

    #[test]
    fn test_find_nearby_large_radius_high_latitude() {
        let mut index = NearbyIndex::new();
        index
            .insert("east", "cycle", Coordinate::new(61.26, 18.1))
            .unwrap();
        let matches = index.find_nearby(Coordinate::new(60.0, 0.0), 1000.0);
        assert_eq!(matches.len(), 1);
        assert!(matches[0].distance_meters < 1_000_000.0);
        assert!(matches[0].distance_meters > 990_000.0);
    }

    #[test]
    fn test_insert_replaces_and_remove() {
        let mut index = london_index();
        index
            .insert("paris", "walk", Coordinate::new(51.5074, -0.1278))
            .unwrap();
        assert_eq!(index.len(), 4);
        assert_eq!(index.get("paris").unwrap().activity_type, "walk");
        assert_eq!(
            index.find_nearby(Coordinate::new(48.8566, 2.3522), 1.0).len(),
            0
        );

        assert!(index.remove("paris"));
        assert!(!index.remove("paris"));
        assert_eq!(index.len(), 3);

        index.clear();
        assert!(index.is_empty());
        assert!(index
            .find_nearby(Coordinate::new(51.5074, -0.1278), 50.0)
            .is_empty());
    }

    #[test]
    fn test_insert_rejects_invalid() {
        let mut index = NearbyIndex::new();
        assert!(matches!(
            index.insert("x", "run", Coordinate::new(f64::NAN, 0.0)),
            Err(TrackerError::InvalidCoordinate { .. })
        ));
        assert!(index.insert("y", "run", Coordinate::new(95.0, 0.0)).is_err());
        assert!(index.is_empty());

        index.insert("z", "run", Coordinate::new(0.0, 190.0)).unwrap();
        assert_eq!(index.get("z").unwrap().location.longitude, -170.0);
    }

    #[test]
    fn test_entries_in_cell() {
        let index = london_index();
        let cell = &index.get("hyde-park").unwrap().geohash[..4];
        let ids: Vec<&str> = index
            .entries_in_cell(&cell.to_uppercase())
            .iter()
            .map(|e| e.id.as_str())
            .collect();
        assert!(ids.contains(&"hyde-park"));
        assert!(!ids.contains(&"paris"));
    }

    #[test]
    fn test_nearest() {
        let index = london_index();
        let nearest = index.nearest(Coordinate::new(48.9, 2.3), 1);
        assert_eq!(nearest[0].id, "paris");
        assert_eq!(index.nearest(Coordinate::new(0.0, 0.0), 10).len(), 4);
    }

    #[test]
    fn test_nearest_ranks_by_ground_distance() {
        let mut index = NearbyIndex::new();
        index
            .insert("same-side", "run", Coordinate::new(0.5, 179.0))
            .unwrap();
        index
            .insert("across", "run", Coordinate::new(0.0, -179.99))
            .unwrap();
        let ids: Vec<&str> = index
            .nearest(Coordinate::new(0.0, 179.99), 2)
            .iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(ids, vec!["across", "same-side"]);
    }

    #[test]
    fn test_insert_summary() {
        let mut index = NearbyIndex::new();
        let mut summary = ActivitySummary {
            session_id: "s1".to_string(),
            started_at: 0,
            ended_at: 1_000,
            distance_meters: 0.0,
            duration_ms: 1_000,
            pace_seconds_per_km: None,
            track_points: vec![],
            start_geohash: None,
            meta: ActivitySessionMeta::new("run"),
        };
        assert!(!index.insert_summary(&summary).unwrap());

        summary.track_points.push(TrackPoint::new(42.6, -5.6, 0));
        assert!(index.insert_summary(&summary).unwrap());
        assert!(index.get("s1").unwrap().geohash.starts_with("ezs42"));
    }
}
