//! # Activity Tracker
//!
//! Activity session tracking and geodesy core for a mobile social-fitness app.
//!
//! This library provides:
//! - Great-circle distance, pace and search-box math for GPS tracks
//! - Geohash encoding/decoding for proximity features
//! - A single-owner activity session state machine (start/pause/resume/stop)
//! - An R-tree backed index for the nearby activity feed
//!
//! ## Features
//!
//! - **`ffi`** - Enable FFI bindings for mobile platforms (iOS/Android)
//!
//! ## Quick Start
//!
//! ```rust
//! use activity_tracker::{ActivitySessionMeta, ActivityTracker, ManualClock, TrackPoint};
//!
//! let clock = ManualClock::new(0);
//! let mut tracker = ActivityTracker::with_clock(clock.clone());
//!
//! tracker.start_activity(ActivitySessionMeta::new("run"));
//! tracker.add_track_point(TrackPoint::new(0.0, 0.0, 0));
//! clock.set(60_000);
//! tracker.add_track_point(TrackPoint::new(0.0, 0.001, 60_000));
//!
//! let summary = tracker.stop_activity().unwrap();
//! println!("{:.0} m in {} ms", summary.distance_meters, summary.duration_ms);
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{Result, TrackerError};

// Geographic utilities (distance, pace, search boxes)
pub mod geo_utils;
pub use geo_utils::{
    accumulate_distance, calculate_pace, distance_between_coordinates,
    distance_between_coordinates_meters, geohash_bounding_box, haversine_distance, SearchBox,
    EARTH_RADIUS_METERS,
};

// Geohash encoding
pub mod geohash;
pub use geohash::{
    decode_geohash, encode_geohash, geohash_bounds, geohash_neighbors, DecodedGeohash,
    GeohashUncertainty, DEFAULT_GEOHASH_PRECISION,
};

// Time source for session math
pub mod clock;
pub use clock::{Clock, ManualClock, SystemClock};

// Session records
pub mod session;
pub use session::{
    ActivitySession, ActivitySessionMeta, ActivitySummary, SessionStatus, Transition,
};

// Stateful tracker (singleton owning the live session)
pub mod tracker;
pub use tracker::{
    with_tracker, ActivityTracker, LiveStats, ScheduledActivity, TrackerConfig, TrackerEvent,
    TrackerListener, TRACKER,
};

// Nearby activity feed index
pub mod nearby;
pub use nearby::{NearbyConfig, NearbyEntry, NearbyIndex, NearbyMatch};

// FFI bindings for mobile platforms (iOS/Android)
#[cfg(feature = "ffi")]
pub mod ffi;

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
pub(crate) fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("ActivityTracker"),
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
pub(crate) fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude in degrees.
///
/// # Example
/// ```
/// use activity_tracker::Coordinate;
/// let point = Coordinate::new(51.5074, -0.1278); // London
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Create a new coordinate.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the coordinate is finite and inside the lat/lon ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

impl From<Coordinate> for geo::Point<f64> {
    fn from(c: Coordinate) -> Self {
        geo::Point::new(c.longitude, c.latitude)
    }
}

impl From<geo::Point<f64>> for Coordinate {
    fn from(p: geo::Point<f64>) -> Self {
        Coordinate::new(p.y(), p.x())
    }
}

/// A single timestamped GPS sample.
///
/// Produced by the host's location provider and appended to the live
/// session in capture order. The tracker never re-sorts points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct TrackPoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl TrackPoint {
    /// Create a new track point.
    pub fn new(latitude: f64, longitude: f64, timestamp: i64) -> Self {
        Self {
            latitude,
            longitude,
            timestamp,
        }
    }

    /// Create a track point from a coordinate and a timestamp.
    pub fn at(coordinate: Coordinate, timestamp: i64) -> Self {
        Self::new(coordinate.latitude, coordinate.longitude, timestamp)
    }

    /// The position of this sample.
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

// ============================================================================
// Tests
// ============================================================================
