//! FFI bindings for mobile platforms (iOS/Android).
//!
//! This module provides the UniFFI bindings that expose the tracker and the
//! geo functions to Kotlin and Swift. Session calls go through the global
//! [`TRACKER`](crate::TRACKER), so the host never holds Rust state.
//! Functions that would clash with the internal API are prefixed `ffi_`.

use log::{debug, info};

use crate::{
    calculate_pace, decode_geohash, encode_geohash, geohash_bounding_box, haversine_distance,
    init_logging, with_tracker, ActivitySession, ActivitySessionMeta, ActivitySummary,
    Coordinate, DecodedGeohash, LiveStats, ScheduledActivity, SearchBox, TrackPoint,
    TrackerError,
};

// ============================================================================
// Session Control
// ============================================================================

/// Start a new session, discarding any previous one.
#[uniffi::export]
pub fn start_activity(meta: ActivitySessionMeta) {
    init_logging();
    info!(
        "[ActivityTrackerRust] start_activity called ({})",
        meta.activity_type
    );
    with_tracker(|t| t.start_activity(meta));
}

/// Start a session for a scheduled activity. Returns false for unknown ids.
#[uniffi::export]
pub fn start_scheduled_activity(scheduled_id: String) -> bool {
    init_logging();
    with_tracker(|t| t.start_activity_from_schedule(&scheduled_id)).is_applied()
}

#[uniffi::export]
pub fn pause_activity() {
    init_logging();
    with_tracker(|t| t.pause_activity());
}

#[uniffi::export]
pub fn resume_activity() {
    init_logging();
    with_tracker(|t| t.resume_activity());
}

/// Feed one location sample to the live session.
#[uniffi::export]
pub fn add_track_point(point: TrackPoint) {
    with_tracker(|t| t.add_track_point(point));
}

/// Feed a batch of samples, e.g. after the app returns from background.
/// Returns how many were accepted.
#[uniffi::export]
pub fn add_track_points(points: Vec<TrackPoint>) -> u32 {
    init_logging();
    debug!(
        "[ActivityTrackerRust] add_track_points called with {} points",
        points.len()
    );
    with_tracker(|t| {
        points
            .into_iter()
            .filter(|p| t.add_track_point(*p).is_applied())
            .count() as u32
    })
}

#[uniffi::export]
pub fn stop_activity() -> Option<ActivitySummary> {
    init_logging();
    let summary = with_tracker(|t| t.stop_activity());
    if let Some(ref s) = summary {
        info!(
            "[ActivityTrackerRust] Summary: {:.0}m in {}ms",
            s.distance_meters, s.duration_ms
        );
    }
    summary
}

#[uniffi::export]
pub fn reset_activity() {
    init_logging();
    with_tracker(|t| t.reset_activity());
}

// ============================================================================
// Read Accessors
// ============================================================================

#[uniffi::export]
pub fn current_session() -> Option<ActivitySession> {
    with_tracker(|t| t.current_session().cloned())
}

#[uniffi::export]
pub fn current_track_points() -> Vec<TrackPoint> {
    with_tracker(|t| t.track_points().to_vec())
}

#[uniffi::export]
pub fn live_stats() -> LiveStats {
    with_tracker(|t| t.live_stats())
}

#[uniffi::export]
pub fn last_summary() -> Option<ActivitySummary> {
    with_tracker(|t| t.last_summary().cloned())
}

/// Last summary as JSON for the JS bridge.
#[uniffi::export]
pub fn last_summary_json() -> String {
    with_tracker(|t| t.summary_json())
}

// ============================================================================
// Scheduled Activities
// ============================================================================

#[uniffi::export]
pub fn schedule_activity(activity: ScheduledActivity) {
    init_logging();
    with_tracker(|t| t.schedule_activity(activity));
}

#[uniffi::export]
pub fn cancel_scheduled_activity(id: String) -> bool {
    with_tracker(|t| t.cancel_scheduled_activity(&id))
}

#[uniffi::export]
pub fn upcoming_activities(now_ms: i64) -> Vec<ScheduledActivity> {
    with_tracker(|t| t.upcoming_activities(now_ms))
}

// ============================================================================
// Geo Functions
// ============================================================================

#[uniffi::export]
pub fn ffi_haversine_distance(a: Coordinate, b: Coordinate) -> f64 {
    haversine_distance(&a, &b)
}

#[uniffi::export]
pub fn ffi_calculate_pace(distance_meters: f64, duration_ms: i64) -> Option<f64> {
    calculate_pace(distance_meters, duration_ms)
}

#[uniffi::export]
pub fn ffi_encode_geohash(latitude: f64, longitude: f64, precision: u32) -> String {
    encode_geohash(latitude, longitude, precision as usize)
}

#[uniffi::export]
pub fn ffi_decode_geohash(hash: String) -> Result<DecodedGeohash, TrackerError> {
    decode_geohash(&hash)
}

#[uniffi::export]
pub fn ffi_geohash_bounding_box(latitude: f64, longitude: f64, radius_km: f64) -> SearchBox {
    geohash_bounding_box(latitude, longitude, radius_km)
}
