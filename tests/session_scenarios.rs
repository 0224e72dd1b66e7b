//! End-to-end activity session scenarios.
//!
//! Drives the tracker with a manual clock the way the mobile host does:
//! start, a stream of location samples, pauses, stop, then posting the
//! finished activity to the nearby feed.
//!
//! Run with: `cargo test --test session_scenarios`

use activity_tracker::{
    ActivitySessionMeta, ActivityTracker, Coordinate, ManualClock, NearbyIndex, SessionStatus,
    TrackPoint, TrackerListener, TrackerEvent,
};
use std::sync::{Arc, Mutex};

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn setup(start_ms: i64) -> (ActivityTracker<ManualClock>, ManualClock) {
    init_logs();
    let clock = ManualClock::new(start_ms);
    (ActivityTracker::with_clock(clock.clone()), clock)
}

fn assert_session_invariants(tracker: &ActivityTracker<ManualClock>) {
    if let Some(s) = tracker.current_session() {
        assert_eq!(s.status == SessionStatus::Paused, s.paused_at.is_some());
        assert_eq!(s.status == SessionStatus::Completed, s.ended_at.is_some());
    }
}

// ============================================================================
// Scenario: equator run with an instant pause
// ============================================================================

#[test]
fn test_equator_run_summary() {
    let (mut tracker, clock) = setup(0);

    tracker.start_activity(ActivitySessionMeta::new("run"));
    tracker.add_track_point(TrackPoint::new(0.0, 0.0, 0));
    clock.set(60_000);
    tracker.add_track_point(TrackPoint::new(0.0, 0.001, 60_000));
    tracker.pause_activity();
    tracker.resume_activity();

    let summary = tracker.stop_activity().expect("session should produce a summary");

    assert!((summary.distance_meters - 111.0).abs() <= 1.0);
    assert_eq!(summary.duration_ms, 60_000);
    let pace = summary.pace_seconds_per_km.expect("pace with distance and time");
    assert!((pace - 540.0).abs() < 1.0);
    assert_eq!(summary.track_points.len(), 2);
    assert_eq!(summary.started_at, 0);
    assert_eq!(summary.ended_at, 60_000);
    assert_eq!(summary.meta.activity_type, "run");
    assert_eq!(tracker.last_summary(), Some(&summary));
    assert_session_invariants(&tracker);
}

#[test]
fn test_stop_without_start_leaves_nothing() {
    let (mut tracker, _clock) = setup(0);
    assert!(tracker.stop_activity().is_none());
    assert!(tracker.current_session().is_none());
    assert!(tracker.last_summary().is_none());
}

// ============================================================================
// Scenario: long run with several pauses
// ============================================================================

#[test]
fn test_run_with_pauses_excludes_paused_time() {
    let (mut tracker, clock) = setup(1_700_000_000_000);
    let t0 = 1_700_000_000_000;

    tracker.start_activity(ActivitySessionMeta::new("run").with_title("Evening loop"));

    // One sample every 10 s heading east along the equator
    let mut paused_total = 0;
    let mut paused_since = None;
    for i in 0..=60 {
        let now = t0 + i * 10_000;
        clock.set(now);
        tracker.add_track_point(TrackPoint::new(0.0, i as f64 * 0.0001, now));

        match i {
            20 | 45 => {
                tracker.pause_activity();
                paused_since = Some(now);
            }
            25 | 50 => {
                tracker.resume_activity();
                paused_total += now - paused_since.take().unwrap();
            }
            _ => {}
        }
        assert_session_invariants(&tracker);
        assert_eq!(
            tracker.current_session().unwrap().total_paused_ms,
            paused_total
        );
    }

    clock.set(t0 + 600_000);
    let summary = tracker.stop_activity().unwrap();

    assert_eq!(paused_total, 100_000);
    assert_eq!(summary.duration_ms, 500_000);
    // 60 segments of ~11.12 m, including those recorded while paused
    assert!((summary.distance_meters - 667.17).abs() < 0.1);
    assert_eq!(summary.track_points.len(), 61);
    assert_eq!(summary.meta.title.as_deref(), Some("Evening loop"));
}

#[test]
fn test_stop_while_paused() {
    let (mut tracker, clock) = setup(0);
    tracker.start_activity(ActivitySessionMeta::new("cycle"));
    tracker.add_track_point(TrackPoint::new(51.5, -0.12, 0));
    clock.set(120_000);
    tracker.add_track_point(TrackPoint::new(51.51, -0.12, 120_000));
    tracker.pause_activity();
    clock.set(300_000);

    let summary = tracker.stop_activity().unwrap();

    assert_eq!(summary.duration_ms, 120_000);
    let session = tracker.current_session().unwrap();
    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.total_paused_ms, 180_000);
    assert_session_invariants(&tracker);
}

#[test]
fn test_second_stop_moves_end_forward() {
    let (mut tracker, clock) = setup(0);
    tracker.start_activity(ActivitySessionMeta::new("run"));
    clock.set(30_000);
    let first = tracker.stop_activity().unwrap();
    clock.set(45_000);
    let second = tracker.stop_activity().unwrap();

    assert_eq!(first.duration_ms, 30_000);
    assert_eq!(second.duration_ms, 45_000);
    assert!(second.ended_at > first.ended_at);
}

// ============================================================================
// Scenario: listener sees the whole lifecycle
// ============================================================================

struct Collect(Arc<Mutex<Vec<String>>>);

impl TrackerListener for Collect {
    fn on_event(&self, event: &TrackerEvent) {
        let name = match event {
            TrackerEvent::Started { .. } => "started",
            TrackerEvent::Paused { .. } => "paused",
            TrackerEvent::Resumed { .. } => "resumed",
            TrackerEvent::PointAdded { .. } => "point",
            TrackerEvent::Stopped { .. } => "stopped",
            TrackerEvent::Reset => "reset",
        };
        self.0.lock().unwrap().push(name.to_string());
    }
}

#[test]
fn test_listener_lifecycle() {
    let (mut tracker, clock) = setup(0);
    let log = Arc::new(Mutex::new(Vec::new()));
    tracker.add_listener(Box::new(Collect(log.clone())));

    tracker.start_activity(ActivitySessionMeta::new("run"));
    tracker.add_track_point(TrackPoint::new(0.0, 0.0, 0));
    clock.advance(5_000);
    tracker.pause_activity();
    tracker.add_track_point(TrackPoint::new(0.0, 0.001, 5_000));
    tracker.resume_activity();
    tracker.stop_activity();
    tracker.add_track_point(TrackPoint::new(0.0, 0.002, 6_000));

    assert_eq!(
        *log.lock().unwrap(),
        vec!["started", "point", "paused", "point", "resumed", "stopped"]
    );
}

// ============================================================================
// Scenario: finished activity shows up in the nearby feed
// ============================================================================

#[test]
fn test_summary_posted_to_nearby_feed() {
    let (mut tracker, clock) = setup(0);
    let mut feed = NearbyIndex::new();

    tracker.start_activity(ActivitySessionMeta::new("run"));
    tracker.add_track_point(TrackPoint::new(51.5073, -0.1657, 0));
    clock.set(600_000);
    tracker.add_track_point(TrackPoint::new(51.5100, -0.1500, 600_000));
    let summary = tracker.stop_activity().unwrap();

    assert!(feed.insert_summary(&summary).unwrap());

    let hits = feed.find_nearby(Coordinate::new(51.5074, -0.1278), 5.0);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].entry.id, summary.session_id);
    assert_eq!(hits[0].entry.activity_type, "run");

    let start_hash = summary.start_geohash.unwrap();
    assert_eq!(start_hash.len(), 7);
    assert_eq!(feed.entries_in_cell(&start_hash).len(), 1);
}
