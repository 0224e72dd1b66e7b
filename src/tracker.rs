//! # Activity Tracker
//!
//! Stateful owner of the live activity session. All mutation of a session
//! goes through one `ActivityTracker`, and the global [`TRACKER`] wraps it
//! in a mutex so that location callbacks and user actions arriving from
//! different threads are applied one at a time.
//!
//! ## Lifecycle
//!
//! ```text
//!   (none) --start--> ACTIVE --pause--> PAUSED
//!                       ^  <--resume--    |
//!                       |                 |
//!                       +------stop-------+--> COMPLETED
//! ```
//!
//! `start_activity` is a hard reset from any state. Invalid transitions
//! (pausing a paused session, adding points with no session, ...) are
//! silent no-ops.
//!
//! Points received while paused are stored and count toward distance;
//! paused time is still excluded from the elapsed clock.

use std::sync::Mutex;

use log::{debug, info};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};
use crate::geo_utils::{accumulate_distance, calculate_pace};
use crate::geohash::encode_geohash;
use crate::session::{
    ActivitySession, ActivitySessionMeta, ActivitySummary, SessionStatus, Transition,
};
use crate::{Coordinate, TrackPoint};

// ============================================================================
// Configuration & Types
// ============================================================================

/// Configuration for the tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerConfig {
    /// Precision of the start geohash attached to each summary.
    /// Default: 7 (~150 m cells)
    pub summary_geohash_precision: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            summary_geohash_precision: 7,
        }
    }
}

/// An activity planned for later. Kept separately from the live session
/// and untouched by `reset_activity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct ScheduledActivity {
    pub id: String,
    pub title: String,
    pub activity_type: String,
    /// Epoch ms the activity is planned for
    pub scheduled_at: i64,
    pub location: Option<Coordinate>,
}

/// Live figures for the current session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct LiveStats {
    pub distance_meters: f64,
    pub elapsed_ms: i64,
    pub pace_seconds_per_km: Option<f64>,
    pub point_count: u32,
}

/// Tracker event types for notifying listeners of applied changes.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerEvent {
    Started {
        session_id: String,
    },
    Paused {
        session_id: String,
    },
    Resumed {
        session_id: String,
    },
    PointAdded {
        session_id: String,
        point_count: usize,
        distance_meters: f64,
    },
    Stopped {
        session_id: String,
        duration_ms: i64,
        distance_meters: f64,
    },
    Reset,
}

/// Receives tracker events. Called synchronously while the tracker is
/// borrowed, so implementations must not call back into the tracker.
pub trait TrackerListener: Send + Sync {
    fn on_event(&self, event: &TrackerEvent);
}

// ============================================================================
// Activity Tracker
// ============================================================================

/// The activity session state machine.
pub struct ActivityTracker<C: Clock = SystemClock> {
    clock: C,
    config: TrackerConfig,

    // Live session state
    session: Option<ActivitySession>,
    track_points: Vec<TrackPoint>,
    distance_meters: f64,
    elapsed_ms: i64,
    pace_seconds_per_km: Option<f64>,
    last_summary: Option<ActivitySummary>,

    // Independent of the live session
    scheduled: Vec<ScheduledActivity>,

    listeners: Vec<Box<dyn TrackerListener>>,
}

impl ActivityTracker<SystemClock> {
    /// Create a tracker on the wall clock.
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for ActivityTracker<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> ActivityTracker<C> {
    /// Create a tracker reading time from `clock`.
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            config: TrackerConfig::default(),
            session: None,
            track_points: Vec::new(),
            distance_meters: 0.0,
            elapsed_ms: 0,
            pace_seconds_per_km: None,
            last_summary: None,
            scheduled: Vec::new(),
            listeners: Vec::new(),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: TrackerConfig) {
        self.config = config;
    }

    pub fn add_listener(&mut self, listener: Box<dyn TrackerListener>) {
        self.listeners.push(listener);
    }

    pub fn clear_listeners(&mut self) {
        self.listeners.clear();
    }

    // ========================================================================
    // Session Transitions
    // ========================================================================

    /// Start a new session, discarding whatever existed before.
    pub fn start_activity(&mut self, meta: ActivitySessionMeta) -> Transition {
        let now = self.clock.now_ms();
        let session = ActivitySession::start(meta, now);
        info!(
            "[ActivityTracker] Started session {} ({})",
            session.id, session.meta.activity_type
        );

        let session_id = session.id.clone();
        self.clear_session_state();
        self.session = Some(session);
        self.notify(TrackerEvent::Started { session_id });
        Transition::Applied
    }

    /// Start a session for a scheduled activity and drop it from the schedule.
    ///
    /// Unknown ids are a no-op.
    pub fn start_activity_from_schedule(&mut self, scheduled_id: &str) -> Transition {
        let Some(index) = self.scheduled.iter().position(|s| s.id == scheduled_id) else {
            debug!("[ActivityTracker] No scheduled activity {}", scheduled_id);
            return Transition::NoOp;
        };
        let scheduled = self.scheduled.remove(index);
        self.start_activity(ActivitySessionMeta {
            activity_type: scheduled.activity_type,
            title: Some(scheduled.title),
            scheduled_activity_id: Some(scheduled.id),
        })
    }

    /// Append a point and refresh distance, elapsed time and pace.
    ///
    /// Accepted while active or paused; ignored with no session or after stop.
    pub fn add_track_point(&mut self, point: TrackPoint) -> Transition {
        let now = self.clock.now_ms();
        let Some(session) = self.session.as_ref() else {
            debug!("[ActivityTracker] Ignoring point: no session");
            return Transition::NoOp;
        };
        if session.status == SessionStatus::Completed {
            debug!("[ActivityTracker] Ignoring point: session completed");
            return Transition::NoOp;
        }

        let session_id = session.id.clone();
        let elapsed_ms = session.elapsed_ms(now);

        self.track_points.push(point);
        self.distance_meters = accumulate_distance(&self.track_points);
        self.elapsed_ms = elapsed_ms;
        self.pace_seconds_per_km = calculate_pace(self.distance_meters, self.elapsed_ms);

        debug!(
            "[ActivityTracker] Point {} -> {:.1}m in {}ms",
            self.track_points.len(),
            self.distance_meters,
            self.elapsed_ms
        );

        self.notify(TrackerEvent::PointAdded {
            session_id,
            point_count: self.track_points.len(),
            distance_meters: self.distance_meters,
        });
        Transition::Applied
    }

    /// Pause an active session.
    pub fn pause_activity(&mut self) -> Transition {
        let now = self.clock.now_ms();
        let Some(session) = self.session.as_mut() else {
            return Transition::NoOp;
        };
        if session.pause(now) == Transition::NoOp {
            debug!(
                "[ActivityTracker] Pause ignored in state {}",
                session.status.as_str()
            );
            return Transition::NoOp;
        }

        info!("[ActivityTracker] Paused session {}", session.id);
        let session_id = session.id.clone();
        self.elapsed_ms = session.elapsed_ms(now);
        self.notify(TrackerEvent::Paused { session_id });
        Transition::Applied
    }

    /// Resume a paused session.
    pub fn resume_activity(&mut self) -> Transition {
        let now = self.clock.now_ms();
        let Some(session) = self.session.as_mut() else {
            return Transition::NoOp;
        };
        if session.resume(now) == Transition::NoOp {
            debug!(
                "[ActivityTracker] Resume ignored in state {}",
                session.status.as_str()
            );
            return Transition::NoOp;
        }

        info!(
            "[ActivityTracker] Resumed session {} ({}ms paused so far)",
            session.id, session.total_paused_ms
        );
        let session_id = session.id.clone();
        self.elapsed_ms = session.elapsed_ms(now);
        self.notify(TrackerEvent::Resumed { session_id });
        Transition::Applied
    }

    /// Finalize the session and return its summary.
    ///
    /// Works from any state. Returns `None` when there is no session. A
    /// second call on a completed session finalizes again against the new
    /// "now", so `ended_at` and `duration_ms` move forward.
    pub fn stop_activity(&mut self) -> Option<ActivitySummary> {
        let now = self.clock.now_ms();
        let Some(session) = self.session.as_mut() else {
            debug!("[ActivityTracker] Stop ignored: no session");
            return None;
        };

        let duration_ms = session.finish(now);
        let distance_meters = accumulate_distance(&self.track_points);
        let pace_seconds_per_km = calculate_pace(distance_meters, duration_ms);
        let start_geohash = self.track_points.first().map(|p| {
            encode_geohash(
                p.latitude,
                p.longitude,
                self.config.summary_geohash_precision,
            )
        });

        let summary = ActivitySummary {
            session_id: session.id.clone(),
            started_at: session.started_at,
            ended_at: now,
            distance_meters,
            duration_ms,
            pace_seconds_per_km,
            track_points: self.track_points.clone(),
            start_geohash,
            meta: session.meta.clone(),
        };

        info!(
            "[ActivityTracker] Stopped session {}: {:.0}m in {}ms ({} points)",
            summary.session_id,
            summary.distance_meters,
            summary.duration_ms,
            summary.track_points.len()
        );

        self.distance_meters = distance_meters;
        self.elapsed_ms = duration_ms;
        self.pace_seconds_per_km = pace_seconds_per_km;
        self.last_summary = Some(summary.clone());

        self.notify(TrackerEvent::Stopped {
            session_id: summary.session_id.clone(),
            duration_ms,
            distance_meters,
        });
        Some(summary)
    }

    /// Clear all session and tracking state. Scheduled activities stay.
    pub fn reset_activity(&mut self) {
        info!("[ActivityTracker] Reset");
        self.clear_session_state();
        self.session = None;
        self.notify(TrackerEvent::Reset);
    }

    fn clear_session_state(&mut self) {
        self.track_points.clear();
        self.distance_meters = 0.0;
        self.elapsed_ms = 0;
        self.pace_seconds_per_km = None;
        self.last_summary = None;
    }

    fn notify(&self, event: TrackerEvent) {
        for listener in &self.listeners {
            listener.on_event(&event);
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn current_session(&self) -> Option<&ActivitySession> {
        self.session.as_ref()
    }

    pub fn track_points(&self) -> &[TrackPoint] {
        &self.track_points
    }

    /// Distance as of the last point (or stop), in meters.
    pub fn distance_meters(&self) -> f64 {
        self.distance_meters
    }

    /// Elapsed active time as of the last mutation.
    pub fn elapsed_ms(&self) -> i64 {
        self.elapsed_ms
    }

    /// Elapsed active time against the clock right now, for ticking timers.
    ///
    /// A completed session reports its final duration.
    pub fn live_elapsed_ms(&self) -> i64 {
        match &self.session {
            Some(s) if s.status != SessionStatus::Completed => s.elapsed_ms(self.clock.now_ms()),
            Some(_) => self.elapsed_ms,
            None => 0,
        }
    }

    pub fn pace_seconds_per_km(&self) -> Option<f64> {
        self.pace_seconds_per_km
    }

    pub fn last_summary(&self) -> Option<&ActivitySummary> {
        self.last_summary.as_ref()
    }

    /// True while a session is active or paused.
    pub fn is_tracking(&self) -> bool {
        matches!(
            self.session.as_ref().map(|s| s.status),
            Some(SessionStatus::Active | SessionStatus::Paused)
        )
    }

    pub fn live_stats(&self) -> LiveStats {
        LiveStats {
            distance_meters: self.distance_meters,
            elapsed_ms: self.live_elapsed_ms(),
            pace_seconds_per_km: self.pace_seconds_per_km,
            point_count: self.track_points.len() as u32,
        }
    }

    /// Current session as JSON (`null` when there is none).
    pub fn session_json(&self) -> String {
        serde_json::to_string(&self.session).unwrap_or_else(|_| "null".to_string())
    }

    /// Last summary as JSON (`null` when there is none).
    pub fn summary_json(&self) -> String {
        serde_json::to_string(&self.last_summary).unwrap_or_else(|_| "null".to_string())
    }

    // ========================================================================
    // Scheduled Activities
    // ========================================================================

    /// Add a scheduled activity, replacing any with the same id.
    pub fn schedule_activity(&mut self, activity: ScheduledActivity) {
        debug!(
            "[ActivityTracker] Scheduled {} at {}",
            activity.id, activity.scheduled_at
        );
        self.scheduled.retain(|s| s.id != activity.id);
        self.scheduled.push(activity);
    }

    /// Remove a scheduled activity. Returns whether it existed.
    pub fn cancel_scheduled_activity(&mut self, id: &str) -> bool {
        let before = self.scheduled.len();
        self.scheduled.retain(|s| s.id != id);
        before != self.scheduled.len()
    }

    /// Scheduled activities in insertion order.
    pub fn scheduled_activities(&self) -> &[ScheduledActivity] {
        &self.scheduled
    }

    /// Scheduled activities at or after `now`, soonest first.
    pub fn upcoming_activities(&self, now: i64) -> Vec<ScheduledActivity> {
        let mut upcoming: Vec<ScheduledActivity> = self
            .scheduled
            .iter()
            .filter(|s| s.scheduled_at >= now)
            .cloned()
            .collect();
        upcoming.sort_by(|a, b| {
            a.scheduled_at
                .cmp(&b.scheduled_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        upcoming
    }
}

// ============================================================================
// Global Singleton
// ============================================================================

/// Global tracker instance.
///
/// This singleton allows FFI calls to share one tracker without passing
/// state back and forth across the FFI boundary.
pub static TRACKER: Lazy<Mutex<ActivityTracker>> = Lazy::new(|| Mutex::new(ActivityTracker::new()));

/// Get a lock on the global tracker.
pub fn with_tracker<F, R>(f: F) -> R
where
    F: FnOnce(&mut ActivityTracker) -> R,
{
    let mut tracker = TRACKER
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    f(&mut tracker)
}
