//! Activity session records.
//!
//! An [`ActivitySession`] is the live record of one tracking episode. It
//! holds the timing state (start, pauses, end) and enforces the status
//! invariants:
//! - `paused_at` is set exactly when the status is `Paused`
//! - `ended_at` is set exactly when the status is `Completed`
//! - `total_paused_ms` never decreases
//!
//! Track points and distance live on the tracker; the session only knows
//! about time.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::TrackPoint;

/// Lifecycle state of a session. "Not started" is the absence of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum SessionStatus {
    Active,
    Paused,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "ACTIVE",
            SessionStatus::Paused => "PAUSED",
            SessionStatus::Completed => "COMPLETED",
        }
    }
}

/// Outcome of a session mutation.
///
/// Invalid transitions are not errors: they leave state untouched and
/// report `NoOp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    NoOp,
}

impl Transition {
    pub fn is_applied(&self) -> bool {
        matches!(self, Transition::Applied)
    }
}

/// Descriptor of the activity being tracked. Stored as given, never read
/// by the session math.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct ActivitySessionMeta {
    /// Sport type (e.g., "run", "cycle")
    pub activity_type: String,
    /// User-facing title, if the activity has one
    pub title: Option<String>,
    /// Scheduled activity this session was started from
    pub scheduled_activity_id: Option<String>,
}

impl ActivitySessionMeta {
    pub fn new(activity_type: impl Into<String>) -> Self {
        Self {
            activity_type: activity_type.into(),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// The live session record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct ActivitySession {
    pub id: String,
    pub status: SessionStatus,
    /// Epoch ms at creation
    pub started_at: i64,
    /// Epoch ms of the (latest) stop
    pub ended_at: Option<i64>,
    /// Epoch ms the current pause began
    pub paused_at: Option<i64>,
    /// Sum of all completed pause intervals
    pub total_paused_ms: i64,
    pub meta: ActivitySessionMeta,
}

impl ActivitySession {
    /// Create a new active session starting at `now`.
    pub(crate) fn start(meta: ActivitySessionMeta, now: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            status: SessionStatus::Active,
            started_at: now,
            ended_at: None,
            paused_at: None,
            total_paused_ms: 0,
            meta,
        }
    }

    /// Active (unpaused) time at `now`, floored at zero.
    ///
    /// An in-progress pause is excluded up to `now`.
    pub fn elapsed_ms(&self, now: i64) -> i64 {
        let current_pause = self.paused_at.map(|p| now - p).unwrap_or(0);
        (now - self.started_at - self.total_paused_ms - current_pause).max(0)
    }

    pub(crate) fn pause(&mut self, now: i64) -> Transition {
        if self.status != SessionStatus::Active {
            return Transition::NoOp;
        }
        self.status = SessionStatus::Paused;
        self.paused_at = Some(now);
        Transition::Applied
    }

    pub(crate) fn resume(&mut self, now: i64) -> Transition {
        if self.status != SessionStatus::Paused {
            return Transition::NoOp;
        }
        self.fold_pause(now);
        self.status = SessionStatus::Active;
        Transition::Applied
    }

    /// Mark the session completed at `now`, folding any open pause.
    ///
    /// Runs again on an already-completed session, moving `ended_at` to the
    /// new `now`. Returns the final active duration.
    pub(crate) fn finish(&mut self, now: i64) -> i64 {
        self.fold_pause(now);
        self.status = SessionStatus::Completed;
        self.ended_at = Some(now);
        (now - self.started_at - self.total_paused_ms).max(0)
    }

    fn fold_pause(&mut self, now: i64) {
        if let Some(paused_at) = self.paused_at.take() {
            // A clock stepping backwards must not shrink the paused total
            self.total_paused_ms += (now - paused_at).max(0);
        }
    }
}

/// Immutable snapshot produced when a session stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct ActivitySummary {
    pub session_id: String,
    pub started_at: i64,
    pub ended_at: i64,
    pub distance_meters: f64,
    /// Active time, pauses excluded
    pub duration_ms: i64,
    pub pace_seconds_per_km: Option<f64>,
    /// Every point captured, in arrival order
    pub track_points: Vec<TrackPoint>,
    /// Geohash of the first track point, for posting to the nearby feed
    pub start_geohash: Option<String>,
    pub meta: ActivitySessionMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_at(now: i64) -> ActivitySession {
        ActivitySession::start(ActivitySessionMeta::new("run"), now)
    }

    fn assert_invariants(s: &ActivitySession) {
        assert_eq!(s.status == SessionStatus::Paused, s.paused_at.is_some());
        assert_eq!(s.status == SessionStatus::Completed, s.ended_at.is_some());
    }

    #[test]
    fn test_start_is_active() {
        let s = session_at(1_000);
        assert_eq!(s.status, SessionStatus::Active);
        assert_eq!(s.started_at, 1_000);
        assert_eq!(s.total_paused_ms, 0);
        assert!(Uuid::parse_str(&s.id).is_ok());
        assert_invariants(&s);
    }

    #[test]
    fn test_unique_ids() {
        assert_ne!(session_at(0).id, session_at(0).id);
    }

    #[test]
    fn test_pause_resume_accumulates() {
        let mut s = session_at(0);
        assert_eq!(s.pause(10_000), Transition::Applied);
        assert_eq!(s.paused_at, Some(10_000));
        assert_invariants(&s);

        assert_eq!(s.resume(15_000), Transition::Applied);
        assert_eq!(s.total_paused_ms, 5_000);
        assert_eq!(s.paused_at, None);
        assert_invariants(&s);

        assert_eq!(s.elapsed_ms(20_000), 15_000);
    }

    #[test]
    fn test_invalid_transitions_are_noops() {
        let mut s = session_at(0);
        assert_eq!(s.resume(1_000), Transition::NoOp);
        assert_eq!(s.pause(1_000), Transition::Applied);
        assert_eq!(s.pause(2_000), Transition::NoOp);
        assert_eq!(s.paused_at, Some(1_000));

        s.finish(3_000);
        assert_eq!(s.pause(4_000), Transition::NoOp);
        assert_eq!(s.resume(4_000), Transition::NoOp);
        assert_eq!(s.status, SessionStatus::Completed);
        assert_invariants(&s);
    }

    #[test]
    fn test_elapsed_excludes_open_pause() {
        let mut s = session_at(0);
        s.pause(4_000);
        assert_eq!(s.elapsed_ms(9_000), 4_000);
    }

    #[test]
    fn test_elapsed_floors_at_zero() {
        let s = session_at(10_000);
        assert_eq!(s.elapsed_ms(5_000), 0);
    }

    #[test]
    fn test_finish_folds_open_pause() {
        let mut s = session_at(0);
        s.pause(30_000);
        let duration = s.finish(50_000);
        assert_eq!(s.total_paused_ms, 20_000);
        assert_eq!(duration, 30_000);
        assert_eq!(s.ended_at, Some(50_000));
        assert_invariants(&s);
    }

    #[test]
    fn test_backwards_clock_keeps_pause_total() {
        let mut s = session_at(0);
        s.pause(10_000);
        s.resume(8_000);
        assert_eq!(s.total_paused_ms, 0);
    }

    #[test]
    fn test_status_json() {
        assert_eq!(
            serde_json::to_string(&SessionStatus::Completed).unwrap(),
            "\"COMPLETED\""
        );
        assert_eq!(SessionStatus::Paused.as_str(), "PAUSED");

        let json = serde_json::to_value(session_at(0)).unwrap();
        assert!(json.get("totalPausedMs").is_some());
        assert_eq!(json["meta"]["activityType"], "run");
    }
}
