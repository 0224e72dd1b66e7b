//! Unified error handling for the activity-tracker library.
//!
//! Session transitions never fail (invalid calls are no-ops), so the error
//! surface here is limited to geohash decoding and nearby-index input checks.

use thiserror::Error;

/// Unified error type for activity-tracker operations.
#[derive(Debug, Clone, PartialEq, Error)]
#[cfg_attr(feature = "ffi", derive(uniffi::Error), uniffi(flat_error))]
pub enum TrackerError {
    /// A geohash contained a character outside the base32 alphabet
    #[error("Invalid geohash character '{character}' at position {position}")]
    InvalidGeohashCharacter { character: char, position: usize },

    /// An empty string was passed where a geohash was expected
    #[error("Geohash is empty")]
    EmptyGeohash,

    /// A coordinate was not finite
    #[error("Invalid coordinate ({latitude}, {longitude})")]
    InvalidCoordinate { latitude: f64, longitude: f64 },
}

/// Result type alias for activity-tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;
