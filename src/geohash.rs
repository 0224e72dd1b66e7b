//! Geohash encoding and decoding.
//!
//! Standard interleaved-bit geohash over the base32 alphabet
//! `0123456789bcdefghjkmnpqrstuvwxyz`. Even bits refine longitude, odd bits
//! refine latitude, five bits per character.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};
use crate::geo_utils::SearchBox;

/// Precision used when the caller has no preference (about 3.7 cm × 1.9 cm).
pub const DEFAULT_GEOHASH_PRECISION: usize = 12;

const MAX_PRECISION: usize = 12;
const BASE32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

/// Half-width and half-height of a decoded geohash cell, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct GeohashUncertainty {
    pub latitude: f64,
    pub longitude: f64,
}

/// Center of a geohash cell plus its remaining uncertainty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct DecodedGeohash {
    pub latitude: f64,
    pub longitude: f64,
    pub error: GeohashUncertainty,
}

/// Encode a position as a geohash of `precision` characters.
///
/// Latitude is clamped to [-90, 90], longitude outside [-180, 180] is
/// wrapped back into range, and precision is clamped to 1..=12.
///
/// # Example
/// ```
/// use activity_tracker::encode_geohash;
/// assert_eq!(encode_geohash(57.64911, 10.40744, 11), "u4pruydqqvj");
/// ```
pub fn encode_geohash(latitude: f64, longitude: f64, precision: usize) -> String {
    encode_cell(latitude, longitude, precision.clamp(1, MAX_PRECISION))
}

/// Encode without the public precision cap.
fn encode_cell(latitude: f64, longitude: f64, precision: usize) -> String {
    let latitude = latitude.clamp(-90.0, 90.0);
    let longitude = normalize_longitude(longitude);

    let mut lat_range = (-90.0_f64, 90.0_f64);
    let mut lon_range = (-180.0_f64, 180.0_f64);
    let mut hash = String::with_capacity(precision);
    let mut even = true;
    let mut bits = 0;
    let mut index = 0usize;

    while hash.len() < precision {
        let (range, value) = if even {
            (&mut lon_range, longitude)
        } else {
            (&mut lat_range, latitude)
        };
        let mid = (range.0 + range.1) / 2.0;
        if value >= mid {
            index = (index << 1) | 1;
            range.0 = mid;
        } else {
            index <<= 1;
            range.1 = mid;
        }
        even = !even;

        bits += 1;
        if bits == 5 {
            hash.push(BASE32[index] as char);
            bits = 0;
            index = 0;
        }
    }

    hash
}

/// Decode a geohash into the center of its cell and the cell's half-size.
///
/// Decoding is case-insensitive. Any character outside the base32 alphabet
/// fails with [`TrackerError::InvalidGeohashCharacter`].
pub fn decode_geohash(hash: &str) -> Result<DecodedGeohash> {
    if hash.is_empty() {
        return Err(TrackerError::EmptyGeohash);
    }

    let mut lat_range = (-90.0_f64, 90.0_f64);
    let mut lon_range = (-180.0_f64, 180.0_f64);
    let mut even = true;

    for (position, character) in hash.chars().enumerate() {
        let index = base32_index(character)
            .ok_or(TrackerError::InvalidGeohashCharacter {
                character,
                position,
            })?;

        for shift in (0..5).rev() {
            let range = if even {
                &mut lon_range
            } else {
                &mut lat_range
            };
            let mid = (range.0 + range.1) / 2.0;
            if (index >> shift) & 1 == 1 {
                range.0 = mid;
            } else {
                range.1 = mid;
            }
            even = !even;
        }
    }

    Ok(DecodedGeohash {
        latitude: (lat_range.0 + lat_range.1) / 2.0,
        longitude: (lon_range.0 + lon_range.1) / 2.0,
        error: GeohashUncertainty {
            latitude: (lat_range.1 - lat_range.0) / 2.0,
            longitude: (lon_range.1 - lon_range.0) / 2.0,
        },
    })
}

/// Bounding box of a geohash cell.
pub fn geohash_bounds(hash: &str) -> Result<SearchBox> {
    let decoded = decode_geohash(hash)?;
    Ok(SearchBox {
        min_latitude: decoded.latitude - decoded.error.latitude,
        max_latitude: decoded.latitude + decoded.error.latitude,
        min_longitude: decoded.longitude - decoded.error.longitude,
        max_longitude: decoded.longitude + decoded.error.longitude,
    })
}

/// The eight cells surrounding `hash`, at the same precision.
///
/// Order: N, NE, E, SE, S, SW, W, NW. Cells wrap across the antimeridian;
/// at the poles the northern (or southern) row collapses onto the edge row.
/// Hashes longer than 12 characters keep their length; past about 20
/// characters the cells fall below f64 resolution.
pub fn geohash_neighbors(hash: &str) -> Result<[String; 8]> {
    let decoded = decode_geohash(hash)?;
    let precision = hash.chars().count();
    let cell_height = decoded.error.latitude * 2.0;
    let cell_width = decoded.error.longitude * 2.0;

    let at = |dlat: f64, dlon: f64| {
        encode_cell(
            decoded.latitude + dlat * cell_height,
            decoded.longitude + dlon * cell_width,
            precision,
        )
    };

    Ok([
        at(1.0, 0.0),
        at(1.0, 1.0),
        at(0.0, 1.0),
        at(-1.0, 1.0),
        at(-1.0, 0.0),
        at(-1.0, -1.0),
        at(0.0, -1.0),
        at(1.0, -1.0),
    ])
}

fn base32_index(character: char) -> Option<usize> {
    let lower = character.to_ascii_lowercase();
    if !lower.is_ascii() {
        return None;
    }
    BASE32.iter().position(|&b| b == lower as u8)
}

fn normalize_longitude(longitude: f64) -> f64 {
    if (-180.0..=180.0).contains(&longitude) {
        longitude
    } else {
        (longitude + 180.0).rem_euclid(360.0) - 180.0
    }
}
