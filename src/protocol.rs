//! Wire Protocol
//!
//! The fixed 13-byte position report exchanged between the collar and the
//! base station. Layout (little-endian):
//!
//! | Offset | Size | Field     | Encoding                              |
//! |--------|------|-----------|---------------------------------------|
//! | 0      | 1    | fix flag  | `1` = valid fix, anything else rejected |
//! | 1      | 4    | UTC time  | unsigned 32-bit, decimal-packed HHMMSS |
//! | 5      | 4    | latitude  | signed 32-bit, degrees x 100000        |
//! | 9      | 4    | longitude | signed 32-bit, degrees x 100000        |
//!
//! The codec is pure and stateless. Scaling by 10^5 gives roughly 1 m of
//! resolution. There is deliberately no representation for "transmitter
//! alive but no fix": a collar without a fix stays silent, and the receiver
//! cannot distinguish that from the collar being offline.

use crate::config::REPORT_LEN;
use crate::types::{GnssFix, UtcTime};

/// Fix-flag value marking a valid position report
pub const FIX_FLAG_VALID: u8 = 1;

/// Degrees-to-wire scale factor (10^5, ~1 m resolution)
const COORD_SCALE: f64 = 100_000.0;

/// An encoded position report, ready for `start_transmit`
///
/// Owns its bytes; transient, created per transmission attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Payload([u8; REPORT_LEN]);

impl Payload {
    /// View the wire bytes
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes (always 13)
    #[must_use]
    #[allow(clippy::len_without_is_empty)]
    pub const fn len(&self) -> usize {
        REPORT_LEN
    }
}

/// Why a fix could not be encoded
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncodeError {
    /// Coordinates outside WGS84 bounds. The codec rejects rather than
    /// saturates: a clamped coordinate would decode as a plausible but
    /// wrong position, which is worse than skipping the cycle.
    OutOfRange,
}

#[cfg(feature = "embedded")]
impl defmt::Format for EncodeError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::OutOfRange => defmt::write!(f, "OutOfRange"),
        }
    }
}

/// Why received bytes were not a position report
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeError {
    /// Input was not exactly 13 bytes
    WrongLength,
    /// Fix flag was not `FIX_FLAG_VALID`
    NoFix,
    /// Time field was not a decimal-packed HHMMSS time of day
    InvalidTime,
    /// Coordinates outside WGS84 bounds
    OutOfRange,
}

#[cfg(feature = "embedded")]
impl defmt::Format for DecodeError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::WrongLength => defmt::write!(f, "WrongLength"),
            Self::NoFix => defmt::write!(f, "NoFix"),
            Self::InvalidTime => defmt::write!(f, "InvalidTime"),
            Self::OutOfRange => defmt::write!(f, "OutOfRange"),
        }
    }
}

/// Encode a fix into the 13-byte wire format
///
/// # Errors
///
/// Returns [`EncodeError::OutOfRange`] if the coordinates fall outside
/// `|lat| <= 90`, `|lon| <= 180`.
pub fn encode(fix: &GnssFix) -> Result<Payload, EncodeError> {
    if !fix.in_bounds() {
        return Err(EncodeError::OutOfRange);
    }

    let lat_fixed = scale_degrees(fix.latitude_deg);
    let lon_fixed = scale_degrees(fix.longitude_deg);

    let mut bytes = [0u8; REPORT_LEN];
    bytes[0] = FIX_FLAG_VALID;
    bytes[1..5].copy_from_slice(&fix.time_utc.as_hhmmss().to_le_bytes());
    bytes[5..9].copy_from_slice(&lat_fixed.to_le_bytes());
    bytes[9..13].copy_from_slice(&lon_fixed.to_le_bytes());
    Ok(Payload(bytes))
}

/// Decode a received frame back into a fix
///
/// # Errors
///
/// Fails with [`DecodeError::WrongLength`] unless exactly 13 bytes, with
/// [`DecodeError::NoFix`] unless the fix flag is set, and with
/// [`DecodeError::InvalidTime`] / [`DecodeError::OutOfRange`] when the
/// payload shape does not match the GNSS contract. Rejection never yields
/// a zero-value fix.
pub fn decode(bytes: &[u8]) -> Result<GnssFix, DecodeError> {
    if bytes.len() != REPORT_LEN {
        return Err(DecodeError::WrongLength);
    }
    if bytes[0] != FIX_FLAG_VALID {
        return Err(DecodeError::NoFix);
    }

    let packed = le_u32(&bytes[1..5]);
    let time_utc = UtcTime::from_hhmmss(packed).ok_or(DecodeError::InvalidTime)?;

    let lat_fixed = le_i32(&bytes[5..9]);
    let lon_fixed = le_i32(&bytes[9..13]);

    let fix = GnssFix::new(
        f64::from(lat_fixed) / COORD_SCALE,
        f64::from(lon_fixed) / COORD_SCALE,
        time_utc,
    );
    if !fix.in_bounds() {
        return Err(DecodeError::OutOfRange);
    }
    Ok(fix)
}

/// Scale degrees to the fixed-point wire representation, rounding
/// half-away-from-zero (the behavior of C's `lround`)
fn scale_degrees(deg: f64) -> i32 {
    let scaled = deg * COORD_SCALE;
    let rounded = if scaled >= 0.0 {
        scaled + 0.5
    } else {
        scaled - 0.5
    };
    // Truncation toward zero after the half-offset; caller guarantees the
    // scaled magnitude fits in i32 (|180| * 1e5 << i32::MAX).
    rounded as i32
}

fn le_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn le_i32(bytes: &[u8]) -> i32 {
    i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}
