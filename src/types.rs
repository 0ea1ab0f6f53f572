//! Shared types used across the node firmware
//!
//! Domain-specific types that enforce invariants at compile time. A
//! [`GnssFix`] always describes a real fix; "no fix yet" is expressed as
//! `Option<GnssFix>` so that an absent position can never be confused with
//! a fix at 0°N 0°E.

use core::fmt;

/// UTC time of day in decimal-packed HHMMSS form with validation
///
/// The wire format carries time as a single `u32` such as `211507` for
/// 21:15:07 UTC, exactly as the GNSS receiver reports it. Construction
/// checks each digit group, so a held value is always a real time of day.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtcTime(u32);

impl UtcTime {
    /// Largest representable packed value (23:59:59)
    pub const MAX_HHMMSS: u32 = 235_959;

    /// Create from a decimal-packed HHMMSS value, `None` if not a valid
    /// time of day
    #[must_use]
    pub const fn from_hhmmss(packed: u32) -> Option<Self> {
        let hours = packed / 10_000;
        let minutes = (packed / 100) % 100;
        let seconds = packed % 100;
        if hours < 24 && minutes < 60 && seconds < 60 {
            Some(Self(packed))
        } else {
            None
        }
    }

    /// Create from separate hour/minute/second components
    #[must_use]
    pub const fn from_hms(hours: u8, minutes: u8, seconds: u8) -> Option<Self> {
        if hours < 24 && minutes < 60 && seconds < 60 {
            Some(Self(
                hours as u32 * 10_000 + minutes as u32 * 100 + seconds as u32,
            ))
        } else {
            None
        }
    }

    /// Get the decimal-packed HHMMSS value
    #[must_use]
    pub const fn as_hhmmss(self) -> u32 {
        self.0
    }

    /// Hour of day (0-23)
    #[must_use]
    pub const fn hours(self) -> u8 {
        (self.0 / 10_000) as u8
    }

    /// Minute of hour (0-59)
    #[must_use]
    pub const fn minutes(self) -> u8 {
        ((self.0 / 100) % 100) as u8
    }

    /// Second of minute (0-59)
    #[must_use]
    pub const fn seconds(self) -> u8 {
        (self.0 % 100) as u8
    }

    /// Second within the current minute; the transmit scheduler keys its
    /// period off this value
    #[must_use]
    pub const fn second_of_minute(self) -> u8 {
        self.seconds()
    }
}

impl fmt::Debug for UtcTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}Z",
            self.hours(),
            self.minutes(),
            self.seconds()
        )
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for UtcTime {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}:{}:{}Z", self.hours(), self.minutes(), self.seconds());
    }
}

/// A GNSS position/time sample believed accurate enough to report
///
/// Produced by the GNSS collaborator, copied by value through the link
/// layer, never shared by reference across the interrupt boundary.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GnssFix {
    /// Latitude in degrees, positive north
    pub latitude_deg: f64,
    /// Longitude in degrees, positive east
    pub longitude_deg: f64,
    /// UTC time of the sample
    pub time_utc: UtcTime,
}

impl GnssFix {
    /// Largest latitude magnitude representable on the wire contract
    pub const MAX_LATITUDE_DEG: f64 = 90.0;

    /// Largest longitude magnitude representable on the wire contract
    pub const MAX_LONGITUDE_DEG: f64 = 180.0;

    /// Create a new fix
    #[must_use]
    pub const fn new(latitude_deg: f64, longitude_deg: f64, time_utc: UtcTime) -> Self {
        Self {
            latitude_deg,
            longitude_deg,
            time_utc,
        }
    }

    /// Check that the coordinates lie within WGS84 bounds
    #[must_use]
    pub fn in_bounds(&self) -> bool {
        // Explicit comparisons instead of abs(): f64::abs is not in core.
        self.latitude_deg >= -Self::MAX_LATITUDE_DEG
            && self.latitude_deg <= Self::MAX_LATITUDE_DEG
            && self.longitude_deg >= -Self::MAX_LONGITUDE_DEG
            && self.longitude_deg <= Self::MAX_LONGITUDE_DEG
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for GnssFix {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "Fix({}, {}, {})",
            self.latitude_deg,
            self.longitude_deg,
            self.time_utc
        );
    }
}

/// Per-packet radio quality metrics
///
/// Describes the packet just read, not a running average.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinkQuality {
    /// Received signal strength in dBm
    pub rssi_dbm: f32,
    /// Signal-to-noise ratio in dB
    pub snr_db: f32,
}

#[cfg(feature = "embedded")]
impl defmt::Format for LinkQuality {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{} dBm / {} dB", self.rssi_dbm, self.snr_db);
    }
}

/// The most recent successfully decoded fix and the radio metrics of the
/// packet that carried it
///
/// Receiver-side, process-lifetime state. Overwritten only on a successful
/// decode; there is no staleness or expiry, so a consumer cannot tell a
/// five-second-old entry from a five-hour-old one without external
/// timestamping.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LastValidFix {
    /// The decoded position report
    pub fix: GnssFix,
    /// Quality of the packet that delivered it
    pub quality: LinkQuality,
}

#[cfg(feature = "embedded")]
impl defmt::Format for LastValidFix {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{} ({})", self.fix, self.quality);
    }
}
