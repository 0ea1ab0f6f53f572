//! Last-Known-Good Fix Cache
//!
//! Drives the receive side of the link: drains pending packets, decodes
//! them, and keeps the most recent valid fix plus the radio quality of the
//! packet that carried it. A failed decode of any kind leaves the cache
//! untouched; stale-but-valid data always beats surfacing transient radio
//! noise as a location jump.

use crate::protocol::{self, DecodeError};
use crate::radio::link::{RxRadio, Transceiver};
use crate::types::LastValidFix;

/// What one cache poll observed, for the caller to log
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PollOutcome {
    /// No packet was pending
    Idle,
    /// A packet decoded successfully and the cache was overwritten
    Updated(LastValidFix),
    /// A packet arrived but was rejected; the cache is unchanged
    Dropped(DecodeError),
}

#[cfg(feature = "embedded")]
impl defmt::Format for PollOutcome {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Idle => defmt::write!(f, "Idle"),
            Self::Updated(entry) => defmt::write!(f, "Updated({})", entry),
            Self::Dropped(e) => defmt::write!(f, "Dropped({})", e),
        }
    }
}

/// Receiver-side cache of the most recent valid position report
///
/// Process-lifetime state: starts empty, is mutated only by
/// [`poll`](Self::poll), and is read by the display/portal collaborators
/// through [`last_valid`](Self::last_valid).
#[derive(Debug, Default)]
pub struct ReceiveCache {
    last: Option<LastValidFix>,
}

impl ReceiveCache {
    /// Create an empty cache
    #[must_use]
    pub const fn new() -> Self {
        Self { last: None }
    }

    /// Drain and decode one pending packet, if any
    ///
    /// On success the cache is overwritten with the fix and the RSSI/SNR
    /// read at the same poll. On any decode failure the previous entry is
    /// retained indefinitely. The radio is listening again by the time
    /// this returns, whatever the outcome.
    pub fn poll<T: Transceiver>(&mut self, radio: &mut RxRadio<'_, T>) -> PollOutcome {
        let Some(packet) = radio.poll_packet() else {
            return PollOutcome::Idle;
        };

        match protocol::decode(&packet.bytes) {
            Ok(fix) => {
                let entry = LastValidFix {
                    fix,
                    quality: packet.quality,
                };
                self.last = Some(entry);
                PollOutcome::Updated(entry)
            }
            Err(e) => PollOutcome::Dropped(e),
        }
    }

    /// The most recent valid fix, `None` only if no valid packet has ever
    /// been received since startup
    #[must_use]
    pub const fn last_valid(&self) -> Option<LastValidFix> {
        self.last
    }
}
