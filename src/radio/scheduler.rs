//! Transmit Scheduling
//!
//! Decides, once per GNSS update tick, whether a new position report goes
//! on the air. Enforces at-most-one-in-flight and at-most-one report per
//! distinct UTC second, and keys the period off the second-of-minute, so
//! both nodes stay within duty-cycle limits without any shared clock.

use crate::protocol::{self, EncodeError};
use crate::radio::link::{RadioError, Transceiver, TxRadio, TxStatus};
use crate::types::{GnssFix, UtcTime};

/// What a scheduler tick did, for the caller to log
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickAction {
    /// Nothing to do this cycle
    None,
    /// The in-flight transmission completed with this status
    Completed(TxStatus),
    /// A new report was accepted by the radio
    Started,
    /// Encoding failed; the cycle was skipped without marking the second
    /// as sent
    SkippedEncode(EncodeError),
    /// The radio rejected the hand-off; state untouched, the next
    /// qualifying second retries
    Rejected(RadioError),
}

#[cfg(feature = "embedded")]
impl defmt::Format for TickAction {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::None => defmt::write!(f, "None"),
            Self::Completed(s) => defmt::write!(f, "Completed({})", s),
            Self::Started => defmt::write!(f, "Started"),
            Self::SkippedEncode(e) => defmt::write!(f, "SkippedEncode({})", e),
            Self::Rejected(e) => defmt::write!(f, "Rejected({})", e),
        }
    }
}

/// Periodic position-report scheduler for the collar node
///
/// A report fires when the fix's second-of-minute is a multiple of the
/// period *and* that UTC second has not been sent already. The
/// modulo-on-seconds scheme is only correct for periods strictly below
/// 60; longer periods would need a monotonic elapsed-time scheduler, so
/// construction rejects them outright.
#[derive(Debug)]
pub struct TransmitScheduler {
    period_s: u8,
    last_sent: Option<UtcTime>,
    tx_in_flight: bool,
    last_outcome: Option<TxStatus>,
}

impl TransmitScheduler {
    /// Create a scheduler firing every `period_s` seconds; `None` unless
    /// `1 <= period_s < 60`
    #[must_use]
    pub const fn new(period_s: u8) -> Option<Self> {
        if period_s == 0 || period_s >= 60 {
            return None;
        }
        Some(Self {
            period_s,
            last_sent: None,
            tx_in_flight: false,
            last_outcome: None,
        })
    }

    /// Configured period in seconds
    #[must_use]
    pub const fn period_s(&self) -> u8 {
        self.period_s
    }

    /// Whether a transmission is currently in flight
    #[must_use]
    pub const fn in_flight(&self) -> bool {
        self.tx_in_flight
    }

    /// UTC second of the most recent accepted hand-off
    #[must_use]
    pub const fn last_sent(&self) -> Option<UtcTime> {
        self.last_sent
    }

    /// Status of the most recently completed transmission
    #[must_use]
    pub const fn last_outcome(&self) -> Option<TxStatus> {
        self.last_outcome
    }

    /// Run one GNSS update cycle
    ///
    /// While a transmission is in flight this only watches for its
    /// completion (consumed exactly once); new qualifying seconds are
    /// deferred until the completion has been observed. Otherwise, if a
    /// fix is present and the gate passes, the fix is encoded and handed
    /// to the radio. There is no retry or backoff beyond the next natural
    /// scheduling window.
    pub fn tick<T: Transceiver>(
        &mut self,
        fix: Option<GnssFix>,
        radio: &mut TxRadio<'_, T>,
    ) -> TickAction {
        if self.tx_in_flight {
            if let Some(status) = radio.poll_completion() {
                self.tx_in_flight = false;
                self.last_outcome = Some(status);
                return TickAction::Completed(status);
            }
            return TickAction::None;
        }

        let Some(fix) = fix else {
            return TickAction::None;
        };
        if !self.should_send(fix.time_utc) {
            return TickAction::None;
        }

        let payload = match protocol::encode(&fix) {
            Ok(payload) => payload,
            Err(e) => return TickAction::SkippedEncode(e),
        };

        match radio.start_transmit(payload.as_bytes()) {
            Ok(()) => {
                self.tx_in_flight = true;
                self.last_sent = Some(fix.time_utc);
                TickAction::Started
            }
            Err(e) => TickAction::Rejected(e),
        }
    }

    /// The transmit gate: a new UTC second whose second-of-minute lands on
    /// the period
    fn should_send(&self, time_utc: UtcTime) -> bool {
        let new_second = self.last_sent != Some(time_utc);
        new_second && time_utc.second_of_minute() % self.period_s == 0
    }
}
