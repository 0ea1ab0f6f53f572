//! Radio Link Facades
//!
//! Two thin, role-specific facades over one physical transceiver, built on
//! a shared interrupt contract: the ISR touches nothing but a single-bit
//! pending flag, and all substantive work (buffer reads, decoding, state
//! mutation) happens inside the cooperative loop when it observes the flag.
//!
//! The transceiver itself is injected through the [`Transceiver`] trait so
//! the whole link layer runs against a simulated chip on the host.

use core::sync::atomic::{AtomicBool, Ordering};

use heapless::Vec;

use crate::config::{
    DEFAULT_FREQUENCY_HZ, LORA_BANDWIDTH_HZ, LORA_CODING_RATE_DENOM, LORA_PREAMBLE_SYMBOLS,
    LORA_SPREADING_FACTOR, LORA_SYNC_WORD, LORA_TX_POWER_DBM, MAX_FRAME_LEN, MAX_READ_LEN,
};
use crate::types::LinkQuality;

/// Radio link failure
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RadioError {
    /// Hardware rejected the requested link parameters. Fatal to the link,
    /// not to the process: the caller may continue in GNSS-only mode.
    Config,
    /// Payload empty or larger than the hardware frame limit
    InvalidPayload,
    /// A transmission is already in flight
    Busy,
    /// Transmit path failure reported by the transceiver
    Tx,
    /// Receive path failure reported by the transceiver
    Rx,
}

#[cfg(feature = "embedded")]
impl defmt::Format for RadioError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Config => defmt::write!(f, "Config"),
            Self::InvalidPayload => defmt::write!(f, "InvalidPayload"),
            Self::Busy => defmt::write!(f, "Busy"),
            Self::Tx => defmt::write!(f, "Tx"),
            Self::Rx => defmt::write!(f, "Rx"),
        }
    }
}

/// Final status of a transmission, reported once per packet
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxStatus {
    /// The packet left the antenna
    Done,
    /// The hardware reported a post-interrupt failure
    Failed(RadioError),
}

#[cfg(feature = "embedded")]
impl defmt::Format for TxStatus {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Done => defmt::write!(f, "Done"),
            Self::Failed(e) => defmt::write!(f, "Failed({})", e),
        }
    }
}

/// LoRa modulation and link parameters
///
/// Every field must match on both ends of the link. `Default` yields the
/// wire-compatible prototype set; only the center frequency is expected to
/// vary by region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoraParams {
    /// Center frequency in Hz
    pub frequency_hz: u32,
    /// Bandwidth in Hz
    pub bandwidth_hz: u32,
    /// Spreading factor (7-12)
    pub spreading_factor: u8,
    /// Coding rate denominator (4/x)
    pub coding_rate_denom: u8,
    /// Sync word distinguishing this private network
    pub sync_word: u8,
    /// Transmit power in dBm
    pub tx_power_dbm: i8,
    /// Preamble length in symbols
    pub preamble_symbols: u16,
}

impl LoraParams {
    /// Parameters for a given center frequency, everything else at the
    /// link defaults
    #[must_use]
    pub const fn new(frequency_hz: u32) -> Self {
        Self {
            frequency_hz,
            bandwidth_hz: LORA_BANDWIDTH_HZ,
            spreading_factor: LORA_SPREADING_FACTOR,
            coding_rate_denom: LORA_CODING_RATE_DENOM,
            sync_word: LORA_SYNC_WORD,
            tx_power_dbm: LORA_TX_POWER_DBM,
            preamble_symbols: LORA_PREAMBLE_SYMBOLS,
        }
    }
}

impl Default for LoraParams {
    fn default() -> Self {
        Self::new(DEFAULT_FREQUENCY_HZ)
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for LoraParams {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "LoRa({} Hz, BW {}, SF{}, CR 4/{})",
            self.frequency_hz,
            self.bandwidth_hz,
            self.spreading_factor,
            self.coding_rate_denom
        );
    }
}

/// Single-bit "event pending" signal shared between an interrupt handler
/// and the cooperative loop
///
/// [`raise`](Self::raise) is the only operation legal in interrupt context:
/// one atomic store, no allocation, no blocking. The loop's
/// [`take`](Self::take) is a load followed by a store, deliberately not a
/// read-modify-write: an interrupt landing between the two merges into the
/// current poll. That bounded race is acceptable because the hardware only
/// ever buffers one in-flight frame per side, so a merged notification
/// never loses a packet. Load/store only also keeps this usable on
/// thumbv6 cores without compare-and-swap.
#[derive(Debug, Default)]
pub struct IrqFlag(AtomicBool);

impl IrqFlag {
    /// Create a lowered flag
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Signal the event. Interrupt-context safe.
    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Poll-and-clear: returns `true` at most once per raise
    pub fn take(&self) -> bool {
        if self.0.load(Ordering::Acquire) {
            self.0.store(false, Ordering::Release);
            true
        } else {
            false
        }
    }

    /// Lower the flag without reporting it
    pub fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }

    /// Peek without clearing
    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Contract of the physical LoRa chip, implemented by the SX1262 driver on
/// hardware and by a scripted simulator in tests
///
/// All methods are non-blocking except [`finish_transmit`], which may wait
/// briefly and is only used during cleanup and mode transitions.
///
/// [`finish_transmit`]: Transceiver::finish_transmit
pub trait Transceiver {
    /// Apply modulation and link parameters
    ///
    /// # Errors
    ///
    /// Returns an error if the hardware rejects any parameter.
    fn configure(&mut self, params: &LoraParams) -> Result<(), RadioError>;

    /// Begin transmitting `bytes`; completion is signaled by interrupt
    ///
    /// # Errors
    ///
    /// Returns an error if the chip refuses the transmission.
    fn start_transmit(&mut self, bytes: &[u8]) -> Result<(), RadioError>;

    /// Hardware-reported result of the most recent transmission, valid
    /// once the completion interrupt has fired
    fn tx_status(&mut self) -> TxStatus;

    /// Force the transmit sequence closed (bounded wait, off the hot path)
    fn finish_transmit(&mut self);

    /// Enter continuous receive; packet arrival is signaled by interrupt
    ///
    /// # Errors
    ///
    /// Returns an error if the chip cannot enter receive mode.
    fn start_receive(&mut self) -> Result<(), RadioError>;

    /// Length in bytes of the packet waiting in the chip buffer, 0 if
    /// unknown
    fn packet_length(&mut self) -> usize;

    /// Copy the pending packet into `buf`, returning the bytes written
    ///
    /// # Errors
    ///
    /// Returns an error if the chip-side read fails (the frame is lost).
    fn read_packet(&mut self, buf: &mut [u8]) -> Result<usize, RadioError>;

    /// RSSI of the last received packet in dBm
    fn last_rssi_dbm(&mut self) -> f32;

    /// SNR of the last received packet in dB
    fn last_snr_db(&mut self) -> f32;
}

/// Transmit-role facade over the transceiver
///
/// Owns the chip for the lifetime of the node. At most one transmission is
/// ever in flight; the completion interrupt raises `done`, and
/// [`poll_completion`](Self::poll_completion) consumes it exactly once.
pub struct TxRadio<'a, T: Transceiver> {
    transceiver: T,
    done: &'a IrqFlag,
    in_flight: bool,
    last_status: Option<TxStatus>,
}

impl<'a, T: Transceiver> TxRadio<'a, T> {
    /// Wrap a transceiver whose TX-done interrupt raises `done`
    pub fn new(transceiver: T, done: &'a IrqFlag) -> Self {
        Self {
            transceiver,
            done,
            in_flight: false,
            last_status: None,
        }
    }

    /// Configure the link parameters
    ///
    /// # Errors
    ///
    /// Returns [`RadioError::Config`] if the hardware rejects any
    /// parameter. The caller decides whether to continue in degraded
    /// GNSS-only mode.
    pub fn init(&mut self, params: &LoraParams) -> Result<(), RadioError> {
        self.transceiver
            .configure(params)
            .map_err(|_| RadioError::Config)
    }

    /// Begin a non-blocking transmission
    ///
    /// # Errors
    ///
    /// [`RadioError::Busy`] if a transmission is already in flight (the
    /// scheduler invariant normally prevents this from being reachable),
    /// [`RadioError::InvalidPayload`] if `bytes` is empty or exceeds the
    /// hardware frame limit, or the chip's rejection. On rejection no
    /// state changes, so the caller may retry at its next window.
    pub fn start_transmit(&mut self, bytes: &[u8]) -> Result<(), RadioError> {
        if self.in_flight {
            return Err(RadioError::Busy);
        }
        if bytes.is_empty() || bytes.len() > MAX_FRAME_LEN {
            return Err(RadioError::InvalidPayload);
        }

        self.done.clear();
        match self.transceiver.start_transmit(bytes) {
            Ok(()) => {
                self.in_flight = true;
                Ok(())
            }
            Err(e) => {
                self.last_status = Some(TxStatus::Failed(e));
                Err(e)
            }
        }
    }

    /// Consume the completion interrupt, once
    ///
    /// Returns `Some` exactly once per transmission, after the interrupt
    /// has fired, carrying the hardware-reported status.
    pub fn poll_completion(&mut self) -> Option<TxStatus> {
        if !self.in_flight || !self.done.take() {
            return None;
        }
        self.in_flight = false;
        let status = self.transceiver.tx_status();
        self.last_status = Some(status);
        Some(status)
    }

    /// Force completion bookkeeping closed
    ///
    /// Does not guarantee the RF transmission finished, only that the
    /// interrupt state is considered closed. Bounded wait; cleanup and
    /// mode transitions only, never the hot path.
    pub fn finish_transmit(&mut self) {
        self.transceiver.finish_transmit();
        self.done.clear();
        self.in_flight = false;
    }

    /// Whether a transmission is currently in flight
    #[must_use]
    pub const fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Last recorded transmission status, for diagnostic consumers
    #[must_use]
    pub const fn last_status(&self) -> Option<TxStatus> {
        self.last_status
    }
}

/// Bytes and quality metrics of one received packet
///
/// The metrics are read synchronously at the same poll that drained the
/// packet; they describe this packet, not a running average.
#[derive(Clone, Debug, PartialEq)]
pub struct ReceivedPacket {
    /// Raw frame bytes, truncated to the receiver read cap
    pub bytes: Vec<u8, MAX_READ_LEN>,
    /// RSSI/SNR of this packet
    pub quality: LinkQuality,
}

/// Receive-role facade over the transceiver
///
/// The packet-received interrupt raises `pending`;
/// [`poll_packet`](Self::poll_packet) drains one frame per raise and
/// unconditionally re-arms listening before returning, so a dropped or
/// malformed packet can never leave the receiver deaf.
pub struct RxRadio<'a, T: Transceiver> {
    transceiver: T,
    pending: &'a IrqFlag,
}

impl<'a, T: Transceiver> RxRadio<'a, T> {
    /// Wrap a transceiver whose packet-received interrupt raises `pending`
    pub fn new(transceiver: T, pending: &'a IrqFlag) -> Self {
        Self {
            transceiver,
            pending,
        }
    }

    /// Configure the link parameters
    ///
    /// # Errors
    ///
    /// Returns [`RadioError::Config`] if the hardware rejects any
    /// parameter.
    pub fn init(&mut self, params: &LoraParams) -> Result<(), RadioError> {
        self.transceiver
            .configure(params)
            .map_err(|_| RadioError::Config)
    }

    /// Enter continuous listening
    ///
    /// # Errors
    ///
    /// Returns the chip's error if receive mode cannot be entered.
    pub fn start_receive(&mut self) -> Result<(), RadioError> {
        self.pending.clear();
        self.transceiver.start_receive()
    }

    /// Drain one pending packet, if the interrupt has fired
    ///
    /// Returns the received bytes (capped at the 64-byte read limit) plus
    /// the packet's RSSI/SNR. Listening is re-armed before returning
    /// regardless of whether the read succeeded.
    pub fn poll_packet(&mut self) -> Option<ReceivedPacket> {
        if !self.pending.take() {
            return None;
        }

        // Chip may not know the length yet; fall back to the full cap.
        let mut len = self.transceiver.packet_length();
        if len == 0 || len > MAX_READ_LEN {
            len = MAX_READ_LEN;
        }

        let mut buf = [0u8; MAX_READ_LEN];
        let packet = match self.transceiver.read_packet(&mut buf[..len]) {
            Ok(n) => {
                let n = n.min(len);
                Vec::from_slice(&buf[..n]).ok().map(|bytes| ReceivedPacket {
                    bytes,
                    quality: LinkQuality {
                        rssi_dbm: self.transceiver.last_rssi_dbm(),
                        snr_db: self.transceiver.last_snr_db(),
                    },
                })
            }
            Err(_) => None,
        };

        // Re-arm before returning, even after a failed read. An error here
        // leaves nothing to do but try again at the next poll.
        let _ = self.transceiver.start_receive();

        packet
    }
}
