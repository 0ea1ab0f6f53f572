//! Simulated Transceiver
//!
//! A scripted [`Transceiver`] double for host-side testing. Tests inject
//! frames and force failures through a [`SimHandle`], and play the part of
//! the interrupt line themselves by raising the shared [`IrqFlag`] — which
//! keeps the ISR contract (flag only, nothing else) explicit in every
//! test.
//!
//! [`IrqFlag`]: crate::radio::link::IrqFlag

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::radio::link::{LoraParams, RadioError, Transceiver, TxStatus};

#[derive(Debug)]
struct SimState {
    configured: Option<LoraParams>,
    config_result: Result<(), RadioError>,
    accept_result: Result<(), RadioError>,
    tx_status: TxStatus,
    read_result: Result<(), RadioError>,
    sent: Vec<Vec<u8>>,
    rx_queue: VecDeque<Vec<u8>>,
    receive_count: usize,
    finish_count: usize,
    rssi_dbm: f32,
    snr_db: f32,
}

impl Default for SimState {
    fn default() -> Self {
        Self {
            configured: None,
            config_result: Ok(()),
            accept_result: Ok(()),
            tx_status: TxStatus::Done,
            read_result: Ok(()),
            sent: Vec::new(),
            rx_queue: VecDeque::new(),
            receive_count: 0,
            finish_count: 0,
            rssi_dbm: -80.0,
            snr_db: 7.5,
        }
    }
}

/// Scripted stand-in for the SX1262
#[derive(Debug, Default)]
pub struct SimTransceiver {
    state: Rc<RefCell<SimState>>,
}

impl SimTransceiver {
    /// Create a simulator plus the handle tests script it with
    #[must_use]
    pub fn new() -> (Self, SimHandle) {
        let sim = Self::default();
        let handle = SimHandle {
            state: Rc::clone(&sim.state),
        };
        (sim, handle)
    }
}

impl Transceiver for SimTransceiver {
    fn configure(&mut self, params: &LoraParams) -> Result<(), RadioError> {
        let mut state = self.state.borrow_mut();
        state.config_result?;
        state.configured = Some(*params);
        Ok(())
    }

    fn start_transmit(&mut self, bytes: &[u8]) -> Result<(), RadioError> {
        let mut state = self.state.borrow_mut();
        state.accept_result?;
        state.sent.push(bytes.to_vec());
        Ok(())
    }

    fn tx_status(&mut self) -> TxStatus {
        self.state.borrow().tx_status
    }

    fn finish_transmit(&mut self) {
        self.state.borrow_mut().finish_count += 1;
    }

    fn start_receive(&mut self) -> Result<(), RadioError> {
        self.state.borrow_mut().receive_count += 1;
        Ok(())
    }

    fn packet_length(&mut self) -> usize {
        self.state
            .borrow()
            .rx_queue
            .front()
            .map_or(0, std::vec::Vec::len)
    }

    fn read_packet(&mut self, buf: &mut [u8]) -> Result<usize, RadioError> {
        let mut state = self.state.borrow_mut();
        let frame = state.rx_queue.pop_front();
        let read_result = state.read_result;
        state.read_result = Ok(());
        read_result?;
        let frame = frame.ok_or(RadioError::Rx)?;
        let n = frame.len().min(buf.len());
        buf[..n].copy_from_slice(&frame[..n]);
        Ok(n)
    }

    fn last_rssi_dbm(&mut self) -> f32 {
        self.state.borrow().rssi_dbm
    }

    fn last_snr_db(&mut self) -> f32 {
        self.state.borrow().snr_db
    }
}

/// Test-side controls for a [`SimTransceiver`]
#[derive(Debug, Clone)]
pub struct SimHandle {
    state: Rc<RefCell<SimState>>,
}

impl SimHandle {
    /// Make `configure` fail
    pub fn fail_configure(&self, error: RadioError) {
        self.state.borrow_mut().config_result = Err(error);
    }

    /// Make `start_transmit` reject the hand-off
    pub fn reject_transmit(&self, error: RadioError) {
        self.state.borrow_mut().accept_result = Err(error);
    }

    /// Accept transmissions again
    pub fn accept_transmit(&self) {
        self.state.borrow_mut().accept_result = Ok(());
    }

    /// Set the interrupt-reported completion status
    pub fn set_tx_status(&self, status: TxStatus) {
        self.state.borrow_mut().tx_status = status;
    }

    /// Make the next `read_packet` fail (the queued frame is still
    /// consumed, like a corrupt chip-buffer read)
    pub fn fail_next_read(&self, error: RadioError) {
        self.state.borrow_mut().read_result = Err(error);
    }

    /// Queue a frame as if it had just arrived over the air
    pub fn inject_frame(&self, bytes: &[u8]) {
        self.state.borrow_mut().rx_queue.push_back(bytes.to_vec());
    }

    /// Set the per-packet quality metrics
    pub fn set_quality(&self, rssi_dbm: f32, snr_db: f32) {
        let mut state = self.state.borrow_mut();
        state.rssi_dbm = rssi_dbm;
        state.snr_db = snr_db;
    }

    /// Parameters last passed to `configure`
    #[must_use]
    pub fn configured(&self) -> Option<LoraParams> {
        self.state.borrow().configured
    }

    /// Every frame handed to `start_transmit`, in order
    #[must_use]
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.state.borrow().sent.clone()
    }

    /// Number of accepted transmissions
    #[must_use]
    pub fn sent_count(&self) -> usize {
        self.state.borrow().sent.len()
    }

    /// Number of `start_receive` calls (re-arm tracking)
    #[must_use]
    pub fn receive_count(&self) -> usize {
        self.state.borrow().receive_count
    }

    /// Number of `finish_transmit` calls
    #[must_use]
    pub fn finish_count(&self) -> usize {
        self.state.borrow().finish_count
    }
}
