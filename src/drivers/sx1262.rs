//! SX1262 LoRa Transceiver Driver
//!
//! Minimal command-level driver implementing the link layer's
//! [`Transceiver`] contract. Covers exactly what the pet-tracking link
//! needs: one modulation configuration, single-shot transmit with DIO1
//! TxDone, continuous receive with DIO1 RxDone, and per-packet RSSI/SNR.
//!
//! The BUSY line gates every command: the chip must not be addressed while
//! BUSY is high. DIO1 is routed to TxDone/RxDone and handled outside this
//! driver (an embassy task raises the link's `IrqFlag`); the RF switch is
//! driven through discrete RXEN/TXEN pins.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiBus;

use crate::radio::link::{LoraParams, RadioError, Transceiver, TxStatus};

// Command opcodes (SX1261/2 datasheet, chapter 13)
const OP_SET_STANDBY: u8 = 0x80;
const OP_SET_TX: u8 = 0x83;
const OP_SET_RX: u8 = 0x82;
const OP_SET_PACKET_TYPE: u8 = 0x8A;
const OP_SET_RF_FREQUENCY: u8 = 0x86;
const OP_SET_PA_CONFIG: u8 = 0x95;
const OP_SET_TX_PARAMS: u8 = 0x8E;
const OP_SET_BUFFER_BASE: u8 = 0x8F;
const OP_WRITE_BUFFER: u8 = 0x0E;
const OP_READ_BUFFER: u8 = 0x1E;
const OP_SET_MODULATION_PARAMS: u8 = 0x8B;
const OP_SET_PACKET_PARAMS: u8 = 0x8C;
const OP_SET_DIO_IRQ_PARAMS: u8 = 0x08;
const OP_GET_IRQ_STATUS: u8 = 0x12;
const OP_CLEAR_IRQ_STATUS: u8 = 0x02;
const OP_GET_RX_BUFFER_STATUS: u8 = 0x13;
const OP_GET_PACKET_STATUS: u8 = 0x14;
const OP_WRITE_REGISTER: u8 = 0x0D;

// IRQ bits
const IRQ_TX_DONE: u16 = 0x0001;
const IRQ_RX_DONE: u16 = 0x0002;
const IRQ_CRC_ERR: u16 = 0x0040;
const IRQ_TIMEOUT: u16 = 0x0200;
const IRQ_ALL: u16 = 0x03FF;

// LoRa sync word register (MSB at 0x0740)
const REG_LORA_SYNC_WORD: u16 = 0x0740;

// XTAL is 32 MHz; RF frequency is programmed in units of XTAL / 2^25
const FREQ_STEP_SHIFT: u32 = 25;
const XTAL_HZ: u64 = 32_000_000;

/// How many 10 us BUSY polls before a command is declared stuck
const BUSY_TIMEOUT_POLLS: u32 = 10_000;

/// SX1262 over a shared SPI bus with discrete NSS/RESET/BUSY and RF-switch
/// control pins
pub struct Sx1262<SPI, NSS, RST, BUSY, RXEN, TXEN, D> {
    spi: SPI,
    nss: NSS,
    reset: RST,
    busy: BUSY,
    rx_en: RXEN,
    tx_en: TXEN,
    delay: D,
    preamble_symbols: u16,
    last_rssi_dbm: f32,
    last_snr_db: f32,
}

impl<SPI, NSS, RST, BUSY, RXEN, TXEN, D> Sx1262<SPI, NSS, RST, BUSY, RXEN, TXEN, D>
where
    SPI: SpiBus<u8>,
    NSS: OutputPin,
    RST: OutputPin,
    BUSY: InputPin,
    RXEN: OutputPin,
    TXEN: OutputPin,
    D: DelayNs,
{
    /// Take ownership of the bus and control pins
    pub fn new(spi: SPI, nss: NSS, reset: RST, busy: BUSY, rx_en: RXEN, tx_en: TXEN, delay: D) -> Self {
        Self {
            spi,
            nss,
            reset,
            busy,
            rx_en,
            tx_en,
            delay,
            preamble_symbols: 8,
            last_rssi_dbm: 0.0,
            last_snr_db: 0.0,
        }
    }

    fn wait_busy(&mut self) -> Result<(), ()> {
        for _ in 0..BUSY_TIMEOUT_POLLS {
            if self.busy.is_low().map_err(|_| ())? {
                return Ok(());
            }
            self.delay.delay_us(10);
        }
        Err(())
    }

    fn command(&mut self, opcode: u8, args: &[u8]) -> Result<(), ()> {
        self.wait_busy()?;
        self.nss.set_low().map_err(|_| ())?;
        let result = self
            .spi
            .write(&[opcode])
            .and_then(|()| self.spi.write(args))
            .and_then(|()| self.spi.flush());
        self.nss.set_high().map_err(|_| ())?;
        result.map_err(|_| ())
    }

    fn read_command(&mut self, opcode: u8, args: &[u8], out: &mut [u8]) -> Result<(), ()> {
        self.wait_busy()?;
        self.nss.set_low().map_err(|_| ())?;
        let mut status = [0u8];
        let result = self
            .spi
            .write(&[opcode])
            .and_then(|()| self.spi.write(args))
            .and_then(|()| self.spi.read(&mut status))
            .and_then(|()| self.spi.read(out))
            .and_then(|()| self.spi.flush());
        self.nss.set_high().map_err(|_| ())?;
        result.map_err(|_| ())
    }

    fn write_register(&mut self, addr: u16, value: &[u8]) -> Result<(), ()> {
        self.wait_busy()?;
        self.nss.set_low().map_err(|_| ())?;
        let result = self
            .spi
            .write(&[OP_WRITE_REGISTER, (addr >> 8) as u8, addr as u8])
            .and_then(|()| self.spi.write(value))
            .and_then(|()| self.spi.flush());
        self.nss.set_high().map_err(|_| ())?;
        result.map_err(|_| ())
    }

    fn irq_status(&mut self) -> Result<u16, ()> {
        let mut out = [0u8; 2];
        self.read_command(OP_GET_IRQ_STATUS, &[], &mut out)?;
        Ok(u16::from_be_bytes(out))
    }

    fn clear_irq(&mut self, mask: u16) -> Result<(), ()> {
        self.command(OP_CLEAR_IRQ_STATUS, &mask.to_be_bytes())
    }

    fn hardware_reset(&mut self) -> Result<(), ()> {
        self.reset.set_low().map_err(|_| ())?;
        self.delay.delay_ms(2);
        self.reset.set_high().map_err(|_| ())?;
        self.delay.delay_ms(10);
        self.wait_busy()
    }

    fn rf_switch_rx(&mut self) -> Result<(), ()> {
        self.tx_en.set_low().map_err(|_| ())?;
        self.rx_en.set_high().map_err(|_| ())
    }

    fn rf_switch_tx(&mut self) -> Result<(), ()> {
        self.rx_en.set_low().map_err(|_| ())?;
        self.tx_en.set_high().map_err(|_| ())
    }

    fn rf_switch_idle(&mut self) -> Result<(), ()> {
        self.rx_en.set_low().map_err(|_| ())?;
        self.tx_en.set_low().map_err(|_| ())
    }

    fn set_packet_params(&mut self, payload_len: u8) -> Result<(), ()> {
        let mut pkt = [0u8; 6];
        pkt[0..2].copy_from_slice(&self.preamble_symbols.to_be_bytes());
        pkt[2] = 0x00; // explicit header
        pkt[3] = payload_len;
        pkt[4] = 0x01; // CRC on
        pkt[5] = 0x00; // standard IQ
        self.command(OP_SET_PACKET_PARAMS, &pkt)
    }

    fn apply_config(&mut self, params: &LoraParams, bw_code: u8) -> Result<(), ()> {
        self.hardware_reset()?;
        self.rf_switch_idle()?;

        // STDBY_RC, LoRa packet type
        self.command(OP_SET_STANDBY, &[0x00])?;
        self.command(OP_SET_PACKET_TYPE, &[0x01])?;

        // Frequency in XTAL/2^25 steps
        let raw = ((u64::from(params.frequency_hz) << FREQ_STEP_SHIFT) / XTAL_HZ) as u32;
        self.command(OP_SET_RF_FREQUENCY, &raw.to_be_bytes())?;

        // PA configuration for the SX1262 power range, 200 us ramp
        self.command(OP_SET_PA_CONFIG, &[0x02, 0x02, 0x00, 0x01])?;
        self.command(OP_SET_TX_PARAMS, &[params.tx_power_dbm as u8, 0x04])?;
        self.command(OP_SET_BUFFER_BASE, &[0x00, 0x00])?;

        // SF / BW / CR, low-data-rate optimize off (SF9 @ 125 kHz is well
        // under the 16 ms symbol threshold)
        self.command(
            OP_SET_MODULATION_PARAMS,
            &[
                params.spreading_factor,
                bw_code,
                params.coding_rate_denom - 4,
                0x00,
            ],
        )?;

        // Private-network sync word: 0xX4Y4 nibble expansion
        let sync = params.sync_word;
        self.write_register(
            REG_LORA_SYNC_WORD,
            &[(sync & 0xF0) | 0x04, ((sync & 0x0F) << 4) | 0x04],
        )?;

        // Route TxDone/RxDone to DIO1, keep timeout/CRC in the status
        let irq_mask = IRQ_TX_DONE | IRQ_RX_DONE | IRQ_TIMEOUT | IRQ_CRC_ERR;
        let dio1_mask = IRQ_TX_DONE | IRQ_RX_DONE;
        let mut args = [0u8; 8];
        args[0..2].copy_from_slice(&irq_mask.to_be_bytes());
        args[2..4].copy_from_slice(&dio1_mask.to_be_bytes());
        self.command(OP_SET_DIO_IRQ_PARAMS, &args)?;
        self.clear_irq(IRQ_ALL)
    }

    fn push_frame(&mut self, bytes: &[u8]) -> Result<(), ()> {
        self.rf_switch_tx()?;
        self.clear_irq(IRQ_ALL)?;
        self.command(OP_SET_BUFFER_BASE, &[0x00, 0x00])?;

        self.wait_busy()?;
        self.nss.set_low().map_err(|_| ())?;
        let write = self
            .spi
            .write(&[OP_WRITE_BUFFER, 0x00])
            .and_then(|()| self.spi.write(bytes))
            .and_then(|()| self.spi.flush());
        self.nss.set_high().map_err(|_| ())?;
        write.map_err(|_| ())?;

        self.set_packet_params(bytes.len() as u8)?;

        // No TX timeout; completion comes back on DIO1
        self.command(OP_SET_TX, &[0x00, 0x00, 0x00])
    }

    fn enter_receive(&mut self) -> Result<(), ()> {
        self.rf_switch_rx()?;
        self.clear_irq(IRQ_ALL)?;

        // Accept up to a full buffer
        self.set_packet_params(0xFF)?;

        // 0xFFFFFF = continuous receive
        self.command(OP_SET_RX, &[0xFF, 0xFF, 0xFF])
    }
}

/// Map a bandwidth in Hz to the chip's code, `None` if unsupported
const fn bandwidth_code(bandwidth_hz: u32) -> Option<u8> {
    match bandwidth_hz {
        125_000 => Some(0x04),
        250_000 => Some(0x05),
        500_000 => Some(0x06),
        _ => None,
    }
}

impl<SPI, NSS, RST, BUSY, RXEN, TXEN, D> Transceiver for Sx1262<SPI, NSS, RST, BUSY, RXEN, TXEN, D>
where
    SPI: SpiBus<u8>,
    NSS: OutputPin,
    RST: OutputPin,
    BUSY: InputPin,
    RXEN: OutputPin,
    TXEN: OutputPin,
    D: DelayNs,
{
    fn configure(&mut self, params: &LoraParams) -> Result<(), RadioError> {
        let bw_code = bandwidth_code(params.bandwidth_hz).ok_or(RadioError::Config)?;
        if !(5..=12).contains(&params.spreading_factor)
            || !(5..=8).contains(&params.coding_rate_denom)
            || !(-9..=22).contains(&params.tx_power_dbm)
        {
            return Err(RadioError::Config);
        }

        self.preamble_symbols = params.preamble_symbols;
        self.apply_config(params, bw_code)
            .map_err(|()| RadioError::Config)
    }

    fn start_transmit(&mut self, bytes: &[u8]) -> Result<(), RadioError> {
        if bytes.is_empty() || bytes.len() > 255 {
            return Err(RadioError::InvalidPayload);
        }
        self.push_frame(bytes).map_err(|()| RadioError::Tx)
    }

    fn tx_status(&mut self) -> TxStatus {
        match self.irq_status() {
            Ok(irq) if irq & IRQ_TIMEOUT != 0 => TxStatus::Failed(RadioError::Tx),
            Ok(_) => TxStatus::Done,
            Err(()) => TxStatus::Failed(RadioError::Tx),
        }
    }

    fn finish_transmit(&mut self) {
        // Bounded wait for TxDone, then force standby either way.
        for _ in 0..BUSY_TIMEOUT_POLLS {
            match self.irq_status() {
                Ok(irq) if irq & (IRQ_TX_DONE | IRQ_TIMEOUT) != 0 => break,
                Ok(_) => self.delay.delay_us(100),
                Err(()) => break,
            }
        }
        let _ = self.command(OP_SET_STANDBY, &[0x00]);
        let _ = self.clear_irq(IRQ_ALL);
        let _ = self.rf_switch_idle();
    }

    fn start_receive(&mut self) -> Result<(), RadioError> {
        self.enter_receive().map_err(|()| RadioError::Rx)
    }

    fn packet_length(&mut self) -> usize {
        let mut out = [0u8; 2];
        match self.read_command(OP_GET_RX_BUFFER_STATUS, &[], &mut out) {
            Ok(()) => usize::from(out[0]),
            Err(()) => 0,
        }
    }

    fn read_packet(&mut self, buf: &mut [u8]) -> Result<usize, RadioError> {
        let mut status = [0u8; 2];
        self.read_command(OP_GET_RX_BUFFER_STATUS, &[], &mut status)
            .map_err(|()| RadioError::Rx)?;
        let len = usize::from(status[0]).min(buf.len());
        let offset = status[1];

        self.read_command(OP_READ_BUFFER, &[offset], &mut buf[..len])
            .map_err(|()| RadioError::Rx)?;

        // Packet status: raw RSSI is -value/2 dBm, SNR is value/4 dB
        let mut pkt = [0u8; 3];
        self.read_command(OP_GET_PACKET_STATUS, &[], &mut pkt)
            .map_err(|()| RadioError::Rx)?;
        self.last_rssi_dbm = -f32::from(pkt[0]) / 2.0;
        self.last_snr_db = f32::from(pkt[1] as i8) / 4.0;

        self.clear_irq(IRQ_ALL).map_err(|()| RadioError::Rx)?;
        Ok(len)
    }

    fn last_rssi_dbm(&mut self) -> f32 {
        self.last_rssi_dbm
    }

    fn last_snr_db(&mut self) -> f32 {
        self.last_snr_db
    }
}
