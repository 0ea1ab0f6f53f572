//! System configuration and link constants
//!
//! Compile-time constants for the pet-tracking link. Both nodes must agree
//! on every radio parameter here; a mismatch on any of them silently
//! partitions the link.

/// Default LoRa center frequency in Hz (EU 868 band prototype)
pub const DEFAULT_FREQUENCY_HZ: u32 = 868_000_000;

/// LoRa bandwidth in Hz (125 kHz)
pub const LORA_BANDWIDTH_HZ: u32 = 125_000;

/// LoRa spreading factor
pub const LORA_SPREADING_FACTOR: u8 = 9;

/// LoRa coding rate denominator (4/7)
pub const LORA_CODING_RATE_DENOM: u8 = 7;

/// LoRa sync word (private network, not cryptographic)
pub const LORA_SYNC_WORD: u8 = 0x12;

/// Transmit power in dBm
pub const LORA_TX_POWER_DBM: i8 = 14;

/// Preamble length in symbols
pub const LORA_PREAMBLE_SYMBOLS: u16 = 8;

/// Maximum frame size the transceiver accepts for transmit
pub const MAX_FRAME_LEN: usize = 256;

/// Maximum bytes the receiver reads from a single packet (safety cap)
pub const MAX_READ_LEN: usize = 64;

/// Position report payload length in bytes
pub const REPORT_LEN: usize = 13;

/// Seconds between position reports.
///
/// The scheduler fires on `second_of_minute % REPORT_PERIOD_S == 0`, which
/// is only correct for periods strictly below 60. Longer periods need a
/// monotonic elapsed-time scheduler instead.
pub const REPORT_PERIOD_S: u8 = 10;

/// GNSS receiver UART baud rate
pub const GNSS_BAUD: u32 = 9600;

/// Pin assignments for GPIO
pub mod pins {
    //! RP2040 pin assignments matching the node schematic (SPI0 bus)

    /// SPI0 clock to the SX1262
    pub const LORA_SCK: u8 = 18;

    /// SPI0 MOSI to the SX1262
    pub const LORA_MOSI: u8 = 19;

    /// SPI0 MISO from the SX1262
    pub const LORA_MISO: u8 = 16;

    /// SX1262 chip select (NSS, active low)
    pub const LORA_NSS: u8 = 17;

    /// SX1262 reset (active low)
    pub const LORA_RST: u8 = 22;

    /// SX1262 DIO1 interrupt line (TxDone / RxDone)
    pub const LORA_DIO1: u8 = 20;

    /// SX1262 BUSY line
    pub const LORA_BUSY: u8 = 28;

    /// RF switch RX enable
    pub const LORA_RXEN: u8 = 26;

    /// RF switch TX enable
    pub const LORA_TXEN: u8 = 27;

    /// UART RX from the GNSS receiver (collar node)
    pub const GNSS_RX: u8 = 5;

    /// UART TX to the GNSS receiver (collar node)
    pub const GNSS_TX: u8 = 4;

    /// Status LED
    pub const LED_STATUS: u8 = 25;
}
