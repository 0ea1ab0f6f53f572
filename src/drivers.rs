//! Peripheral Drivers
//!
//! Command-level driver for the SX1262 LoRa transceiver, generic over
//! `embedded-hal` traits so any SPI bus and GPIO implementation can carry
//! it.

pub mod sx1262;

pub use sx1262::Sx1262;
