//! Petlink Node Firmware Library
//!
//! Core functionality for a two-node pet-tracking radio link. The collar
//! node reads a GNSS receiver and periodically transmits a compact 13-byte
//! position report over a sub-GHz LoRa link; the base-station node listens
//! continuously, decodes reports, and republishes the latest fix to its
//! display and web portal.
//!
//! # Architecture
//!
//! The firmware is organized in layers:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    APPLICATION LAYER                          │
//! │  Collar node (GNSS + TX)  │  Base-station node (RX + portal)  │
//! ├──────────────────────────────────────────────────────────────┤
//! │                    RADIO LINK LAYER                           │
//! │  PayloadCodec  │  TxRadio/RxRadio  │  Scheduler  │  Cache     │
//! ├──────────────────────────────────────────────────────────────┤
//! │                   HAL / DRIVER LAYER                          │
//! │  SX1262 driver  │  SPI  │  GPIO  │  DIO1 interrupt            │
//! ├──────────────────────────────────────────────────────────────┤
//! │                    RTOS / SCHEDULER                           │
//! │           embassy-rs (async/await executor)                   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Design Principles
//!
//! - **Type-driven design**: Custom types enforce invariants at compile time
//! - **Interrupt minimalism**: ISRs only raise a single-bit pending flag
//! - **Injected hardware**: The transceiver is a trait, testable on the host
//! - **Explicit error handling**: All fallible operations return `Result`
//! - **Stale over noisy**: A decode failure never disturbs the last good fix

#![cfg_attr(feature = "embedded", no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Re-export dependencies needed by applications (only in embedded mode)
#[cfg(feature = "embedded")]
pub use embassy_executor;
#[cfg(feature = "embedded")]
pub use embassy_rp;
#[cfg(feature = "embedded")]
pub use embassy_time;

/// Peripheral Drivers
///
/// Command-level driver for the SX1262 LoRa transceiver.
#[cfg(feature = "embedded")]
pub mod drivers;

/// Radio Link Layer
///
/// Interrupt-driven TX/RX facades, transmit scheduling, and the
/// last-known-good fix cache.
pub mod radio;

/// GNSS Collaborator Boundary
///
/// The interface through which position fixes enter the link layer.
pub mod gnss;

/// Wire Protocol
///
/// The fixed 13-byte position report codec shared by both nodes.
pub mod protocol;

/// Shared types used across modules
pub mod types;

/// System configuration and constants
pub mod config;

/// Prelude module for common imports
#[cfg(feature = "embedded")]
pub mod prelude {
    //! Convenient re-exports for common types and traits.

    pub use crate::config::*;
    pub use crate::types::*;

    // Common traits
    pub use embedded_hal::digital::OutputPin;
    pub use embedded_hal::spi::SpiBus;

    // Embassy
    pub use embassy_time::{Duration, Instant, Timer};

    // Error handling
    pub use core::result::Result;

    // Logging
    pub use defmt::{debug, error, info, trace, warn};
}
