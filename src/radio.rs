//! Radio Link Layer
//!
//! Everything between the GNSS collaborator and the physical transceiver:
//! the interrupt contract, the TX/RX facades, transmit scheduling, and the
//! last-known-good fix cache.

pub mod cache;
pub mod link;
pub mod scheduler;

#[cfg(feature = "std")]
pub mod sim;
