//! GNSS Collaborator Boundary
//!
//! The link layer consumes position fixes as plain values; NMEA parsing,
//! the UART plumbing, and receiver configuration live behind this trait in
//! the collar node's application code.

use crate::types::GnssFix;

/// Source of position fixes for the transmit scheduler
///
/// "No fix" is structurally distinct from any fix value: an implementation
/// must never fabricate a fix at 0°N 0°E to mean "no data".
pub trait GnssSource {
    /// The current fix, if the receiver has both a valid position and a
    /// valid time
    fn current_fix(&self) -> Option<GnssFix>;

    /// Whether a fix is currently available
    fn has_fix(&self) -> bool {
        self.current_fix().is_some()
    }
}
