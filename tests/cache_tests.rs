//! Receive Cache Tests
//!
//! Host-side tests for the last-known-good fix cache, driven the way the
//! base-station loop drives it: frames injected through the simulator,
//! interrupts played by the test.

use petlink_firmware::protocol::{self, DecodeError};
use petlink_firmware::radio::cache::{PollOutcome, ReceiveCache};
use petlink_firmware::radio::link::{IrqFlag, RadioError, RxRadio};
use petlink_firmware::radio::sim::{SimHandle, SimTransceiver};
use petlink_firmware::types::{GnssFix, UtcTime};

fn fix(lat: f64, lon: f64, hhmmss: u32) -> GnssFix {
    GnssFix::new(lat, lon, UtcTime::from_hhmmss(hhmmss).unwrap())
}

fn inject_fix(handle: &SimHandle, fix: &GnssFix) {
    let payload = protocol::encode(fix).unwrap();
    handle.inject_frame(payload.as_bytes());
}

// ============================================================================
// Basic Cache Behavior
// ============================================================================

#[test]
fn test_cache_starts_empty() {
    let cache = ReceiveCache::new();
    assert!(cache.last_valid().is_none());
}

#[test]
fn test_idle_poll_reports_idle() {
    let pending = IrqFlag::new();
    let (sim, _handle) = SimTransceiver::new();
    let mut radio = RxRadio::new(sim, &pending);
    let mut cache = ReceiveCache::new();

    assert_eq!(cache.poll(&mut radio), PollOutcome::Idle);
    assert!(cache.last_valid().is_none());
}

#[test]
fn test_valid_report_populates_the_cache() {
    let pending = IrqFlag::new();
    let (sim, handle) = SimTransceiver::new();
    let mut radio = RxRadio::new(sim, &pending);
    let mut cache = ReceiveCache::new();

    let sent = fix(40.4168, -3.7038, 211_507);
    inject_fix(&handle, &sent);
    handle.set_quality(-101.0, 3.75);
    pending.raise();

    let PollOutcome::Updated(entry) = cache.poll(&mut radio) else {
        panic!("expected an update");
    };
    assert!((entry.fix.latitude_deg - sent.latitude_deg).abs() < 1e-5);
    assert!((entry.fix.longitude_deg - sent.longitude_deg).abs() < 1e-5);
    assert_eq!(entry.fix.time_utc, sent.time_utc);
    assert!((entry.quality.rssi_dbm - (-101.0)).abs() < f32::EPSILON);

    let held = cache.last_valid().unwrap();
    assert_eq!(held.fix.time_utc, sent.time_utc);
}

#[test]
fn test_newer_report_overwrites_older() {
    let pending = IrqFlag::new();
    let (sim, handle) = SimTransceiver::new();
    let mut radio = RxRadio::new(sim, &pending);
    let mut cache = ReceiveCache::new();

    inject_fix(&handle, &fix(10.0, 20.0, 100_000));
    pending.raise();
    cache.poll(&mut radio);

    inject_fix(&handle, &fix(11.0, 21.0, 100_010));
    pending.raise();
    cache.poll(&mut radio);

    let held = cache.last_valid().unwrap();
    assert_eq!(held.fix.time_utc, UtcTime::from_hhmmss(100_010).unwrap());
    assert!((held.fix.latitude_deg - 11.0).abs() < 1e-5);
}

// ============================================================================
// Corruption Resilience
// ============================================================================

#[test]
fn test_corrupt_packet_preserves_previous_fix() {
    let pending = IrqFlag::new();
    let (sim, handle) = SimTransceiver::new();
    let mut radio = RxRadio::new(sim, &pending);
    let mut cache = ReceiveCache::new();

    let good = fix(40.4168, -3.7038, 211_507);
    inject_fix(&handle, &good);
    pending.raise();
    assert!(matches!(cache.poll(&mut radio), PollOutcome::Updated(_)));

    // A truncated 10-byte frame arrives next
    handle.inject_frame(&[1, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
    pending.raise();
    assert_eq!(
        cache.poll(&mut radio),
        PollOutcome::Dropped(DecodeError::WrongLength)
    );

    // The earlier fix is still served
    let held = cache.last_valid().unwrap();
    assert_eq!(held.fix.time_utc, good.time_utc);
    assert!((held.fix.latitude_deg - good.latitude_deg).abs() < 1e-5);
}

#[test]
fn test_corruption_before_any_fix_leaves_cache_empty() {
    let pending = IrqFlag::new();
    let (sim, handle) = SimTransceiver::new();
    let mut radio = RxRadio::new(sim, &pending);
    let mut cache = ReceiveCache::new();

    handle.inject_frame(&[0xFF; 13]);
    pending.raise();
    assert!(matches!(cache.poll(&mut radio), PollOutcome::Dropped(_)));
    assert!(cache.last_valid().is_none());
}

#[test]
fn test_failed_chip_read_counts_as_idle_and_keeps_cache() {
    let pending = IrqFlag::new();
    let (sim, handle) = SimTransceiver::new();
    let mut radio = RxRadio::new(sim, &pending);
    let mut cache = ReceiveCache::new();

    let good = fix(1.0, 2.0, 30_000);
    inject_fix(&handle, &good);
    pending.raise();
    cache.poll(&mut radio);

    inject_fix(&handle, &fix(3.0, 4.0, 30_010));
    handle.fail_next_read(RadioError::Rx);
    pending.raise();

    assert_eq!(cache.poll(&mut radio), PollOutcome::Idle);
    assert_eq!(
        cache.last_valid().unwrap().fix.time_utc,
        good.time_utc
    );
}

#[test]
fn test_receiver_stays_alive_after_a_dropped_packet() {
    let pending = IrqFlag::new();
    let (sim, handle) = SimTransceiver::new();
    let mut radio = RxRadio::new(sim, &pending);
    let mut cache = ReceiveCache::new();

    radio.start_receive().unwrap();
    let after_start = handle.receive_count();

    handle.inject_frame(&[0u8; 5]);
    pending.raise();
    assert!(matches!(cache.poll(&mut radio), PollOutcome::Dropped(_)));
    // Listening was re-armed as part of the poll
    assert_eq!(handle.receive_count(), after_start + 1);

    let next = fix(5.0, 6.0, 40_000);
    inject_fix(&handle, &next);
    pending.raise();
    assert!(matches!(cache.poll(&mut radio), PollOutcome::Updated(_)));
    assert_eq!(cache.last_valid().unwrap().fix.time_utc, next.time_utc);
}

// ============================================================================
// End-to-End Report Path
// ============================================================================

#[test]
fn test_collar_payload_round_trips_through_the_cache() {
    let pending = IrqFlag::new();
    let (sim, handle) = SimTransceiver::new();
    let mut radio = RxRadio::new(sim, &pending);
    let mut cache = ReceiveCache::new();

    // The exact bytes the collar would hand to its radio
    let report = protocol::encode(&fix(51.5007, -0.1246, 235_959)).unwrap();
    handle.inject_frame(report.as_bytes());
    pending.raise();

    let PollOutcome::Updated(entry) = cache.poll(&mut radio) else {
        panic!("expected an update");
    };
    assert!((entry.fix.latitude_deg - 51.5007).abs() < 1e-5);
    assert!((entry.fix.longitude_deg - (-0.1246)).abs() < 1e-5);
    assert_eq!(entry.fix.time_utc, UtcTime::from_hhmmss(235_959).unwrap());
}
