//! Base-Station Node Firmware
//!
//! Entry point for the RP2040-based base station. Listens continuously for
//! position reports from the collar and keeps the last valid fix for the
//! display and web-portal collaborators. The DIO1 task is the only code
//! that runs on the interrupt edge, and the only thing it does is raise
//! the packet-pending flag.

#![no_std]
#![no_main]

use defmt::{error, info, warn};
use embassy_executor::Spawner;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::spi::Spi;
use embassy_time::Delay;
use {defmt_rtt as _, panic_probe as _};

use petlink_firmware::drivers::Sx1262;
use petlink_firmware::prelude::*;
use petlink_firmware::radio::cache::{PollOutcome, ReceiveCache};
use petlink_firmware::radio::link::{IrqFlag, LoraParams, RxRadio};

/// Raised by the DIO1 task when the transceiver reports a received packet
static RX_PENDING: IrqFlag = IrqFlag::new();

/// How many poll cycles between last-known-fix status lines
const STATUS_EVERY_POLLS: u32 = 300;

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("petlink base node v{}", env!("CARGO_PKG_VERSION"));

    let p = embassy_rp::init(Default::default());

    // SPI0 to the SX1262
    let mut spi_config = embassy_rp::spi::Config::default();
    spi_config.frequency = 8_000_000;
    let spi = Spi::new_blocking(p.SPI0, p.PIN_18, p.PIN_19, p.PIN_16, spi_config);

    let nss = Output::new(p.PIN_17, Level::High);
    let reset = Output::new(p.PIN_22, Level::High);
    let busy = Input::new(p.PIN_28, Pull::None);
    let rx_en = Output::new(p.PIN_26, Level::Low);
    let tx_en = Output::new(p.PIN_27, Level::Low);
    let transceiver = Sx1262::new(spi, nss, reset, busy, rx_en, tx_en, Delay);

    let mut radio = RxRadio::new(transceiver, &RX_PENDING);
    let params = LoraParams::default();
    if let Err(e) = radio.init(&params) {
        // Without a configured radio there is nothing to listen to.
        defmt::panic!("radio init failed: {}", e);
    }
    info!("radio configured: {}", params);

    let dio1 = Input::new(p.PIN_20, Pull::Down);
    let led = Output::new(p.PIN_25, Level::Low);

    spawner.spawn(dio1_task(dio1)).unwrap();
    spawner.spawn(heartbeat_task(led)).unwrap();

    if let Err(e) = radio.start_receive() {
        error!("failed to enter receive mode: {}", e);
    }

    let mut cache = ReceiveCache::new();
    let mut polls: u32 = 0;

    info!("tasks spawned, listening for position reports");

    loop {
        match cache.poll(&mut radio) {
            PollOutcome::Idle => {}
            PollOutcome::Updated(entry) => info!("fix updated: {}", entry),
            PollOutcome::Dropped(e) => warn!("packet dropped: {}", e),
        }

        polls = polls.wrapping_add(1);
        if polls % STATUS_EVERY_POLLS == 0 {
            match cache.last_valid() {
                Some(entry) => info!("last known position: {}", entry),
                None => info!("no valid report received yet"),
            }
        }

        Timer::after(Duration::from_millis(100)).await;
    }
}

/// DIO1 interrupt surrogate. Raising the flag is the only work allowed
/// here.
#[embassy_executor::task]
async fn dio1_task(mut dio1: Input<'static>) {
    loop {
        dio1.wait_for_rising_edge().await;
        RX_PENDING.raise();
    }
}

/// Heartbeat task - blinks LED to show system is running
#[embassy_executor::task]
async fn heartbeat_task(mut led: Output<'static>) {
    loop {
        led.set_high();
        Timer::after(Duration::from_millis(100)).await;
        led.set_low();
        Timer::after(Duration::from_millis(900)).await;
    }
}
