//! Collar Node Firmware
//!
//! Entry point for the RP2040-based collar node. Reads the GNSS receiver
//! over UART, and every report period hands an encoded position report to
//! the SX1262. The DIO1 task is the only code that runs on the interrupt
//! edge, and the only thing it does is raise the TX-done flag.

#![no_std]
#![no_main]

use core::cell::Cell;

use defmt::{error, info, warn};
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::peripherals::UART1;
use embassy_rp::spi::Spi;
use embassy_rp::uart::{BufferedInterruptHandler, BufferedUartRx};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_time::Delay;
use embedded_io_async::Read;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use petlink_firmware::drivers::Sx1262;
use petlink_firmware::gnss::GnssSource;
use petlink_firmware::prelude::*;
use petlink_firmware::radio::link::{IrqFlag, LoraParams, TxRadio};
use petlink_firmware::radio::scheduler::{TickAction, TransmitScheduler};

bind_interrupts!(struct Irqs {
    UART1_IRQ => BufferedInterruptHandler<UART1>;
});

/// Raised by the DIO1 task when the transceiver reports TX done
static TX_DONE: IrqFlag = IrqFlag::new();

/// Latest fix parsed from the GNSS stream, shared with the transmit loop
static CURRENT_FIX: Mutex<CriticalSectionRawMutex, Cell<Option<GnssFix>>> =
    Mutex::new(Cell::new(None));

static GNSS_RX_BUF: StaticCell<[u8; 256]> = StaticCell::new();

/// Fix source backed by the shared cell the GNSS task writes into
struct SharedGnss;

impl GnssSource for SharedGnss {
    fn current_fix(&self) -> Option<GnssFix> {
        CURRENT_FIX.lock(Cell::get)
    }
}

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("petlink collar node v{}", env!("CARGO_PKG_VERSION"));

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

    let mut radio = TxRadio::new(transceiver, &TX_DONE);
    let params = LoraParams::default();
    match radio.init(&params) {
        Ok(()) => info!("radio configured: {}", params),
        // Degraded GNSS-only mode: the loop keeps running so the fix
        // stream stays observable over the debug link.
        Err(e) => error!("radio init failed, continuing without TX: {}", e),
    }

    let dio1 = Input::new(p.PIN_20, Pull::Down);

    // GNSS receiver on UART1 (RX only; the receiver free-runs at its
    // default sentence set)
    let mut uart_config = embassy_rp::uart::Config::default();
    uart_config.baudrate = GNSS_BAUD;
    let gnss_rx = BufferedUartRx::new(
        p.UART1,
        Irqs,
        p.PIN_5,
        GNSS_RX_BUF.init([0; 256]),
        uart_config,
    );

    let led = Output::new(p.PIN_25, Level::Low);

    spawner.spawn(dio1_task(dio1)).unwrap();
    spawner.spawn(gnss_task(gnss_rx)).unwrap();
    spawner.spawn(heartbeat_task(led)).unwrap();

    let Some(mut scheduler) = TransmitScheduler::new(REPORT_PERIOD_S) else {
        defmt::panic!("report period {} is not schedulable", REPORT_PERIOD_S);
    };
    let gnss = SharedGnss;

    info!(
        "tasks spawned, reporting every {} s when a fix is held",
        REPORT_PERIOD_S
    );

    loop {
        match scheduler.tick(gnss.current_fix(), &mut radio) {
            TickAction::None => {}
            TickAction::Started => info!("position report on the air"),
            TickAction::Completed(status) => info!("transmission finished: {}", status),
            TickAction::SkippedEncode(e) => warn!("fix not encodable, cycle skipped: {}", e),
            TickAction::Rejected(e) => warn!("radio rejected hand-off: {}", e),
        }
        Timer::after(Duration::from_millis(200)).await;
    }
}

/// DIO1 interrupt surrogate. Raising the flag is the only work allowed
/// here.
#[embassy_executor::task]
async fn dio1_task(mut dio1: Input<'static>) {
    loop {
        dio1.wait_for_rising_edge().await;
        TX_DONE.raise();
    }
}

/// Reads NMEA sentences and publishes the latest valid RMC fix
#[embassy_executor::task]
async fn gnss_task(mut rx: BufferedUartRx) {
    let mut line: heapless::Vec<u8, 128> = heapless::Vec::new();
    let mut buf = [0u8; 64];
    loop {
        let Ok(n) = rx.read(&mut buf).await else {
            continue;
        };
        for &byte in &buf[..n] {
            if byte == b'\n' {
                if let Ok(sentence) = core::str::from_utf8(&line) {
                    if let Some(fix) = parse_rmc(sentence.trim_end()) {
                        CURRENT_FIX.lock(|cell| cell.set(Some(fix)));
                    }
                }
                line.clear();
            } else if line.push(byte).is_err() {
                // Oversized garbage; resynchronize at the next newline.
                line.clear();
            }
        }
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

/// Parse a `$GxRMC` sentence into a fix, `None` unless the receiver marks
/// the solution active
fn parse_rmc(sentence: &str) -> Option<GnssFix> {
    let mut fields = sentence.split(',');
    let talker = fields.next()?;
    if !talker.ends_with("RMC") {
        return None;
    }

    let time_field = fields.next()?;
    if fields.next()? != "A" {
        return None;
    }

    let latitude = parse_coordinate(fields.next()?)?;
    let latitude = match fields.next()? {
        "N" => latitude,
        "S" => -latitude,
        _ => return None,
    };
    let longitude = parse_coordinate(fields.next()?)?;
    let longitude = match fields.next()? {
        "E" => longitude,
        "W" => -longitude,
        _ => return None,
    };

    let time_utc = parse_time(time_field)?;
    let fix = GnssFix::new(latitude, longitude, time_utc);
    fix.in_bounds().then_some(fix)
}

/// Parse `hhmmss.sss`, ignoring the fractional second
fn parse_time(field: &str) -> Option<UtcTime> {
    let digits = field.get(..6)?;
    let packed: u32 = digits.parse().ok()?;
    UtcTime::from_hhmmss(packed)
}

/// Parse an NMEA `(d)ddmm.mmmm` coordinate into decimal degrees
fn parse_coordinate(field: &str) -> Option<f64> {
    let dot = field.find('.')?;
    let whole: u32 = field.get(..dot)?.parse().ok()?;

    let mut fraction = 0.0;
    let mut scale = 0.1;
    for byte in field.get(dot + 1..)?.bytes() {
        if !byte.is_ascii_digit() {
            return None;
        }
        fraction += f64::from(byte - b'0') * scale;
        scale /= 10.0;
    }

    let degrees = whole / 100;
    let minutes = f64::from(whole % 100) + fraction;
    Some(f64::from(degrees) + minutes / 60.0)
}
