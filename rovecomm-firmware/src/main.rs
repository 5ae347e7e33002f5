//! RoveComm-Serial reference node
//!
//! Runs one protocol session over UART0 (GPIO0 TX, GPIO1 RX) on an
//! RP2040 board. Application messages are echoed back to the peer, and
//! the node pings its peer once per second.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::peripherals::UART0;
use embassy_rp::uart::{BufferedInterruptHandler, Uart};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use rovecomm_hal::UartConfig;
use rovecomm_protocol::{Mode, Session, SessionConfig, MAX_PAYLOAD_SIZE};

mod serial;
mod tasks;

use crate::serial::{driver_config, UartTransport};

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

// Static cells for UART buffers (must live forever)
static TX_BUF: StaticCell<[u8; 256]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 256]> = StaticCell::new();

/// Link settings; both ends must agree
const LINK_MODE: Mode = Mode::Full;
const LINK_BAUDRATE: u32 = 115_200;

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("RoveComm-Serial node starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let line = UartConfig::with_baudrate(LINK_BAUDRATE);

    let tx_buf = TX_BUF.init([0u8; 256]);
    let rx_buf = RX_BUF.init([0u8; 256]);

    let uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, driver_config(&line));
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);
    let (tx, rx) = uart.split();

    info!("UART initialized at {} baud", line.baudrate);

    let config = SessionConfig::new(LINK_MODE, MAX_PAYLOAD_SIZE as u8);
    let session = match Session::open(UartTransport::new(rx, tx), config) {
        Ok(session) => session,
        Err(e) => defmt::panic!("Session config rejected: {:?}", e),
    };

    info!(
        "Session open, receive buffer {} bytes",
        session.buffer_size()
    );

    spawner.spawn(tasks::link_task(session)).unwrap();

    info!("All tasks spawned");
}
