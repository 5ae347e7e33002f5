//! Link task
//!
//! Drives the protocol session from a fixed tick: pumps the UART, drains
//! ready frames, echoes application messages back to the peer and keeps
//! the link alive with periodic pings.

use defmt::*;
use embassy_time::{Duration, Instant, Ticker};

use rovecomm_hal::SerialTransport;
use rovecomm_protocol::{Message, Session};

use crate::serial::UartTransport;

/// Tick interval in milliseconds
pub const TICK_INTERVAL_MS: u64 = 1;

/// Ticks between keep-alive pings
const PING_INTERVAL_TICKS: u32 = 1_000;

/// Ticks between stats reports
const STATS_INTERVAL_TICKS: u32 = 10_000;

/// Upper bound on frames handled in one tick
const MAX_POLLS_PER_TICK: usize = 8;

/// Uptime telemetry, sent once per second while the peer is subscribed
pub const UPTIME_DATA_ID: u16 = 0x0100;

/// Link task - owns the session for its whole life
#[embassy_executor::task]
pub async fn link_task(mut session: Session<UartTransport>) {
    info!(
        "Link task started (mode {:?}, max payload {})",
        session.mode(),
        session.max_payload()
    );

    let mut ticker = Ticker::every(Duration::from_millis(TICK_INTERVAL_MS));
    let start = Instant::now();
    let mut ticks: u32 = 0;

    loop {
        ticker.next().await;
        ticks = ticks.wrapping_add(1);

        session.transport_mut().pump();

        for _ in 0..MAX_POLLS_PER_TICK {
            match session.poll() {
                Ok(Some(message)) => handle_message(&mut session, &message),
                Ok(None) => {
                    if session.transport().available() == 0 {
                        break;
                    }
                }
                Err(e) => debug!("Frame dropped: {:?}", e),
            }
        }

        if let Some(id) = session.take_acknowledged() {
            debug!("Peer acknowledged {:#x}", id);
        }

        if ticks % PING_INTERVAL_TICKS == 0 {
            if let Err(e) = session.ping() {
                warn!("Ping failed: {:?}", e);
            }

            if session.peer_subscribed() {
                let uptime_ms = start.elapsed().as_millis() as u32;
                if let Err(e) = session.send(UPTIME_DATA_ID, &uptime_ms.to_be_bytes()) {
                    warn!("Telemetry failed: {:?}", e);
                }
            }
        }

        if ticks % STATS_INTERVAL_TICKS == 0 {
            let stats = session.stats();
            info!(
                "Link stats: {} rx, {} tx, {} rejected, uart rx errors {}",
                stats.frames_received,
                stats.frames_sent,
                stats.rejected(),
                session.transport().rx_errors()
            );
            debug!("Link counters: {:?}", stats);
        }

        // Flush replies queued while polling
        session.transport_mut().pump();
    }
}

/// Echo an application message back to the peer
fn handle_message(session: &mut Session<UartTransport>, message: &Message) {
    trace!(
        "RX {:#x}: {} bytes, flags {:#x}",
        message.data_id,
        message.size(),
        message.flags
    );

    if let Err(e) = session.send_message(message) {
        warn!("Echo of {:#x} failed: {:?}", message.data_id, e);
    }
}
