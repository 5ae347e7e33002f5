//! UART transport for the protocol session
//!
//! The session works on a non-blocking, peekable byte stream. The embassy
//! buffered UART only offers read/write, so this adapter keeps its own
//! receive and transmit rings and moves bytes to and from the driver in
//! [`UartTransport::pump`], once per link tick.

use defmt::*;
use embassy_rp::uart::{self, BufferedUartRx, BufferedUartTx};
use embedded_io::{ErrorKind, ErrorType, Read, ReadReady, Write};
use heapless::Deque;

use rovecomm_hal::{DataBits, Parity, SerialTransport, StopBits, UartConfig};

/// Receive ring capacity (largest frame plus slack)
pub const RX_CAPACITY: usize = 272;

/// Transmit staging capacity
pub const TX_CAPACITY: usize = 272;

/// Bytes moved per driver call
const CHUNK: usize = 32;

/// Transport error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum UartTransportError {
    /// Frame does not fit in the transmit staging ring
    TxFull,
}

impl embedded_io::Error for UartTransportError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::OutOfMemory
    }
}

/// Map the board-independent line settings onto the RP2040 driver config
pub fn driver_config(config: &UartConfig) -> uart::Config {
    let mut out = uart::Config::default();
    out.baudrate = config.baudrate;
    out.data_bits = match config.data_bits {
        DataBits::Seven => uart::DataBits::DataBits7,
        DataBits::Eight => uart::DataBits::DataBits8,
    };
    out.parity = match config.parity {
        Parity::None => uart::Parity::ParityNone,
        Parity::Even => uart::Parity::ParityEven,
        Parity::Odd => uart::Parity::ParityOdd,
    };
    out.stop_bits = match config.stop_bits {
        StopBits::One => uart::StopBits::STOP1,
        StopBits::Two => uart::StopBits::STOP2,
    };
    out
}

/// Buffered UART exposed as a [`SerialTransport`]
pub struct UartTransport {
    rx: BufferedUartRx,
    tx: BufferedUartTx,
    rx_ring: Deque<u8, RX_CAPACITY>,
    tx_ring: Deque<u8, TX_CAPACITY>,
    rx_limit: usize,
    rx_errors: u32,
}

impl UartTransport {
    pub fn new(rx: BufferedUartRx, tx: BufferedUartTx) -> Self {
        Self {
            rx,
            tx,
            rx_ring: Deque::new(),
            tx_ring: Deque::new(),
            rx_limit: RX_CAPACITY,
            rx_errors: 0,
        }
    }

    /// Move received bytes into the ring and flush staged output
    ///
    /// Receiving never waits. Received bytes beyond the ring limit stay in
    /// the driver buffer until the session consumes enough to make room.
    ///
    /// Flushing can wait: `BufferedUartTx` has no write-readiness check, so
    /// a write blocks while the driver's transmit buffer is full. The
    /// staging ring is barely larger than that buffer, so the worst case is
    /// a few byte times at the configured baud rate.
    pub fn pump(&mut self) {
        self.fill_rx();
        self.flush_tx();
    }

    /// Driver-level receive errors (framing, parity, overrun, break)
    pub fn rx_errors(&self) -> u32 {
        self.rx_errors
    }

    /// Bytes staged but not yet handed to the driver
    pub fn tx_pending(&self) -> usize {
        self.tx_ring.len()
    }

    fn fill_rx(&mut self) {
        let mut chunk = [0u8; CHUNK];
        loop {
            match self.rx.read_ready() {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    self.rx_errors = self.rx_errors.wrapping_add(1);
                    warn!("UART RX error: {:?}", e);
                    break;
                }
            }

            let room = self
                .rx_limit
                .saturating_sub(self.rx_ring.len())
                .min(CHUNK);
            if room == 0 {
                break;
            }

            match self.rx.read(&mut chunk[..room]) {
                Ok(n) => {
                    for &byte in &chunk[..n] {
                        // room was checked above
                        let _ = self.rx_ring.push_back(byte);
                    }
                }
                Err(e) => {
                    self.rx_errors = self.rx_errors.wrapping_add(1);
                    warn!("UART read error: {:?}", e);
                    break;
                }
            }
        }
    }

    fn flush_tx(&mut self) {
        while !self.tx_ring.is_empty() {
            let (front, _) = self.tx_ring.as_slices();
            match self.tx.write(front) {
                Ok(0) => break,
                Ok(n) => {
                    for _ in 0..n {
                        self.tx_ring.pop_front();
                    }
                }
                Err(e) => {
                    warn!("UART write error: {:?}", e);
                    break;
                }
            }
        }
    }
}

impl ErrorType for UartTransport {
    type Error = UartTransportError;
}

impl SerialTransport for UartTransport {
    fn available(&self) -> usize {
        self.rx_ring.len()
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.rx_ring.iter().nth(offset).copied()
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        let mut n = 0;
        while n < buf.len() {
            match self.rx_ring.pop_front() {
                Some(byte) => {
                    buf[n] = byte;
                    n += 1;
                }
                None => break,
            }
        }
        n
    }

    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        if TX_CAPACITY - self.tx_ring.len() < data.len() {
            return Err(UartTransportError::TxFull);
        }
        for &byte in data {
            let _ = self.tx_ring.push_back(byte);
        }
        Ok(())
    }

    fn buffer_capacity(&self) -> usize {
        self.rx_limit
    }

    fn set_buffer_length(&mut self, len: usize) {
        self.rx_limit = len.min(RX_CAPACITY);
    }
}
