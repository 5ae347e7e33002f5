//! In-memory serial transport
//!
//! [`RingSerial`] models a UART driver with fixed receive and transmit ring
//! buffers. The "wire" side is driven by hand: [`RingSerial::inject`] plays
//! the role of the RX interrupt and [`RingSerial::drain_tx`] the role of the
//! TX shift register. Used for host-side simulation and protocol tests.

use core::fmt;

use embedded_io::{Error, ErrorKind, ErrorType};
use heapless::Deque;

use crate::uart::SerialTransport;

/// Errors from the in-memory transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RingError {
    /// Transmit buffer cannot take the whole write
    TxFull,
}

impl fmt::Display for RingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RingError::TxFull => f.write_str("transmit buffer full"),
        }
    }
}

impl Error for RingError {
    fn kind(&self) -> ErrorKind {
        match self {
            RingError::TxFull => ErrorKind::OutOfMemory,
        }
    }
}

/// Serial transport backed by two fixed ring buffers of `N` bytes
#[derive(Debug, Clone)]
pub struct RingSerial<const N: usize> {
    rx: Deque<u8, N>,
    tx: Deque<u8, N>,
    /// Receive buffer length set by the protocol layer (≤ N)
    rx_limit: usize,
    /// Bytes dropped because the receive buffer was full
    overruns: usize,
}

impl<const N: usize> Default for RingSerial<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RingSerial<N> {
    /// Create an empty transport using the full `N`-byte receive buffer
    pub const fn new() -> Self {
        Self {
            rx: Deque::new(),
            tx: Deque::new(),
            rx_limit: N,
            overruns: 0,
        }
    }

    /// Simulate bytes arriving on the RX line
    ///
    /// Bytes that do not fit in the receive buffer are dropped, like a
    /// hardware overrun. Returns the number of bytes accepted.
    pub fn inject(&mut self, bytes: &[u8]) -> usize {
        let mut accepted = 0;
        for &byte in bytes {
            if self.rx.len() >= self.rx_limit || self.rx.push_back(byte).is_err() {
                self.overruns += bytes.len() - accepted;
                break;
            }
            accepted += 1;
        }
        accepted
    }

    /// Move transmitted bytes out of the TX buffer into `out`
    ///
    /// Returns the number of bytes moved.
    pub fn drain_tx(&mut self, out: &mut [u8]) -> usize {
        let mut n = 0;
        while n < out.len() {
            match self.tx.pop_front() {
                Some(byte) => {
                    out[n] = byte;
                    n += 1;
                }
                None => break,
            }
        }
        n
    }

    /// Number of bytes waiting in the TX buffer
    pub fn tx_pending(&self) -> usize {
        self.tx.len()
    }

    /// Free space in the TX buffer
    pub fn tx_free(&self) -> usize {
        N - self.tx.len()
    }

    /// Bytes dropped by [`RingSerial::inject`] because RX was full
    pub fn overruns(&self) -> usize {
        self.overruns
    }

    /// Forward everything transmitted by `self` into the RX side of `peer`
    ///
    /// Returns the number of bytes the peer accepted.
    pub fn forward_to<const M: usize>(&mut self, peer: &mut RingSerial<M>) -> usize {
        let mut accepted = 0;
        while let Some(byte) = self.tx.pop_front() {
            accepted += peer.inject(&[byte]);
        }
        accepted
    }
}

impl<const N: usize> ErrorType for RingSerial<N> {
    type Error = RingError;
}

impl<const N: usize> SerialTransport for RingSerial<N> {
    fn available(&self) -> usize {
        self.rx.len()
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.rx.iter().nth(offset).copied()
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        let mut n = 0;
        while n < buf.len() {
            match self.rx.pop_front() {
                Some(byte) => {
                    buf[n] = byte;
                    n += 1;
                }
                None => break,
            }
        }
        n
    }

    fn write(&mut self, data: &[u8]) -> Result<(), RingError> {
        if data.len() > self.tx_free() {
            return Err(RingError::TxFull);
        }
        for &byte in data {
            self.tx.push_back(byte).map_err(|_| RingError::TxFull)?;
        }
        Ok(())
    }

    fn buffer_capacity(&self) -> usize {
        self.rx_limit
    }

    fn set_buffer_length(&mut self, len: usize) {
        self.rx_limit = len.min(N);
    }
}
