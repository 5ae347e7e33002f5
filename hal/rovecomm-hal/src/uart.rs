//! UART serial transport abstractions
//!
//! Provides the non-blocking byte transport the protocol engine polls.
//! Unlike `embedded_io::Read`, the protocol needs to look ahead into the
//! receive buffer without consuming, so the trait exposes offset-capable
//! [`SerialTransport::peek`].

use embedded_io::ErrorType;

/// Non-blocking serial byte transport
///
/// Implementations own a fixed receive ring buffer filled by the UART
/// driver (interrupt or DMA). None of the methods may block waiting for
/// bytes that have not arrived yet.
pub trait SerialTransport: ErrorType {
    /// Number of received bytes currently buffered
    fn available(&self) -> usize;

    /// Look at the buffered byte `offset` positions from the front
    ///
    /// Returns `None` if fewer than `offset + 1` bytes are buffered.
    fn peek(&self, offset: usize) -> Option<u8>;

    /// Consume up to `buf.len()` buffered bytes into `buf`
    ///
    /// Returns the number of bytes copied, which is zero when nothing is
    /// buffered.
    fn read(&mut self, buf: &mut [u8]) -> usize;

    /// Queue `data` for transmission
    ///
    /// All-or-nothing: if the outgoing buffer cannot take the whole slice,
    /// nothing is queued and an error is returned.
    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Usable receive buffer length in bytes
    fn buffer_capacity(&self) -> usize;

    /// Limit the receive buffer to `len` bytes
    ///
    /// Implementations clamp to their physical capacity; read back the
    /// effective value with [`SerialTransport::buffer_capacity`].
    fn set_buffer_length(&mut self, len: usize);

    /// Drop a single buffered byte
    ///
    /// Returns `false` if nothing was buffered.
    fn discard(&mut self) -> bool {
        let mut byte = [0u8; 1];
        self.read(&mut byte) == 1
    }
}

/// UART configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UartConfig {
    /// Baud rate in bits per second
    pub baudrate: u32,
    /// Number of data bits (typically 8)
    pub data_bits: DataBits,
    /// Parity mode
    pub parity: Parity,
    /// Number of stop bits
    pub stop_bits: StopBits,
}

impl Default for UartConfig {
    fn default() -> Self {
        Self {
            baudrate: 115200,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }
}

impl UartConfig {
    /// Config with the given baud rate and 8N1 framing
    pub fn with_baudrate(baudrate: u32) -> Self {
        Self {
            baudrate,
            ..Self::default()
        }
    }

    /// Bits on the wire per transmitted byte (start + data + parity + stop)
    pub fn bits_per_byte(&self) -> u32 {
        let data = match self.data_bits {
            DataBits::Seven => 7,
            DataBits::Eight => 8,
        };
        let parity = match self.parity {
            Parity::None => 0,
            Parity::Even | Parity::Odd => 1,
        };
        let stop = match self.stop_bits {
            StopBits::One => 1,
            StopBits::Two => 2,
        };
        1 + data + parity + stop
    }

    /// Time to transmit `bytes` bytes, in microseconds
    ///
    /// Useful for sizing poll intervals against the receive buffer.
    pub fn transfer_time_us(&self, bytes: usize) -> u64 {
        if self.baudrate == 0 {
            return 0;
        }
        (bytes as u64 * self.bits_per_byte() as u64 * 1_000_000) / self.baudrate as u64
    }
}

/// Number of data bits per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataBits {
    Seven,
    Eight,
}

/// Parity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parity {
    None,
    Even,
    Odd,
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopBits {
    One,
    Two,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_115200_8n1() {
        let config = UartConfig::default();
        assert_eq!(config.baudrate, 115200);
        assert_eq!(config.bits_per_byte(), 10);
    }

    #[test]
    fn test_transfer_time() {
        let config = UartConfig::with_baudrate(9600);
        // 96 bytes * 10 bits = 960 bits -> 100 ms
        assert_eq!(config.transfer_time_us(96), 100_000);
    }

    #[test]
    fn test_bits_per_byte_with_parity() {
        let config = UartConfig {
            parity: Parity::Even,
            stop_bits: StopBits::Two,
            ..UartConfig::default()
        };
        assert_eq!(config.bits_per_byte(), 12);
    }
}
