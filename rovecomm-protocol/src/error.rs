//! Session error types

use core::fmt;

use crate::frame::FrameError;

/// Errors reported by [`crate::Session`]
///
/// Receive-side kinds are never fatal: the offending frame is already
/// dropped and the next poll carries on. `E` is the transport's error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Checksum mismatch; the frame was discarded
    CorruptFrame,
    /// Declared length does not fit the receive buffer; one byte discarded
    FrameTooLarge,
    /// Header failed the end-byte cross-check; one byte discarded
    Misaligned,
    /// Outgoing payload exceeds the session's maximum
    PayloadTooLarge,
    /// Transport refused the write (e.g. transmit buffer full)
    Transport(E),
}

impl<E> Error<E> {
    /// Whether this error came from the receive path
    pub fn is_receive_error(&self) -> bool {
        matches!(
            self,
            Error::CorruptFrame | Error::FrameTooLarge | Error::Misaligned
        )
    }
}

impl<E> From<FrameError> for Error<E> {
    fn from(e: FrameError) -> Self {
        match e {
            FrameError::CorruptFrame | FrameError::Incomplete => Error::CorruptFrame,
            FrameError::InvalidDelimiter | FrameError::Misaligned => Error::Misaligned,
            FrameError::FrameTooLarge => Error::FrameTooLarge,
            FrameError::PayloadTooLarge | FrameError::BufferTooSmall => Error::PayloadTooLarge,
        }
    }
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::CorruptFrame => f.write_str("corrupt frame discarded"),
            Error::FrameTooLarge => f.write_str("frame larger than receive buffer"),
            Error::Misaligned => f.write_str("misaligned header"),
            Error::PayloadTooLarge => f.write_str("payload too large"),
            Error::Transport(e) => write!(f, "transport error: {:?}", e),
        }
    }
}

/// Invalid session configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// `max_payload` cannot hold an acknowledge payload
    PayloadTooSmall,
    /// Transport receive buffer cannot hold a largest-payload frame
    BufferTooSmall { capacity: usize, required: usize },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::PayloadTooSmall => f.write_str("max payload below 2 bytes"),
            ConfigError::BufferTooSmall { capacity, required } => write!(
                f,
                "receive buffer of {} bytes, need at least {}",
                capacity, required
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_error_mapping() {
        let e: Error<()> = FrameError::CorruptFrame.into();
        assert_eq!(e, Error::CorruptFrame);
        let e: Error<()> = FrameError::InvalidDelimiter.into();
        assert_eq!(e, Error::Misaligned);
        let e: Error<()> = FrameError::BufferTooSmall.into();
        assert_eq!(e, Error::PayloadTooLarge);
    }

    #[test]
    fn test_receive_errors() {
        assert!(Error::<()>::CorruptFrame.is_receive_error());
        assert!(Error::<()>::Misaligned.is_receive_error());
        assert!(!Error::<()>::PayloadTooLarge.is_receive_error());
        assert!(!Error::Transport(()).is_receive_error());
    }
}
