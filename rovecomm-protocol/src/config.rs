//! Session configuration
//!
//! A board picks its framing mode and the largest payload it expects to
//! exchange. Both ends of a link must use the same mode. With the `serde`
//! feature the config can be persisted alongside the rest of a board's
//! settings (postcard in flash).

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::mode::Mode;

/// Smallest usable payload bound (an acknowledge carries a 2-byte id)
pub const MIN_PAYLOAD: u8 = 2;

/// Default payload bound
pub const DEFAULT_MAX_PAYLOAD: u8 = 64;

/// Per-session configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SessionConfig {
    /// Wire layout
    pub mode: Mode,
    /// Largest payload accepted or sent, in bytes
    pub max_payload: u8,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Full,
            max_payload: DEFAULT_MAX_PAYLOAD,
        }
    }
}

impl SessionConfig {
    pub fn new(mode: Mode, max_payload: u8) -> Self {
        Self { mode, max_payload }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_max_payload(mut self, max_payload: u8) -> Self {
        self.max_payload = max_payload;
        self
    }

    /// Receive buffer length to request from the transport
    ///
    /// One byte of slack on top of the largest frame.
    pub fn buffer_length(&self) -> usize {
        self.max_payload as usize + self.mode.header_len() + 1
    }

    /// Largest frame the session exchanges
    ///
    /// The transport's receive buffer must hold at least this many bytes.
    pub fn max_frame_len(&self) -> usize {
        self.mode.header_len() + self.max_payload as usize
    }

    /// Check the configuration on its own
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_payload < MIN_PAYLOAD {
            return Err(ConfigError::PayloadTooSmall);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.mode, Mode::Full);
        assert_eq!(config.max_payload, 64);
        assert_eq!(config.buffer_length(), 64 + 8 + 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = SessionConfig::default()
            .with_mode(Mode::Delimiterless)
            .with_max_payload(255);
        assert_eq!(config.buffer_length(), 255 + 4 + 1);
        assert_eq!(config.max_frame_len(), 259);
    }

    #[test]
    fn test_payload_too_small() {
        let config = SessionConfig::new(Mode::Full, 1);
        assert_eq!(config.validate(), Err(ConfigError::PayloadTooSmall));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_postcard_roundtrip() {
        let config = SessionConfig::new(Mode::StartOnly, 200);
        let mut buf = [0u8; 16];
        let bytes = postcard::to_slice(&config, &mut buf).unwrap();
        let restored: SessionConfig = postcard::from_bytes(bytes).unwrap();
        assert_eq!(restored, config);
    }
}
