//! Framing modes
//!
//! Deployed boards speak one of four header layouts. All of them share the
//! field order `LENGTH, FLAGS, DATA_ID(MSB, LSB)`; they differ only in
//! which delimiters and checksum surround those fields:
//!
//! ```text
//! Full              START LEN FLAGS ID_H ID_L CRC_H CRC_L END | payload
//! StartOnly         START LEN FLAGS ID_H ID_L CRC_H CRC_L     | payload
//! DelimiterlessCrc        LEN FLAGS ID_H ID_L CRC_H CRC_L     | payload
//! Delimiterless           LEN FLAGS ID_H ID_L                 | payload
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Frame synchronization byte
pub const START_BYTE: u8 = 0xFE;

/// Header terminator byte
pub const END_BYTE: u8 = 0xEF;

/// Longest header of any mode
pub const MAX_HEADER_LEN: usize = 8;

/// Wire layout selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Mode {
    /// Start byte, CRC and end byte; recovers from corrupted length fields
    #[default]
    Full,
    /// Start byte and CRC, no end byte
    StartOnly,
    /// CRC only; relies on the stream never losing alignment
    DelimiterlessCrc,
    /// Bare header; for links assumed error-free
    Delimiterless,
}

impl Mode {
    /// All supported modes
    pub const ALL: [Mode; 4] = [
        Mode::Full,
        Mode::StartOnly,
        Mode::DelimiterlessCrc,
        Mode::Delimiterless,
    ];

    /// Header length in bytes (everything before the payload)
    pub const fn header_len(self) -> usize {
        match self {
            Mode::Full => 8,
            Mode::StartOnly => 7,
            Mode::DelimiterlessCrc => 6,
            Mode::Delimiterless => 4,
        }
    }

    /// Start byte, if this mode has one
    pub const fn start_byte(self) -> Option<u8> {
        match self {
            Mode::Full | Mode::StartOnly => Some(START_BYTE),
            Mode::DelimiterlessCrc | Mode::Delimiterless => None,
        }
    }

    /// Whether frames carry a payload checksum
    pub const fn has_crc(self) -> bool {
        !matches!(self, Mode::Delimiterless)
    }

    /// Whether the header ends with [`END_BYTE`]
    pub const fn has_end_byte(self) -> bool {
        matches!(self, Mode::Full)
    }

    const fn base(self) -> usize {
        if self.start_byte().is_some() {
            1
        } else {
            0
        }
    }

    /// Offset of the payload length byte
    pub const fn length_offset(self) -> usize {
        self.base()
    }

    /// Offset of the flags byte
    pub const fn flags_offset(self) -> usize {
        self.base() + 1
    }

    /// Offset of the data id MSB (LSB follows)
    pub const fn data_id_offset(self) -> usize {
        self.base() + 2
    }

    /// Offset of the checksum MSB (LSB follows), if present
    pub const fn crc_offset(self) -> Option<usize> {
        if self.has_crc() {
            Some(self.base() + 4)
        } else {
            None
        }
    }

    /// Offset of the end byte, if present
    pub const fn end_offset(self) -> Option<usize> {
        if self.has_end_byte() {
            Some(self.header_len() - 1)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lengths() {
        assert_eq!(Mode::Full.header_len(), 8);
        assert_eq!(Mode::StartOnly.header_len(), 7);
        assert_eq!(Mode::DelimiterlessCrc.header_len(), 6);
        assert_eq!(Mode::Delimiterless.header_len(), 4);
    }

    #[test]
    fn test_full_mode_offsets() {
        let mode = Mode::Full;
        assert_eq!(mode.length_offset(), 1);
        assert_eq!(mode.flags_offset(), 2);
        assert_eq!(mode.data_id_offset(), 3);
        assert_eq!(mode.crc_offset(), Some(5));
        assert_eq!(mode.end_offset(), Some(7));
    }

    #[test]
    fn test_delimiterless_offsets() {
        let mode = Mode::Delimiterless;
        assert_eq!(mode.length_offset(), 0);
        assert_eq!(mode.data_id_offset(), 2);
        assert_eq!(mode.crc_offset(), None);
        assert_eq!(mode.end_offset(), None);
        assert_eq!(mode.start_byte(), None);
    }

    #[test]
    fn test_fields_fit_inside_header() {
        for mode in Mode::ALL {
            let last = match (mode.end_offset(), mode.crc_offset()) {
                (Some(end), _) => end,
                (None, Some(crc)) => crc + 1,
                (None, None) => mode.data_id_offset() + 1,
            };
            assert_eq!(last, mode.header_len() - 1, "{:?}", mode);
            assert!(mode.header_len() <= MAX_HEADER_LEN);
        }
    }
}
