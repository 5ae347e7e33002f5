//! Frame encoding and decoding
//!
//! A frame is the header for the configured [`Mode`] followed by the
//! payload. Multi-byte header fields are big-endian and the checksum covers
//! the payload only:
//! - START (optional): 0xFE
//! - LENGTH: payload length (0-255)
//! - FLAGS: bit 0 requests an acknowledge
//! - DATA ID: 16-bit message identifier
//! - CRC (optional): [`crc16`] of the payload
//! - END (optional): 0xEF
//! - PAYLOAD: `LENGTH` bytes

use core::fmt;

use heapless::Vec;

use crate::crc::crc16;
use crate::mode::{Mode, END_BYTE, MAX_HEADER_LEN};

/// Maximum payload size in bytes (the LENGTH field is one byte)
pub const MAX_PAYLOAD_SIZE: usize = 255;

/// Maximum complete frame size in any mode
pub const MAX_FRAME_SIZE: usize = MAX_HEADER_LEN + MAX_PAYLOAD_SIZE;

/// Flags bit asking the receiver to send an acknowledge
pub const FLAG_ACK_REQUESTED: u8 = 0x01;

/// Errors that can occur during frame encoding or decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Payload exceeds maximum allowed size
    PayloadTooLarge,
    /// Checksum mismatch
    CorruptFrame,
    /// Frame is shorter than its header says
    Incomplete,
    /// Start or end byte missing where the mode requires one
    InvalidDelimiter,
    /// Header failed the end-byte cross-check while assembling
    Misaligned,
    /// Declared frame does not fit the receive buffer
    FrameTooLarge,
    /// Buffer too small for encoding
    BufferTooSmall,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            FrameError::PayloadTooLarge => "payload too large",
            FrameError::CorruptFrame => "checksum mismatch",
            FrameError::Incomplete => "incomplete frame",
            FrameError::InvalidDelimiter => "missing frame delimiter",
            FrameError::Misaligned => "misaligned header",
            FrameError::FrameTooLarge => "frame exceeds receive buffer",
            FrameError::BufferTooSmall => "buffer too small",
        };
        f.write_str(msg)
    }
}

/// Encoded length of a frame carrying `payload_len` bytes
pub const fn frame_len(mode: Mode, payload_len: usize) -> usize {
    mode.header_len() + payload_len
}

/// Encode a frame into `buffer`
///
/// Returns the number of bytes written.
pub fn encode_frame(
    data_id: u16,
    payload: &[u8],
    flags: u8,
    mode: Mode,
    buffer: &mut [u8],
) -> Result<usize, FrameError> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(FrameError::PayloadTooLarge);
    }
    let header_len = mode.header_len();
    let total = frame_len(mode, payload.len());
    if buffer.len() < total {
        return Err(FrameError::BufferTooSmall);
    }

    if let Some(start) = mode.start_byte() {
        buffer[0] = start;
    }
    buffer[mode.length_offset()] = payload.len() as u8;
    buffer[mode.flags_offset()] = flags;
    let id = mode.data_id_offset();
    buffer[id..id + 2].copy_from_slice(&data_id.to_be_bytes());
    if let Some(crc) = mode.crc_offset() {
        buffer[crc..crc + 2].copy_from_slice(&crc16(payload).to_be_bytes());
    }
    if let Some(end) = mode.end_offset() {
        buffer[end] = END_BYTE;
    }
    buffer[header_len..total].copy_from_slice(payload);

    Ok(total)
}

/// A decoded message, or one about to be sent
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Message {
    /// Message identifier; low values are reserved for system messages
    pub data_id: u16,
    /// Flag bits ([`FLAG_ACK_REQUESTED`])
    pub flags: u8,
    /// Payload data
    pub payload: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl Message {
    /// Create a message with the given id and payload
    pub fn new(data_id: u16, payload: &[u8]) -> Result<Self, FrameError> {
        Self::with_flags(data_id, payload, 0)
    }

    /// Create a message with explicit flags
    pub fn with_flags(data_id: u16, payload: &[u8], flags: u8) -> Result<Self, FrameError> {
        let payload = Vec::from_slice(payload).map_err(|_| FrameError::PayloadTooLarge)?;
        Ok(Self {
            data_id,
            flags,
            payload,
        })
    }

    /// Create a message with no payload
    pub fn empty(data_id: u16) -> Self {
        Self {
            data_id,
            flags: 0,
            payload: Vec::new(),
        }
    }

    /// Payload length as carried in the LENGTH field
    pub fn size(&self) -> u8 {
        self.payload.len() as u8
    }

    /// Whether the sender asked for an acknowledge
    pub fn ack_requested(&self) -> bool {
        self.flags & FLAG_ACK_REQUESTED != 0
    }

    /// Encoded length of this message in `mode`
    pub fn encoded_len(&self, mode: Mode) -> usize {
        frame_len(mode, self.payload.len())
    }

    /// Encode this message into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, mode: Mode, buffer: &mut [u8]) -> Result<usize, FrameError> {
        encode_frame(self.data_id, &self.payload, self.flags, mode, buffer)
    }

    /// Encode this message into a heapless Vec
    pub fn encode_to_vec(&self, mode: Mode) -> Result<Vec<u8, MAX_FRAME_SIZE>, FrameError> {
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let len = self.encode(mode, &mut buffer)?;
        Vec::from_slice(&buffer[..len]).map_err(|_| FrameError::BufferTooSmall)
    }

    /// Decode a complete frame
    ///
    /// `frame` must start at the first header byte. Bytes past the declared
    /// payload are ignored. On checksum mismatch nothing from the frame is
    /// returned.
    pub fn decode(frame: &[u8], mode: Mode) -> Result<Self, FrameError> {
        let header_len = mode.header_len();
        if frame.len() < header_len {
            return Err(FrameError::Incomplete);
        }
        if let Some(start) = mode.start_byte() {
            if frame[0] != start {
                return Err(FrameError::InvalidDelimiter);
            }
        }
        if let Some(end) = mode.end_offset() {
            if frame[end] != END_BYTE {
                return Err(FrameError::InvalidDelimiter);
            }
        }

        let length = frame[mode.length_offset()] as usize;
        if frame.len() < header_len + length {
            return Err(FrameError::Incomplete);
        }

        let id = mode.data_id_offset();
        let data_id = u16::from_be_bytes([frame[id], frame[id + 1]]);
        let flags = frame[mode.flags_offset()];
        let payload = Vec::from_slice(&frame[header_len..header_len + length])
            .map_err(|_| FrameError::PayloadTooLarge)?;

        if let Some(crc) = mode.crc_offset() {
            let received = u16::from_be_bytes([frame[crc], frame[crc + 1]]);
            if crc16(&payload) != received {
                return Err(FrameError::CorruptFrame);
            }
        }

        Ok(Self {
            data_id,
            flags,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encode_full_mode_layout() {
        let msg = Message::new(0x1234, &[1, 2, 3, 4, 5]).unwrap();
        let mut buffer = [0u8; 32];
        let len = msg.encode(Mode::Full, &mut buffer).unwrap();

        assert_eq!(len, 13);
        assert_eq!(buffer[0], 0xFE); // start
        assert_eq!(buffer[1], 5); // length
        assert_eq!(buffer[2], 0); // flags
        assert_eq!(&buffer[3..5], &[0x12, 0x34]); // data id
        assert_eq!(&buffer[5..7], &[0x93, 0x04]); // crc
        assert_eq!(buffer[7], 0xEF); // end
        assert_eq!(&buffer[8..13], &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_encode_start_only_layout() {
        let msg = Message::with_flags(0x0102, &[0x00], FLAG_ACK_REQUESTED).unwrap();
        let encoded = msg.encode_to_vec(Mode::StartOnly).unwrap();

        assert_eq!(&encoded[..], &[0xFE, 1, 1, 0x01, 0x02, 0xE1, 0xF0, 0x00]);
    }

    #[test]
    fn test_encode_delimiterless_layouts() {
        let msg = Message::new(0x00FF, &[0xAA]).unwrap();

        let with_crc = msg.encode_to_vec(Mode::DelimiterlessCrc).unwrap();
        assert_eq!(with_crc.len(), 7);
        assert_eq!(&with_crc[..4], &[1, 0, 0x00, 0xFF]);

        let bare = msg.encode_to_vec(Mode::Delimiterless).unwrap();
        assert_eq!(&bare[..], &[1, 0, 0x00, 0xFF, 0xAA]);
    }

    #[test]
    fn test_encode_empty_payload_checksum_is_init() {
        let encoded = Message::empty(7).encode_to_vec(Mode::Full).unwrap();
        assert_eq!(&encoded[..], &[0xFE, 0, 0, 0, 7, 0xFF, 0xFF, 0xEF]);
    }

    #[test]
    fn test_encode_buffer_too_small() {
        let msg = Message::new(1, &[0; 10]).unwrap();
        let mut buffer = [0u8; 12];
        assert_eq!(msg.encode(Mode::Full, &mut buffer), Err(FrameError::BufferTooSmall));
    }

    #[test]
    fn test_payload_too_large() {
        let large_payload = [0u8; MAX_PAYLOAD_SIZE + 1];
        assert_eq!(Message::new(9, &large_payload), Err(FrameError::PayloadTooLarge));

        let mut buffer = [0u8; MAX_FRAME_SIZE + 8];
        assert_eq!(
            encode_frame(9, &large_payload, 0, Mode::Full, &mut buffer),
            Err(FrameError::PayloadTooLarge)
        );
    }

    #[test]
    fn test_decode_max_payload() {
        let payload = [0x5A; MAX_PAYLOAD_SIZE];
        let msg = Message::new(0xBEEF, &payload).unwrap();
        let encoded = msg.encode_to_vec(Mode::Full).unwrap();

        assert_eq!(encoded.len(), MAX_FRAME_SIZE);
        assert_eq!(Message::decode(&encoded, Mode::Full).unwrap(), msg);
    }

    #[test]
    fn test_decode_corrupt_payload() {
        let msg = Message::new(300, b"steer").unwrap();
        let mut encoded = msg.encode_to_vec(Mode::Full).unwrap();
        let last = encoded.len() - 1;
        encoded[last] ^= 0x01;

        assert_eq!(Message::decode(&encoded, Mode::Full), Err(FrameError::CorruptFrame));
    }

    #[test]
    fn test_decode_corrupt_crc_field() {
        let msg = Message::new(300, b"steer").unwrap();
        let mut encoded = msg.encode_to_vec(Mode::DelimiterlessCrc).unwrap();
        encoded[4] ^= 0x80;

        assert_eq!(
            Message::decode(&encoded, Mode::DelimiterlessCrc),
            Err(FrameError::CorruptFrame)
        );
    }

    #[test]
    fn test_decode_without_crc_accepts_anything() {
        let msg = Message::new(300, b"steer").unwrap();
        let mut encoded = msg.encode_to_vec(Mode::Delimiterless).unwrap();
        encoded[4] = b'S';

        let decoded = Message::decode(&encoded, Mode::Delimiterless).unwrap();
        assert_eq!(&decoded.payload[..], b"Steer");
    }

    #[test]
    fn test_decode_rejects_bad_delimiters() {
        let encoded = Message::new(5, &[1]).unwrap().encode_to_vec(Mode::Full).unwrap();

        let mut bad_start = encoded.clone();
        bad_start[0] = 0x00;
        assert_eq!(Message::decode(&bad_start, Mode::Full), Err(FrameError::InvalidDelimiter));

        let mut bad_end = encoded;
        bad_end[7] = 0x00;
        assert_eq!(Message::decode(&bad_end, Mode::Full), Err(FrameError::InvalidDelimiter));
    }

    #[test]
    fn test_decode_truncated() {
        let encoded = Message::new(5, &[1, 2, 3]).unwrap().encode_to_vec(Mode::Full).unwrap();

        assert_eq!(Message::decode(&encoded[..5], Mode::Full), Err(FrameError::Incomplete));
        assert_eq!(Message::decode(&encoded[..10], Mode::Full), Err(FrameError::Incomplete));
    }

    #[test]
    fn test_ack_flag_masks_bit_zero() {
        assert!(Message::with_flags(10, &[], 0x01).unwrap().ack_requested());
        assert!(Message::with_flags(10, &[], 0xFF).unwrap().ack_requested());
        assert!(!Message::with_flags(10, &[], 0x02).unwrap().ack_requested());
        assert!(!Message::empty(10).ack_requested());
    }

    fn any_mode() -> impl Strategy<Value = Mode> {
        prop::sample::select(Mode::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn prop_roundtrip(
            mode in any_mode(),
            data_id in any::<u16>(),
            flags in any::<u8>(),
            payload in prop::collection::vec(any::<u8>(), 0..=MAX_PAYLOAD_SIZE),
        ) {
            let msg = Message::with_flags(data_id, &payload, flags).unwrap();
            let encoded = msg.encode_to_vec(mode).unwrap();
            prop_assert_eq!(encoded.len(), mode.header_len() + payload.len());
            prop_assert_eq!(Message::decode(&encoded, mode).unwrap(), msg);
        }

        #[test]
        fn prop_payload_bit_flip_is_corrupt(
            mode in prop::sample::select(vec![Mode::Full, Mode::StartOnly, Mode::DelimiterlessCrc]),
            payload in prop::collection::vec(any::<u8>(), 1..=64),
            index in any::<prop::sample::Index>(),
            bit in 0u8..8,
        ) {
            let msg = Message::new(0x0100, &payload).unwrap();
            let mut encoded = msg.encode_to_vec(mode).unwrap();
            let i = mode.header_len() + index.index(payload.len());
            encoded[i] ^= 1 << bit;
            prop_assert_eq!(Message::decode(&encoded, mode), Err(FrameError::CorruptFrame));
        }
    }
}
