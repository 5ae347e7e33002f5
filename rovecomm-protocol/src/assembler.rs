//! Stream assembler
//!
//! Turns the transport's receive buffer into complete frames. Bytes are only
//! consumed when they are discarded during resync or when a whole frame is
//! present, so a partial frame simply waits in the transport between polls.
//!
//! ```text
//!            start byte found
//!   ┌──────┐ ───────────────► ┌─────────┐
//!   │ Idle │                  │ Syncing │ ── header/payload incomplete ──┐
//!   └──────┘ ◄─────────────── └─────────┘ ◄──────────────────────────────┘
//!      frame consumed, misaligned header or oversize frame
//! ```
//!
//! Modes without a start byte have nothing to hunt for and never leave
//! `Idle`.

use heapless::Vec;
use rovecomm_hal::SerialTransport;

use crate::frame::{FrameError, MAX_FRAME_SIZE};
use crate::mode::{Mode, END_BYTE};
use crate::stats::SessionStats;

/// Resync state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AssemblerState {
    /// No frame start located
    #[default]
    Idle,
    /// A start byte sits at the front of the receive buffer
    Syncing,
}

/// Size bounds applied to incoming frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLimits {
    /// Largest complete frame the receive buffer can hold
    pub buffer_size: usize,
    /// Largest payload the session accepts
    pub max_payload: usize,
}

/// Frame assembly state machine
#[derive(Debug, Clone)]
pub struct StreamAssembler {
    mode: Mode,
    state: AssemblerState,
    frame: Vec<u8, MAX_FRAME_SIZE>,
}

impl StreamAssembler {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            state: AssemblerState::Idle,
            frame: Vec::new(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn state(&self) -> AssemblerState {
        self.state
    }

    /// Forget any partially located frame
    pub fn reset(&mut self) {
        self.state = AssemblerState::Idle;
        self.frame.clear();
    }

    /// Try to pull one complete frame out of `transport`
    ///
    /// Returns `Ok(Some(frame))` with the raw frame bytes when one is
    /// complete, `Ok(None)` when more bytes are needed, or `Err` when a
    /// header was rejected (one byte is dropped so the next poll resyncs).
    /// Never waits for bytes that have not arrived.
    pub fn poll<T: SerialTransport>(
        &mut self,
        transport: &mut T,
        limits: FrameLimits,
        stats: &mut SessionStats,
    ) -> Result<Option<&[u8]>, FrameError> {
        let header_len = self.mode.header_len();

        if let Some(start) = self.mode.start_byte() {
            // Someone else consumed from the transport since the last poll
            if self.state == AssemblerState::Syncing && transport.peek(0) != Some(start) {
                self.state = AssemblerState::Idle;
            }
            if self.state == AssemblerState::Idle {
                if !Self::seek_start(transport, start, stats) {
                    return Ok(None);
                }
                self.state = AssemblerState::Syncing;
            }
        }

        let available = transport.available();
        if available < header_len {
            return Ok(None);
        }

        let Some(length) = transport.peek(self.mode.length_offset()) else {
            return Ok(None);
        };
        let length = length as usize;

        if let Some(end) = self.mode.end_offset() {
            if transport.peek(end) != Some(END_BYTE) {
                self.reject(transport, stats);
                stats.misaligned_headers = stats.misaligned_headers.wrapping_add(1);
                return Err(FrameError::Misaligned);
            }
        }

        let frame_len = header_len + length;
        if frame_len > limits.buffer_size || length > limits.max_payload {
            self.reject(transport, stats);
            stats.oversize_frames = stats.oversize_frames.wrapping_add(1);
            return Err(FrameError::FrameTooLarge);
        }

        if frame_len > available {
            trace!("waiting for {} more bytes", frame_len - available);
            return Ok(None);
        }

        self.frame.clear();
        self.frame
            .resize_default(frame_len)
            .map_err(|_| FrameError::FrameTooLarge)?;
        let n = transport.read(&mut self.frame);
        self.frame.truncate(n);
        self.state = AssemblerState::Idle;

        if n < frame_len {
            return Err(FrameError::Incomplete);
        }
        Ok(Some(self.frame.as_slice()))
    }

    /// Drop bytes until a start byte is at the front
    ///
    /// Scans only what was buffered on entry.
    fn seek_start<T: SerialTransport>(transport: &mut T, start: u8, stats: &mut SessionStats) -> bool {
        let scan = transport.available();
        let mut dropped = 0;
        let mut found = false;

        while dropped < scan {
            if transport.peek(0) == Some(start) {
                found = true;
                break;
            }
            if !transport.discard() {
                break;
            }
            dropped += 1;
        }

        if dropped > 0 {
            trace!("resync dropped {} bytes", dropped);
            stats.bytes_discarded = stats.bytes_discarded.wrapping_add(dropped as u32);
        }
        found
    }

    /// Drop the first buffered byte and go back to hunting for a start
    fn reject<T: SerialTransport>(&mut self, transport: &mut T, stats: &mut SessionStats) {
        if transport.discard() {
            stats.bytes_discarded = stats.bytes_discarded.wrapping_add(1);
        }
        self.state = AssemblerState::Idle;
    }
}
