//! Link statistics

/// Per-session counters
///
/// All counters wrap on overflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SessionStats {
    /// Frames that passed the checksum
    pub frames_received: u32,
    /// Frames written to the transport (including system replies)
    pub frames_sent: u32,
    /// Frames dropped on checksum mismatch
    pub corrupt_frames: u32,
    /// Frames whose declared length exceeded the receive buffer
    pub oversize_frames: u32,
    /// Headers that failed the end-byte cross-check
    pub misaligned_headers: u32,
    /// Bytes dropped while hunting for a frame start
    pub bytes_discarded: u32,
    /// Reserved-id messages handled and hidden from the caller
    pub system_messages: u32,
    /// Ping replies received from the peer
    pub ping_replies: u32,
    /// System replies (ping reply, acknowledge) the transport refused
    pub failed_replies: u32,
}

impl SessionStats {
    /// Frames rejected for any reason
    pub fn rejected(&self) -> u32 {
        self.corrupt_frames
            .wrapping_add(self.oversize_frames)
            .wrapping_add(self.misaligned_headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_sums_drop_counters() {
        let stats = SessionStats {
            corrupt_frames: 2,
            oversize_frames: 3,
            misaligned_headers: 4,
            bytes_discarded: 100,
            failed_replies: 7,
            ..Default::default()
        };
        assert_eq!(stats.rejected(), 9);
    }

    #[test]
    fn test_rejected_wraps() {
        let stats = SessionStats {
            corrupt_frames: u32::MAX,
            oversize_frames: 2,
            ..Default::default()
        };
        assert_eq!(stats.rejected(), 1);
    }
}
