//! Per-link statistics collection

use crate::error::Jt809Error;

/// Link statistics
///
/// Tracks frame counters and decode failures for one link. Updated by the
/// link's receive loop and the session send path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkStatistics {
    /// Total number of frames sent
    pub frames_sent: u64,
    /// Total number of frames received and decoded
    pub frames_received: u64,
    /// Truncated, oversized or undelimited frames
    pub framing_errors: u64,
    /// CRC16 mismatches
    pub checksum_errors: u64,
    /// Unknown packet or sub-packet type codes
    pub unsupported_packets: u64,
    /// Structural decode failures
    pub decode_errors: u64,
    /// Bytes dropped outside a frame
    pub bytes_discarded: u64,
}

impl LinkStatistics {
    /// Create new statistics with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all statistics counters
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn increment_frames_sent(&mut self) {
        self.frames_sent += 1;
    }

    pub fn increment_frames_received(&mut self) {
        self.frames_received += 1;
    }

    /// Count a receive-side error in the matching bucket
    ///
    /// I/O errors are not counted; they end the link.
    pub fn record_error(&mut self, error: &Jt809Error) {
        match error {
            Jt809Error::FrameInvalid(_) => self.framing_errors += 1,
            Jt809Error::Checksum { .. } => self.checksum_errors += 1,
            Jt809Error::UnsupportedPacket(_) | Jt809Error::UnsupportedSubPacket(_) => {
                self.unsupported_packets += 1
            }
            Jt809Error::Connection(_) => {}
            _ => self.decode_errors += 1,
        }
    }

    /// Total receive-side errors
    pub fn total_errors(&self) -> u64 {
        self.framing_errors + self.checksum_errors + self.unsupported_packets + self.decode_errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_error_buckets() {
        let mut stats = LinkStatistics::new();
        stats.record_error(&Jt809Error::FrameInvalid("truncated".into()));
        stats.record_error(&Jt809Error::Checksum {
            raw: vec![],
            sum: 1,
            expected: 2,
        });
        stats.record_error(&Jt809Error::UnsupportedPacket(0x1300));
        stats.record_error(&Jt809Error::UnsupportedSubPacket(0x1203));
        stats.record_error(&Jt809Error::InvalidData("short body".into()));
        stats.record_error(&Jt809Error::Connection(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "eof",
        )));

        assert_eq!(stats.framing_errors, 1);
        assert_eq!(stats.checksum_errors, 1);
        assert_eq!(stats.unsupported_packets, 2);
        assert_eq!(stats.decode_errors, 1);
        assert_eq!(stats.total_errors(), 5);
    }

    #[test]
    fn test_clear() {
        let mut stats = LinkStatistics::new();
        stats.increment_frames_sent();
        stats.increment_frames_received();
        stats.bytes_discarded = 12;
        stats.clear();
        assert_eq!(stats, LinkStatistics::default());
    }
}
