//! JT/T 809 frame decoder
//!
//! Splits a byte stream into raw delimited frames. Bytes outside a
//! `0x5B .. 0x5D` pair are discarded. A begin flag seen inside an open
//! frame means the previous frame was truncated; it is reported as a
//! framing error and scanning restarts at the new flag.

use crate::error::{Jt809Error, Jt809Result};
use crate::link::frame::{BEGIN_FLAG, END_FLAG};
use bytes::{Buf, BytesMut};
use jt809_transport::StreamAccessor;

/// Default upper bound on a raw (escaped) frame
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 1024 * 1024;

const READ_CHUNK: usize = 4096;

/// Buffered frame decoder
#[derive(Debug)]
pub struct FrameDecoder {
    buffer: BytesMut,
    /// Bytes before the current scan position already checked for flags
    scan_pos: usize,
    in_frame: bool,
    discarded: u64,
    max_frame_length: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::with_max_frame_length(DEFAULT_MAX_FRAME_LENGTH)
    }

    pub fn with_max_frame_length(max_frame_length: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(READ_CHUNK),
            scan_pos: 0,
            in_frame: false,
            discarded: 0,
            max_frame_length,
        }
    }

    /// Append received bytes
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Number of bytes buffered but not yet returned
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Total bytes dropped while hunting for a begin flag
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    /// Take the next complete frame out of the buffer
    ///
    /// # Returns
    /// - `None` if more input is needed
    /// - `Some(Ok(frame))` with both delimiters included
    /// - `Some(Err(FrameInvalid))` for a truncated or oversized frame; the
    ///   decoder has already resynchronised and may be polled again
    pub fn next_frame(&mut self) -> Option<Jt809Result<Vec<u8>>> {
        if !self.in_frame {
            match self.buffer.iter().position(|&b| b == BEGIN_FLAG) {
                Some(start) => {
                    if start > 0 {
                        self.discard(start);
                    }
                    self.in_frame = true;
                    self.scan_pos = 1;
                }
                None => {
                    let len = self.buffer.len();
                    self.discard(len);
                    return None;
                }
            }
        }

        let pending = &self.buffer[self.scan_pos..];
        match pending.iter().position(|&b| b == BEGIN_FLAG || b == END_FLAG) {
            Some(offset) => {
                let at = self.scan_pos + offset;
                if self.buffer[at] == END_FLAG {
                    let frame = self.buffer.split_to(at + 1).to_vec();
                    self.in_frame = false;
                    self.scan_pos = 0;
                    Some(Ok(frame))
                } else {
                    self.buffer.advance(at);
                    self.scan_pos = 1;
                    Some(Err(Jt809Error::FrameInvalid(format!(
                        "Begin flag inside frame after {} bytes, frame dropped",
                        at
                    ))))
                }
            }
            None => {
                self.scan_pos = self.buffer.len();
                if self.buffer.len() > self.max_frame_length {
                    let len = self.buffer.len();
                    self.buffer.clear();
                    self.in_frame = false;
                    self.scan_pos = 0;
                    return Some(Err(Jt809Error::FrameInvalid(format!(
                        "Frame exceeds {} bytes without end flag ({} buffered)",
                        self.max_frame_length, len
                    ))));
                }
                None
            }
        }
    }

    /// Read from `stream` until a complete frame (or framing error) is
    /// available
    ///
    /// # Errors
    /// - `Jt809Error::Connection` with `UnexpectedEof` when the peer closes
    /// - `Jt809Error::FrameInvalid` as described in [`FrameDecoder::next_frame`]
    pub async fn read_frame<S: StreamAccessor + ?Sized>(
        &mut self,
        stream: &mut S,
    ) -> Jt809Result<Vec<u8>> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some(result) = self.next_frame() {
                return result;
            }
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                return Err(Jt809Error::Connection(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "link closed by peer",
                )));
            }
            self.feed(&chunk[..n]);
        }
    }

    fn discard(&mut self, n: usize) {
        self.buffer.advance(n);
        self.discarded += n as u64;
        log::trace!("Discarded {} bytes outside a frame", n);
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jt809_transport::IoReader;

    const LOGIN_FRAME: &str = "5B000000480000008510010133EFB8010000010003E8B2D37D9CC4900C77DC78F8676527D8AE12243CFB64CC2FBA619AEFAD33ACCB3256F67BFF19DF33097841098665703FE36E5D";

    fn hex(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    #[test]
    fn test_single_frame() {
        let frame = hex(LOGIN_FRAME);
        let mut decoder = FrameDecoder::new();
        decoder.feed(&frame);
        assert_eq!(decoder.next_frame().unwrap().unwrap(), frame);
        assert!(decoder.next_frame().is_none());
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_garbage_before_frame_is_discarded() {
        let frame = hex(LOGIN_FRAME);
        let mut decoder = FrameDecoder::new();
        decoder.feed(&[0x00, 0x11, 0x5D, 0x22]);
        assert!(decoder.next_frame().is_none());
        decoder.feed(&frame);
        assert_eq!(decoder.next_frame().unwrap().unwrap(), frame);
        assert_eq!(decoder.discarded(), 4);
    }

    #[test]
    fn test_two_frames_in_one_chunk() {
        let frame = hex(LOGIN_FRAME);
        let mut input = frame.clone();
        input.extend_from_slice(&frame);
        let mut decoder = FrameDecoder::new();
        decoder.feed(&input);
        assert_eq!(decoder.next_frame().unwrap().unwrap(), frame);
        assert_eq!(decoder.next_frame().unwrap().unwrap(), frame);
        assert!(decoder.next_frame().is_none());
    }

    #[test]
    fn test_truncated_frame_resyncs() {
        let frame = hex(LOGIN_FRAME);
        let mut decoder = FrameDecoder::new();
        decoder.feed(&frame[..20]);
        assert!(decoder.next_frame().is_none());
        decoder.feed(&frame);
        assert!(matches!(
            decoder.next_frame(),
            Some(Err(Jt809Error::FrameInvalid(_)))
        ));
        assert_eq!(decoder.next_frame().unwrap().unwrap(), frame);
    }

    #[test]
    fn test_oversized_frame() {
        let mut decoder = FrameDecoder::with_max_frame_length(16);
        decoder.feed(&[BEGIN_FLAG; 1]);
        decoder.feed(&[0x01; 20]);
        assert!(matches!(
            decoder.next_frame(),
            Some(Err(Jt809Error::FrameInvalid(_)))
        ));
        assert_eq!(decoder.buffered(), 0);
        decoder.feed(&[BEGIN_FLAG, 0x01, END_FLAG]);
        assert_eq!(
            decoder.next_frame().unwrap().unwrap(),
            vec![BEGIN_FLAG, 0x01, END_FLAG]
        );
    }

    #[tokio::test]
    async fn test_read_frame_across_chunks() {
        let frame = hex(LOGIN_FRAME);
        let mock = tokio_test::io::Builder::new()
            .read(&frame[..1])
            .read(&frame[1..30])
            .read(&frame[30..])
            .build();
        let mut reader = IoReader::new(mock);
        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.read_frame(&mut reader).await.unwrap(), frame);
    }

    #[tokio::test]
    async fn test_read_frame_eof() {
        let frame = hex(LOGIN_FRAME);
        let mock = tokio_test::io::Builder::new().read(&frame[..10]).build();
        let mut reader = IoReader::new(mock);
        let mut decoder = FrameDecoder::new();
        let err = decoder.read_frame(&mut reader).await.unwrap_err();
        assert!(err.is_eof());
    }
}
