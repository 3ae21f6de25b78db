//! JT/T 809 frame structure: delimiters, escaping and checksum
//!
//! ```text
//! 0x5B | escape(content ++ crc16(content)) | 0x5D
//! ```
//!
//! `content` is the 22-byte header followed by the (possibly enciphered)
//! body. Escaping keeps the delimiter bytes out of the interior:
//!
//! | raw  | escaped     |
//! |------|-------------|
//! | 0x5B | 0x5A 0x01   |
//! | 0x5A | 0x5A 0x02   |
//! | 0x5D | 0x5E 0x01   |
//! | 0x5E | 0x5E 0x02   |

use crate::error::{Jt809Error, Jt809Result};
use crate::link::crc::crc16_ccitt;

/// Frame begin flag
pub const BEGIN_FLAG: u8 = 0x5B;
/// Frame end flag
pub const END_FLAG: u8 = 0x5D;
/// Escape lead byte for the begin flag and itself
pub const BEGIN_ESCAPE: u8 = 0x5A;
/// Escape lead byte for the end flag and itself
pub const END_ESCAPE: u8 = 0x5E;

/// Checksum length in bytes
pub const CRC_LENGTH: usize = 2;

/// Bytes a sealed frame adds around its content before escaping:
/// both flags and the checksum
pub const FRAME_OVERHEAD: usize = 1 + CRC_LENGTH + 1;

/// Escape the interior of a frame
pub fn escape(data: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(data.len() + data.len() / 8);
    for &b in data {
        match b {
            BEGIN_FLAG => result.extend_from_slice(&[BEGIN_ESCAPE, 0x01]),
            BEGIN_ESCAPE => result.extend_from_slice(&[BEGIN_ESCAPE, 0x02]),
            END_FLAG => result.extend_from_slice(&[END_ESCAPE, 0x01]),
            END_ESCAPE => result.extend_from_slice(&[END_ESCAPE, 0x02]),
            _ => result.push(b),
        }
    }
    result
}

/// Reverse [`escape`]
///
/// An escape byte that is not followed by 0x01 or 0x02 (including a lone
/// trailing one) is passed through unchanged.
pub fn unescape(data: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        let b = data[i];
        let next = data.get(i + 1).copied();
        let decoded = match (b, next) {
            (BEGIN_ESCAPE, Some(0x01)) => Some(BEGIN_FLAG),
            (BEGIN_ESCAPE, Some(0x02)) => Some(BEGIN_ESCAPE),
            (END_ESCAPE, Some(0x01)) => Some(END_FLAG),
            (END_ESCAPE, Some(0x02)) => Some(END_ESCAPE),
            _ => None,
        };
        match decoded {
            Some(raw) => {
                result.push(raw);
                i += 2;
            }
            None => {
                result.push(b);
                i += 1;
            }
        }
    }
    result
}

/// Frame length as recorded in the header: content plus flags and checksum,
/// counted before escaping
pub fn framed_length(content_len: usize) -> usize {
    content_len + FRAME_OVERHEAD
}

/// Append the checksum, escape and delimit `content`
pub fn seal_frame(content: &[u8]) -> Vec<u8> {
    let mut interior = Vec::with_capacity(content.len() + CRC_LENGTH);
    interior.extend_from_slice(content);
    interior.extend_from_slice(&crc16_ccitt(content).to_be_bytes());

    let escaped = escape(&interior);
    let mut frame = Vec::with_capacity(escaped.len() + 2);
    frame.push(BEGIN_FLAG);
    frame.extend_from_slice(&escaped);
    frame.push(END_FLAG);
    frame
}

/// Strip delimiters, unescape and verify the checksum of a raw frame
///
/// # Returns
/// The verified content (header and body) without the checksum.
///
/// # Errors
/// - `Jt809Error::FrameInvalid` if delimiters are missing or the frame is
///   too short to hold a checksum
/// - `Jt809Error::Checksum` if the checksum does not match
pub fn open_frame(frame: &[u8]) -> Jt809Result<Vec<u8>> {
    if frame.len() < 2 || frame[0] != BEGIN_FLAG || frame[frame.len() - 1] != END_FLAG {
        return Err(Jt809Error::FrameInvalid(format!(
            "Frame must be delimited by 0x{:02X}..0x{:02X}, got {} bytes",
            BEGIN_FLAG,
            END_FLAG,
            frame.len()
        )));
    }

    let mut interior = unescape(&frame[1..frame.len() - 1]);
    if interior.len() < CRC_LENGTH {
        return Err(Jt809Error::FrameInvalid(format!(
            "Frame too short for checksum: {} bytes",
            interior.len()
        )));
    }

    let split = interior.len() - CRC_LENGTH;
    let sum = u16::from_be_bytes([interior[split], interior[split + 1]]);
    let expected = crc16_ccitt(&interior[..split]);
    if sum != expected {
        return Err(Jt809Error::Checksum {
            raw: interior,
            sum,
            expected,
        });
    }

    interior.truncate(split);
    Ok(interior)
}
