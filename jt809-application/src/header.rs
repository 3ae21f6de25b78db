//! JT/T 809 packet header
//!
//! ```text
//! Length(4) SerialNo(4) Type(2) GNSSCenterID(4) Version(3) Encrypt(1) EncryptKey(4)
//! ```
//!
//! All fields are big-endian. `Length` counts the whole frame before
//! escaping: both flags, this header, the body and the checksum.

use crate::field::FieldReader;
use bytes::BufMut;
use jt809_core::{Jt809Error, Jt809Result};
use std::fmt;

/// Encoded header length in bytes
pub const HEADER_LENGTH: usize = 22;

/// Protocol version stamped on outbound packets
pub const PROTOCOL_VERSION: [u8; 3] = [1, 0, 0];

/// Encrypt flag value meaning the body is enciphered
pub const ENCRYPTED: u8 = 1;

/// Packet header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub length: u32,
    pub serial_no: u32,
    pub msg_type: u16,
    pub gnss_center_id: u32,
    pub version: [u8; 3],
    pub encrypt_flag: u8,
    pub encrypt_key: u32,
}

impl Header {
    /// Unencrypted header for `msg_type` with the default version
    pub fn new(msg_type: u16) -> Self {
        Self {
            length: 0,
            serial_no: 0,
            msg_type,
            gnss_center_id: 0,
            version: PROTOCOL_VERSION,
            encrypt_flag: 0,
            encrypt_key: 0,
        }
    }

    pub fn is_encrypted(&self) -> bool {
        self.encrypt_flag == ENCRYPTED
    }

    /// Mark the body as enciphered with `key`
    pub fn set_encryption(&mut self, key: u32) {
        self.encrypt_flag = ENCRYPTED;
        self.encrypt_key = key;
    }

    pub fn clear_encryption(&mut self) {
        self.encrypt_flag = 0;
        self.encrypt_key = 0;
    }

    pub fn encode<B: BufMut>(&self, out: &mut B) {
        out.put_u32(self.length);
        out.put_u32(self.serial_no);
        out.put_u16(self.msg_type);
        out.put_u32(self.gnss_center_id);
        out.put_slice(&self.version);
        out.put_u8(self.encrypt_flag);
        out.put_u32(self.encrypt_key);
    }

    /// Decode the first [`HEADER_LENGTH`] bytes of `data`
    ///
    /// # Errors
    /// `Jt809Error::InvalidData` if `data` is shorter than a header.
    pub fn decode(data: &[u8]) -> Jt809Result<Self> {
        if data.len() < HEADER_LENGTH {
            return Err(Jt809Error::InvalidData(format!(
                "Header needs {} bytes, got {}",
                HEADER_LENGTH,
                data.len()
            )));
        }
        let mut r = FieldReader::new(&data[..HEADER_LENGTH], "Header");
        Ok(Self {
            length: r.u32("length")?,
            serial_no: r.u32("serial_no")?,
            msg_type: r.u16("msg_type")?,
            gnss_center_id: r.u32("gnss_center_id")?,
            version: r.array::<3>("version")?,
            encrypt_flag: r.u8("encrypt_flag")?,
            encrypt_key: r.u32("encrypt_key")?,
        })
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Header{{length: {}, serial_no: {}, type: 0x{:04X}, center: {}, version: {}.{}.{}, encrypt: {}, key: {}}}",
            self.length,
            self.serial_no,
            self.msg_type,
            self.gnss_center_id,
            self.version[0],
            self.version[1],
            self.version[2],
            self.encrypt_flag,
            self.encrypt_key
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_captured_header() {
        let mut header = Header::new(0x1001);
        header.length = 0x48;
        header.serial_no = 133;
        header.gnss_center_id = 20180920;
        header.set_encryption(256178);

        let mut out = Vec::new();
        header.encode(&mut out);
        assert_eq!(
            out,
            vec![
                0x00, 0x00, 0x00, 0x48, 0x00, 0x00, 0x00, 0x85, 0x10, 0x01, 0x01, 0x33, 0xEF,
                0xB8, 0x01, 0x00, 0x00, 0x01, 0x00, 0x03, 0xE8, 0xB2
            ]
        );
        assert_eq!(Header::decode(&out).unwrap(), header);
    }

    #[test]
    fn test_decode_short_header() {
        assert!(matches!(
            Header::decode(&[0u8; 21]),
            Err(Jt809Error::InvalidData(_))
        ));
    }

    #[test]
    fn test_encryption_flag() {
        let mut header = Header::new(0x1200);
        assert!(!header.is_encrypted());
        header.set_encryption(7);
        assert!(header.is_encrypted());
        header.clear_encryption();
        assert_eq!(header.encrypt_key, 0);
        assert!(!header.is_encrypted());
    }
}
