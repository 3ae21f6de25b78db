//! Bounds-checked big-endian field reader for packet bodies

use bytes::Buf;
use jt809_core::{Jt809Error, Jt809Result};

/// Cursor over a body that turns a short read into `InvalidData`
#[derive(Debug)]
pub struct FieldReader<'a> {
    buf: &'a [u8],
    what: &'static str,
}

impl<'a> FieldReader<'a> {
    /// `what` names the record being decoded in error messages
    pub fn new(buf: &'a [u8], what: &'static str) -> Self {
        Self { buf, what }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    fn need(&self, n: usize, field: &str) -> Jt809Result<()> {
        if self.buf.len() < n {
            return Err(Jt809Error::InvalidData(format!(
                "{}: {} needs {} bytes, {} left",
                self.what,
                field,
                n,
                self.buf.len()
            )));
        }
        Ok(())
    }

    pub fn u8(&mut self, field: &str) -> Jt809Result<u8> {
        self.need(1, field)?;
        Ok(self.buf.get_u8())
    }

    pub fn u16(&mut self, field: &str) -> Jt809Result<u16> {
        self.need(2, field)?;
        Ok(self.buf.get_u16())
    }

    pub fn u32(&mut self, field: &str) -> Jt809Result<u32> {
        self.need(4, field)?;
        Ok(self.buf.get_u32())
    }

    pub fn u64(&mut self, field: &str) -> Jt809Result<u64> {
        self.need(8, field)?;
        Ok(self.buf.get_u64())
    }

    /// Borrow the next `n` bytes
    pub fn bytes(&mut self, n: usize, field: &str) -> Jt809Result<&'a [u8]> {
        self.need(n, field)?;
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    /// Copy the next `N` bytes into an array
    pub fn array<const N: usize>(&mut self, field: &str) -> Jt809Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N, field)?);
        Ok(out)
    }

    /// Borrow everything left
    pub fn rest(&mut self) -> &'a [u8] {
        let rest = self.buf;
        self.buf = &[];
        rest
    }

    /// End of record; trailing bytes are tolerated and traced
    pub fn finish(self) {
        if !self.buf.is_empty() {
            log::debug!(
                "{}: ignoring {} trailing bytes",
                self.what,
                self.buf.len()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_big_endian() {
        let data = [0x01, 0x02, 0x03, 0x00, 0x00, 0x00, 0x04, 0xAA];
        let mut r = FieldReader::new(&data, "test");
        assert_eq!(r.u8("a").unwrap(), 0x01);
        assert_eq!(r.u16("b").unwrap(), 0x0203);
        assert_eq!(r.u32("c").unwrap(), 4);
        assert_eq!(r.rest(), &[0xAA]);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_short_read_names_field() {
        let data = [0x01, 0x02];
        let mut r = FieldReader::new(&data, "UpConnectRsp");
        let err = r.u32("verify_code").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("UpConnectRsp"));
        assert!(msg.contains("verify_code"));
        assert!(!err.is_recoverable());
    }
}
