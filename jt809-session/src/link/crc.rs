//! CRC16 checksum for JT/T 809 frames
//!
//! CRC-16/CCITT-FALSE: polynomial 0x1021, initial value 0xFFFF, no bit
//! reflection and no final xor. The same variant is used when sealing and
//! when verifying a frame.

/// CRC calculation constants
const INITIAL_CRC: u16 = 0xFFFF;
const POLY: u16 = 0x1021;

/// Precomputed CRC table (MSB first)
static CRC_TABLE: once_cell::sync::Lazy<[u16; 256]> = once_cell::sync::Lazy::new(|| {
    let mut table = [0u16; 256];
    for b in 0..=0xFFu16 {
        let mut v = b << 8;
        for _ in 0..8 {
            if (v & 0x8000) != 0 {
                v = (v << 1) ^ POLY;
            } else {
                v <<= 1;
            }
        }
        table[b as usize] = v;
    }
    table
});

/// Incremental CRC16 calculator
#[derive(Debug, Clone)]
pub struct Crc16 {
    value: u16,
}

impl Crc16 {
    pub fn new() -> Self {
        Self { value: INITIAL_CRC }
    }

    /// Reset the CRC value to initial state
    pub fn reset(&mut self) {
        self.value = INITIAL_CRC;
    }

    /// Update the CRC value with a single byte
    pub fn update(&mut self, data: u8) {
        let index = ((self.value >> 8) ^ data as u16) & 0xFF;
        self.value = (self.value << 8) ^ CRC_TABLE[index as usize];
    }

    /// Update the CRC value with multiple bytes
    pub fn update_bytes(&mut self, data: &[u8]) {
        for &byte in data {
            self.update(byte);
        }
    }

    /// Current CRC as big-endian wire bytes
    pub fn value_bytes(&self) -> [u8; 2] {
        self.value.to_be_bytes()
    }

    pub fn value(&self) -> u16 {
        self.value
    }
}

impl Default for Crc16 {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot CRC16 over `data`
pub fn crc16_ccitt(data: &[u8]) -> u16 {
    let mut calc = Crc16::new();
    calc.update_bytes(data);
    calc.value()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_value() {
        // Standard check input for CRC catalogues
        assert_eq!(crc16_ccitt(b"123456789"), 0x29B1);
    }

    #[test]
    fn test_empty_input_is_initial_value() {
        assert_eq!(crc16_ccitt(&[]), INITIAL_CRC);
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        let data = [0x00, 0x00, 0x00, 0x48, 0x5B, 0x5A, 0xFF];
        let mut calc = Crc16::new();
        calc.update_bytes(&data[..3]);
        calc.update_bytes(&data[3..]);
        assert_eq!(calc.value(), crc16_ccitt(&data));
        calc.reset();
        assert_eq!(calc.value(), INITIAL_CRC);
    }
}
