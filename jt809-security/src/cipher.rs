//! Body stream cipher
//!
//! Each byte is XORed with bits 20..28 of a linear congruential generator
//! seeded by the header's encrypt key:
//!
//! ```text
//! state = key (1 if key == 0)
//! state = IA1 * (state % M1) + IC1     (wrapping u32)
//! out   = in ^ ((state >> 20) & 0xFF)
//! ```
//!
//! Applying the cipher twice with the same key restores the input.

use crate::constants::{IA1, IC1, M1};

/// JT/T 809 stream cipher
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamCipher;

impl StreamCipher {
    pub fn new() -> Self {
        Self
    }

    /// Encrypt or decrypt `data` in place
    pub fn apply(&self, key: u32, data: &mut [u8]) {
        let mut state = if key == 0 { 1 } else { key };
        for b in data.iter_mut() {
            state = IA1.wrapping_mul(state % M1).wrapping_add(IC1);
            *b ^= ((state >> 20) & 0xFF) as u8;
        }
    }

    /// Copying variant of [`StreamCipher::apply`]
    pub fn apply_to_vec(&self, key: u32, data: &[u8]) -> Vec<u8> {
        let mut out = data.to_vec();
        self.apply(key, &mut out);
        out
    }
}
