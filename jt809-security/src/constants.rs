//! JT/T 809 cipher constants
//!
//! The standard leaves M1, IA1 and IC1 to agreement between the two
//! platforms. These are the values used by the platforms this gateway
//! interoperates with.

/// Modulus applied to the generator state
pub const M1: u32 = 30_000_000;

/// Multiplier
pub const IA1: u32 = 20_000_000;

/// Increment
pub const IC1: u32 = 20_000_000;
