//! Security module for the JT/T 809 protocol
//!
//! This crate provides the body stream cipher selected by the header's
//! encrypt flag.

pub mod cipher;
pub mod constants;

pub use cipher::StreamCipher;
pub use constants::{IA1, IC1, M1};
