//! Core types and utilities for the JT/T 809 protocol
//!
//! This crate provides the error type shared by every layer and the small
//! value types (GNSS date/time, plate colour, fixed-width text fields) used
//! by the packet model.

pub mod error;
pub mod datatypes;

pub use error::{to_hex, Jt809Error, Jt809Result};
