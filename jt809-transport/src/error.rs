//! Error types re-exported from `jt809-core`

pub use jt809_core::error::{Jt809Error, Jt809Result};
