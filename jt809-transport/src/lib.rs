//! Transport layer module for the JT/T 809 protocol
//!
//! This crate provides the byte-stream abstraction the frame decoder reads
//! from and the TCP plumbing for both links: dialing the main link and
//! wrapping an accepted sub-link socket.

pub mod error;
pub mod stream;
pub mod tcp;

pub use error::{Jt809Error, Jt809Result};
pub use stream::{IoReader, IoWriter, StreamAccessor, StreamWriter};
pub use tcp::{TcpReader, TcpSettings, TcpTransport, TcpWriter};
