use thiserror::Error;

/// Main error type for JT/T 809 operations
#[derive(Error, Debug)]
pub enum Jt809Error {
    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),

    #[error("Frame invalid: {0}")]
    FrameInvalid(String),

    #[error("CRC16 check failed: src={} sum=0x{sum:04X} should be=0x{expected:04X}", to_hex(.raw))]
    Checksum {
        /// Unescaped frame interior (content plus trailing checksum)
        raw: Vec<u8>,
        /// Checksum carried by the frame
        sum: u16,
        /// Checksum computed over the content
        expected: u16,
    },

    #[error("Unsupported packet type 0x{0:04X}")]
    UnsupportedPacket(u16),

    #[error("Unsupported sub packet type 0x{0:04X}")]
    UnsupportedSubPacket(u16),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Text encoding error: {0}")]
    Encoding(String),

    #[error("Timeout")]
    Timeout,

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Link unavailable: {0}")]
    LinkUnavailable(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl Jt809Error {
    /// Whether a receive loop may discard the current frame and keep reading.
    ///
    /// Framing, checksum and unknown-type errors leave the following frame
    /// boundaries intact. I/O and structural errors end the loop.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Jt809Error::FrameInvalid(_)
                | Jt809Error::Checksum { .. }
                | Jt809Error::UnsupportedPacket(_)
                | Jt809Error::UnsupportedSubPacket(_)
        )
    }

    /// Whether this is the peer closing the stream
    pub fn is_eof(&self) -> bool {
        matches!(self, Jt809Error::Connection(e) if e.kind() == std::io::ErrorKind::UnexpectedEof)
    }
}

/// Upper-case hex rendering used in error messages and packet traces
pub fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{:02X}", b));
    }
    out
}

/// Result type alias for JT/T 809 operations
pub type Jt809Result<T> = Result<T, Jt809Error>;
