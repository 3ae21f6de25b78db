//! JT/T 809 link layer: framing, checksum, scanning and session state

pub mod crc;
pub mod decoder;
pub mod frame;
pub mod state;
pub mod statistics;

pub use crc::{crc16_ccitt, Crc16};
pub use decoder::{FrameDecoder, DEFAULT_MAX_FRAME_LENGTH};
pub use frame::{
    escape, framed_length, open_frame, seal_frame, unescape, BEGIN_ESCAPE, BEGIN_FLAG, END_ESCAPE,
    END_FLAG, FRAME_OVERHEAD,
};
pub use state::SessionState;
pub use statistics::LinkStatistics;
