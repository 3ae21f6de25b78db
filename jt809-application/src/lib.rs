//! Application layer for the JT/T 809 protocol
//!
//! This crate provides the packet model: the 22-byte header, a typed body
//! for every supported message type, the dynamic-information sub-packets,
//! packet encoding/decoding over the session layer's frames and the serial
//! number generator.

pub mod codec;
pub mod exg;
pub mod field;
pub mod header;
pub mod link_control;
pub mod location;
pub mod message_type;
pub mod packet;
pub mod serial;

pub use codec::{decode_content, decode_frame, encode_packet, PacketReader};
pub use exg::{SubPacket, UpExgMsg};
pub use header::{Header, HEADER_LENGTH, PROTOCOL_VERSION};
pub use link_control::{
    login_result, DownTotalRecvBackMsg, ResultCode, UpConnectReq, UpConnectRsp, UpDisconnectReq,
    VerifyCode,
};
pub use location::{LocationAlarm, LocationStatus, RealLocation};
pub use packet::{LinkType, Packet, PacketBody};
pub use serial::SerialNoGenerator;
