//! Packet encoding and decoding to and from wire frames

use crate::header::{Header, HEADER_LENGTH};
use crate::packet::{Packet, PacketBody};
use jt809_core::{Jt809Error, Jt809Result};
use jt809_security::StreamCipher;
use jt809_session::{framed_length, open_frame, seal_frame, FrameDecoder};
use jt809_transport::StreamAccessor;

/// Encode `packet` into a complete frame
///
/// The header's `length` and `msg_type` are stamped from the body. If the
/// header's encrypt flag is set, the body is enciphered with its key before
/// the checksum is computed.
pub fn encode_packet(packet: &mut Packet) -> Jt809Result<Vec<u8>> {
    let mut body = Vec::new();
    packet.body.encode(&mut body)?;
    if packet.header.is_encrypted() {
        StreamCipher::new().apply(packet.header.encrypt_key, &mut body);
    }

    let length = framed_length(HEADER_LENGTH + body.len());
    packet.header.length = u32::try_from(length)
        .map_err(|_| Jt809Error::InvalidData(format!("packet too large: {} bytes", length)))?;
    packet.header.msg_type = packet.body.msg_type();

    let mut content = Vec::with_capacity(HEADER_LENGTH + body.len());
    packet.header.encode(&mut content);
    content.extend_from_slice(&body);
    Ok(seal_frame(&content))
}

/// Decode verified frame content (header and body, checksum removed)
pub fn decode_content(content: &[u8]) -> Jt809Result<Packet> {
    let header = Header::decode(content)?;
    let mut body = content[HEADER_LENGTH..].to_vec();
    if header.is_encrypted() {
        StreamCipher::new().apply(header.encrypt_key, &mut body);
    }
    let body = PacketBody::decode(header.msg_type, &body)?;
    Ok(Packet { header, body })
}

/// Decode a raw delimited frame
///
/// # Errors
/// - `Jt809Error::FrameInvalid` / `Jt809Error::Checksum` from the frame layer
/// - `Jt809Error::UnsupportedPacket` / `Jt809Error::UnsupportedSubPacket`
/// - `Jt809Error::InvalidData` for a malformed header or body
pub fn decode_frame(frame: &[u8]) -> Jt809Result<Packet> {
    let content = open_frame(frame)?;
    decode_content(&content)
}

/// Reads packets from one link
pub struct PacketReader<S> {
    stream: S,
    decoder: FrameDecoder,
}

impl<S: StreamAccessor> PacketReader<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            decoder: FrameDecoder::new(),
        }
    }

    /// Read and decode the next packet
    ///
    /// Recoverable errors (see `Jt809Error::is_recoverable`) concern only
    /// the current frame; the reader may be called again.
    pub async fn read_packet(&mut self) -> Jt809Result<Packet> {
        let frame = self.decoder.read_frame(&mut self.stream).await?;
        log::trace!("Received frame {}", jt809_core::to_hex(&frame));
        decode_frame(&frame)
    }

    /// Bytes dropped outside frames so far
    pub fn discarded(&self) -> u64 {
        self.decoder.discarded()
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}
