//! Packet model
//!
//! A packet is a [`Header`] plus a [`PacketBody`] selected by the header's
//! type code. The set of bodies is closed: decoding matches the type code
//! exhaustively and any code not listed is reported as
//! `Jt809Error::UnsupportedPacket`.

use crate::exg::UpExgMsg;
use crate::header::Header;
use crate::link_control::{
    DownTotalRecvBackMsg, ResultCode, UpConnectReq, UpConnectRsp, UpDisconnectReq, VerifyCode,
};
use crate::message_type::*;
use bytes::BufMut;
use jt809_core::{Jt809Error, Jt809Result};
use std::fmt;

/// Which link a packet may travel on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkType {
    /// Main link (this platform dialed it)
    MainOnly,
    /// Sub link (the superior platform dialed it)
    SubOnly,
    /// Main link, falling back to the sub link
    MainPreferred,
    /// Sub link, falling back to the main link
    SubPreferred,
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LinkType::MainOnly => "main only",
            LinkType::SubOnly => "sub only",
            LinkType::MainPreferred => "prefer main",
            LinkType::SubPreferred => "prefer sub",
        };
        f.write_str(name)
    }
}

/// Packet body, one variant per supported message type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketBody {
    UpConnectReq(UpConnectReq),
    UpConnectRsp(UpConnectRsp),
    UpDisconnectReq(UpDisconnectReq),
    UpDisconnectRsp,
    UpLinkTestReq,
    UpLinkTestRsp,
    /// Error code
    UpDisconnectInform(ResultCode),
    /// Reason code
    UpCloseLinkInform(ResultCode),
    DownConnectReq(VerifyCode),
    /// Result code, 0 on success
    DownConnectRsp(ResultCode),
    DownDisconnectReq(VerifyCode),
    DownDisconnectRsp,
    DownLinkTestReq,
    DownLinkTestRsp,
    /// Error code
    DownDisconnectInform(ResultCode),
    /// Reason code
    DownCloseLinkInform(ResultCode),
    DownTotalRecvBackMsg(DownTotalRecvBackMsg),
    UpExgMsg(UpExgMsg),
}

impl PacketBody {
    /// Message type code
    pub fn msg_type(&self) -> u16 {
        match self {
            PacketBody::UpConnectReq(_) => UP_CONNECT_REQ,
            PacketBody::UpConnectRsp(_) => UP_CONNECT_RSP,
            PacketBody::UpDisconnectReq(_) => UP_DISCONNECT_REQ,
            PacketBody::UpDisconnectRsp => UP_DISCONNECT_RSP,
            PacketBody::UpLinkTestReq => UP_LINKTEST_REQ,
            PacketBody::UpLinkTestRsp => UP_LINKTEST_RSP,
            PacketBody::UpDisconnectInform(_) => UP_DISCONNECT_INFORM,
            PacketBody::UpCloseLinkInform(_) => UP_CLOSELINK_INFORM,
            PacketBody::DownConnectReq(_) => DOWN_CONNECT_REQ,
            PacketBody::DownConnectRsp(_) => DOWN_CONNECT_RSP,
            PacketBody::DownDisconnectReq(_) => DOWN_DISCONNECT_REQ,
            PacketBody::DownDisconnectRsp => DOWN_DISCONNECT_RSP,
            PacketBody::DownLinkTestReq => DOWN_LINKTEST_REQ,
            PacketBody::DownLinkTestRsp => DOWN_LINKTEST_RSP,
            PacketBody::DownDisconnectInform(_) => DOWN_DISCONNECT_INFORM,
            PacketBody::DownCloseLinkInform(_) => DOWN_CLOSELINK_INFORM,
            PacketBody::DownTotalRecvBackMsg(_) => DOWN_TOTAL_RECV_BACK_MSG,
            PacketBody::UpExgMsg(_) => UP_EXG_MSG,
        }
    }

    /// Link affinity used by the send path
    pub fn link_type(&self) -> LinkType {
        match self {
            PacketBody::UpConnectReq(_)
            | PacketBody::UpConnectRsp(_)
            | PacketBody::UpDisconnectReq(_)
            | PacketBody::UpDisconnectRsp
            | PacketBody::UpLinkTestReq
            | PacketBody::UpLinkTestRsp
            | PacketBody::DownDisconnectInform(_)
            | PacketBody::DownCloseLinkInform(_) => LinkType::MainOnly,
            PacketBody::UpDisconnectInform(_)
            | PacketBody::UpCloseLinkInform(_)
            | PacketBody::DownConnectReq(_)
            | PacketBody::DownConnectRsp(_)
            | PacketBody::DownDisconnectReq(_)
            | PacketBody::DownDisconnectRsp
            | PacketBody::DownLinkTestReq
            | PacketBody::DownLinkTestRsp => LinkType::SubOnly,
            PacketBody::DownTotalRecvBackMsg(_) => LinkType::SubPreferred,
            PacketBody::UpExgMsg(_) => LinkType::MainPreferred,
        }
    }

    /// Wire name of the message type
    pub fn description(&self) -> &'static str {
        name(self.msg_type()).unwrap_or("UNKNOWN")
    }

    /// Encode the plain (not enciphered) body
    pub fn encode<B: BufMut>(&self, out: &mut B) -> Jt809Result<()> {
        match self {
            PacketBody::UpConnectReq(req) => req.encode(out)?,
            PacketBody::UpConnectRsp(rsp) => rsp.encode(out),
            PacketBody::UpDisconnectReq(req) => req.encode(out)?,
            PacketBody::UpDisconnectInform(code)
            | PacketBody::UpCloseLinkInform(code)
            | PacketBody::DownConnectRsp(code)
            | PacketBody::DownDisconnectInform(code)
            | PacketBody::DownCloseLinkInform(code) => code.encode(out),
            PacketBody::DownConnectReq(req) | PacketBody::DownDisconnectReq(req) => req.encode(out),
            PacketBody::DownTotalRecvBackMsg(msg) => msg.encode(out),
            PacketBody::UpExgMsg(msg) => msg.encode(out)?,
            PacketBody::UpDisconnectRsp
            | PacketBody::UpLinkTestReq
            | PacketBody::UpLinkTestRsp
            | PacketBody::DownDisconnectRsp
            | PacketBody::DownLinkTestReq
            | PacketBody::DownLinkTestRsp => {}
        }
        Ok(())
    }

    /// Decode a plain body of type `msg_type`
    ///
    /// # Errors
    /// - `Jt809Error::UnsupportedPacket` naming an unknown code
    /// - `Jt809Error::UnsupportedSubPacket` from composite bodies
    /// - `Jt809Error::InvalidData` for a malformed body
    pub fn decode(msg_type: u16, data: &[u8]) -> Jt809Result<Self> {
        let body = match msg_type {
            UP_CONNECT_REQ => PacketBody::UpConnectReq(UpConnectReq::decode(data)?),
            UP_CONNECT_RSP => PacketBody::UpConnectRsp(UpConnectRsp::decode(data)?),
            UP_DISCONNECT_REQ => PacketBody::UpDisconnectReq(UpDisconnectReq::decode(data)?),
            UP_DISCONNECT_RSP => PacketBody::UpDisconnectRsp,
            UP_LINKTEST_REQ => PacketBody::UpLinkTestReq,
            UP_LINKTEST_RSP => PacketBody::UpLinkTestRsp,
            UP_DISCONNECT_INFORM => PacketBody::UpDisconnectInform(ResultCode::decode(data)?),
            UP_CLOSELINK_INFORM => PacketBody::UpCloseLinkInform(ResultCode::decode(data)?),
            DOWN_CONNECT_REQ => PacketBody::DownConnectReq(VerifyCode::decode(data)?),
            DOWN_CONNECT_RSP => PacketBody::DownConnectRsp(ResultCode::decode(data)?),
            DOWN_DISCONNECT_REQ => PacketBody::DownDisconnectReq(VerifyCode::decode(data)?),
            DOWN_DISCONNECT_RSP => PacketBody::DownDisconnectRsp,
            DOWN_LINKTEST_REQ => PacketBody::DownLinkTestReq,
            DOWN_LINKTEST_RSP => PacketBody::DownLinkTestRsp,
            DOWN_DISCONNECT_INFORM => PacketBody::DownDisconnectInform(ResultCode::decode(data)?),
            DOWN_CLOSELINK_INFORM => PacketBody::DownCloseLinkInform(ResultCode::decode(data)?),
            DOWN_TOTAL_RECV_BACK_MSG => {
                PacketBody::DownTotalRecvBackMsg(DownTotalRecvBackMsg::decode(data)?)
            }
            UP_EXG_MSG => PacketBody::UpExgMsg(UpExgMsg::decode(data)?),
            other => return Err(Jt809Error::UnsupportedPacket(other)),
        };
        Ok(body)
    }
}

impl fmt::Display for PacketBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketBody::UpConnectReq(req) => write!(
                f,
                "{}{{user_id: {}, down_link: {}:{}}}",
                self.description(),
                req.user_id,
                req.down_link_ip,
                req.down_link_port
            ),
            PacketBody::UpConnectRsp(rsp) => write!(
                f,
                "{}{{result: {}, verify_code: {}}}",
                self.description(),
                rsp.result,
                rsp.verify_code
            ),
            PacketBody::UpDisconnectReq(req) => {
                write!(f, "{}{{user_id: {}}}", self.description(), req.user_id)
            }
            PacketBody::UpDisconnectInform(code)
            | PacketBody::UpCloseLinkInform(code)
            | PacketBody::DownConnectRsp(code)
            | PacketBody::DownDisconnectInform(code)
            | PacketBody::DownCloseLinkInform(code) => {
                write!(f, "{}{{code: {}}}", self.description(), code.code)
            }
            PacketBody::DownConnectReq(req) | PacketBody::DownDisconnectReq(req) => write!(
                f,
                "{}{{verify_code: {}}}",
                self.description(),
                req.verify_code
            ),
            PacketBody::DownTotalRecvBackMsg(msg) => write!(
                f,
                "{}{{total: {}, from: {}, to: {}}}",
                self.description(),
                msg.dynamic_info_total,
                msg.start_time,
                msg.end_time
            ),
            PacketBody::UpExgMsg(msg) => write!(f, "{}{{{}}}", self.description(), msg),
            _ => f.write_str(self.description()),
        }
    }
}

/// A JT/T 809 packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub header: Header,
    pub body: PacketBody,
}

impl Packet {
    /// Packet with a fresh header matching `body`
    pub fn new(body: PacketBody) -> Self {
        Self {
            header: Header::new(body.msg_type()),
            body,
        }
    }

    pub fn msg_type(&self) -> u16 {
        self.body.msg_type()
    }

    pub fn link_type(&self) -> LinkType {
        self.body.link_type()
    }

    pub fn description(&self) -> &'static str {
        self.body.description()
    }
}

impl From<PacketBody> for Packet {
    fn from(body: PacketBody) -> Self {
        Packet::new(body)
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.header, self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exg::SubPacket;
    use crate::location::RealLocation;
    use jt809_core::datatypes::PlateColor;

    fn all_bodies() -> Vec<PacketBody> {
        vec![
            PacketBody::UpConnectReq(UpConnectReq {
                user_id: 1,
                password: "pw".into(),
                down_link_ip: "10.0.0.1".into(),
                down_link_port: 8090,
            }),
            PacketBody::UpConnectRsp(UpConnectRsp {
                result: 0,
                verify_code: 99,
            }),
            PacketBody::UpDisconnectReq(UpDisconnectReq {
                user_id: 1,
                password: "pw".into(),
            }),
            PacketBody::UpDisconnectRsp,
            PacketBody::UpLinkTestReq,
            PacketBody::UpLinkTestRsp,
            PacketBody::UpDisconnectInform(ResultCode::new(1)),
            PacketBody::UpCloseLinkInform(ResultCode::new(2)),
            PacketBody::DownConnectReq(VerifyCode { verify_code: 99 }),
            PacketBody::DownConnectRsp(ResultCode::new(0)),
            PacketBody::DownDisconnectReq(VerifyCode { verify_code: 99 }),
            PacketBody::DownDisconnectRsp,
            PacketBody::DownLinkTestReq,
            PacketBody::DownLinkTestRsp,
            PacketBody::DownDisconnectInform(ResultCode::new(0)),
            PacketBody::DownCloseLinkInform(ResultCode::new(1)),
            PacketBody::DownTotalRecvBackMsg(DownTotalRecvBackMsg {
                dynamic_info_total: 5,
                start_time: 1,
                end_time: 2,
            }),
            PacketBody::UpExgMsg(
                UpExgMsg::new(
                    "测A12345",
                    PlateColor::Yellow,
                    SubPacket::RealLocation(RealLocation::now()),
                )
                .unwrap(),
            ),
        ]
    }

    #[test]
    fn test_every_body_decodes_to_itself() {
        for body in all_bodies() {
            let mut out = Vec::new();
            body.encode(&mut out).unwrap();
            let decoded = PacketBody::decode(body.msg_type(), &out).unwrap();
            assert_eq!(decoded, body, "{}", body.description());
        }
    }

    #[test]
    fn test_link_affinity() {
        use LinkType::*;
        let expected = [
            (UP_CONNECT_REQ, MainOnly),
            (UP_CONNECT_RSP, MainOnly),
            (UP_DISCONNECT_REQ, MainOnly),
            (UP_DISCONNECT_RSP, MainOnly),
            (UP_LINKTEST_REQ, MainOnly),
            (UP_LINKTEST_RSP, MainOnly),
            (UP_DISCONNECT_INFORM, SubOnly),
            (UP_CLOSELINK_INFORM, SubOnly),
            (DOWN_CONNECT_REQ, SubOnly),
            (DOWN_CONNECT_RSP, SubOnly),
            (DOWN_DISCONNECT_REQ, SubOnly),
            (DOWN_DISCONNECT_RSP, SubOnly),
            (DOWN_LINKTEST_REQ, SubOnly),
            (DOWN_LINKTEST_RSP, SubOnly),
            (DOWN_DISCONNECT_INFORM, MainOnly),
            (DOWN_CLOSELINK_INFORM, MainOnly),
            (DOWN_TOTAL_RECV_BACK_MSG, SubPreferred),
            (UP_EXG_MSG, MainPreferred),
        ];
        let bodies = all_bodies();
        assert_eq!(bodies.len(), expected.len());
        for (body, (code, link)) in bodies.iter().zip(expected) {
            assert_eq!(body.msg_type(), code);
            assert_eq!(body.link_type(), link, "{}", body.description());
        }
    }

    #[test]
    fn test_unknown_type_names_code() {
        let err = PacketBody::decode(0x1300, &[]).unwrap_err();
        assert!(matches!(err, Jt809Error::UnsupportedPacket(0x1300)));
        assert!(err.to_string().contains("0x1300"));
    }

    #[test]
    fn test_display() {
        let packet = Packet::new(PacketBody::UpLinkTestReq);
        assert_eq!(packet.header.msg_type, UP_LINKTEST_REQ);
        assert_eq!(packet.description(), "UP_LINKTEST_REQ");
        assert!(packet.to_string().ends_with("UP_LINKTEST_REQ"));
        let rsp = PacketBody::DownConnectRsp(ResultCode::new(0));
        assert_eq!(rsp.to_string(), "DOWN_CONNECT_RSP{code: 0}");
    }
}
