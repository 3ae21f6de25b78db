//! Link management bodies: login, logout, keepalive and link notices
//!
//! Keepalive requests and responses and the disconnect responses carry no
//! body and have no record here.

use crate::field::FieldReader;
use bytes::BufMut;
use jt809_core::datatypes::{decode_fixed_string, fixed_length_string};
use jt809_core::Jt809Result;

/// Width of the password field
pub const PASSWORD_LENGTH: usize = 8;
/// Width of the sub-link IP field
pub const DOWN_LINK_IP_LENGTH: usize = 32;

/// Login result codes of `UP_CONNECT_RSP`
pub mod login_result {
    pub const SUCCESS: u8 = 0x00;
    pub const IP_INCORRECT: u8 = 0x01;
    pub const ACCESS_CODE_INCORRECT: u8 = 0x02;
    pub const USER_NOT_REGISTERED: u8 = 0x03;
    pub const PASSWORD_INCORRECT: u8 = 0x04;
    pub const RESOURCE_SHORTAGE: u8 = 0x05;
    pub const OTHER: u8 = 0x06;

    /// Human-readable meaning of a login result
    pub fn describe(result: u8) -> &'static str {
        match result {
            SUCCESS => "success",
            IP_INCORRECT => "IP address incorrect",
            ACCESS_CODE_INCORRECT => "access code incorrect",
            USER_NOT_REGISTERED => "user not registered",
            PASSWORD_INCORRECT => "password incorrect",
            RESOURCE_SHORTAGE => "resources exhausted, retry later",
            _ => "other",
        }
    }
}

/// `UP_CONNECT_REQ`: main-link login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpConnectReq {
    pub user_id: u32,
    pub password: String,
    /// Address the superior platform should dial for the sub link
    pub down_link_ip: String,
    pub down_link_port: u16,
}

impl UpConnectReq {
    pub fn encode<B: BufMut>(&self, out: &mut B) -> Jt809Result<()> {
        out.put_u32(self.user_id);
        out.put_slice(&fixed_length_string(&self.password, PASSWORD_LENGTH, false)?);
        out.put_slice(&fixed_length_string(
            &self.down_link_ip,
            DOWN_LINK_IP_LENGTH,
            false,
        )?);
        out.put_u16(self.down_link_port);
        Ok(())
    }

    pub fn decode(data: &[u8]) -> Jt809Result<Self> {
        let mut r = FieldReader::new(data, "UpConnectReq");
        let req = Self {
            user_id: r.u32("user_id")?,
            password: decode_fixed_string(r.bytes(PASSWORD_LENGTH, "password")?, false)?,
            down_link_ip: decode_fixed_string(
                r.bytes(DOWN_LINK_IP_LENGTH, "down_link_ip")?,
                false,
            )?,
            down_link_port: r.u16("down_link_port")?,
        };
        r.finish();
        Ok(req)
    }
}

/// `UP_CONNECT_RSP`: login acknowledgement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpConnectRsp {
    /// See [`login_result`]
    pub result: u8,
    pub verify_code: u32,
}

impl UpConnectRsp {
    pub fn is_success(&self) -> bool {
        self.result == login_result::SUCCESS
    }

    pub fn encode<B: BufMut>(&self, out: &mut B) {
        out.put_u8(self.result);
        out.put_u32(self.verify_code);
    }

    pub fn decode(data: &[u8]) -> Jt809Result<Self> {
        let mut r = FieldReader::new(data, "UpConnectRsp");
        let rsp = Self {
            result: r.u8("result")?,
            verify_code: r.u32("verify_code")?,
        };
        r.finish();
        Ok(rsp)
    }
}

/// `UP_DISCONNECT_REQ`: main-link logout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpDisconnectReq {
    pub user_id: u32,
    pub password: String,
}

impl UpDisconnectReq {
    pub fn encode<B: BufMut>(&self, out: &mut B) -> Jt809Result<()> {
        out.put_u32(self.user_id);
        out.put_slice(&fixed_length_string(&self.password, PASSWORD_LENGTH, false)?);
        Ok(())
    }

    pub fn decode(data: &[u8]) -> Jt809Result<Self> {
        let mut r = FieldReader::new(data, "UpDisconnectReq");
        let req = Self {
            user_id: r.u32("user_id")?,
            password: decode_fixed_string(r.bytes(PASSWORD_LENGTH, "password")?, false)?,
        };
        r.finish();
        Ok(req)
    }
}

/// `DOWN_CONNECT_REQ` / `DOWN_DISCONNECT_REQ`: sub-link connect or
/// disconnect, both carrying the verify code handed out at login
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyCode {
    pub verify_code: u32,
}

impl VerifyCode {
    pub fn encode<B: BufMut>(&self, out: &mut B) {
        out.put_u32(self.verify_code);
    }

    pub fn decode(data: &[u8]) -> Jt809Result<Self> {
        let mut r = FieldReader::new(data, "VerifyCode");
        let req = Self {
            verify_code: r.u32("verify_code")?,
        };
        r.finish();
        Ok(req)
    }
}

/// Single result/reason byte shared by `DOWN_CONNECT_RSP` and the
/// disconnect/close-link notices of both directions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultCode {
    pub code: u8,
}

impl ResultCode {
    pub fn new(code: u8) -> Self {
        Self { code }
    }

    pub fn encode<B: BufMut>(&self, out: &mut B) {
        out.put_u8(self.code);
    }

    pub fn decode(data: &[u8]) -> Jt809Result<Self> {
        let mut r = FieldReader::new(data, "ResultCode");
        let code = Self { code: r.u8("code")? };
        r.finish();
        Ok(code)
    }
}

/// `DOWN_TOTAL_RECV_BACK_MSG`: count of dynamic-info packets the superior
/// platform received in a window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownTotalRecvBackMsg {
    pub dynamic_info_total: u32,
    /// UTC seconds
    pub start_time: u64,
    /// UTC seconds
    pub end_time: u64,
}

impl DownTotalRecvBackMsg {
    pub fn encode<B: BufMut>(&self, out: &mut B) {
        out.put_u32(self.dynamic_info_total);
        out.put_u64(self.start_time);
        out.put_u64(self.end_time);
    }

    pub fn decode(data: &[u8]) -> Jt809Result<Self> {
        let mut r = FieldReader::new(data, "DownTotalRecvBackMsg");
        let msg = Self {
            dynamic_info_total: r.u32("dynamic_info_total")?,
            start_time: r.u64("start_time")?,
            end_time: r.u64("end_time")?,
        };
        r.finish();
        Ok(msg)
    }
}
