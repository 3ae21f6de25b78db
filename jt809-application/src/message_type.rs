//! Message type codes
//!
//! Codes are grouped by direction: `0x1xxx` travel from the subordinate
//! platform up, `0x9xxx` from the superior platform down.

// 链路管理类
pub const UP_CONNECT_REQ: u16 = 0x1001;
pub const UP_CONNECT_RSP: u16 = 0x1002;
pub const UP_DISCONNECT_REQ: u16 = 0x1003;
pub const UP_DISCONNECT_RSP: u16 = 0x1004;
pub const UP_LINKTEST_REQ: u16 = 0x1005;
pub const UP_LINKTEST_RSP: u16 = 0x1006;
pub const UP_DISCONNECT_INFORM: u16 = 0x1007;
pub const UP_CLOSELINK_INFORM: u16 = 0x1008;

pub const DOWN_CONNECT_REQ: u16 = 0x9001;
pub const DOWN_CONNECT_RSP: u16 = 0x9002;
pub const DOWN_DISCONNECT_REQ: u16 = 0x9003;
pub const DOWN_DISCONNECT_RSP: u16 = 0x9004;
pub const DOWN_LINKTEST_REQ: u16 = 0x9005;
pub const DOWN_LINKTEST_RSP: u16 = 0x9006;
pub const DOWN_DISCONNECT_INFORM: u16 = 0x9007;
pub const DOWN_CLOSELINK_INFORM: u16 = 0x9008;

// 信息统计类
pub const DOWN_TOTAL_RECV_BACK_MSG: u16 = 0x9101;

// 车辆动态信息交换
pub const UP_EXG_MSG: u16 = 0x1200;

/// Sub-packet types carried by `UP_EXG_MSG`
pub mod exg {
    pub const UP_EXG_MSG_REAL_LOCATION: u16 = 0x1202;
}

/// Wire name of a message type code, if known
pub fn name(code: u16) -> Option<&'static str> {
    let name = match code {
        UP_CONNECT_REQ => "UP_CONNECT_REQ",
        UP_CONNECT_RSP => "UP_CONNECT_RSP",
        UP_DISCONNECT_REQ => "UP_DISCONNECT_REQ",
        UP_DISCONNECT_RSP => "UP_DISCONNECT_RSP",
        UP_LINKTEST_REQ => "UP_LINKTEST_REQ",
        UP_LINKTEST_RSP => "UP_LINKTEST_RSP",
        UP_DISCONNECT_INFORM => "UP_DISCONNECT_INFORM",
        UP_CLOSELINK_INFORM => "UP_CLOSELINK_INFORM",
        DOWN_CONNECT_REQ => "DOWN_CONNECT_REQ",
        DOWN_CONNECT_RSP => "DOWN_CONNECT_RSP",
        DOWN_DISCONNECT_REQ => "DOWN_DISCONNECT_REQ",
        DOWN_DISCONNECT_RSP => "DOWN_DISCONNECT_RSP",
        DOWN_LINKTEST_REQ => "DOWN_LINKTEST_REQ",
        DOWN_LINKTEST_RSP => "DOWN_LINKTEST_RSP",
        DOWN_DISCONNECT_INFORM => "DOWN_DISCONNECT_INFORM",
        DOWN_CLOSELINK_INFORM => "DOWN_CLOSELINK_INFORM",
        DOWN_TOTAL_RECV_BACK_MSG => "DOWN_TOTAL_RECV_BACK_MSG",
        UP_EXG_MSG => "UP_EXG_MSG",
        _ => return None,
    };
    Some(name)
}
