//! jt809 - Rust implementation of the JT/T 809 platform interconnect protocol
//!
//! This library implements the subordinate-platform side of JT/T 809: the
//! frame codec, the packet model and a dual-link session that logs in to a
//! superior platform and reports vehicle positions.
//!
//! # Architecture
//!
//! This library is organized as a workspace with multiple crates:
//!
//! - `jt809-core`: Error type and value types (GNSS date/time, plates)
//! - `jt809-transport`: Byte-stream traits and TCP links
//! - `jt809-session`: Framing, escaping, CRC16, session state
//! - `jt809-security`: Body stream cipher
//! - `jt809-application`: Header, packet bodies, codec, serial numbers
//! - `jt809-server`: Dual-link session manager
//!
//! # Implementation Status
//!
//! ## ✅ 已完成
//! - 帧编解码（定界、转义、CRC16）
//! - 报文体加解密
//! - 链路管理类报文（登录、注销、保持、断开通知）
//! - 车辆实时定位上报
//! - 主从链路会话管理
//!
//! ## 📋 待实现
//! - 断线重连
//! - 其余车辆动态信息交换子业务
//!
//! # Usage
//!
//! ```no_run
//! use jt809::server::{Jt809Server, ServerConfig};
//! ```

// Re-export core types
pub use jt809_core::{Jt809Error, Jt809Result};
pub use jt809_core::datatypes::*;

// Re-export the packet model
pub mod packet {
    pub use jt809_application::*;
}

// Re-export framing
pub mod frame {
    pub use jt809_session::*;
}

// Re-export the body cipher
pub mod security {
    pub use jt809_security::*;
}

// Re-export server API
pub mod server {
    pub use jt809_server::*;
}
