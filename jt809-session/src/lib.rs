//! Session layer for the JT/T 809 protocol
//!
//! This crate turns a byte stream into verified frame contents and back:
//! delimiting, escaping and the CRC16 check. It also carries the dual-link
//! session state machine and per-link statistics used by the server.
//!
//! # TODO
//!
//! ## 帧层
//! - [x] 帧定界 (0x5B / 0x5D)
//! - [x] 转义/反转义
//! - [x] CRC16 计算和验证
//! - [x] 流式帧扫描（缓冲读取、截断帧重同步）
//! - [x] 链路统计信息
//! - [x] 会话状态机
//! - [ ] 帧长度与头部 Length 字段交叉校验

pub mod error;
pub mod link;

pub use error::{Jt809Error, Jt809Result};
pub use link::*;
