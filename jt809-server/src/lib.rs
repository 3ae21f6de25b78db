//! JT/T 809 gateway session
//!
//! This crate runs the subordinate-platform side of a JT/T 809 session:
//! dialing the main link, logging in, accepting the sub link, answering
//! link tests and reporting vehicle positions.
//!
//! # TODO
//!
//! ## 会话
//! - [x] 主链路拨号与登录
//! - [x] 从链路监听和接受（退避重试）
//! - [x] 会话状态管理
//! - [x] 心跳保活
//! - [x] 关闭流程（可重入）
//! - [ ] 断线自动重连
//!
//! ## 请求处理
//! - [x] 从链路连接/断开请求应答
//! - [x] 从链路保持应答
//! - [x] 车辆实时定位上报
//! - [ ] 车辆动态信息交换的其余子业务
//!
//! ## 高级功能
//! - [x] 链路统计信息
//! - [x] TOML 配置

pub mod config;
pub mod listener;
pub mod server;
pub mod task;

pub use config::ServerConfig;
pub use listener::{AcceptBackoff, SubLinkListener};
pub use server::{Jt809Server, Link, SessionStatistics};
pub use task::spawn_supervised;
