//! # Dispenser Device
//!
//! 远程命令循环：定期上报状态、获取命令、持有共享执行器锁执行、确认结果。
//!
//! - [`CommandPoller`]: 后台轮询线程
//! - [`RemoteApi`]: 远程 API 接口，[`HttpRemoteApi`] 为 HTTP 实现
//! - [`DeviceStatus`]: 支付 ID 与命令执行状态（独立于执行器锁）

pub mod ack;
pub mod api;
pub mod command;
mod error;
pub mod http;
pub mod poller;
pub mod status;

pub use ack::{AckResult, AckStatus, MAX_ERROR_MESSAGE_CHARS};
pub use api::{ApiError, RemoteApi};
pub use command::{Command, CommandKind};
pub use error::DeviceError;
pub use http::HttpRemoteApi;
pub use poller::{CommandPoller, PollerConfig, PollerHandle, TickOutcome};
pub use status::{DeviceStatus, StatusSnapshot};
