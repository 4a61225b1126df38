//! 远程命令 API

use crate::ack::AckResult;
use crate::command::Command;
use thiserror::Error;

/// 远程 API 错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// API 密钥无效或缺失（HTTP 401）
    #[error("unauthorized: invalid or missing API key")]
    Unauthorized,

    /// 命令不存在或属于其他设备（确认时 HTTP 404）
    #[error("command {0} not found or belongs to different device")]
    CommandNotFound(i64),

    #[error("unexpected status code {code}: {body}")]
    Status { code: u16, body: String },

    /// 服务端返回 `success=false`
    #[error("server returned success=false")]
    Rejected,

    /// 连接、超时等传输层错误
    #[error("request failed: {0}")]
    Transport(String),

    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// 轮询器使用的三个远程操作
pub trait RemoteApi: Send + Sync {
    /// 上报当前跟踪的支付 ID（可能为空字符串）
    fn report_status(&self, payment_id: &str) -> Result<(), ApiError>;

    /// 获取下一条待执行命令（最多一条）
    fn fetch_command(&self) -> Result<Option<Command>, ApiError>;

    /// 确认命令执行结果
    fn acknowledge(&self, command_id: i64, ack: &AckResult) -> Result<(), ApiError>;
}
