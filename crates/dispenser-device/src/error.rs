//! 设备层错误类型定义

use dispenser_driver::DriverError;
use thiserror::Error;

/// 命令执行错误
#[derive(Error, Debug)]
pub enum DeviceError {
    /// 执行器运动失败
    #[error(transparent)]
    Actuator(#[from] DriverError),

    /// 无法识别的命令（本地校验失败）
    #[error("unknown command: {0}")]
    UnknownCommand(String),
}
