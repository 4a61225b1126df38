//! 驱动层错误类型定义

use crate::outputs::LineRole;
use crate::state::ActuatorPhase;
use dispenser_gpio::GpioError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 输出线写入失败（当前运动步骤已中止）
    #[error("Failed to write {role} line: {source}")]
    HardwareWrite {
        role: LineRole,
        #[source]
        source: GpioError,
    },

    /// 控制器未初始化或已清理
    #[error("Actuator not initialized")]
    NotInitialized,

    /// 非法状态转换
    #[error("Invalid actuator phase transition: {from} -> {to}")]
    InvalidTransition {
        from: ActuatorPhase,
        to: ActuatorPhase,
    },

    /// 配置无效
    #[error("Invalid actuator config: {0}")]
    InvalidConfig(String),
}

impl DriverError {
    /// 是否为硬件写入错误
    pub fn is_hardware_write(&self) -> bool {
        matches!(self, DriverError::HardwareWrite { .. })
    }
}
