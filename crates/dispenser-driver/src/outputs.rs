//! 执行器输出线
//!
//! [`ActuatorOutputs`] 在初始化时确定一次：要么持有真实的三条输出线，
//! 要么是仿真标记。两者通过同一组方法调用，仿真变体的所有写入都是空操作，
//! 时序由控制器统一负责，因此两条路径对外的时序行为一致。

use crate::config::PinConfig;
use crate::error::DriverError;
use dispenser_gpio::{GpioBackend, GpioError, OutputLine, PinLevel};
use std::fmt;
use tracing::{debug, warn};

/// 运动方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// 伸出：IN1 高，IN2 低
    Extend,
    /// 缩回：IN1 低，IN2 高
    Retract,
}

impl Direction {
    /// (direction-A, direction-B) 电平
    fn levels(self) -> (PinLevel, PinLevel) {
        match self {
            Direction::Extend => (PinLevel::High, PinLevel::Low),
            Direction::Retract => (PinLevel::Low, PinLevel::High),
        }
    }
}

/// 输出线角色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRole {
    Enable,
    DirectionA,
    DirectionB,
}

impl fmt::Display for LineRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineRole::Enable => f.write_str("enable"),
            LineRole::DirectionA => f.write_str("direction-A"),
            LineRole::DirectionB => f.write_str("direction-B"),
        }
    }
}

/// 已申请的三条输出线
pub struct OutputLines {
    enable: Box<dyn OutputLine>,
    direction_a: Box<dyn OutputLine>,
    direction_b: Box<dyn OutputLine>,
}

impl OutputLines {
    /// 按配置申请三条输出线
    ///
    /// 任一条申请失败时，已经申请到的线会被释放后再返回错误。
    pub fn acquire(pins: &PinConfig, backend: &dyn GpioBackend) -> Result<Self, GpioError> {
        let mut enable = backend.acquire_output(&pins.enable)?;

        let mut direction_a = match backend.acquire_output(&pins.direction_a) {
            Ok(line) => line,
            Err(e) => {
                let _ = enable.release();
                return Err(e);
            },
        };

        let direction_b = match backend.acquire_output(&pins.direction_b) {
            Ok(line) => line,
            Err(e) => {
                let _ = direction_a.release();
                let _ = enable.release();
                return Err(e);
            },
        };

        Ok(Self {
            enable,
            direction_a,
            direction_b,
        })
    }

    fn write(&mut self, role: LineRole, level: PinLevel) -> Result<(), DriverError> {
        let line = match role {
            LineRole::Enable => &mut self.enable,
            LineRole::DirectionA => &mut self.direction_a,
            LineRole::DirectionB => &mut self.direction_b,
        };
        line.set_level(level)
            .map_err(|source| DriverError::HardwareWrite { role, source })
    }
}

impl fmt::Debug for OutputLines {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputLines")
            .field("enable", &self.enable.name())
            .field("direction_a", &self.direction_a.name())
            .field("direction_b", &self.direction_b.name())
            .finish()
    }
}

/// 执行器输出（真实或仿真）
pub enum ActuatorOutputs {
    Real(OutputLines),
    /// 仿真模式：所有写入都是空操作
    Simulated,
}

impl ActuatorOutputs {
    pub fn is_simulated(&self) -> bool {
        matches!(self, ActuatorOutputs::Simulated)
    }

    /// 设置使能线电平
    pub fn set_enabled(&mut self, enabled: bool) -> Result<(), DriverError> {
        match self {
            ActuatorOutputs::Real(lines) => {
                let level = if enabled { PinLevel::High } else { PinLevel::Low };
                lines.write(LineRole::Enable, level)
            },
            ActuatorOutputs::Simulated => Ok(()),
        }
    }

    /// 按方向驱动两条方向线（先写 direction-A，再写 direction-B）
    pub fn drive(&mut self, direction: Direction) -> Result<(), DriverError> {
        match self {
            ActuatorOutputs::Real(lines) => {
                let (a, b) = direction.levels();
                lines.write(LineRole::DirectionA, a)?;
                lines.write(LineRole::DirectionB, b)
            },
            ActuatorOutputs::Simulated => Ok(()),
        }
    }

    /// 两条方向线都置低（电机停止）
    ///
    /// 即使第一条写入失败也会尝试第二条，返回第一个错误。
    pub fn halt(&mut self) -> Result<(), DriverError> {
        match self {
            ActuatorOutputs::Real(lines) => {
                let first = lines.write(LineRole::DirectionA, PinLevel::Low);
                let second = lines.write(LineRole::DirectionB, PinLevel::Low);
                first.and(second)
            },
            ActuatorOutputs::Simulated => Ok(()),
        }
    }

    /// 释放所有输出线，之后变为仿真变体
    pub fn release(&mut self) {
        if let ActuatorOutputs::Real(mut lines) = std::mem::replace(self, ActuatorOutputs::Simulated)
        {
            for line in [&mut lines.direction_a, &mut lines.direction_b, &mut lines.enable] {
                match line.release() {
                    Ok(()) => debug!("Released output line {}", line.name()),
                    Err(e) => warn!("Failed to release output line {}: {}", line.name(), e),
                }
            }
        }
    }
}

impl fmt::Debug for ActuatorOutputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActuatorOutputs::Real(lines) => f.debug_tuple("Real").field(lines).finish(),
            ActuatorOutputs::Simulated => f.write_str("Simulated"),
        }
    }
}
