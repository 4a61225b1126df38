//! # Dispenser GPIO Layer
//!
//! 数字输出线抽象层，按符号名称（如 `"GPIO25"`）申请输出线，提供统一的
//! 置高 / 置低 / 释放接口。
//!
//! - Linux: [`CdevBackend`]，基于 GPIO 字符设备（`/dev/gpiochipN`）
//! - 其他平台: [`UnavailableBackend`]，所有申请均失败（上层据此降级为仿真模式）
//! - `mock` feature: [`mock::MockBackend`]，记录所有写入，用于测试

use thiserror::Error;

#[cfg(target_os = "linux")]
pub mod cdev;

#[cfg(target_os = "linux")]
pub use cdev::CdevBackend;

#[cfg(feature = "mock")]
pub mod mock;

/// 输出电平
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinLevel {
    /// 低电平（非激活）
    Low,
    /// 高电平（激活）
    High,
}

impl PinLevel {
    pub fn is_high(self) -> bool {
        self == Self::High
    }
}

/// 设备/后端错误的结构化分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioErrorKind {
    /// 找不到该名称的输出线
    NotFound,
    /// 输出线已被其他进程占用
    Busy,
    /// 权限不足（通常需要加入 gpio 组）
    AccessDenied,
    /// 当前平台不支持 GPIO
    Unsupported,
    /// 输出线已释放，不能再写入
    Released,
    /// 底层 IO 错误
    Io,
    Unknown,
}

/// GPIO 统一错误类型
#[derive(Error, Debug, Clone)]
#[error("{kind:?} on line '{line}': {message}")]
pub struct GpioError {
    pub kind: GpioErrorKind,
    pub line: String,
    pub message: String,
}

impl GpioError {
    pub fn new(kind: GpioErrorKind, line: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            line: line.into(),
            message: message.into(),
        }
    }
}

/// 单条数字输出线
///
/// 实现者在 `Drop` 时应释放底层资源；`release()` 必须可重复调用。
pub trait OutputLine: Send {
    /// 符号名称（申请时使用的名称）
    fn name(&self) -> &str;

    fn set_level(&mut self, level: PinLevel) -> Result<(), GpioError>;

    fn set_high(&mut self) -> Result<(), GpioError> {
        self.set_level(PinLevel::High)
    }

    fn set_low(&mut self) -> Result<(), GpioError> {
        self.set_level(PinLevel::Low)
    }

    /// 释放输出线，之后的写入返回 [`GpioErrorKind::Released`]
    fn release(&mut self) -> Result<(), GpioError>;
}

/// 输出线提供者
pub trait GpioBackend: Send + Sync {
    /// 按符号名称申请一条输出线，初始电平为低
    fn acquire_output(&self, name: &str) -> Result<Box<dyn OutputLine>, GpioError>;
}

/// 不支持 GPIO 的平台上使用的后端
///
/// 所有申请都返回 [`GpioErrorKind::Unsupported`]。
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableBackend;

impl GpioBackend for UnavailableBackend {
    fn acquire_output(&self, name: &str) -> Result<Box<dyn OutputLine>, GpioError> {
        Err(GpioError::new(
            GpioErrorKind::Unsupported,
            name,
            "GPIO character devices are not available on this platform",
        ))
    }
}

/// 当前平台的默认后端
pub fn system_backend() -> Box<dyn GpioBackend> {
    #[cfg(target_os = "linux")]
    {
        Box::new(CdevBackend::new())
    }

    #[cfg(not(target_os = "linux"))]
    {
        Box::new(UnavailableBackend)
    }
}
