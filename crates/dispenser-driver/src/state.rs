//! 执行器运动阶段
//!
//! 执行器没有位置传感器，控制器只能根据自己发出的动作推断位置。
//! [`ActuatorPhase`] 描述当前推断的阶段，[`AtomicPhase`] 用于在不获取
//! 执行器锁的情况下读取阶段（状态查询不会被正在进行的循环阻塞）。

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// 执行器运动阶段
///
/// # 合法转换
///
/// | 从 | 到 |
/// |----|----|
/// | Unknown / Home | Homing, Extending, Retracting |
/// | Homing / Extending / Retracting | Settling |
/// | Settling | Paused, Home, Unknown |
/// | Paused | Retracting |
///
/// 写入失败时强制回到 `Unknown`，不受上表约束。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[repr(u8)]
pub enum ActuatorPhase {
    /// 位置未知（启动时或伸出后）
    #[default]
    Unknown = 0,
    /// 正在归零（长时间缩回）
    Homing = 1,
    /// 已确认完全缩回
    Home = 2,
    Extending = 3,
    /// 已停止，等待电机静止
    Settling = 4,
    /// 伸出与缩回之间的停顿
    Paused = 5,
    Retracting = 6,
}

impl ActuatorPhase {
    /// 从 u8 转换
    ///
    /// 无效值返回 `Unknown`。
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Homing,
            2 => Self::Home,
            3 => Self::Extending,
            4 => Self::Settling,
            5 => Self::Paused,
            6 => Self::Retracting,
            _ => Self::Unknown,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// 电机是否正在驱动
    pub fn is_moving(self) -> bool {
        matches!(self, Self::Homing | Self::Extending | Self::Retracting)
    }

    /// 检查状态转换是否合法
    pub fn can_transition_to(self, next: ActuatorPhase) -> bool {
        use ActuatorPhase::*;
        match self {
            Unknown | Home => matches!(next, Homing | Extending | Retracting),
            Homing | Extending | Retracting => next == Settling,
            Settling => matches!(next, Paused | Home | Unknown),
            Paused => next == Retracting,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Homing => "homing",
            Self::Home => "home",
            Self::Extending => "extending",
            Self::Settling => "settling",
            Self::Paused => "paused",
            Self::Retracting => "retracting",
        }
    }
}

impl fmt::Display for ActuatorPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 运动阶段（原子版本，用于线程间共享）
#[derive(Debug)]
pub struct AtomicPhase {
    inner: AtomicU8,
}

impl AtomicPhase {
    pub fn new(phase: ActuatorPhase) -> Self {
        Self {
            inner: AtomicU8::new(phase.as_u8()),
        }
    }

    pub fn load(&self) -> ActuatorPhase {
        ActuatorPhase::from_u8(self.inner.load(Ordering::Acquire))
    }

    pub fn store(&self, phase: ActuatorPhase) {
        self.inner.store(phase.as_u8(), Ordering::Release);
    }
}

impl Default for AtomicPhase {
    fn default() -> Self {
        Self::new(ActuatorPhase::Unknown)
    }
}
