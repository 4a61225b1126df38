//! 执行器配置
//!
//! 伸出与缩回始终使用同一个 `movement_time`，不存在单独的伸出/缩回时长配置，
//! 从而保证两个方向的行程相等。

use crate::error::DriverError;
use std::time::Duration;

/// 默认运动时长（伸出 = 缩回）
pub const DEFAULT_MOVEMENT_TIME: Duration = Duration::from_secs(2);

/// 默认伸出与缩回之间的停顿
pub const DEFAULT_PAUSE_TIME: Duration = Duration::from_secs(2);

/// 停止后等待电机完全静止的时间（消除惯性，之后才能反向）
pub const DEFAULT_SETTLING_DELAY: Duration = Duration::from_millis(100);

/// 归零时长：必须超过任意位置到完全缩回的最长行程时间
pub const DEFAULT_HOMING_DURATION: Duration = Duration::from_secs(10);

/// 输出线符号名称
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PinConfig {
    /// 使能线（H 桥 ENA）
    pub enable: String,
    /// 方向 A（IN1，置高 = 伸出）
    pub direction_a: String,
    /// 方向 B（IN2，置高 = 缩回）
    pub direction_b: String,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            enable: "GPIO25".to_string(),
            direction_a: "GPIO8".to_string(),
            direction_b: "GPIO7".to_string(),
        }
    }
}

/// 执行器配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActuatorConfig {
    /// 是否驱动真实硬件（false 时直接进入仿真模式）
    pub enabled: bool,
    pub pins: PinConfig,
    /// 伸出和缩回的运动时长
    pub movement_time: Duration,
    /// 伸出与缩回之间的停顿
    pub pause_time: Duration,
    pub settling_delay: Duration,
    pub homing_duration: Duration,
    /// 完整循环结束后的冷却时间（零表示不冷却）
    pub cooldown: Duration,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            pins: PinConfig::default(),
            movement_time: DEFAULT_MOVEMENT_TIME,
            pause_time: DEFAULT_PAUSE_TIME,
            settling_delay: DEFAULT_SETTLING_DELAY,
            homing_duration: DEFAULT_HOMING_DURATION,
            cooldown: Duration::ZERO,
        }
    }
}

impl ActuatorConfig {
    /// 零值的运动时长和停顿替换为默认值
    pub fn normalized(mut self) -> Self {
        if self.movement_time.is_zero() {
            self.movement_time = DEFAULT_MOVEMENT_TIME;
        }
        if self.pause_time.is_zero() {
            self.pause_time = DEFAULT_PAUSE_TIME;
        }
        self
    }

    /// 检查配置
    ///
    /// 归零时长必须严格大于运动时长，否则开环归零无法保证到达完全缩回位置。
    pub fn validate(&self) -> Result<(), DriverError> {
        if self.movement_time.is_zero() {
            return Err(DriverError::InvalidConfig(
                "movement_time must be greater than zero".to_string(),
            ));
        }
        if self.homing_duration <= self.movement_time {
            return Err(DriverError::InvalidConfig(format!(
                "homing_duration ({:?}) must exceed movement_time ({:?})",
                self.homing_duration, self.movement_time
            )));
        }
        if self.checked_cycle_duration().is_none() {
            return Err(DriverError::InvalidConfig(
                "cycle duration overflows".to_string(),
            ));
        }
        if self.enabled {
            let pins = [
                ("enable", &self.pins.enable),
                ("direction_a", &self.pins.direction_a),
                ("direction_b", &self.pins.direction_b),
            ];
            for (role, name) in pins {
                if name.trim().is_empty() {
                    return Err(DriverError::InvalidConfig(format!(
                        "{} pin name must not be empty",
                        role
                    )));
                }
            }
        }
        Ok(())
    }

    /// 一次完整循环的标称时长
    ///
    /// `2 * movement + pause + 2 * settling + cooldown`，仿真模式直接报告该值。
    ///
    /// 溢出时饱和到 `Duration::MAX`（`validate()` 会拒绝这类配置）。
    pub fn cycle_duration(&self) -> Duration {
        self.checked_cycle_duration().unwrap_or(Duration::MAX)
    }

    fn checked_cycle_duration(&self) -> Option<Duration> {
        self.movement_time
            .checked_mul(2)?
            .checked_add(self.pause_time)?
            .checked_add(self.settling_delay.checked_mul(2)?)?
            .checked_add(self.cooldown)
    }
}
