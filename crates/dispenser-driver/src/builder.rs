//! Builder 模式实现
//!
//! 提供链式构造 `ActuatorController` 实例的便捷方式。

use crate::clock::{Clock, SystemClock};
use crate::config::ActuatorConfig;
use crate::controller::ActuatorController;
use crate::error::DriverError;
use dispenser_gpio::{GpioBackend, UnavailableBackend};
use std::sync::Arc;

/// 执行器 Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// use dispenser_driver::{ActuatorBuilder, ActuatorConfig};
///
/// let config = ActuatorConfig {
///     enabled: true,
///     ..Default::default()
/// };
/// let backend = dispenser_gpio::system_backend();
/// let controller = ActuatorBuilder::new(config)
///     .build(backend.as_ref())
///     .unwrap();
/// ```
pub struct ActuatorBuilder {
    config: ActuatorConfig,
    /// 默认使用 [`SystemClock`]
    clock: Option<Arc<dyn Clock>>,
}

impl ActuatorBuilder {
    pub fn new(config: ActuatorConfig) -> Self {
        Self {
            config,
            clock: None,
        }
    }

    /// 指定时钟（测试中使用 `VirtualClock`）
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// 构建并初始化控制器
    ///
    /// 只有配置无效时返回错误；硬件不可用时得到仿真模式的控制器。
    pub fn build(self, backend: &dyn GpioBackend) -> Result<ActuatorController, DriverError> {
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let mut controller = ActuatorController::new(self.config, clock)?;
        controller.init(backend);
        Ok(controller)
    }

    /// 构建仿真模式的控制器（忽略 `enabled`）
    pub fn build_simulated(mut self) -> Result<ActuatorController, DriverError> {
        self.config.enabled = false;
        self.build(&UnavailableBackend)
    }
}
