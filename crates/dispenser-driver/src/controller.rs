//! 执行器控制器
//!
//! 开环（按时长推算位置）的线性执行器控制。所有运动都按
//! “驱动 → 等待 → 停止 → 静止延迟” 的顺序执行，每次换向之前必须经过
//! [`ActuatorPhase::Settling`]，消除电机惯性。
//!
//! # 并发约定
//!
//! 控制器内部不加锁，所有运动原语都需要 `&mut self`。跨线程使用时必须
//! 通过 [`SharedActuator`](crate::SharedActuator) 持有共享执行器锁后再调用。

use crate::clock::Clock;
use crate::config::ActuatorConfig;
use crate::error::DriverError;
use crate::outputs::{ActuatorOutputs, Direction, OutputLines};
use crate::state::{ActuatorPhase, AtomicPhase};
use dispenser_gpio::GpioBackend;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 一次完整循环的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// 循环总时长
    ///
    /// 真实硬件为实测时长；仿真模式为按配置计算的标称时长。
    pub total: Duration,
    pub simulated: bool,
}

impl CycleReport {
    pub fn total_time_ms(&self) -> u64 {
        self.total.as_millis() as u64
    }
}

/// 执行器控制器
#[derive(Debug)]
pub struct ActuatorController {
    config: ActuatorConfig,
    clock: Arc<dyn Clock>,
    outputs: ActuatorOutputs,
    /// 当前阶段（与 `SharedActuator` 共享，用于不加锁的状态读取）
    phase: Arc<AtomicPhase>,
    initialized: bool,
}

impl ActuatorController {
    /// 创建控制器（尚未申请输出线）
    ///
    /// 零值的运动时长和停顿会被替换为默认值，然后检查配置。
    pub fn new(config: ActuatorConfig, clock: Arc<dyn Clock>) -> Result<Self, DriverError> {
        let config = config.normalized();
        config.validate()?;

        Ok(Self {
            config,
            clock,
            outputs: ActuatorOutputs::Simulated,
            phase: Arc::new(AtomicPhase::new(ActuatorPhase::Unknown)),
            initialized: false,
        })
    }

    /// 申请输出线并拉高使能线
    ///
    /// 配置禁用、任一条线申请失败、或使能线写入失败时，降级为仿真模式，
    /// 不返回错误。重复调用会先清理之前的输出线。
    pub fn init(&mut self, backend: &dyn GpioBackend) {
        if self.initialized {
            self.cleanup();
        }

        self.outputs = if !self.config.enabled {
            info!("Actuator: hardware disabled by config, running in simulation mode");
            ActuatorOutputs::Simulated
        } else {
            match OutputLines::acquire(&self.config.pins, backend) {
                Ok(lines) => {
                    let mut outputs = ActuatorOutputs::Real(lines);
                    match outputs.set_enabled(true) {
                        Ok(()) => {
                            info!(
                                "Actuator: initialized (enable={}, direction-A={}, direction-B={})",
                                self.config.pins.enable,
                                self.config.pins.direction_a,
                                self.config.pins.direction_b
                            );
                            outputs
                        },
                        Err(e) => {
                            warn!("Actuator: failed to drive enable line ({}), falling back to simulation", e);
                            outputs.release();
                            ActuatorOutputs::Simulated
                        },
                    }
                },
                Err(e) => {
                    warn!("Actuator: GPIO unavailable ({}), falling back to simulation", e);
                    ActuatorOutputs::Simulated
                },
            }
        };

        self.phase.store(ActuatorPhase::Unknown);
        self.initialized = true;
    }

    pub fn config(&self) -> &ActuatorConfig {
        &self.config
    }

    pub fn phase(&self) -> ActuatorPhase {
        self.phase.load()
    }

    /// 阶段的共享句柄
    pub fn phase_handle(&self) -> Arc<AtomicPhase> {
        Arc::clone(&self.phase)
    }

    /// 是否位于已确认的原点（完全缩回）
    pub fn is_home(&self) -> bool {
        self.phase() == ActuatorPhase::Home
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_simulated(&self) -> bool {
        self.outputs.is_simulated()
    }

    /// 归零
    ///
    /// 以 `homing_duration` 持续缩回（超过任意位置的最长行程），停止并静止后
    /// 标记为原点。无论之前处于什么位置，成功返回后 `is_home()` 为 true。
    pub fn home(&mut self) -> Result<(), DriverError> {
        self.ensure_initialized()?;
        info!("Actuator: homing for {:?}", self.config.homing_duration);

        self.run(
            ActuatorPhase::Homing,
            Direction::Retract,
            self.config.homing_duration,
        )?;
        self.enter(ActuatorPhase::Home)?;

        info!("Actuator: homed");
        Ok(())
    }

    /// 执行一次完整循环
    ///
    /// 伸出 → 静止 → 停顿 → 缩回（同一时长）→ 静止 → 冷却（可选）。
    /// 冷却期间仍处于 `Settling`，冷却结束后才标记为原点。
    pub fn trigger(&mut self) -> Result<CycleReport, DriverError> {
        self.ensure_initialized()?;
        if !self.is_home() {
            warn!(
                "Actuator: trigger requested while not at home position (phase: {})",
                self.phase()
            );
        }

        let movement = self.config.movement_time;
        let start = self.clock.now();
        info!(
            "Actuator: starting cycle (movement {:?}, pause {:?})",
            movement, self.config.pause_time
        );

        self.run(ActuatorPhase::Extending, Direction::Extend, movement)?;

        self.enter(ActuatorPhase::Paused)?;
        debug!("Actuator: pausing for {:?}", self.config.pause_time);
        self.clock.sleep(self.config.pause_time);

        self.run(ActuatorPhase::Retracting, Direction::Retract, movement)?;

        if !self.config.cooldown.is_zero() {
            debug!("Actuator: cooling down for {:?}", self.config.cooldown);
            self.clock.sleep(self.config.cooldown);
        }
        self.enter(ActuatorPhase::Home)?;

        let simulated = self.is_simulated();
        let total = if simulated {
            self.config.cycle_duration()
        } else {
            self.clock.now().saturating_duration_since(start)
        };

        info!(
            "Actuator: cycle complete in {}ms{}",
            total.as_millis(),
            if simulated { " (simulated)" } else { "" }
        );
        Ok(CycleReport { total, simulated })
    }

    /// 单向伸出指定时长
    ///
    /// 结束后位置未知（不再位于原点）。
    pub fn extend(&mut self, duration: Duration) -> Result<(), DriverError> {
        self.ensure_initialized()?;
        info!("Actuator: extending for exactly {:?}", duration);

        self.run(ActuatorPhase::Extending, Direction::Extend, duration)?;
        self.enter(ActuatorPhase::Unknown)
    }

    /// 单向缩回指定时长
    ///
    /// 结束后恢复缩回之前的静止阶段：原点仍为原点，未知仍为未知。
    /// 即使时长足以到达完全缩回位置，也不会把未知提升为原点，
    /// 只有归零和完整循环会确认原点。
    pub fn retract(&mut self, duration: Duration) -> Result<(), DriverError> {
        self.ensure_initialized()?;
        info!("Actuator: retracting for exactly {:?}", duration);

        let resting = self.phase();
        self.run(ActuatorPhase::Retracting, Direction::Retract, duration)?;
        self.enter(resting)
    }

    /// 两条方向线置低并等待静止延迟
    ///
    /// 可以重复调用，不改变阶段。
    pub fn stop_motor(&mut self) -> Result<(), DriverError> {
        self.ensure_initialized()?;
        self.guarded(ActuatorOutputs::halt)?;
        self.clock.sleep(self.config.settling_delay);
        Ok(())
    }

    /// 停止电机并等待静止，然后拉低使能线并释放所有输出线
    ///
    /// 未初始化（或已清理）时为空操作。
    pub fn cleanup(&mut self) {
        if !self.initialized {
            return;
        }

        if let Err(e) = self.stop_motor() {
            warn!("Actuator: failed to stop motor during cleanup: {}", e);
        }
        if let Err(e) = self.outputs.set_enabled(false) {
            warn!("Actuator: failed to clear enable line during cleanup: {}", e);
        }
        self.outputs.release();

        self.phase.store(ActuatorPhase::Unknown);
        self.initialized = false;
        info!("Actuator: cleaned up");
    }

    fn ensure_initialized(&self) -> Result<(), DriverError> {
        if self.initialized {
            Ok(())
        } else {
            Err(DriverError::NotInitialized)
        }
    }

    fn enter(&mut self, next: ActuatorPhase) -> Result<(), DriverError> {
        let from = self.phase.load();
        if !from.can_transition_to(next) {
            return Err(DriverError::InvalidTransition { from, to: next });
        }
        self.phase.store(next);
        Ok(())
    }

    /// 驱动一个方向指定时长，然后停止并等待静止
    ///
    /// 返回时处于 `Settling`。
    fn run(
        &mut self,
        moving: ActuatorPhase,
        direction: Direction,
        duration: Duration,
    ) -> Result<(), DriverError> {
        self.enter(moving)?;
        self.guarded(|outputs| outputs.drive(direction))?;
        self.clock.sleep(duration);

        self.guarded(ActuatorOutputs::halt)?;
        self.enter(ActuatorPhase::Settling)?;
        self.clock.sleep(self.config.settling_delay);
        Ok(())
    }

    /// 执行一次输出写入，失败时中止当前运动
    fn guarded<F>(&mut self, write: F) -> Result<(), DriverError>
    where
        F: FnOnce(&mut ActuatorOutputs) -> Result<(), DriverError>,
    {
        write(&mut self.outputs).inspect_err(|e| self.abort(e))
    }

    /// 写入失败：尽力停止电机，位置变为未知
    fn abort(&mut self, cause: &DriverError) {
        warn!(
            "Actuator: aborting {} after write failure: {}",
            self.phase.load(),
            cause
        );
        if let Err(e) = self.outputs.halt() {
            warn!("Actuator: best-effort stop also failed: {}", e);
        }
        self.phase.store(ActuatorPhase::Unknown);
    }
}

impl Drop for ActuatorController {
    fn drop(&mut self) {
        self.cleanup();
    }
}
