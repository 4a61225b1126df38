//! # Dispenser Driver
//!
//! 线性执行器驱动层：
//! - 开环定时运动（伸出 / 缩回 / 归零 / 完整循环），每次换向前静止延迟
//! - 运动阶段状态机（[`ActuatorPhase`]），原子镜像用于不加锁的状态读取
//! - 真实 / 仿真两种输出（[`ActuatorOutputs`]），时序行为一致
//! - 可注入的时钟（[`Clock`]），测试中使用虚拟时间
//! - 进程级共享执行器锁（[`SharedActuator`]）

mod builder;
pub mod clock;
pub mod config;
mod controller;
mod error;
pub mod outputs;
mod shared;
pub mod state;

pub use builder::ActuatorBuilder;
pub use clock::{Clock, SystemClock, VirtualClock};
pub use config::{ActuatorConfig, PinConfig};
pub use controller::{ActuatorController, CycleReport};
pub use error::DriverError;
pub use outputs::{ActuatorOutputs, Direction, LineRole};
pub use shared::SharedActuator;
pub use state::{ActuatorPhase, AtomicPhase};
