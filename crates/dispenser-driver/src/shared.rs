//! 共享执行器锁
//!
//! 整个进程只有一个 [`SharedActuator`]，轮询器的命令分发和本地触发请求
//! 都通过它获取执行器，保证任意时刻最多只有一个物理运动在进行。
//!
//! 获取锁会无限期阻塞（没有超时，也没有 try-lock）：长时间的运动只会
//! 推迟下一次分发，而阶段查询通过 [`AtomicPhase`] 读取，从不等待该锁。

use crate::controller::{ActuatorController, CycleReport};
use crate::error::DriverError;
use crate::state::{ActuatorPhase, AtomicPhase};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use std::thread::{JoinHandle, spawn};
use tracing::{error, info};

/// 共享执行器（可克隆，克隆体共享同一把锁）
#[derive(Debug, Clone)]
pub struct SharedActuator {
    inner: Arc<Mutex<ActuatorController>>,
    phase: Arc<AtomicPhase>,
}

impl SharedActuator {
    pub fn new(controller: ActuatorController) -> Self {
        let phase = controller.phase_handle();
        Self {
            inner: Arc::new(Mutex::new(controller)),
            phase,
        }
    }

    /// 获取执行器锁（阻塞直到可用）
    pub fn lock(&self) -> MutexGuard<'_, ActuatorController> {
        self.inner.lock()
    }

    /// 当前阶段（不加锁）
    pub fn phase(&self) -> ActuatorPhase {
        self.phase.load()
    }

    pub fn is_home(&self) -> bool {
        self.phase() == ActuatorPhase::Home
    }

    /// 持有锁执行一次完整循环
    pub fn trigger(&self) -> Result<CycleReport, DriverError> {
        self.lock().trigger()
    }

    /// 在后台线程中归零
    ///
    /// 启动后调用一次，不阻塞请求处理；归零期间其他运动在锁上排队。
    pub fn spawn_homing(&self) -> JoinHandle<Result<(), DriverError>> {
        let actuator = self.clone();
        spawn(move || {
            let result = actuator.lock().home();
            if let Err(e) = &result {
                error!("Actuator: startup homing failed: {}", e);
            }
            result
        })
    }

    /// 停止电机并释放输出线（等待正在进行的运动结束）
    pub fn shutdown(&self) {
        info!("Actuator: shutting down");
        self.lock().cleanup();
    }
}
