//! 时钟抽象
//!
//! 所有运动时序（运动、停顿、静止、冷却）都通过 [`Clock`] 等待。
//! 生产环境使用 [`SystemClock`]（真实等待），测试使用 [`VirtualClock`]
//! （立即推进虚拟时间），对外可观察的时序行为不变。

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 时钟接口
pub trait Clock: Send + Sync + fmt::Debug {
    /// 当前时刻
    fn now(&self) -> Instant;

    /// 阻塞等待指定时长
    fn sleep(&self, duration: Duration);
}

/// 系统时钟
///
/// 使用 `spin_sleep` 而非 `thread::sleep`，运动时长的抖动在微秒级
/// （相比 `thread::sleep` 的 1-2ms），保证伸出与缩回的实际时长一致。
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        spin_sleep::sleep(duration);
    }
}

#[derive(Debug, Default)]
struct VirtualTime {
    elapsed: Duration,
    sleeps: Vec<Duration>,
}

/// 虚拟时钟（测试用）
///
/// `sleep()` 不阻塞，只把虚拟时间向前推进；克隆体共享同一时间线。
#[derive(Debug, Clone)]
pub struct VirtualClock {
    origin: Instant,
    time: Arc<Mutex<VirtualTime>>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            time: Arc::new(Mutex::new(VirtualTime::default())),
        }
    }

    /// 自创建以来推进的虚拟时间
    pub fn elapsed(&self) -> Duration {
        self.time.lock().elapsed
    }

    /// 手动推进虚拟时间（不记入 sleep 日志）
    pub fn advance(&self, duration: Duration) {
        self.time.lock().elapsed += duration;
    }

    /// 所有 `sleep()` 调用的时长（按调用顺序）
    pub fn sleeps(&self) -> Vec<Duration> {
        self.time.lock().sleeps.clone()
    }

    pub fn clear_sleeps(&self) {
        self.time.lock().sleeps.clear();
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> Instant {
        self.origin + self.time.lock().elapsed
    }

    fn sleep(&self, duration: Duration) {
        let mut time = self.time.lock();
        time.elapsed += duration;
        time.sleeps.push(duration);
    }
}
