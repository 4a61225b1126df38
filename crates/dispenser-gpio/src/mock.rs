//! Mock GPIO 后端
//!
//! 用于测试的模拟输出线。所有申请、写入、释放都记录到共享事件日志中，
//! 可以注入“缺失的线”（申请失败）和“故障的线”（写入失败）。

use crate::{GpioBackend, GpioError, GpioErrorKind, OutputLine, PinLevel};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// 模拟事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEvent {
    Acquire { line: String },
    Write { line: String, level: PinLevel },
    Release { line: String },
}

impl MockEvent {
    pub fn line(&self) -> &str {
        match self {
            MockEvent::Acquire { line } | MockEvent::Write { line, .. } | MockEvent::Release { line } => {
                line
            },
        }
    }
}

#[derive(Debug, Default)]
struct MockBus {
    events: Vec<MockEvent>,
    levels: HashMap<String, PinLevel>,
    missing: HashSet<String>,
    failing: HashSet<String>,
}

/// 模拟后端（可克隆，克隆体共享同一事件日志）
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    bus: Arc<Mutex<MockBus>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// 让指定名称的线不可申请
    pub fn with_missing(self, name: &str) -> Self {
        self.bus.lock().missing.insert(name.to_string());
        self
    }

    /// 让指定名称的线写入失败（申请仍然成功）
    pub fn fail_writes(&self, name: &str) {
        self.bus.lock().failing.insert(name.to_string());
    }

    /// 恢复指定名称的线的写入
    pub fn restore_writes(&self, name: &str) {
        self.bus.lock().failing.remove(name);
    }

    /// 事件日志快照
    pub fn events(&self) -> Vec<MockEvent> {
        self.bus.lock().events.clone()
    }

    /// 硬件调用总数（申请 + 写入 + 释放）
    pub fn hardware_calls(&self) -> usize {
        self.bus.lock().events.len()
    }

    /// 写入日志（按时间顺序）
    pub fn writes(&self) -> Vec<(String, PinLevel)> {
        self.bus
            .lock()
            .events
            .iter()
            .filter_map(|event| match event {
                MockEvent::Write { line, level } => Some((line.clone(), *level)),
                _ => None,
            })
            .collect()
    }

    /// 指定线最后一次写入的电平
    pub fn level(&self, name: &str) -> Option<PinLevel> {
        self.bus.lock().levels.get(name).copied()
    }

    /// 指定线是否已被释放
    pub fn is_released(&self, name: &str) -> bool {
        self.bus
            .lock()
            .events
            .iter()
            .any(|event| matches!(event, MockEvent::Release { line } if line == name))
    }

    pub fn clear_events(&self) {
        self.bus.lock().events.clear();
    }
}

impl GpioBackend for MockBackend {
    fn acquire_output(&self, name: &str) -> Result<Box<dyn OutputLine>, GpioError> {
        let mut bus = self.bus.lock();
        if bus.missing.contains(name) {
            return Err(GpioError::new(
                GpioErrorKind::NotFound,
                name,
                "mock line configured as missing",
            ));
        }
        bus.events.push(MockEvent::Acquire {
            line: name.to_string(),
        });
        bus.levels.insert(name.to_string(), PinLevel::Low);

        Ok(Box::new(MockLine {
            name: name.to_string(),
            bus: self.bus.clone(),
            released: false,
        }))
    }
}

/// 模拟输出线
#[derive(Debug)]
pub struct MockLine {
    name: String,
    bus: Arc<Mutex<MockBus>>,
    released: bool,
}

impl OutputLine for MockLine {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_level(&mut self, level: PinLevel) -> Result<(), GpioError> {
        if self.released {
            return Err(GpioError::new(
                GpioErrorKind::Released,
                &self.name,
                "line already released",
            ));
        }
        let mut bus = self.bus.lock();
        if bus.failing.contains(&self.name) {
            return Err(GpioError::new(
                GpioErrorKind::Io,
                &self.name,
                "injected write failure",
            ));
        }
        bus.events.push(MockEvent::Write {
            line: self.name.clone(),
            level,
        });
        bus.levels.insert(self.name.clone(), level);
        Ok(())
    }

    fn release(&mut self) -> Result<(), GpioError> {
        if !self.released {
            self.released = true;
            self.bus.lock().events.push(MockEvent::Release {
                line: self.name.clone(),
            });
        }
        Ok(())
    }
}
