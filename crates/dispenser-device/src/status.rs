//! 设备状态
//!
//! 支付 ID、正在执行的命令和最近一次错误各自使用独立的细粒度锁，
//! 与执行器锁无关，因此状态读取不会被正在进行的物理运动阻塞。

use crate::command::Command;
use parking_lot::Mutex;
use serde::Serialize;

/// 设备状态（轮询器与本地界面共享）
#[derive(Debug, Default)]
pub struct DeviceStatus {
    payment_id: Mutex<String>,
    executing: Mutex<Option<Command>>,
    last_error: Mutex<Option<String>>,
}

/// 状态快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub payment_id: String,
    pub executing_command: Option<Command>,
    pub last_error: Option<String>,
}

impl DeviceStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前跟踪的支付 ID（没有时为空字符串）
    pub fn payment_id(&self) -> String {
        self.payment_id.lock().clone()
    }

    pub fn set_payment_id(&self, payment_id: impl Into<String>) {
        *self.payment_id.lock() = payment_id.into();
    }

    pub fn clear_payment_id(&self) {
        self.payment_id.lock().clear();
    }

    /// 正在执行的命令
    pub fn executing_command(&self) -> Option<Command> {
        self.executing.lock().clone()
    }

    pub(crate) fn set_executing(&self, command: Command) {
        *self.executing.lock() = Some(command);
    }

    pub(crate) fn clear_executing(&self) {
        *self.executing.lock() = None;
    }

    /// 最近一次命令执行失败的错误（成功执行后清除）
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    pub(crate) fn set_last_error(&self, error: Option<String>) {
        *self.last_error.lock() = error;
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            payment_id: self.payment_id(),
            executing_command: self.executing_command(),
            last_error: self.last_error(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandKind;

    #[test]
    fn test_payment_id() {
        let status = DeviceStatus::new();
        assert_eq!(status.payment_id(), "");

        status.set_payment_id("payment-uuid-123");
        assert_eq!(status.payment_id(), "payment-uuid-123");

        status.clear_payment_id();
        assert_eq!(status.payment_id(), "");
    }

    #[test]
    fn test_executing_command_tracking() {
        let status = DeviceStatus::new();
        assert!(status.executing_command().is_none());

        let cmd = Command::new(42, CommandKind::Extend).with_duration_ms(500);
        status.set_executing(cmd.clone());
        assert_eq!(status.executing_command(), Some(cmd));

        status.clear_executing();
        assert!(status.executing_command().is_none());
    }

    #[test]
    fn test_snapshot_serializes() {
        let status = DeviceStatus::new();
        status.set_payment_id("p-1");
        status.set_executing(Command::new(3, CommandKind::Home));
        status.set_last_error(Some("boom".to_string()));

        let json = serde_json::to_value(status.snapshot()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "payment_id": "p-1",
                "executing_command": {"id": 3, "command": "home"},
                "last_error": "boom",
            })
        );
    }
}
