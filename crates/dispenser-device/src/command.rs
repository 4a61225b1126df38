//! 远程命令
//!
//! 服务端每次最多下发一条命令：
//!
//! ```json
//! {"id": 45, "command": "extend", "duration_ms": 1500, "message": "..."}
//! ```
//!
//! 响应体为 `null` 或 `command` 为空时表示没有待执行的命令。

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::time::Duration;

/// 命令类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    Extend,
    Retract,
    Home,
    /// 仅用于界面显示，不驱动硬件
    Message,
    /// 清除当前支付 ID，不驱动硬件
    Cancel,
    /// 无法识别的命令（保留原始文本）
    Unknown(String),
}

impl CommandKind {
    /// 解析命令名（不区分大小写）
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "extend" => Self::Extend,
            "retract" => Self::Retract,
            "home" => Self::Home,
            "message" => Self::Message,
            "cancel" => Self::Cancel,
            _ => Self::Unknown(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Extend => "extend",
            Self::Retract => "retract",
            Self::Home => "home",
            Self::Message => "message",
            Self::Cancel => "cancel",
            Self::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CommandKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// 一条待执行的命令
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Command {
    pub id: i64,
    #[serde(rename = "command")]
    pub kind: CommandKind,
    /// 服务端指定的时长（毫秒），可能为零或负数
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Command {
    pub fn new(id: i64, kind: CommandKind) -> Self {
        Self {
            id,
            kind,
            duration_ms: None,
            message: None,
        }
    }

    pub fn with_duration_ms(mut self, duration_ms: i64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// 实际执行时长
    ///
    /// 只有严格为正的 `duration_ms` 才会被采用，否则使用 `default`。
    pub fn resolve_duration(&self, default: Duration) -> Duration {
        match self.duration_ms {
            Some(ms) if ms > 0 => Duration::from_millis(ms as u64),
            _ => default,
        }
    }
}

/// `GET /api/v1/device/commands` 的响应体
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CommandResponse {
    id: Option<i64>,
    command: Option<String>,
    duration_ms: Option<i64>,
    message: Option<String>,
}

/// 解析命令响应体
///
/// `null`、空对象、`"command": null` 或空的 `command` 字段都返回 `Ok(None)`。
pub fn parse_command_body(body: &str) -> Result<Option<Command>, serde_json::Error> {
    let response: Option<CommandResponse> = serde_json::from_str(body)?;
    let Some(response) = response else {
        return Ok(None);
    };
    let Some(command) = response.command.filter(|c| !c.trim().is_empty()) else {
        return Ok(None);
    };

    Ok(Some(Command {
        id: response.id.unwrap_or_default(),
        kind: CommandKind::parse(&command),
        duration_ms: response.duration_ms,
        message: response.message.filter(|m| !m.is_empty()),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_kind_case_insensitive() {
        assert_eq!(CommandKind::parse("EXTEND"), CommandKind::Extend);
        assert_eq!(CommandKind::parse("Retract"), CommandKind::Retract);
        assert_eq!(CommandKind::parse(" home "), CommandKind::Home);
        assert_eq!(CommandKind::parse("Cancel"), CommandKind::Cancel);
        assert_eq!(
            CommandKind::parse("ball_dispenser"),
            CommandKind::Unknown("ball_dispenser".to_string())
        );
    }

    #[test]
    fn test_parse_body_with_duration() {
        let cmd = parse_command_body(r#"{"id": 45, "command": "extend", "duration_ms": 1500}"#)
            .unwrap()
            .unwrap();
        assert_eq!(cmd.id, 45);
        assert_eq!(cmd.kind, CommandKind::Extend);
        assert_eq!(cmd.duration_ms, Some(1500));
        assert_eq!(cmd.message, None);
    }

    #[test]
    fn test_parse_body_message() {
        let cmd = parse_command_body(
            r#"{"id": 46, "command": "message", "message": "Hello Device!", "duration_ms": 100}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(cmd.kind, CommandKind::Message);
        assert_eq!(cmd.message.as_deref(), Some("Hello Device!"));
    }

    #[test]
    fn test_parse_body_without_command() {
        assert_eq!(parse_command_body("null").unwrap(), None);
        assert_eq!(parse_command_body("{}").unwrap(), None);
        assert_eq!(parse_command_body(r#"{"id": 3, "command": ""}"#).unwrap(), None);
        assert_eq!(parse_command_body(r#"{"command": null}"#).unwrap(), None);
        assert_eq!(
            parse_command_body(r#"{"id": null, "command": null, "duration_ms": null}"#).unwrap(),
            None
        );
    }

    #[test]
    fn test_parse_body_null_id() {
        let cmd = parse_command_body(r#"{"id": null, "command": "home"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(cmd.id, 0);
        assert_eq!(cmd.kind, CommandKind::Home);
    }

    #[test]
    fn test_parse_body_invalid_json() {
        assert!(parse_command_body("{not json").is_err());
    }

    #[test]
    fn test_resolve_duration() {
        let default = Duration::from_secs(2);
        let cmd = Command::new(1, CommandKind::Extend);
        assert_eq!(cmd.resolve_duration(default), default);
        assert_eq!(
            cmd.clone().with_duration_ms(0).resolve_duration(default),
            default
        );
        assert_eq!(
            cmd.clone().with_duration_ms(-50).resolve_duration(default),
            default
        );
        assert_eq!(
            cmd.with_duration_ms(1500).resolve_duration(default),
            Duration::from_millis(1500)
        );
    }

    #[test]
    fn test_command_serializes_wire_names() {
        let cmd = Command::new(7, CommandKind::Retract).with_duration_ms(800);
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": 7, "command": "retract", "duration_ms": 800})
        );
    }

    proptest! {
        #[test]
        fn prop_non_positive_duration_uses_default(ms in i64::MIN..=0, default_ms in 1u64..100_000) {
            let default = Duration::from_millis(default_ms);
            let cmd = Command::new(1, CommandKind::Extend).with_duration_ms(ms);
            prop_assert_eq!(cmd.resolve_duration(default), default);
        }

        #[test]
        fn prop_positive_duration_is_used(ms in 1i64..10_000_000) {
            let cmd = Command::new(1, CommandKind::Retract).with_duration_ms(ms);
            prop_assert_eq!(
                cmd.resolve_duration(Duration::from_secs(2)),
                Duration::from_millis(ms as u64)
            );
        }
    }
}
