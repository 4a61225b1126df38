//! 命令确认

use serde::Serialize;

/// 确认消息中错误文本的最大字符数
pub const MAX_ERROR_MESSAGE_CHARS: usize = 1000;

/// 执行结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AckStatus {
    Success,
    Failed,
}

/// `POST /api/v1/device/commands/{id}/ack` 的请求体
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AckResult {
    pub status: AckStatus,
    /// 成功时为空字符串
    pub error_message: String,
}

impl AckResult {
    pub fn success() -> Self {
        Self {
            status: AckStatus::Success,
            error_message: String::new(),
        }
    }

    /// 失败结果，错误文本截断到 [`MAX_ERROR_MESSAGE_CHARS`] 个字符
    pub fn failed(error_message: &str) -> Self {
        Self {
            status: AckStatus::Failed,
            error_message: truncate_chars(error_message, MAX_ERROR_MESSAGE_CHARS),
        }
    }
}

/// 按字符（而不是字节）截断，不会切断多字节字符
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_success_wire_format() {
        let json = serde_json::to_value(AckResult::success()).unwrap();
        assert_eq!(json, serde_json::json!({"status": "success", "error_message": ""}));
    }

    #[test]
    fn test_failed_truncates_to_limit() {
        let long = "x".repeat(1500);
        let ack = AckResult::failed(&long);
        assert_eq!(ack.status, AckStatus::Failed);
        assert_eq!(ack.error_message.chars().count(), 1000);
    }

    #[test]
    fn test_short_message_untouched() {
        let ack = AckResult::failed("unknown command: ball_dispenser");
        assert_eq!(ack.error_message, "unknown command: ball_dispenser");
    }

    #[test]
    fn test_truncate_multibyte() {
        let text = "执行器".repeat(400);
        let truncated = truncate_chars(&text, 1000);
        assert_eq!(truncated.chars().count(), 1000);
        assert!(text.starts_with(&truncated));
    }

    proptest! {
        #[test]
        fn prop_truncation_is_exact(text in "\\PC{0,1500}") {
            let truncated = truncate_chars(&text, MAX_ERROR_MESSAGE_CHARS);
            let expected = text.chars().count().min(MAX_ERROR_MESSAGE_CHARS);
            prop_assert_eq!(truncated.chars().count(), expected);
            prop_assert!(text.starts_with(&truncated));
        }
    }
}
