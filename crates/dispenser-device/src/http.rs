//! 基于 HTTP 的远程 API 实现
//!
//! 所有请求都带 `Authorization: Bearer <key>`，请求超时 15 秒。

use crate::ack::AckResult;
use crate::api::{ApiError, RemoteApi};
use crate::command::{Command, parse_command_body};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// 默认请求超时
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Serialize)]
struct StatusRequest<'a> {
    payment_id: &'a str,
}

#[derive(Deserialize)]
struct SuccessResponse {
    #[serde(default)]
    success: bool,
}

/// HTTP 远程 API 客户端
pub struct HttpRemoteApi {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
}

impl HttpRemoteApi {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_timeout(base_url, api_key, DEFAULT_HTTP_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// 拼接完整 URL（去掉多余的斜杠）
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// 发送请求并返回响应体
    fn send(&self, request: ureq::Request, body: Option<String>) -> Result<String, ApiError> {
        let request = request.set("Authorization", &format!("Bearer {}", self.api_key));
        let result = match body {
            Some(body) => request
                .set("Content-Type", "application/json")
                .send_string(&body),
            None => request.call(),
        };

        match result {
            Ok(response) => response
                .into_string()
                .map_err(|e| ApiError::Transport(format!("failed to read response body: {}", e))),
            Err(ureq::Error::Status(401, _)) => Err(ApiError::Unauthorized),
            Err(ureq::Error::Status(code, response)) => Err(ApiError::Status {
                code,
                body: response.into_string().unwrap_or_default(),
            }),
            Err(e) => Err(ApiError::Transport(e.to_string())),
        }
    }

    fn post_json<T: Serialize>(&self, path: &str, payload: &T) -> Result<String, ApiError> {
        let body = serde_json::to_string(payload)
            .map_err(|e| ApiError::Decode(format!("failed to encode request: {}", e)))?;
        self.send(self.agent.post(&self.url(path)), Some(body))
    }
}

/// 解析 `{"success": bool}`，`false` 视为拒绝
fn expect_success(body: &str) -> Result<(), ApiError> {
    let response: SuccessResponse =
        serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))?;
    if response.success {
        Ok(())
    } else {
        Err(ApiError::Rejected)
    }
}

impl RemoteApi for HttpRemoteApi {
    fn report_status(&self, payment_id: &str) -> Result<(), ApiError> {
        let body = self.post_json("/api/v1/device/status", &StatusRequest { payment_id })?;
        expect_success(&body)
    }

    fn fetch_command(&self) -> Result<Option<Command>, ApiError> {
        let body = self.send(self.agent.get(&self.url("/api/v1/device/commands")), None)?;
        parse_command_body(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    fn acknowledge(&self, command_id: i64, ack: &AckResult) -> Result<(), ApiError> {
        let path = format!("/api/v1/device/commands/{}/ack", command_id);
        let body = self.post_json(&path, ack).map_err(|e| match e {
            ApiError::Status { code: 404, .. } => ApiError::CommandNotFound(command_id),
            other => other,
        })?;
        expect_success(&body)?;

        debug!("Device client: acknowledged command {}", command_id);
        Ok(())
    }
}
