//! 本地 HTTP 接口
//!
//! - `POST /api/actuate`: 持有执行器锁执行一次完整循环
//! - `GET /api/device/status`: 设备状态（不等待执行器锁）
//! - `PUT /api/device/payment`: 设置轮询器上报的支付 ID

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use dispenser_device::{DeviceStatus, StatusSnapshot};
use dispenser_driver::{ActuatorPhase, SharedActuator};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

/// 处理器共享状态
#[derive(Clone)]
pub struct AppState {
    pub actuator: SharedActuator,
    pub status: Arc<DeviceStatus>,
}

#[derive(Debug, Serialize)]
struct ActuateResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    total_time_ms: u64,
}

#[derive(Debug, Serialize)]
struct ActuatorView {
    phase: ActuatorPhase,
    is_home: bool,
}

#[derive(Debug, Serialize)]
struct DeviceStatusResponse {
    #[serde(flatten)]
    device: StatusSnapshot,
    actuator: ActuatorView,
}

#[derive(Debug, Deserialize)]
struct PaymentRequest {
    payment_id: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/actuate", post(actuate_handler))
        .route("/api/device/status", get(device_status_handler))
        .route("/api/device/payment", put(set_payment_handler))
        .with_state(state)
}

/// 在给定监听器上提供服务，直到 `shutdown` 完成
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!("HTTP server listening on {}", addr);
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

fn actuate_error(message: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ActuateResponse {
            status: "error",
            error: Some(message),
            total_time_ms: 0,
        }),
    )
        .into_response()
}

/// 运动是阻塞的，放到阻塞线程池中执行
async fn actuate_handler(State(state): State<AppState>) -> Response {
    let actuator = state.actuator.clone();
    match tokio::task::spawn_blocking(move || actuator.trigger()).await {
        Ok(Ok(report)) => (
            StatusCode::OK,
            Json(ActuateResponse {
                status: "ok",
                error: None,
                total_time_ms: report.total_time_ms(),
            }),
        )
            .into_response(),
        Ok(Err(e)) => {
            error!("actuator error: {}", e);
            actuate_error(e.to_string())
        },
        Err(e) => {
            error!("actuator task failed: {}", e);
            actuate_error("actuator task failed".to_string())
        },
    }
}

async fn device_status_handler(State(state): State<AppState>) -> Json<DeviceStatusResponse> {
    Json(DeviceStatusResponse {
        device: state.status.snapshot(),
        actuator: ActuatorView {
            phase: state.actuator.phase(),
            is_home: state.actuator.is_home(),
        },
    })
}

async fn set_payment_handler(
    State(state): State<AppState>,
    Json(request): Json<PaymentRequest>,
) -> StatusCode {
    info!("Tracking payment id '{}'", request.payment_id);
    state.status.set_payment_id(request.payment_id);
    StatusCode::NO_CONTENT
}
