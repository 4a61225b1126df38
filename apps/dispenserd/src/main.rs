//! 出货机守护进程主入口
//!
//! 启动顺序：读取配置 → 初始化日志 → 单例锁 → 初始化执行器（硬件不可用时
//! 降级为仿真）→ 后台归零 → 启动命令轮询 → 提供本地 HTTP 接口。
//!
//! Ctrl+C 后依次停止 HTTP 服务、停止轮询（正在执行的命令先完成）、
//! 释放输出线。

mod config;
mod server;
mod singleton;

use anyhow::{Context, Result};
use clap::Parser;
use config::AppConfig;
use dispenser_device::{CommandPoller, DeviceStatus, HttpRemoteApi};
use dispenser_driver::{ActuatorBuilder, SharedActuator};
use server::AppState;
use singleton::{SingletonLock, default_lock_path};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_LOG_FILTER: &str = "dispenserd=info,dispenser_driver=info,dispenser_device=info";

/// 出货机守护进程
///
/// 驱动线性执行器出货，轮询远程命令队列，并提供本地触发接口
#[derive(Parser, Debug)]
#[command(name = "dispenserd")]
#[command(about = "Dispenser daemon - actuator control and remote command polling", long_about = None)]
struct Args {
    /// 配置文件路径（TOML）
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// 日志目录（可选，按天轮转）
    ///
    /// 默认: 只输出到 stderr
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// 锁文件路径
    ///
    /// 默认: $XDG_RUNTIME_DIR/dispenserd.lock，否则系统临时目录
    #[arg(long)]
    lock_file: Option<PathBuf>,
}

/// 初始化日志
///
/// 返回的 guard 必须存活到进程退出，否则文件日志会丢失尾部内容。
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let stderr_layer = fmt::layer().with_writer(std::io::stderr);

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "dispenserd.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        },
        None => {
            tracing_subscriber::registry().with(filter).with(stderr_layer).init();
            None
        },
    }
}

/// 等待 Ctrl+C
///
/// 信号处理注册失败时永远不返回（服务继续运行，而不是立即退出）。
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received interrupt signal, shutting down"),
        Err(e) => {
            error!("Failed to listen for interrupt signal: {}", e);
            std::future::pending::<()>().await;
        },
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // 1. 配置
    let config = AppConfig::load(&args.config)?;

    // 2. 日志
    let _log_guard = init_tracing(args.log_dir.as_deref());
    info!("Configuration loaded from {}", args.config.display());

    // 3. 单例锁（只有一个进程可以持有输出线）
    let lock_path = args.lock_file.clone().unwrap_or_else(default_lock_path);
    let _lock = SingletonLock::try_lock(&lock_path).with_context(|| {
        format!(
            "failed to acquire singleton lock {}; another instance may be running",
            lock_path.display()
        )
    })?;

    // 4. 执行器（硬件不可用时降级为仿真）
    let backend = dispenser_gpio::system_backend();
    let controller = ActuatorBuilder::new(config.actuator_config())
        .build(backend.as_ref())
        .context("invalid actuator configuration")?;
    if controller.is_simulated() {
        warn!("Actuator running in simulation mode, no GPIO output");
    }
    let actuator = SharedActuator::new(controller);
    let status = Arc::new(DeviceStatus::new());

    // 5. 后台归零
    let homing = actuator.spawn_homing();

    // 6. 命令轮询
    let api = Arc::new(HttpRemoteApi::new(
        config.api.url.clone(),
        config.api.key.clone(),
    ));
    let poller = CommandPoller::new(
        api,
        actuator.clone(),
        status.clone(),
        config.poller_config(),
    )
    .start();

    // 7. 本地 HTTP 接口（阻塞直到 Ctrl+C）
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    let state = AppState {
        actuator: actuator.clone(),
        status,
    };
    let served = runtime.block_on(async {
        let listener = tokio::net::TcpListener::bind(&config.server.listen)
            .await
            .with_context(|| format!("failed to bind {}", config.server.listen))?;
        server::serve(listener, state, shutdown_signal())
            .await
            .context("HTTP server failed")
    });

    // 8. 关闭：先停轮询，再等归零结束，最后释放输出线
    poller.stop();
    // 归零失败已在归零线程中记录
    if homing.join().is_err() {
        error!("Homing thread panicked");
    }
    actuator.shutdown();
    info!("dispenserd stopped");

    served
}
