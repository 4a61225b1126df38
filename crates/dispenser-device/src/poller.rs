//! 命令轮询器
//!
//! 后台线程按固定间隔执行一次轮询：
//!
//! 1. 上报当前支付 ID（失败只记录日志，下次重试）
//! 2. 获取至多一条命令（失败则本次轮询结束）
//! 3. 持有共享执行器锁执行命令
//! 4. 确认执行结果（失败只记录日志，由服务端负责重新下发）
//! 5. 清除“正在执行”标记
//!
//! 停止是协作式的，只在两次轮询之间检查；正在执行的运动总会完整结束。

use crate::ack::{AckResult, AckStatus};
use crate::api::RemoteApi;
use crate::command::{Command, CommandKind};
use crate::error::DeviceError;
use crate::status::DeviceStatus;
use crossbeam_channel::{RecvTimeoutError, Sender, bounded};
use dispenser_driver::{Clock, SharedActuator, SystemClock};
use std::sync::Arc;
use std::thread::{JoinHandle, spawn};
use std::time::Duration;
use tracing::{error, info, warn};

/// 轮询器配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    /// 轮询间隔
    pub interval: Duration,
    /// 命令未指定时长（或时长不为正）时使用的默认时长
    pub default_duration: Duration,
    /// `cancel` 命令的保持时间（让界面能看到正在执行的取消）
    pub cancel_hold: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(7),
            default_duration: Duration::from_secs(2),
            cancel_hold: Duration::from_millis(250),
        }
    }
}

/// 一次轮询的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// 没有待执行的命令
    Idle,
    /// 获取命令失败
    FetchFailed,
    /// 执行了一条命令（无论确认是否成功）
    Executed { id: i64, status: AckStatus },
}

/// 命令轮询器
pub struct CommandPoller {
    api: Arc<dyn RemoteApi>,
    actuator: SharedActuator,
    status: Arc<DeviceStatus>,
    config: PollerConfig,
    clock: Arc<dyn Clock>,
}

impl CommandPoller {
    pub fn new(
        api: Arc<dyn RemoteApi>,
        actuator: SharedActuator,
        status: Arc<DeviceStatus>,
        config: PollerConfig,
    ) -> Self {
        Self {
            api,
            actuator,
            status,
            config,
            clock: Arc::new(SystemClock),
        }
    }

    /// 指定 `message` / `cancel` 保持时间使用的时钟
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// 执行一次轮询
    pub fn tick(&self) -> TickOutcome {
        let payment_id = self.status.payment_id();
        if let Err(e) = self.api.report_status(&payment_id) {
            warn!("Device client: failed to report status: {}", e);
        }

        let command = match self.api.fetch_command() {
            Ok(Some(command)) => command,
            Ok(None) => return TickOutcome::Idle,
            Err(e) => {
                warn!("Device client: failed to get command: {}", e);
                return TickOutcome::FetchFailed;
            },
        };

        let ack = match self.execute(&command) {
            Ok(()) => {
                self.status.set_last_error(None);
                AckResult::success()
            },
            Err(e) => {
                error!(
                    "Device client: failed to execute command {} ({}): {}",
                    command.id, command.kind, e
                );
                let ack = AckResult::failed(&e.to_string());
                self.status.set_last_error(Some(ack.error_message.clone()));
                ack
            },
        };

        match self.api.acknowledge(command.id, &ack) {
            Ok(()) => info!("Device client: acknowledged command {}", command.id),
            Err(e) => warn!(
                "Device client: failed to acknowledge command {}: {}",
                command.id, e
            ),
        }

        self.status.clear_executing();
        TickOutcome::Executed {
            id: command.id,
            status: ack.status,
        }
    }

    /// 持有执行器锁执行命令
    ///
    /// 所有命令（包括不驱动硬件的 `message` / `cancel`）都在锁内执行，
    /// 保证命令之间严格串行。
    pub fn execute(&self, command: &Command) -> Result<(), DeviceError> {
        let duration = command.resolve_duration(self.config.default_duration);
        if command.duration_ms.is_some_and(|ms| ms > 0) {
            info!(
                "Device client: executing command {}: {} with API-provided duration {:?}",
                command.id, command.kind, duration
            );
        } else {
            info!(
                "Device client: executing command {}: {} with default duration {:?}",
                command.id, command.kind, duration
            );
        }

        let mut actuator = self.actuator.lock();
        self.status.set_executing(command.clone());

        match &command.kind {
            CommandKind::Extend => actuator.extend(duration)?,
            CommandKind::Retract => actuator.retract(duration)?,
            CommandKind::Home => actuator.home()?,
            CommandKind::Message => {
                info!(
                    "Device client: displaying message: {} for {:?}",
                    command.message.as_deref().unwrap_or_default(),
                    duration
                );
                self.clock.sleep(duration);
            },
            CommandKind::Cancel => {
                info!("Device client: cancel received, clearing payment id");
                self.status.clear_payment_id();
                self.clock.sleep(self.config.cancel_hold);
            },
            CommandKind::Unknown(raw) => return Err(DeviceError::UnknownCommand(raw.clone())),
        }
        Ok(())
    }

    /// 启动后台轮询线程
    ///
    /// 第一次轮询在一个间隔之后进行。
    pub fn start(self) -> PollerHandle {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let interval = self.config.interval;

        let thread = spawn(move || {
            info!("Device client started (interval {:?})", interval);
            loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        self.tick();
                    },
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            info!("Device client stopped");
        });

        PollerHandle {
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        }
    }
}

/// 轮询线程句柄
///
/// `stop()` 或 `Drop` 时通知线程退出并等待；正在执行的命令会先完成。
pub struct PollerHandle {
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl PollerHandle {
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // 关闭发送端，接收端得到 Disconnected
        self.stop_tx.take();
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            error!("Device client thread panicked");
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use dispenser_driver::{ActuatorBuilder, ActuatorConfig, ActuatorPhase, VirtualClock};
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct ScriptedApi {
        commands: Mutex<VecDeque<Result<Option<Command>, ApiError>>>,
        reports: Mutex<Vec<String>>,
        acks: Mutex<Vec<(i64, AckResult)>>,
        fail_reports: bool,
    }

    impl ScriptedApi {
        fn with_commands(commands: Vec<Result<Option<Command>, ApiError>>) -> Self {
            Self {
                commands: Mutex::new(commands.into()),
                ..Default::default()
            }
        }
    }

    impl RemoteApi for ScriptedApi {
        fn report_status(&self, payment_id: &str) -> Result<(), ApiError> {
            self.reports.lock().push(payment_id.to_string());
            if self.fail_reports {
                Err(ApiError::Transport("connection refused".to_string()))
            } else {
                Ok(())
            }
        }

        fn fetch_command(&self) -> Result<Option<Command>, ApiError> {
            self.commands.lock().pop_front().unwrap_or(Ok(None))
        }

        fn acknowledge(&self, command_id: i64, ack: &AckResult) -> Result<(), ApiError> {
            self.acks.lock().push((command_id, ack.clone()));
            Ok(())
        }
    }

    fn poller(api: Arc<ScriptedApi>) -> (CommandPoller, Arc<DeviceStatus>, SharedActuator, VirtualClock) {
        let clock = VirtualClock::new();
        let actuator = SharedActuator::new(
            ActuatorBuilder::new(ActuatorConfig::default())
                .clock(Arc::new(clock.clone()))
                .build_simulated()
                .unwrap(),
        );
        let status = Arc::new(DeviceStatus::new());
        let poller = CommandPoller::new(api, actuator.clone(), status.clone(), PollerConfig::default())
            .with_clock(Arc::new(clock.clone()));
        (poller, status, actuator, clock)
    }

    #[test]
    fn test_idle_tick_reports_status() {
        let api = Arc::new(ScriptedApi::default());
        let (poller, status, _, _) = poller(api.clone());
        status.set_payment_id("p-9");

        assert_eq!(poller.tick(), TickOutcome::Idle);
        assert_eq!(*api.reports.lock(), vec!["p-9".to_string()]);
        assert!(api.acks.lock().is_empty());
    }

    #[test]
    fn test_report_failure_is_not_fatal() {
        let api = Arc::new(ScriptedApi {
            fail_reports: true,
            ..ScriptedApi::with_commands(vec![Ok(Some(Command::new(1, CommandKind::Home)))])
        });
        let (poller, _, actuator, _) = poller(api.clone());

        assert_eq!(
            poller.tick(),
            TickOutcome::Executed {
                id: 1,
                status: AckStatus::Success
            }
        );
        assert!(actuator.is_home());
    }

    #[test]
    fn test_fetch_failure_ends_tick() {
        let api = Arc::new(ScriptedApi::with_commands(vec![Err(ApiError::Unauthorized)]));
        let (poller, _, _, _) = poller(api.clone());

        assert_eq!(poller.tick(), TickOutcome::FetchFailed);
        assert!(api.acks.lock().is_empty());
    }

    #[test]
    fn test_zero_duration_uses_default() {
        let api = Arc::new(ScriptedApi::with_commands(vec![Ok(Some(
            Command::new(5, CommandKind::Extend).with_duration_ms(0),
        ))]));
        let (poller, _, actuator, clock) = poller(api);

        poller.tick();
        assert_eq!(clock.sleeps()[0], Duration::from_secs(2));
        assert_eq!(actuator.phase(), ActuatorPhase::Unknown);
    }

    #[test]
    fn test_unknown_command_acked_failed() {
        let api = Arc::new(ScriptedApi::with_commands(vec![Ok(Some(Command::new(
            47,
            CommandKind::Unknown("ball_dispenser".to_string()),
        )))]));
        let (poller, status, _, clock) = poller(api.clone());

        assert_eq!(
            poller.tick(),
            TickOutcome::Executed {
                id: 47,
                status: AckStatus::Failed
            }
        );
        let acks = api.acks.lock();
        assert_eq!(acks[0].1.error_message, "unknown command: ball_dispenser");
        assert_eq!(
            status.last_error().as_deref(),
            Some("unknown command: ball_dispenser")
        );
        assert!(status.executing_command().is_none());
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn test_cancel_clears_payment_and_holds() {
        let api = Arc::new(ScriptedApi::with_commands(vec![Ok(Some(Command::new(
            50,
            CommandKind::Cancel,
        )))]));
        let (poller, status, _, clock) = poller(api);
        status.set_payment_id("payment-uuid-123");

        poller.tick();

        assert_eq!(status.payment_id(), "");
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(250)]);
    }

    #[test]
    fn test_message_holds_for_duration() {
        let api = Arc::new(ScriptedApi::with_commands(vec![Ok(Some(
            Command::new(46, CommandKind::Message)
                .with_duration_ms(100)
                .with_message("Hello Device!"),
        ))]));
        let (poller, _, _, clock) = poller(api);

        poller.tick();
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(100)]);
    }

    #[test]
    fn test_poller_config_defaults() {
        let config = PollerConfig::default();
        assert_eq!(config.interval, Duration::from_secs(7));
        assert_eq!(config.cancel_hold, Duration::from_millis(250));
    }
}
