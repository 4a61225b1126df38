//! 配置文件
//!
//! TOML 格式，所有段落都有默认值，只有 `[api]` 的 `url` 和 `key` 必须提供：
//!
//! ```toml
//! [api]
//! url = "https://baendaeli.example.com"
//! key = "device-api-key"
//!
//! [server]
//! listen = "0.0.0.0:8000"
//!
//! [actuator]
//! enabled = true
//! movement_seconds = 2.0
//! pause_seconds = 2.0
//! cooldown_ms = 0
//! homing_seconds = 10.0
//!
//! [actuator.pins]
//! enable = "GPIO25"
//! direction_a = "GPIO8"
//! direction_b = "GPIO7"
//!
//! [poller]
//! interval_seconds = 7
//! ```

use anyhow::{Context, Result, bail};
use dispenser_device::PollerConfig;
use dispenser_driver::config::DEFAULT_SETTLING_DELAY;
use dispenser_driver::{ActuatorConfig, PinConfig};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// 时长类配置项的上限（1 小时）
const MAX_SECONDS: f64 = 3600.0;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiSection,
    pub server: ServerSection,
    pub actuator: ActuatorSection,
    pub poller: PollerSection,
}

/// 远程 API
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    pub url: String,
    pub key: String,
}

/// 本地 HTTP 服务
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8000".to_string(),
        }
    }
}

/// 执行器
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ActuatorSection {
    pub enabled: bool,
    pub pins: PinConfig,
    /// 伸出与缩回的运动时长（秒，0 表示默认值 2）
    pub movement_seconds: f64,
    pub pause_seconds: f64,
    pub cooldown_ms: u64,
    pub homing_seconds: f64,
}

impl Default for ActuatorSection {
    fn default() -> Self {
        Self {
            enabled: false,
            pins: PinConfig::default(),
            movement_seconds: 2.0,
            pause_seconds: 2.0,
            cooldown_ms: 0,
            homing_seconds: 10.0,
        }
    }
}

/// 命令轮询
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollerSection {
    pub interval_seconds: u64,
}

impl Default for PollerSection {
    fn default() -> Self {
        Self {
            interval_seconds: 7,
        }
    }
}

impl AppConfig {
    /// 读取并检查配置文件
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = Self::parse(&text)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.api.url.trim().is_empty() || self.api.key.trim().is_empty() {
            bail!("configuration missing required fields: [api] url and key");
        }
        if self.poller.interval_seconds == 0 {
            bail!("[poller] interval_seconds must be greater than zero");
        }
        for (name, value) in [
            ("movement_seconds", self.actuator.movement_seconds),
            ("pause_seconds", self.actuator.pause_seconds),
            ("homing_seconds", self.actuator.homing_seconds),
        ] {
            if !value.is_finite() || value < 0.0 {
                bail!("[actuator] {} must be a non-negative number", name);
            }
            if value > MAX_SECONDS {
                bail!("[actuator] {} must not exceed {} seconds", name, MAX_SECONDS);
            }
        }
        if self.actuator.cooldown_ms as f64 > MAX_SECONDS * 1000.0 {
            bail!("[actuator] cooldown_ms must not exceed {} seconds", MAX_SECONDS);
        }
        Ok(())
    }

    pub fn actuator_config(&self) -> ActuatorConfig {
        let section = &self.actuator;
        ActuatorConfig {
            enabled: section.enabled,
            pins: section.pins.clone(),
            movement_time: Duration::from_secs_f64(section.movement_seconds),
            pause_time: Duration::from_secs_f64(section.pause_seconds),
            settling_delay: DEFAULT_SETTLING_DELAY,
            homing_duration: Duration::from_secs_f64(section.homing_seconds),
            cooldown: Duration::from_millis(section.cooldown_ms),
        }
        .normalized()
    }

    /// 轮询配置，默认命令时长与执行器运动时长一致
    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            interval: Duration::from_secs(self.poller.interval_seconds),
            default_duration: self.actuator_config().movement_time,
            ..Default::default()
        }
    }
}
