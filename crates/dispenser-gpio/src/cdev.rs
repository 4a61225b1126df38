//! Linux GPIO 字符设备后端
//!
//! 通过内核的线名表（`gpioinfo` 中显示的名称，如 `GPIO25`）查找输出线，
//! 以 `dispenserd` 作为 consumer 标签申请为输出。释放时（`release()` 或 `Drop`）
//! 关闭请求句柄，内核会把线交还。

use crate::{GpioBackend, GpioError, GpioErrorKind, OutputLine, PinLevel};
use gpiocdev::Request;
use gpiocdev::line::{Offset, Value};
use tracing::debug;

const CONSUMER: &str = "dispenserd";

/// GPIO 字符设备后端
#[derive(Debug, Default, Clone, Copy)]
pub struct CdevBackend;

impl CdevBackend {
    pub fn new() -> Self {
        Self
    }
}

impl GpioBackend for CdevBackend {
    fn acquire_output(&self, name: &str) -> Result<Box<dyn OutputLine>, GpioError> {
        let found = gpiocdev::find_named_line(name).ok_or_else(|| {
            GpioError::new(
                GpioErrorKind::NotFound,
                name,
                "no GPIO line with this name on any chip",
            )
        })?;

        let offset = found.info.offset;
        let request = Request::builder()
            .with_found_line(&found)
            .with_consumer(CONSUMER)
            .as_output(Value::Inactive)
            .request()
            .map_err(|e| GpioError::new(classify(&e), name, e.to_string()))?;

        debug!(
            "Acquired GPIO line {} (chip {}, offset {})",
            name,
            found.chip.display(),
            offset
        );

        Ok(Box::new(CdevLine {
            name: name.to_string(),
            offset,
            request: Some(request),
        }))
    }
}

/// 已申请的输出线
pub struct CdevLine {
    name: String,
    offset: Offset,
    /// `None` 表示已释放
    request: Option<Request>,
}

impl OutputLine for CdevLine {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_level(&mut self, level: PinLevel) -> Result<(), GpioError> {
        let request = self.request.as_ref().ok_or_else(|| {
            GpioError::new(GpioErrorKind::Released, &self.name, "line already released")
        })?;

        let value = match level {
            PinLevel::High => Value::Active,
            PinLevel::Low => Value::Inactive,
        };
        request
            .set_value(self.offset, value)
            .map_err(|e| GpioError::new(GpioErrorKind::Io, &self.name, e.to_string()))
    }

    fn release(&mut self) -> Result<(), GpioError> {
        // 关闭请求句柄即释放
        if self.request.take().is_some() {
            debug!("Released GPIO line {}", self.name);
        }
        Ok(())
    }
}

/// 把 gpiocdev 错误映射为结构化分类
fn classify(err: &gpiocdev::Error) -> GpioErrorKind {
    let msg = err.to_string().to_ascii_lowercase();
    if msg.contains("busy") {
        GpioErrorKind::Busy
    } else if msg.contains("permission") || msg.contains("not permitted") {
        GpioErrorKind::AccessDenied
    } else {
        GpioErrorKind::Io
    }
}
