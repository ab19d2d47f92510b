use crate::validation::{ConfigValidator, ValidationUtils};
use serde::{Deserialize, Serialize};

/// 距离任务的派发方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DispatchMode {
    /// 提交时直接计算并把结果写入结果队列
    #[default]
    Inline,
    /// 提交时只写入任务队列，由Worker计算
    Queued,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DistanceConfig {
    pub dispatch_mode: DispatchMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub enabled: bool,
    pub worker_id: String,
    pub poll_interval_ms: u64,
    pub retry_delay_seconds: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            worker_id: "worker-001".to_string(),
            poll_interval_ms: 500,
            retry_delay_seconds: 5,
        }
    }
}

impl ConfigValidator for DistanceConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        Ok(())
    }
}

impl ConfigValidator for WorkerConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        ValidationUtils::validate_not_empty(&self.worker_id, "worker.worker_id")?;

        if self.poll_interval_ms == 0 {
            return Err(crate::ConfigError::Validation(
                "worker.poll_interval_ms must be greater than 0".to_string(),
            ));
        }

        ValidationUtils::validate_timeout_seconds(
            self.retry_delay_seconds,
            "worker.retry_delay_seconds",
        )?;
        Ok(())
    }
}
