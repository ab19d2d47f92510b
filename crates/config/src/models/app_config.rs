use anyhow::{Context, Result};
use config::{builder::DefaultState, Config as ConfigBuilder, ConfigBuilder as Builder};
use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{
    api_observability::{ApiConfig, ObservabilityConfig},
    distance_worker::{DistanceConfig, WorkerConfig},
    location_store::LocationStoreConfig,
    message_queue::MessageQueueConfig,
};
use crate::validation::ConfigValidator;

const DEFAULT_CONFIG_PATHS: [&str; 3] = [
    "config/geodist.toml",
    "geodist.toml",
    "/etc/geodist/config.toml",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub message_queue: MessageQueueConfig,
    pub location_store: LocationStoreConfig,
    pub distance: DistanceConfig,
    pub worker: WorkerConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// 嵌入式配置：消息队列和位置存储都在进程内，不依赖外部服务
    pub fn in_memory_default() -> Self {
        Self {
            message_queue: MessageQueueConfig::in_memory_default(),
            location_store: LocationStoreConfig::in_memory_default(),
            ..Self::default()
        }
    }

    /// 加载配置：内置默认值 < 配置文件 < `GEODIST_*` 环境变量
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = Self::with_defaults(ConfigBuilder::builder())?;

        if let Some(path) = config_path {
            if Path::new(path).exists() {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            } else {
                return Err(anyhow::anyhow!("配置文件不存在: {}", path));
            }
        } else if let Some(path) = DEFAULT_CONFIG_PATHS
            .iter()
            .find(|path| Path::new(path).exists())
        {
            builder = builder.add_source(File::new(path, FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix("GEODIST")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .context("构建配置失败")?
            .try_deserialize()
            .context("反序列化配置失败")?;

        config.validate()?;

        Ok(config)
    }

    fn with_defaults(builder: Builder<DefaultState>) -> Result<Builder<DefaultState>> {
        let defaults = Self::default();
        let mq = &defaults.message_queue;
        let store = &defaults.location_store;
        let worker = &defaults.worker;

        Ok(builder
            .set_default("api.bind_address", defaults.api.bind_address.clone())?
            .set_default("api.cors_enabled", defaults.api.cors_enabled)?
            .set_default(
                "api.request_timeout_seconds",
                defaults.api.request_timeout_seconds,
            )?
            .set_default("message_queue.type", "Rabbitmq")?
            .set_default("message_queue.url", mq.url.clone())?
            .set_default("message_queue.result_queue", mq.result_queue.clone())?
            .set_default("message_queue.job_queue", mq.job_queue.clone())?
            .set_default("message_queue.durable", mq.durable)?
            .set_default(
                "message_queue.connection_timeout_seconds",
                mq.connection_timeout_seconds,
            )?
            .set_default(
                "message_queue.operation_timeout_seconds",
                mq.operation_timeout_seconds,
            )?
            .set_default("location_store.type", "Redis")?
            .set_default("location_store.url", store.url.clone())?
            .set_default(
                "location_store.connection_timeout_seconds",
                store.connection_timeout_seconds,
            )?
            .set_default("distance.dispatch_mode", "Inline")?
            .set_default("worker.enabled", worker.enabled)?
            .set_default("worker.worker_id", worker.worker_id.clone())?
            .set_default("worker.poll_interval_ms", worker.poll_interval_ms)?
            .set_default("worker.retry_delay_seconds", worker.retry_delay_seconds)?
            .set_default("observability.metrics_enabled", true)?
            .set_default("observability.metrics_endpoint", "/metrics")?
            .set_default("observability.log_level", "info")?
            .set_default("observability.log_format", "Pretty")?)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(toml_str).context("解析TOML配置失败")?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("序列化配置为TOML失败")
    }
}

impl ConfigValidator for AppConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        self.api.validate()?;
        self.message_queue.validate()?;
        self.location_store.validate()?;
        self.distance.validate()?;
        self.worker.validate()?;
        self.observability.validate()?;
        Ok(())
    }
}
