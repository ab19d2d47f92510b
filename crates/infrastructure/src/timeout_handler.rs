//! Timeout handling utilities for broker and store calls
//!
//! Every call that crosses an I/O boundary is bounded, so a hung broker or
//! store turns into a reportable error instead of a stuck request.

use geodist_errors::{GeoError, GeoResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::error;

/// Timeout values for the two external collaborators
#[derive(Debug, Clone, Copy)]
pub struct TimeoutConfig {
    /// Message broker connect timeout
    pub connect_timeout: Duration,
    /// Message broker declare/publish/get/ack timeout
    pub message_queue_timeout: Duration,
    /// Location store operations timeout
    pub location_store_timeout: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            message_queue_timeout: Duration::from_secs(5),
            location_store_timeout: Duration::from_secs(5),
        }
    }
}

/// Timeout handler utility for async operations
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeoutHandler {
    config: TimeoutConfig,
}

impl TimeoutHandler {
    pub fn new(config: TimeoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TimeoutConfig {
        &self.config
    }

    /// Execute broker connect with timeout
    pub async fn connect_operation<F, T>(&self, operation: F, target: &str) -> GeoResult<T>
    where
        F: Future<Output = GeoResult<T>>,
    {
        Self::execute_with_timeout(
            operation,
            self.config.connect_timeout,
            "连接",
            target,
            GeoError::queue_unavailable,
        )
        .await
    }

    /// Execute message queue operation with timeout
    pub async fn message_queue_operation<F, T>(
        &self,
        operation: F,
        operation_name: &str,
    ) -> GeoResult<T>
    where
        F: Future<Output = GeoResult<T>>,
    {
        Self::execute_with_timeout(
            operation,
            self.config.message_queue_timeout,
            "消息队列",
            operation_name,
            GeoError::queue_unavailable,
        )
        .await
    }

    /// Execute location store operation with timeout
    pub async fn location_store_operation<F, T>(
        &self,
        operation: F,
        operation_name: &str,
    ) -> GeoResult<T>
    where
        F: Future<Output = GeoResult<T>>,
    {
        Self::execute_with_timeout(
            operation,
            self.config.location_store_timeout,
            "位置存储",
            operation_name,
            GeoError::store_unavailable,
        )
        .await
    }

    async fn execute_with_timeout<F, T>(
        operation: F,
        duration: Duration,
        category: &str,
        operation_name: &str,
        on_timeout: fn(String) -> GeoError,
    ) -> GeoResult<T>
    where
        F: Future<Output = GeoResult<T>>,
    {
        match timeout(duration, operation).await {
            Ok(result) => result,
            Err(_) => {
                error!(
                    "{}操作超时: {} (超时时间: {:?})",
                    category, operation_name, duration
                );
                Err(on_timeout(format!(
                    "{category}操作 {operation_name} 超时 ({duration:?})"
                )))
            }
        }
    }
}
