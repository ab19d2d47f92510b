use std::sync::Arc;
use std::time::Duration;

use geodist_application::{close_connection, DistanceService};
use geodist_config::WorkerConfig;
use geodist_domain::{payload, BrokerConnection, MessageBroker};
use geodist_errors::GeoResult;
use metrics::counter;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// 处理一条任务消息的结果
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// 任务队列为空
    Idle,
    /// 结果已发布，任务已确认
    Completed { job_id: String, total_distance: f64 },
    /// 任务无法完成，已确认并丢弃
    Dropped { reason: String },
}

/// 距离计算Worker
///
/// 持有一个代理连接，从任务队列逐条取出任务，计算后把结果发布到结果队列。
/// 连接出错时关闭连接（未确认的任务随之重新入队），等待 `retry_delay` 后重连。
pub struct DistanceWorker {
    worker_id: String,
    broker: Arc<dyn MessageBroker>,
    distance_service: Arc<DistanceService>,
    poll_interval: Duration,
    retry_delay: Duration,
}

impl DistanceWorker {
    pub fn new(
        config: &WorkerConfig,
        broker: Arc<dyn MessageBroker>,
        distance_service: Arc<DistanceService>,
    ) -> Self {
        let host = hostname::get()
            .unwrap_or_else(|_| "unknown".into())
            .to_string_lossy()
            .to_string();

        Self {
            worker_id: format!("{}@{}", config.worker_id, host),
            broker,
            distance_service,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            retry_delay: Duration::from_secs(config.retry_delay_seconds),
        }
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// 运行直到收到关闭信号
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!(
            "Starting distance worker {} on queue {}",
            self.worker_id,
            self.distance_service.job_queue()
        );

        loop {
            match self.connect().await {
                Ok(conn) => {
                    let outcome = self.drain(conn.as_ref(), &mut shutdown_rx).await;
                    close_connection(conn).await;
                    match outcome {
                        Ok(()) => break,
                        Err(e) => warn!("Worker {} 连接出错，准备重连: {}", self.worker_id, e),
                    }
                }
                Err(e) => warn!("Worker {} 无法连接消息队列: {}", self.worker_id, e),
            }

            tokio::select! {
                _ = shutdown_rx.recv() => break,
                _ = sleep(self.retry_delay) => {}
            }
        }

        info!("Distance worker {} stopped", self.worker_id);
    }

    async fn connect(&self) -> GeoResult<Box<dyn BrokerConnection>> {
        let conn = self.broker.connect().await?;
        conn.declare_queue(self.distance_service.job_queue()).await?;
        conn.declare_queue(self.distance_service.result_queue()).await?;
        Ok(conn)
    }

    /// 持续处理任务；收到关闭信号时返回 `Ok(())`，连接出错时返回错误
    async fn drain(
        &self,
        conn: &dyn BrokerConnection,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) -> GeoResult<()> {
        loop {
            if !matches!(shutdown_rx.try_recv(), Err(TryRecvError::Empty)) {
                return Ok(());
            }

            if self.process_next(conn).await? == JobOutcome::Idle {
                tokio::select! {
                    _ = shutdown_rx.recv() => return Ok(()),
                    _ = sleep(self.poll_interval) => {}
                }
            }
        }
    }

    /// 处理任务队列中的下一条消息，连接须来自 [`Self::connect`]
    ///
    /// 无法解析的任务和引用了不存在位置的任务会被确认并丢弃。
    /// 可重试的错误原样返回，此时任务保持未确认状态。
    async fn process_next(&self, conn: &dyn BrokerConnection) -> GeoResult<JobOutcome> {
        let Some(delivery) = conn.get_one(self.distance_service.job_queue()).await? else {
            return Ok(JobOutcome::Idle);
        };

        let job = match payload::decode_job(&delivery.payload) {
            Ok(job) => job,
            Err(e) => {
                error!(
                    "丢弃无法解析的任务消息: {} (原始内容: {:?})",
                    e,
                    String::from_utf8_lossy(&delivery.payload)
                );
                conn.ack(delivery.delivery_tag).await?;
                counter!("geodist_worker_jobs_dropped_total").increment(1);
                return Ok(JobOutcome::Dropped {
                    reason: e.to_string(),
                });
            }
        };

        debug!("Worker {} 开始处理任务 {}", self.worker_id, job.job_id);

        let total_distance = match self.distance_service.compute(&job.location_ids).await {
            Ok(distance) => distance,
            Err(e) if e.is_retryable() => return Err(e),
            Err(e) => {
                warn!("丢弃任务 {}: {}", job.job_id, e);
                conn.ack(delivery.delivery_tag).await?;
                counter!("geodist_worker_jobs_dropped_total").increment(1);
                return Ok(JobOutcome::Dropped {
                    reason: e.to_string(),
                });
            }
        };

        conn.publish(
            self.distance_service.result_queue(),
            &payload::encode_distance(total_distance),
            Some(&job.job_id),
        )
        .await?;
        conn.ack(delivery.delivery_tag).await?;

        counter!("geodist_worker_jobs_processed_total").increment(1);
        info!(
            "任务 {} 完成: {} 公里",
            job.job_id, total_distance
        );

        Ok(JobOutcome::Completed {
            job_id: job.job_id,
            total_distance,
        })
    }
}
