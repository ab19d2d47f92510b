use std::sync::Arc;

use geodist_config::{DispatchMode, MessageQueueConfig};
use geodist_domain::{
    payload, BrokerConnection, DistanceJob, DistanceResult, JobReceipt, Location, LocationId,
    LocationStore, MessageBroker,
};
use geodist_errors::{GeoError, GeoResult};
use metrics::counter;
use tracing::{debug, error, info, instrument, warn};

use super::connection::close_connection;

/// 距离计算服务 - 负责任务提交与结果获取
///
/// 每次提交或获取都使用独立的代理连接，调用结束前连接一定会被关闭。
pub struct DistanceService {
    broker: Arc<dyn MessageBroker>,
    store: Arc<dyn LocationStore>,
    result_queue: String,
    job_queue: String,
    dispatch_mode: DispatchMode,
}

impl DistanceService {
    pub fn new(
        broker: Arc<dyn MessageBroker>,
        store: Arc<dyn LocationStore>,
        queue_config: &MessageQueueConfig,
        dispatch_mode: DispatchMode,
    ) -> Self {
        Self {
            broker,
            store,
            result_queue: queue_config.result_queue.clone(),
            job_queue: queue_config.job_queue.clone(),
            dispatch_mode,
        }
    }

    pub fn result_queue(&self) -> &str {
        &self.result_queue
    }

    pub fn job_queue(&self) -> &str {
        &self.job_queue
    }

    pub fn dispatch_mode(&self) -> DispatchMode {
        self.dispatch_mode
    }

    /// 提交一次距离计算
    ///
    /// 参数个数不为2时不做任何查询；任一位置不存在时不发布任何消息。
    #[instrument(skip(self), fields(mode = ?self.dispatch_mode))]
    pub async fn submit(&self, location_ids: &[LocationId]) -> GeoResult<JobReceipt> {
        let [first, second] = location_ids else {
            return Err(GeoError::invalid_request(format!(
                "location_ids 必须恰好包含2个位置ID，实际为 {} 个",
                location_ids.len()
            )));
        };

        let job = DistanceJob::new(first.clone(), second.clone());
        let (from, to) = self.resolve_pair(&job.location_ids).await?;

        let (queue, body) = match self.dispatch_mode {
            DispatchMode::Inline => {
                let distance = from.distance_to(&to);
                debug!(
                    "{} -> {} 的距离为 {} 公里",
                    from.name, to.name, distance
                );
                (&self.result_queue, payload::encode_distance(distance))
            }
            DispatchMode::Queued => (&self.job_queue, payload::encode_job(&job)?),
        };

        let conn = self.broker.connect().await?;
        let outcome = Self::declare_and_publish(conn.as_ref(), queue, &body, &job.job_id).await;
        close_connection(conn).await;
        outcome?;

        counter!("geodist_jobs_submitted_total").increment(1);
        info!("距离任务 {} 已发送到队列 {}", job.job_id, queue);

        Ok(JobReceipt { job_id: job.job_id })
    }

    /// 从结果队列中取出一个结果
    ///
    /// 队列为空时返回 `Ok(None)`。结果与哪一次提交对应不做保证，
    /// 先到先得；消息携带的任务ID会原样返回。
    #[instrument(skip(self))]
    pub async fn retrieve(&self) -> GeoResult<Option<DistanceResult>> {
        let conn = self.broker.connect().await?;
        let outcome = self.take_result(conn.as_ref()).await;
        close_connection(conn).await;

        match &outcome {
            Ok(Some(_)) => counter!("geodist_results_retrieved_total").increment(1),
            Ok(None) => counter!("geodist_results_empty_total").increment(1),
            Err(_) => {}
        }

        outcome
    }

    /// 按ID解析两个位置并计算距离
    pub async fn compute(&self, location_ids: &[LocationId; 2]) -> GeoResult<f64> {
        let (from, to) = self.resolve_pair(location_ids).await?;
        Ok(from.distance_to(&to))
    }

    /// 按顺序查询，第一个不存在的ID即返回错误
    async fn resolve_pair(&self, location_ids: &[LocationId; 2]) -> GeoResult<(Location, Location)> {
        let [first, second] = location_ids;
        let from = self.resolve(first).await?;
        let to = self.resolve(second).await?;
        Ok((from, to))
    }

    async fn resolve(&self, id: &str) -> GeoResult<Location> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| GeoError::location_not_found(id))
    }

    async fn declare_and_publish(
        conn: &dyn BrokerConnection,
        queue: &str,
        body: &[u8],
        job_id: &str,
    ) -> GeoResult<()> {
        conn.declare_queue(queue).await?;
        conn.publish(queue, body, Some(job_id)).await
    }

    async fn take_result(&self, conn: &dyn BrokerConnection) -> GeoResult<Option<DistanceResult>> {
        conn.declare_queue(&self.result_queue).await?;

        let Some(delivery) = conn.get_one(&self.result_queue).await? else {
            debug!("结果队列 {} 为空", self.result_queue);
            return Ok(None);
        };

        let decoded = payload::decode_distance(&delivery.payload);
        if let Err(e) = &decoded {
            error!(
                "结果消息损坏，确认后丢弃: {} (原始内容: {:?})",
                e,
                String::from_utf8_lossy(&delivery.payload)
            );
        }

        if let Err(e) = conn.ack(delivery.delivery_tag).await {
            warn!("确认结果消息 {} 失败: {}", delivery.delivery_tag, e);
        }

        let total_distance = decoded?;
        debug!("取得距离结果: {} 公里", total_distance);

        Ok(Some(DistanceResult {
            total_distance,
            job_id: delivery.correlation_id,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use geodist_domain::Delivery;
    use geodist_infrastructure::{InMemoryBroker, InMemoryLocationStore};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const NY_LA_KM: f64 = 3935.746254609723;

    async fn seeded_store() -> Arc<InMemoryLocationStore> {
        let store = Arc::new(InMemoryLocationStore::new());
        store
            .insert("ny", Location::new("Nueva York", 40.7128, -74.0060))
            .await;
        store
            .insert("la", Location::new("Los Ángeles", 34.0522, -118.2437))
            .await;
        store
    }

    fn service(
        broker: Arc<dyn MessageBroker>,
        store: Arc<dyn LocationStore>,
        mode: DispatchMode,
    ) -> DistanceService {
        DistanceService::new(broker, store, &MessageQueueConfig::in_memory_default(), mode)
    }

    fn ids(values: &[&str]) -> Vec<LocationId> {
        values.iter().map(|v| v.to_string()).collect()
    }

    /// 记录调用次数的位置存储，用于确认参数校验先于查询
    struct CountingStore {
        inner: Arc<InMemoryLocationStore>,
        gets: AtomicUsize,
    }

    #[async_trait]
    impl LocationStore for CountingStore {
        async fn get(&self, id: &str) -> GeoResult<Option<Location>> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            self.inner.get(id).await
        }

        async fn put(&self, location: &Location) -> GeoResult<LocationId> {
            self.inner.put(location).await
        }
    }

    struct FailingStore;

    #[async_trait]
    impl LocationStore for FailingStore {
        async fn get(&self, _id: &str) -> GeoResult<Option<Location>> {
            Err(GeoError::store_unavailable("connection refused"))
        }

        async fn put(&self, _location: &Location) -> GeoResult<LocationId> {
            Err(GeoError::store_unavailable("connection refused"))
        }
    }

    /// 确认总是失败的连接包装
    struct AckFailingBroker(InMemoryBroker);

    struct AckFailingConnection(Box<dyn BrokerConnection>);

    #[async_trait]
    impl MessageBroker for AckFailingBroker {
        async fn connect(&self) -> GeoResult<Box<dyn BrokerConnection>> {
            Ok(Box::new(AckFailingConnection(self.0.connect().await?)))
        }
    }

    #[async_trait]
    impl BrokerConnection for AckFailingConnection {
        async fn declare_queue(&self, queue: &str) -> GeoResult<()> {
            self.0.declare_queue(queue).await
        }

        async fn publish(
            &self,
            queue: &str,
            payload: &[u8],
            correlation_id: Option<&str>,
        ) -> GeoResult<()> {
            self.0.publish(queue, payload, correlation_id).await
        }

        async fn get_one(&self, queue: &str) -> GeoResult<Option<Delivery>> {
            self.0.get_one(queue).await
        }

        async fn ack(&self, _delivery_tag: u64) -> GeoResult<()> {
            Err(GeoError::queue_unavailable("channel closed"))
        }

        async fn close(self: Box<Self>) -> GeoResult<()> {
            self.0.close().await
        }
    }

    async fn publish_raw(broker: &InMemoryBroker, queue: &str, body: &[u8]) {
        let conn = broker.connect().await.unwrap();
        conn.declare_queue(queue).await.unwrap();
        conn.publish(queue, body, None).await.unwrap();
        conn.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_submit_then_retrieve_ny_la() {
        let broker = Arc::new(InMemoryBroker::new());
        let service = service(broker.clone(), seeded_store().await, DispatchMode::Inline);

        let receipt = service.submit(&ids(&["ny", "la"])).await.unwrap();
        assert_eq!(broker.queue_stats("result_queue").ready, 1);

        let result = service.retrieve().await.unwrap().unwrap();
        assert!((result.total_distance - NY_LA_KM).abs() < 1e-9);
        assert_eq!(result.job_id, Some(receipt.job_id));

        assert!(service.retrieve().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_near_antipodal_pair_round_trips() {
        let broker = Arc::new(InMemoryBroker::new());
        let store = Arc::new(InMemoryLocationStore::new());
        store.insert("north", Location::new("North", 87.5, -74.006)).await;
        store.insert("south", Location::new("South", -87.5, 105.994)).await;
        let service = service(broker, store, DispatchMode::Inline);

        service.submit(&ids(&["north", "south"])).await.unwrap();

        let result = service.retrieve().await.unwrap().unwrap();
        assert!(result.total_distance.is_finite());
        assert!((result.total_distance - 20015.086796020572).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_result_payload_is_bare_decimal() {
        let broker = Arc::new(InMemoryBroker::new());
        let service = service(broker.clone(), seeded_store().await, DispatchMode::Inline);
        service.submit(&ids(&["ny", "la"])).await.unwrap();

        let conn = broker.connect().await.unwrap();
        let delivery = conn.get_one("result_queue").await.unwrap().unwrap();
        let text = String::from_utf8(delivery.payload).unwrap();
        assert_eq!(text.parse::<f64>().unwrap(), NY_LA_KM);
        assert!(!text.contains('{'));
        conn.ack(delivery.delivery_tag).await.unwrap();
        conn.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_arity_checked_before_lookup() {
        let broker = Arc::new(InMemoryBroker::new());
        let store = Arc::new(CountingStore {
            inner: seeded_store().await,
            gets: AtomicUsize::new(0),
        });
        let service = service(broker.clone(), store.clone(), DispatchMode::Inline);

        for bad in [ids(&[]), ids(&["ny"]), ids(&["ny", "la", "ny"])] {
            let err = service.submit(&bad).await.unwrap_err();
            assert!(matches!(err, GeoError::InvalidRequest(_)));
        }

        assert_eq!(store.gets.load(Ordering::SeqCst), 0);
        assert_eq!(broker.queue_stats("result_queue").ready, 0);
    }

    #[tokio::test]
    async fn test_missing_location_publishes_nothing() {
        let broker = Arc::new(InMemoryBroker::new());
        let service = service(broker.clone(), seeded_store().await, DispatchMode::Inline);

        let err = service.submit(&ids(&["ny", "atlantis"])).await.unwrap_err();
        match err {
            GeoError::LocationNotFound { id } => assert_eq!(id, "atlantis"),
            other => panic!("unexpected error: {other:?}"),
        }

        let err = service.submit(&ids(&["mu", "lemuria"])).await.unwrap_err();
        assert!(matches!(err, GeoError::LocationNotFound { id } if id == "mu"));

        assert_eq!(broker.queue_stats("result_queue"), Default::default());
    }

    #[tokio::test]
    async fn test_store_failure_surfaces_as_store_unavailable() {
        let broker = Arc::new(InMemoryBroker::new());
        let service = service(broker.clone(), Arc::new(FailingStore), DispatchMode::Inline);

        let err = service.submit(&ids(&["ny", "la"])).await.unwrap_err();
        assert!(matches!(err, GeoError::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn test_broker_down_on_submit_and_retrieve() {
        let broker = Arc::new(InMemoryBroker::new());
        broker.set_available(false);
        let service = service(broker.clone(), seeded_store().await, DispatchMode::Inline);

        let err = service.submit(&ids(&["ny", "la"])).await.unwrap_err();
        assert!(matches!(err, GeoError::QueueUnavailable(_)));

        let err = service.retrieve().await.unwrap_err();
        assert!(matches!(err, GeoError::QueueUnavailable(_)));
    }

    #[tokio::test]
    async fn test_empty_queue_is_not_an_error() {
        let broker = Arc::new(InMemoryBroker::new());
        let service = service(broker, seeded_store().await, DispatchMode::Inline);
        assert_eq!(service.retrieve().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_corrupt_message_is_acked_and_reported() {
        let broker = Arc::new(InMemoryBroker::new());
        publish_raw(&broker, "result_queue", b"not-a-number").await;
        let service = service(broker.clone(), seeded_store().await, DispatchMode::Inline);

        let err = service.retrieve().await.unwrap_err();
        match err {
            GeoError::CorruptMessage(reason) => assert!(reason.contains("not-a-number")),
            other => panic!("unexpected error: {other:?}"),
        }

        assert_eq!(broker.queue_stats("result_queue"), Default::default());
        assert!(service.retrieve().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ack_failure_still_returns_value() {
        let inner = InMemoryBroker::new();
        publish_raw(&inner, "result_queue", b"12.5").await;
        let broker = Arc::new(AckFailingBroker(inner.clone()));
        let service = service(broker, seeded_store().await, DispatchMode::Inline);

        let result = service.retrieve().await.unwrap().unwrap();
        assert_eq!(result.total_distance, 12.5);
        assert_eq!(result.job_id, None);

        // 未确认的消息在连接关闭后重新入队
        assert_eq!(inner.queue_stats("result_queue").ready, 1);
    }

    #[tokio::test]
    async fn test_retrieve_closes_connection_on_every_path() {
        let broker = Arc::new(InMemoryBroker::new());
        let service = service(broker.clone(), seeded_store().await, DispatchMode::Inline);

        service.retrieve().await.unwrap();
        publish_raw(&broker, "result_queue", b"bad").await;
        service.retrieve().await.unwrap_err();
        service.submit(&ids(&["ny", "la"])).await.unwrap();
        service.retrieve().await.unwrap();

        assert_eq!(broker.open_connections(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_retrieval_of_single_result() {
        let broker = Arc::new(InMemoryBroker::new());
        let service = Arc::new(service(
            broker.clone(),
            seeded_store().await,
            DispatchMode::Inline,
        ));
        service.submit(&ids(&["ny", "la"])).await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.retrieve().await })
            })
            .collect();

        let mut found = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap().is_some() {
                found += 1;
            }
        }

        assert_eq!(found, 1);
        assert_eq!(broker.queue_stats("result_queue"), Default::default());
    }

    #[tokio::test]
    async fn test_queued_mode_publishes_job() {
        let broker = Arc::new(InMemoryBroker::new());
        let service = service(broker.clone(), seeded_store().await, DispatchMode::Queued);

        let receipt = service.submit(&ids(&["ny", "la"])).await.unwrap();
        assert_eq!(broker.queue_stats("distance_jobs").ready, 1);
        assert_eq!(broker.queue_stats("result_queue").ready, 0);

        let conn = broker.connect().await.unwrap();
        let delivery = conn.get_one("distance_jobs").await.unwrap().unwrap();
        let job = payload::decode_job(&delivery.payload).unwrap();
        assert_eq!(job.job_id, receipt.job_id);
        assert_eq!(job.location_ids, ["ny".to_string(), "la".to_string()]);
        conn.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_queued_mode_still_rejects_unknown_locations() {
        let broker = Arc::new(InMemoryBroker::new());
        let service = service(broker.clone(), seeded_store().await, DispatchMode::Queued);

        let err = service.submit(&ids(&["ny", "atlantis"])).await.unwrap_err();
        assert!(matches!(err, GeoError::LocationNotFound { .. }));
        assert_eq!(broker.queue_stats("distance_jobs").ready, 0);
    }
}
