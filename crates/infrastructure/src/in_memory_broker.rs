use async_trait::async_trait;
use geodist_domain::{BrokerConnection, Delivery, MessageBroker};
use geodist_errors::{GeoError, GeoResult};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// 内存消息代理
///
/// 进程内模拟RabbitMQ的语义，用于嵌入式部署和测试：
/// - 队列按FIFO投递，`get_one` 在锁内把消息移入未确认集合，竞争消费者不会拿到同一条消息
/// - `ack` 永久删除消息
/// - 连接关闭（或被丢弃）时，该连接上未确认的消息回到队列头部
#[derive(Debug, Clone)]
pub struct InMemoryBroker {
    state: Arc<Mutex<BrokerState>>,
    available: Arc<AtomicBool>,
}

#[derive(Debug, Default)]
struct BrokerState {
    queues: HashMap<String, VecDeque<StoredMessage>>,
    /// delivery_tag -> 未确认消息
    unacked: HashMap<u64, Unacked>,
    next_delivery_tag: u64,
    next_connection_id: u64,
    open_connections: usize,
}

#[derive(Debug, Clone)]
struct StoredMessage {
    payload: Vec<u8>,
    correlation_id: Option<String>,
}

#[derive(Debug)]
struct Unacked {
    connection_id: u64,
    queue: String,
    message: StoredMessage,
}

/// 内存队列统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InMemoryQueueStats {
    pub ready: usize,
    pub unacked: usize,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        info!("Creating in-memory message broker");
        Self {
            state: Arc::default(),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// 模拟代理宕机或恢复；不可用时 `connect` 返回 `QueueUnavailable`
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn queue_stats(&self, queue: &str) -> InMemoryQueueStats {
        let state = lock(&self.state);
        InMemoryQueueStats {
            ready: state.queues.get(queue).map_or(0, VecDeque::len),
            unacked: state.unacked.values().filter(|u| u.queue == queue).count(),
        }
    }

    /// 尚未关闭或丢弃的连接数
    pub fn open_connections(&self) -> usize {
        lock(&self.state).open_connections
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageBroker for InMemoryBroker {
    async fn connect(&self) -> GeoResult<Box<dyn BrokerConnection>> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(GeoError::queue_unavailable("内存消息代理不可用"));
        }

        let id = {
            let mut state = lock(&self.state);
            state.next_connection_id += 1;
            state.open_connections += 1;
            state.next_connection_id
        };

        Ok(Box::new(InMemoryConnection {
            id,
            state: Arc::clone(&self.state),
            available: Arc::clone(&self.available),
            closed: AtomicBool::new(false),
        }))
    }
}

pub struct InMemoryConnection {
    id: u64,
    state: Arc<Mutex<BrokerState>>,
    available: Arc<AtomicBool>,
    closed: AtomicBool,
}

impl InMemoryConnection {
    fn ensure_usable(&self) -> GeoResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(GeoError::queue_unavailable("连接已关闭"));
        }
        if !self.available.load(Ordering::SeqCst) {
            return Err(GeoError::queue_unavailable("内存消息代理不可用"));
        }
        Ok(())
    }

    /// 释放连接，并把本连接的未确认消息按原顺序放回队列头部
    fn release(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let mut state = lock(&self.state);
        state.open_connections = state.open_connections.saturating_sub(1);

        let mut tags: Vec<u64> = state
            .unacked
            .iter()
            .filter(|(_, u)| u.connection_id == self.id)
            .map(|(tag, _)| *tag)
            .collect();
        // 标签越大越晚取出，倒序插回头部以保持原顺序
        tags.sort_unstable_by(|a, b| b.cmp(a));

        for tag in tags {
            if let Some(unacked) = state.unacked.remove(&tag) {
                debug!("消息 {} 重新入队: {}", tag, unacked.queue);
                state
                    .queues
                    .entry(unacked.queue)
                    .or_default()
                    .push_front(unacked.message);
            }
        }
    }
}

#[async_trait]
impl BrokerConnection for InMemoryConnection {
    async fn declare_queue(&self, queue: &str) -> GeoResult<()> {
        self.ensure_usable()?;
        lock(&self.state)
            .queues
            .entry(queue.to_string())
            .or_default();
        Ok(())
    }

    async fn publish(
        &self,
        queue: &str,
        payload: &[u8],
        correlation_id: Option<&str>,
    ) -> GeoResult<()> {
        self.ensure_usable()?;
        let mut state = lock(&self.state);
        let messages = state
            .queues
            .get_mut(queue)
            .ok_or_else(|| GeoError::queue_unavailable(format!("队列 {queue} 未声明")))?;

        messages.push_back(StoredMessage {
            payload: payload.to_vec(),
            correlation_id: correlation_id.map(str::to_string),
        });
        Ok(())
    }

    async fn get_one(&self, queue: &str) -> GeoResult<Option<Delivery>> {
        self.ensure_usable()?;
        let mut state = lock(&self.state);

        let message = state
            .queues
            .get_mut(queue)
            .ok_or_else(|| GeoError::queue_unavailable(format!("队列 {queue} 未声明")))?
            .pop_front();

        let Some(message) = message else {
            return Ok(None);
        };

        state.next_delivery_tag += 1;
        let delivery_tag = state.next_delivery_tag;
        let delivery = Delivery {
            payload: message.payload.clone(),
            delivery_tag,
            correlation_id: message.correlation_id.clone(),
        };
        state.unacked.insert(
            delivery_tag,
            Unacked {
                connection_id: self.id,
                queue: queue.to_string(),
                message,
            },
        );

        Ok(Some(delivery))
    }

    async fn ack(&self, delivery_tag: u64) -> GeoResult<()> {
        self.ensure_usable()?;
        let mut state = lock(&self.state);

        let owned = state
            .unacked
            .get(&delivery_tag)
            .is_some_and(|unacked| unacked.connection_id == self.id);
        if !owned {
            return Err(GeoError::queue_unavailable(format!(
                "未知的投递标签: {delivery_tag}"
            )));
        }

        state.unacked.remove(&delivery_tag);
        Ok(())
    }

    async fn close(self: Box<Self>) -> GeoResult<()> {
        self.release();
        Ok(())
    }
}

impl Drop for InMemoryConnection {
    fn drop(&mut self) {
        self.release();
    }
}

fn lock(state: &Mutex<BrokerState>) -> MutexGuard<'_, BrokerState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUEUE: &str = "result_queue";

    async fn connected(broker: &InMemoryBroker) -> Box<dyn BrokerConnection> {
        let conn = broker.connect().await.unwrap();
        conn.declare_queue(QUEUE).await.unwrap();
        conn
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let broker = InMemoryBroker::new();
        let conn = connected(&broker).await;
        for value in ["1", "2", "3"] {
            conn.publish(QUEUE, value.as_bytes(), None).await.unwrap();
        }

        for expected in ["1", "2", "3"] {
            let delivery = conn.get_one(QUEUE).await.unwrap().unwrap();
            assert_eq!(delivery.payload, expected.as_bytes());
            conn.ack(delivery.delivery_tag).await.unwrap();
        }
        assert!(conn.get_one(QUEUE).await.unwrap().is_none());
        conn.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_declare_is_idempotent() {
        let broker = InMemoryBroker::new();
        let conn = connected(&broker).await;
        conn.publish(QUEUE, b"1", None).await.unwrap();
        conn.declare_queue(QUEUE).await.unwrap();
        assert_eq!(broker.queue_stats(QUEUE).ready, 1);
    }

    #[tokio::test]
    async fn test_undeclared_queue_is_rejected() {
        let broker = InMemoryBroker::new();
        let conn = broker.connect().await.unwrap();
        assert!(matches!(
            conn.publish("nowhere", b"1", None).await,
            Err(GeoError::QueueUnavailable(_))
        ));
        assert!(matches!(
            conn.get_one("nowhere").await,
            Err(GeoError::QueueUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_unacked_message_is_requeued_on_close() {
        let broker = InMemoryBroker::new();
        let conn = connected(&broker).await;
        conn.publish(QUEUE, b"first", None).await.unwrap();
        conn.publish(QUEUE, b"second", None).await.unwrap();

        let first = conn.get_one(QUEUE).await.unwrap().unwrap();
        assert_eq!(first.payload, b"first");
        assert_eq!(
            broker.queue_stats(QUEUE),
            InMemoryQueueStats {
                ready: 1,
                unacked: 1
            }
        );
        conn.close().await.unwrap();

        let conn = connected(&broker).await;
        let again = conn.get_one(QUEUE).await.unwrap().unwrap();
        assert_eq!(again.payload, b"first");
    }

    #[tokio::test]
    async fn test_unacked_message_is_requeued_on_drop() {
        let broker = InMemoryBroker::new();
        {
            let conn = connected(&broker).await;
            conn.publish(QUEUE, b"42.0", None).await.unwrap();
            let _delivery = conn.get_one(QUEUE).await.unwrap().unwrap();
        }
        assert_eq!(broker.queue_stats(QUEUE).ready, 1);
        assert_eq!(broker.queue_stats(QUEUE).unacked, 0);
        assert_eq!(broker.open_connections(), 0);
    }

    #[tokio::test]
    async fn test_acked_message_is_gone_after_close() {
        let broker = InMemoryBroker::new();
        let conn = connected(&broker).await;
        conn.publish(QUEUE, b"42.0", Some("job-1")).await.unwrap();
        let delivery = conn.get_one(QUEUE).await.unwrap().unwrap();
        assert_eq!(delivery.correlation_id.as_deref(), Some("job-1"));
        conn.ack(delivery.delivery_tag).await.unwrap();
        conn.close().await.unwrap();

        assert_eq!(broker.queue_stats(QUEUE), InMemoryQueueStats::default());
    }

    #[tokio::test]
    async fn test_cannot_ack_another_connections_delivery() {
        let broker = InMemoryBroker::new();
        let a = connected(&broker).await;
        let b = connected(&broker).await;
        a.publish(QUEUE, b"1", None).await.unwrap();
        let delivery = a.get_one(QUEUE).await.unwrap().unwrap();
        assert!(b.ack(delivery.delivery_tag).await.is_err());
        assert!(a.ack(delivery.delivery_tag).await.is_ok());
    }

    #[tokio::test]
    async fn test_competing_consumers_never_share_a_message() {
        let broker = InMemoryBroker::new();
        let producer = connected(&broker).await;
        for i in 0..100 {
            producer
                .publish(QUEUE, i.to_string().as_bytes(), None)
                .await
                .unwrap();
        }

        let mut handles = Vec::new();
        for _ in 0..8 {
            let broker = broker.clone();
            handles.push(tokio::spawn(async move {
                let conn = connected(&broker).await;
                let mut seen = Vec::new();
                while let Some(delivery) = conn.get_one(QUEUE).await.unwrap() {
                    conn.ack(delivery.delivery_tag).await.unwrap();
                    seen.push(String::from_utf8(delivery.payload).unwrap());
                }
                conn.close().await.unwrap();
                seen
            }));
        }

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.await.unwrap());
        }
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 100);
    }

    #[tokio::test]
    async fn test_unavailable_broker() {
        let broker = InMemoryBroker::new();
        let conn = connected(&broker).await;
        broker.set_available(false);

        assert!(matches!(
            broker.connect().await,
            Err(GeoError::QueueUnavailable(_))
        ));
        assert!(matches!(
            conn.publish(QUEUE, b"1", None).await,
            Err(GeoError::QueueUnavailable(_))
        ));

        broker.set_available(true);
        assert!(broker.connect().await.is_ok());
    }
}
