use async_trait::async_trait;
use geodist_errors::GeoResult;

use crate::entities::Delivery;

/// 消息代理：每次调用 `connect` 都得到一个独立的连接
#[async_trait]
pub trait MessageBroker: Send + Sync {
    async fn connect(&self) -> GeoResult<Box<dyn BrokerConnection>>;
}

/// 一个代理连接
///
/// 同一连接上的发布和获取之前必须先声明队列。连接通过 `close` 释放；
/// 关闭时尚未确认的消息由代理重新入队。
#[async_trait]
pub trait BrokerConnection: Send + Sync {
    /// 声明队列，队列已存在时无副作用
    async fn declare_queue(&self, queue: &str) -> GeoResult<()>;

    /// 把消息追加到队列尾部
    async fn publish(
        &self,
        queue: &str,
        payload: &[u8],
        correlation_id: Option<&str>,
    ) -> GeoResult<()>;

    /// 非阻塞地获取一条消息，队列为空时返回 `None`
    async fn get_one(&self, queue: &str) -> GeoResult<Option<Delivery>>;

    /// 确认消息，代理将永久删除它
    async fn ack(&self, delivery_tag: u64) -> GeoResult<()>;

    async fn close(self: Box<Self>) -> GeoResult<()>;
}
