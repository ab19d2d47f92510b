use async_trait::async_trait;
use geodist_config::MessageQueueConfig;
use geodist_domain::{BrokerConnection, Delivery, MessageBroker};
use geodist_errors::{GeoError, GeoResult};
use lapin::{
    options::*, publisher_confirm::Confirmation, types::FieldTable, types::ShortString,
    BasicProperties, Channel, Connection, ConnectionProperties,
};
use std::time::Duration;
use tracing::{debug, warn};

use crate::timeout_handler::{TimeoutConfig, TimeoutHandler};

/// RabbitMQ消息代理
///
/// 不持有长连接，每次 `connect` 都建立新的AMQP连接和通道。
pub struct RabbitMQBroker {
    url: String,
    durable: bool,
    timeouts: TimeoutHandler,
}

impl RabbitMQBroker {
    pub fn new(config: &MessageQueueConfig) -> Self {
        Self {
            url: config.url.clone(),
            durable: config.durable,
            timeouts: TimeoutHandler::new(TimeoutConfig {
                connect_timeout: Duration::from_secs(config.connection_timeout_seconds),
                message_queue_timeout: Duration::from_secs(config.operation_timeout_seconds),
                ..TimeoutConfig::default()
            }),
        }
    }
}

#[async_trait]
impl MessageBroker for RabbitMQBroker {
    async fn connect(&self) -> GeoResult<Box<dyn BrokerConnection>> {
        let (connection, channel) = self
            .timeouts
            .connect_operation(
                async {
                    let connection =
                        Connection::connect(&self.url, ConnectionProperties::default())
                            .await
                            .map_err(|e| {
                                GeoError::queue_unavailable(format!("连接RabbitMQ失败: {e}"))
                            })?;

                    let channel = connection.create_channel().await.map_err(|e| {
                        GeoError::queue_unavailable(format!("创建通道失败: {e}"))
                    })?;

                    channel
                        .confirm_select(ConfirmSelectOptions::default())
                        .await
                        .map_err(|e| {
                            GeoError::queue_unavailable(format!("启用发布确认失败: {e}"))
                        })?;

                    Ok((connection, channel))
                },
                "RabbitMQ",
            )
            .await?;

        debug!("已建立RabbitMQ连接");

        Ok(Box::new(RabbitMQConnection {
            connection: Some(connection),
            channel,
            durable: self.durable,
            timeouts: self.timeouts,
        }))
    }
}

/// 单次请求使用的RabbitMQ连接
///
/// 未显式关闭就被丢弃时，会在后台关闭底层连接，代理随之把未确认的消息重新入队。
pub struct RabbitMQConnection {
    connection: Option<Connection>,
    channel: Channel,
    durable: bool,
    timeouts: TimeoutHandler,
}

#[async_trait]
impl BrokerConnection for RabbitMQConnection {
    async fn declare_queue(&self, queue: &str) -> GeoResult<()> {
        self.timeouts
            .message_queue_operation(
                async {
                    self.channel
                        .queue_declare(
                            queue,
                            QueueDeclareOptions {
                                durable: self.durable,
                                exclusive: false,
                                auto_delete: false,
                                ..Default::default()
                            },
                            FieldTable::default(),
                        )
                        .await
                        .map_err(|e| {
                            GeoError::queue_unavailable(format!("声明队列 {queue} 失败: {e}"))
                        })
                },
                "queue_declare",
            )
            .await?;

        debug!("队列 {} 声明成功", queue);
        Ok(())
    }

    async fn publish(
        &self,
        queue: &str,
        payload: &[u8],
        correlation_id: Option<&str>,
    ) -> GeoResult<()> {
        let mut properties = BasicProperties::default().with_delivery_mode(2); // 2 = persistent
        if let Some(id) = correlation_id {
            properties = properties.with_correlation_id(ShortString::from(id.to_string()));
        }

        self.timeouts
            .message_queue_operation(
                async {
                    let confirm = self
                        .channel
                        .basic_publish(
                            "",
                            queue,
                            BasicPublishOptions::default(),
                            payload,
                            properties,
                        )
                        .await
                        .map_err(|e| {
                            GeoError::queue_unavailable(format!(
                                "发布消息到队列 {queue} 失败: {e}"
                            ))
                        })?;

                    let confirmation = confirm.await.map_err(|e| {
                        GeoError::queue_unavailable(format!("消息发布确认失败: {e}"))
                    })?;
                    match confirmation {
                        Confirmation::Ack(_) => Ok(()),
                        Confirmation::Nack(_) => Err(GeoError::queue_unavailable(format!(
                            "RabbitMQ拒绝了发往队列 {queue} 的消息"
                        ))),
                        Confirmation::NotRequested => Err(GeoError::queue_unavailable(
                            "通道未启用发布确认",
                        )),
                    }
                },
                "basic_publish",
            )
            .await?;

        debug!("消息已发布到队列: {}", queue);
        Ok(())
    }

    async fn get_one(&self, queue: &str) -> GeoResult<Option<Delivery>> {
        let message = self
            .timeouts
            .message_queue_operation(
                async {
                    self.channel
                        .basic_get(queue, BasicGetOptions::default())
                        .await
                        .map_err(|e| {
                            GeoError::queue_unavailable(format!(
                                "从队列 {queue} 获取消息失败: {e}"
                            ))
                        })
                },
                "basic_get",
            )
            .await?;

        Ok(message.map(|message| {
            let delivery = message.delivery;
            Delivery {
                correlation_id: delivery
                    .properties
                    .correlation_id()
                    .as_ref()
                    .map(|id| id.as_str().to_string()),
                delivery_tag: delivery.delivery_tag,
                payload: delivery.data,
            }
        }))
    }

    async fn ack(&self, delivery_tag: u64) -> GeoResult<()> {
        self.timeouts
            .message_queue_operation(
                async {
                    self.channel
                        .basic_ack(delivery_tag, BasicAckOptions::default())
                        .await
                        .map_err(|e| GeoError::queue_unavailable(format!("确认消息失败: {e}")))
                },
                "basic_ack",
            )
            .await
    }

    async fn close(mut self: Box<Self>) -> GeoResult<()> {
        let Some(connection) = self.connection.take() else {
            return Ok(());
        };

        self.timeouts
            .message_queue_operation(
                async {
                    connection.close(200, "正常关闭").await.map_err(|e| {
                        GeoError::queue_unavailable(format!("关闭连接失败: {e}"))
                    })
                },
                "connection_close",
            )
            .await?;

        debug!("RabbitMQ连接已关闭");
        Ok(())
    }
}

impl Drop for RabbitMQConnection {
    fn drop(&mut self) {
        let Some(connection) = self.connection.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = connection.close(200, "连接被丢弃").await {
                        warn!("后台关闭RabbitMQ连接失败: {e}");
                    }
                });
            }
            Err(_) => warn!("没有可用的运行时，RabbitMQ连接未能显式关闭"),
        }
    }
}
