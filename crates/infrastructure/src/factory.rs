use std::sync::Arc;

use geodist_config::{
    LocationStoreConfig, LocationStoreType, MessageQueueConfig, MessageQueueType,
};
use geodist_domain::{LocationStore, MessageBroker};
use geodist_errors::GeoResult;
use tracing::{debug, info};

use crate::{InMemoryBroker, InMemoryLocationStore, RabbitMQBroker, RedisLocationStore};

pub struct MessageBrokerFactory;

impl MessageBrokerFactory {
    pub fn create(config: &MessageQueueConfig) -> Arc<dyn MessageBroker> {
        debug!("Creating message broker with type: {:?}", config.r#type);

        match config.r#type {
            MessageQueueType::Rabbitmq => {
                info!("Initializing RabbitMQ message broker: {}", config.url);
                Arc::new(RabbitMQBroker::new(config))
            }
            MessageQueueType::InMemory => {
                info!("Initializing in-memory message broker");
                Arc::new(InMemoryBroker::new())
            }
        }
    }
}

pub struct LocationStoreFactory;

impl LocationStoreFactory {
    pub async fn create(config: &LocationStoreConfig) -> GeoResult<Arc<dyn LocationStore>> {
        debug!("Creating location store with type: {:?}", config.r#type);

        match config.r#type {
            LocationStoreType::Redis => {
                let store = RedisLocationStore::new(config).await?;
                Ok(Arc::new(store))
            }
            LocationStoreType::InMemory => {
                info!("Initializing in-memory location store");
                Ok(Arc::new(InMemoryLocationStore::new()))
            }
        }
    }
}
