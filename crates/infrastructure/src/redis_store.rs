//! Redis location store
//!
//! Locations are stored as JSON strings under the bare location id, which is
//! the layout the registration service writes.

use async_trait::async_trait;
use geodist_config::LocationStoreConfig;
use geodist_domain::{Location, LocationId, LocationStore};
use geodist_errors::{GeoError, GeoResult};
use redis::aio::ConnectionManager;
use std::time::Duration;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::timeout_handler::{TimeoutConfig, TimeoutHandler};

pub struct RedisLocationStore {
    manager: ConnectionManager,
    timeouts: TimeoutHandler,
}

impl RedisLocationStore {
    /// Connect to Redis and verify the connection with PING
    pub async fn new(config: &LocationStoreConfig) -> GeoResult<Self> {
        info!("Creating Redis location store with URL: {}", config.url);

        let timeouts = TimeoutHandler::new(TimeoutConfig {
            location_store_timeout: Duration::from_secs(config.connection_timeout_seconds),
            ..TimeoutConfig::default()
        });

        let client = redis::Client::open(config.url.clone())
            .map_err(|e| GeoError::config_error(format!("无效的Redis URL: {e}")))?;

        let mut manager = timeouts
            .location_store_operation(
                async {
                    client
                        .get_connection_manager()
                        .await
                        .map_err(|e| GeoError::store_unavailable(e.to_string()))
                },
                "connect",
            )
            .await?;

        let _: String = timeouts
            .location_store_operation(
                async {
                    redis::cmd("PING")
                        .query_async(&mut manager)
                        .await
                        .map_err(|e| GeoError::store_unavailable(e.to_string()))
                },
                "PING",
            )
            .await?;

        info!("Redis location store created successfully");

        Ok(Self { manager, timeouts })
    }
}

#[async_trait]
impl LocationStore for RedisLocationStore {
    #[instrument(skip(self))]
    async fn get(&self, id: &str) -> GeoResult<Option<Location>> {
        let mut conn = self.manager.clone();

        let raw: Option<String> = self
            .timeouts
            .location_store_operation(
                async {
                    redis::cmd("GET")
                        .arg(id)
                        .query_async(&mut conn)
                        .await
                        .map_err(|e| GeoError::store_unavailable(e.to_string()))
                },
                "GET",
            )
            .await?;

        match raw {
            Some(json) => {
                debug!("Location found: {}", id);
                let location = serde_json::from_str(&json).map_err(|e| {
                    GeoError::Serialization(format!("位置 {id} 的存储数据无法解析: {e}"))
                })?;
                Ok(Some(location))
            }
            None => {
                debug!("Location not found: {}", id);
                Ok(None)
            }
        }
    }

    #[instrument(skip(self))]
    async fn put(&self, location: &Location) -> GeoResult<LocationId> {
        let id = Uuid::new_v4().to_string();
        let json = serde_json::to_string(location)?;
        let mut conn = self.manager.clone();

        let _: () = self
            .timeouts
            .location_store_operation(
                async {
                    redis::cmd("SET")
                        .arg(&id)
                        .arg(&json)
                        .query_async(&mut conn)
                        .await
                        .map_err(|e| GeoError::store_unavailable(e.to_string()))
                },
                "SET",
            )
            .await?;

        debug!("Location stored: {}", id);
        Ok(id)
    }
}
