use async_trait::async_trait;
use geodist_errors::GeoResult;

use crate::entities::{Location, LocationId};

/// 位置键值存储接口
#[async_trait]
pub trait LocationStore: Send + Sync {
    /// 按ID读取位置，不存在时返回 `None`
    async fn get(&self, id: &str) -> GeoResult<Option<Location>>;
    /// 保存位置并返回新分配的ID
    async fn put(&self, location: &Location) -> GeoResult<LocationId>;
}
