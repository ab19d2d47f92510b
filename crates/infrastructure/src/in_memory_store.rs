use async_trait::async_trait;
use geodist_domain::{Location, LocationId, LocationStore};
use geodist_errors::GeoResult;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// 内存位置存储，用于嵌入式部署和测试
#[derive(Debug, Clone, Default)]
pub struct InMemoryLocationStore {
    locations: Arc<RwLock<HashMap<LocationId, Location>>>,
}

impl InMemoryLocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以指定ID写入位置，已存在时覆盖
    pub async fn insert(&self, id: impl Into<LocationId>, location: Location) {
        self.locations.write().await.insert(id.into(), location);
    }

    pub async fn len(&self) -> usize {
        self.locations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.locations.read().await.is_empty()
    }
}

#[async_trait]
impl LocationStore for InMemoryLocationStore {
    async fn get(&self, id: &str) -> GeoResult<Option<Location>> {
        Ok(self.locations.read().await.get(id).cloned())
    }

    async fn put(&self, location: &Location) -> GeoResult<LocationId> {
        let id = Uuid::new_v4().to_string();
        self.locations
            .write()
            .await
            .insert(id.clone(), location.clone());
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_then_get() {
        let store = InMemoryLocationStore::new();
        let location = Location::new("Los Ángeles", 34.0522, -118.2437);

        let id = store.put(&location).await.unwrap();
        assert!(Uuid::parse_str(&id).is_ok());
        assert_eq!(store.get(&id).await.unwrap(), Some(location));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_missing_id_returns_none() {
        let store = InMemoryLocationStore::new();
        assert!(store.is_empty().await);
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_insert_with_explicit_id() {
        let store = InMemoryLocationStore::new();
        store.insert("ny", Location::new("Nueva York", 40.7128, -74.0060)).await;
        assert_eq!(store.get("ny").await.unwrap().unwrap().name, "Nueva York");
    }
}
