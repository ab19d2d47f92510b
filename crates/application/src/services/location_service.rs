use std::sync::Arc;

use geodist_domain::{Location, LocationId, LocationStore};
use geodist_errors::{GeoError, GeoResult};
use metrics::counter;
use tracing::{info, instrument};

/// 位置登记服务
pub struct LocationService {
    store: Arc<dyn LocationStore>,
}

impl LocationService {
    pub fn new(store: Arc<dyn LocationStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, location), fields(name = %location.name))]
    pub async fn register(&self, location: Location) -> GeoResult<LocationId> {
        let id = self.store.put(&location).await?;
        counter!("geodist_locations_registered_total").increment(1);
        info!("位置 {} 已登记: {}", location.name, id);
        Ok(id)
    }

    pub async fn get(&self, id: &str) -> GeoResult<Location> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| GeoError::location_not_found(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geodist_infrastructure::InMemoryLocationStore;

    #[tokio::test]
    async fn test_register_then_get() {
        let service = LocationService::new(Arc::new(InMemoryLocationStore::new()));
        let location = Location::new("Nueva York", 40.7128, -74.0060);

        let id = service.register(location.clone()).await.unwrap();
        assert_eq!(service.get(&id).await.unwrap(), location);
    }

    #[tokio::test]
    async fn test_get_unknown_id() {
        let service = LocationService::new(Arc::new(InMemoryLocationStore::new()));
        let err = service.get("missing").await.unwrap_err();
        assert!(matches!(err, GeoError::LocationNotFound { id } if id == "missing"));
    }

    #[tokio::test]
    async fn test_registered_ids_are_unique() {
        let service = LocationService::new(Arc::new(InMemoryLocationStore::new()));
        let location = Location::new("a", 0.0, 0.0);
        let first = service.register(location.clone()).await.unwrap();
        let second = service.register(location).await.unwrap();
        assert_ne!(first, second);
    }
}
