use axum::{
    routing::{get, post},
    Router,
};
use geodist_application::{DistanceService, LocationService};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

use crate::handlers::{
    distance::{calculate_distance, distance_result},
    health::health_check,
    locations::{create_location, get_location},
    metrics::prometheus_metrics,
};

/// API应用状态
#[derive(Clone)]
pub struct AppState {
    pub distance_service: Arc<DistanceService>,
    pub location_service: Arc<LocationService>,
    /// 未启用指标时为空，此时不挂载指标路由
    pub metrics_handle: Option<PrometheusHandle>,
}

/// 创建API路由
pub fn create_routes(state: AppState, metrics_endpoint: &str) -> Router {
    let mut router = Router::new()
        // 健康检查
        .route("/health", get(health_check))
        // 距离计算
        .route("/calculate_distance", post(calculate_distance))
        .route("/distance_result", get(distance_result))
        // 位置登记
        .route("/locations", post(create_location))
        .route("/locations/{id}", get(get_location));

    if state.metrics_handle.is_some() {
        router = router.route(metrics_endpoint, get(prometheus_metrics));
    }

    router.with_state(state)
}
