//! # Geodist API
//!
//! 基于Axum的HTTP接口：
//! - `POST /calculate_distance` 提交距离计算，返回202和任务ID
//! - `GET /distance_result` 从结果队列取出一个结果；队列为空时返回204
//! - `POST /locations`、`GET /locations/{id}` 登记和查询位置
//! - `GET /health` 健康检查，`GET /metrics` Prometheus指标

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;

use axum::Router;
use geodist_config::ApiConfig;
use tower::ServiceBuilder;

use middleware::{cors_layer, request_logging, timeout_layer, trace_layer};
use routes::{create_routes, AppState};

/// 创建完整的API应用
pub fn create_app(state: AppState, api_config: &ApiConfig, metrics_endpoint: &str) -> Router {
    let router = create_routes(state, metrics_endpoint).layer(
        ServiceBuilder::new()
            .layer(trace_layer())
            .layer(timeout_layer(api_config.request_timeout_seconds))
            .layer(axum::middleware::from_fn(request_logging)),
    );

    if api_config.cors_enabled {
        router.layer(cors_layer())
    } else {
        router
    }
}
