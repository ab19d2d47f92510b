use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::IntoResponse,
    Json,
};
use geodist_domain::Location;
use serde::Deserialize;

use crate::{
    error::ApiResult,
    response::{created, success, LocationCreated, LocationResponse},
    routes::AppState,
};

/// 位置登记请求
#[derive(Debug, Deserialize)]
pub struct CreateLocationRequest {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// 登记位置
pub async fn create_location(
    State(state): State<AppState>,
    payload: Result<Json<CreateLocationRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;

    let id = state
        .location_service
        .register(Location::new(request.name, request.latitude, request.longitude))
        .await?;

    Ok(created(LocationCreated { id }))
}

/// 获取位置详情
pub async fn get_location(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let location = state.location_service.get(&id).await?;

    Ok(success(LocationResponse {
        id,
        name: location.name,
        latitude: location.latitude,
        longitude: location.longitude,
    }))
}
