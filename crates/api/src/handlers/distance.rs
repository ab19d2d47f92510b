use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::{
    error::ApiResult,
    response::{accepted, no_content, success, DistanceResultResponse, StatusMessage, SubmissionAccepted},
    routes::AppState,
};

/// 距离计算请求
#[derive(Debug, Deserialize)]
pub struct CalculateDistanceRequest {
    pub location_ids: Vec<String>,
}

/// 提交距离计算
pub async fn calculate_distance(
    State(state): State<AppState>,
    payload: Result<Json<CalculateDistanceRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;

    let receipt = state
        .distance_service
        .submit(&request.location_ids)
        .await?;

    Ok(accepted(SubmissionAccepted::new(receipt.job_id)))
}

/// 获取一个距离结果
pub async fn distance_result(State(state): State<AppState>) -> ApiResult<Response> {
    let response = match state.distance_service.retrieve().await? {
        Some(result) => success(DistanceResultResponse {
            total_distance: result.total_distance,
            job_id: result.job_id,
        })
        .into_response(),
        None => no_content(StatusMessage::NO_RESULTS).into_response(),
    };

    Ok(response)
}
