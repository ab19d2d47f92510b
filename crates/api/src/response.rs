use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

/// 距离任务已受理
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionAccepted {
    pub status: String,
    pub job_id: String,
}

impl SubmissionAccepted {
    pub const STATUS: &'static str = "Request sent to calculate distance";

    pub fn new(job_id: String) -> Self {
        Self {
            status: Self::STATUS.to_string(),
            job_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistanceResultResponse {
    pub total_distance: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}

/// 只包含状态说明的响应体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusMessage {
    pub status: String,
}

impl StatusMessage {
    pub const NO_RESULTS: &'static str = "No results available";

    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationCreated {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationResponse {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

pub fn success<T: Serialize>(data: T) -> impl IntoResponse {
    (StatusCode::OK, Json(data))
}

pub fn created<T: Serialize>(data: T) -> impl IntoResponse {
    (StatusCode::CREATED, Json(data))
}

pub fn accepted<T: Serialize>(data: T) -> impl IntoResponse {
    (StatusCode::ACCEPTED, Json(data))
}

/// 204响应；HTTP服务器可能会丢弃响应体
pub fn no_content(message: &str) -> impl IntoResponse {
    (StatusCode::NO_CONTENT, Json(StatusMessage::new(message)))
}
