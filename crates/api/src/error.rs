use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use geodist_errors::GeoError;
use serde_json::json;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Geo(#[from] GeoError),

    #[error("请求参数错误: {0}")]
    BadRequest(String),

    #[error("未找到资源")]
    NotFound,
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message, error_type, suggestions) = match &self {
            ApiError::Geo(GeoError::InvalidRequest(msg)) => (
                StatusCode::BAD_REQUEST,
                msg.clone(),
                "INVALID_REQUEST",
                vec![
                    "location_ids 必须恰好包含2个位置ID".to_string(),
                    "示例: {\"location_ids\": [\"<id1>\", \"<id2>\"]}".to_string(),
                ],
            ),
            ApiError::Geo(GeoError::LocationNotFound { id }) => (
                StatusCode::NOT_FOUND,
                format!("位置 ID {id} 不存在"),
                "LOCATION_NOT_FOUND",
                vec![
                    "请检查位置ID是否正确".to_string(),
                    "使用 POST /locations 登记新位置".to_string(),
                ],
            ),
            ApiError::Geo(GeoError::QueueUnavailable(msg)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("消息队列不可用: {msg}"),
                "QUEUE_UNAVAILABLE",
                vec![
                    "消息队列暂时不可用，请稍后重试".to_string(),
                    "查看 GET /health 检查系统状态".to_string(),
                ],
            ),
            ApiError::Geo(GeoError::StoreUnavailable(msg)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("位置存储不可用: {msg}"),
                "STORE_UNAVAILABLE",
                vec![
                    "位置存储暂时不可用，请稍后重试".to_string(),
                    "查看 GET /health 检查系统状态".to_string(),
                ],
            ),
            ApiError::Geo(GeoError::CorruptMessage(reason)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("结果消息损坏: {reason}"),
                "CORRUPT_MESSAGE",
                vec![
                    "损坏的消息已被确认并移出结果队列".to_string(),
                    "请检查结果生产者的消息格式".to_string(),
                ],
            ),
            ApiError::Geo(other) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "系统内部错误".to_string(),
                "INTERNAL_ERROR",
                vec![
                    other.user_message().to_string(),
                    "如果问题持续存在，请联系系统管理员".to_string(),
                ],
            ),
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                format!("请求参数错误: {msg}"),
                "BAD_REQUEST",
                vec![
                    "请检查JSON格式是否正确".to_string(),
                    "确保Content-Type设置为application/json".to_string(),
                ],
            ),
            ApiError::NotFound => (
                StatusCode::NOT_FOUND,
                "请求的资源不存在".to_string(),
                "NOT_FOUND",
                vec!["请检查请求URL是否正确".to_string()],
            ),
        };

        if status.is_server_error() {
            error!("请求处理失败: {}", self);
        }

        let body = Json(json!({
            "error": {
                "message": error_message,
                "type": error_type,
                "code": status.as_u16(),
                "suggestions": suggestions,
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
