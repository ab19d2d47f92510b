use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeoError {
    #[error("无效的请求: {0}")]
    InvalidRequest(String),
    #[error("位置未找到: {id}")]
    LocationNotFound { id: String },
    #[error("消息队列不可用: {0}")]
    QueueUnavailable(String),
    #[error("消息内容损坏: {0}")]
    CorruptMessage(String),
    #[error("位置存储不可用: {0}")]
    StoreUnavailable(String),
    #[error("序列化错误: {0}")]
    Serialization(String),
    #[error("配置错误: {0}")]
    Configuration(String),
    #[error("内部错误: {0}")]
    Internal(String),
}

pub type GeoResult<T> = Result<T, GeoError>;

impl GeoError {
    pub fn invalid_request<S: Into<String>>(msg: S) -> Self {
        Self::InvalidRequest(msg.into())
    }
    pub fn location_not_found<S: Into<String>>(id: S) -> Self {
        Self::LocationNotFound { id: id.into() }
    }
    pub fn queue_unavailable<S: Into<String>>(msg: S) -> Self {
        Self::QueueUnavailable(msg.into())
    }
    pub fn corrupt_message<S: Into<String>>(msg: S) -> Self {
        Self::CorruptMessage(msg.into())
    }
    pub fn store_unavailable<S: Into<String>>(msg: S) -> Self {
        Self::StoreUnavailable(msg.into())
    }
    pub fn config_error<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }
    /// 瞬时故障，调用方可以退避后重试
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GeoError::QueueUnavailable(_) | GeoError::StoreUnavailable(_)
        )
    }
    pub fn user_message(&self) -> &str {
        match self {
            GeoError::InvalidRequest(_) => "请求参数不符合要求",
            GeoError::LocationNotFound { .. } => "请求的位置不存在",
            GeoError::QueueUnavailable(_) => "消息队列暂时不可用，请稍后重试",
            GeoError::StoreUnavailable(_) => "位置存储暂时不可用，请稍后重试",
            GeoError::CorruptMessage(_) => "结果消息格式错误",
            _ => "系统繁忙，请稍后重试",
        }
    }
}

impl From<serde_json::Error> for GeoError {
    fn from(err: serde_json::Error) -> Self {
        GeoError::Serialization(err.to_string())
    }
}
