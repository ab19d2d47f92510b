//! 结果队列与任务队列的消息体编解码
//!
//! 结果消息的消息体只有一个十进制浮点数字符串（公里），没有其他元数据。
//! 任务消息的消息体是 [`DistanceJob`] 的JSON。

use geodist_errors::{GeoError, GeoResult};

use crate::entities::DistanceJob;

/// 把距离编码为最短可往返的十进制字符串
pub fn encode_distance(distance_km: f64) -> Vec<u8> {
    distance_km.to_string().into_bytes()
}

/// 解析结果消息体
///
/// 非UTF-8、无法解析或非有限值都视为生产者与消费者之间的契约破坏。
pub fn decode_distance(payload: &[u8]) -> GeoResult<f64> {
    let text = std::str::from_utf8(payload).map_err(|e| {
        GeoError::corrupt_message(format!("结果消息不是合法的UTF-8: {e}"))
    })?;

    let value: f64 = text.trim().parse().map_err(|e| {
        GeoError::corrupt_message(format!("结果消息 '{text}' 不是十进制数: {e}"))
    })?;

    if !value.is_finite() {
        return Err(GeoError::corrupt_message(format!(
            "结果消息 '{text}' 不是有限值"
        )));
    }

    Ok(value)
}

pub fn encode_job(job: &DistanceJob) -> GeoResult<Vec<u8>> {
    Ok(serde_json::to_vec(job)?)
}

pub fn decode_job(payload: &[u8]) -> GeoResult<DistanceJob> {
    serde_json::from_slice(payload)
        .map_err(|e| GeoError::corrupt_message(format!("任务消息无法解析: {e}")))
}
