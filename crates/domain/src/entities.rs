use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::haversine_km;

/// 位置的外部标识，由位置存储分配
pub type LocationId = String;

/// 位置记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new<S: Into<String>>(name: S, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
        }
    }

    /// 到另一个位置的大圆距离（公里）
    pub fn distance_to(&self, other: &Location) -> f64 {
        haversine_km(self.latitude, self.longitude, other.latitude, other.longitude)
    }
}

/// 距离计算任务
///
/// 仅在排队派发模式下作为任务队列中的消息出现；直接派发模式下
/// 任务在提交时就被折叠成计算结果。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceJob {
    pub job_id: String,
    pub location_ids: [LocationId; 2],
}

impl DistanceJob {
    pub fn new(first: LocationId, second: LocationId) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            location_ids: [first, second],
        }
    }
}

/// 从结果队列中取出的距离结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceResult {
    pub total_distance: f64,
    /// 产生该结果的任务ID；结果消息没有携带时为空
    pub job_id: Option<String>,
}

/// 提交距离任务后的回执
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReceipt {
    pub job_id: String,
}

/// 从队列获取到的一条消息
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub payload: Vec<u8>,
    /// 代理分配的投递标签，只用于确认
    pub delivery_tag: u64,
    pub correlation_id: Option<String>,
}
