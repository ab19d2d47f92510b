//! 大圆距离计算

/// 地球半径（公里）
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// 使用haversine公式计算两点之间的大圆距离（公里）
///
/// 输入为角度制经纬度。超出范围的坐标按原值参与计算，不做截断。
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_phi = (lat2 - lat1).to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    // 舍入误差可能让近对跖点的 a 略大于1
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}
