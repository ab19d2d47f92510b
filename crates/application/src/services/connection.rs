use geodist_domain::BrokerConnection;
use tracing::warn;

/// 关闭代理连接，关闭失败只记录警告
///
/// 连接关闭时业务结果已经确定，关闭失败不应改变返回给调用方的结果。
pub async fn close_connection(conn: Box<dyn BrokerConnection>) {
    if let Err(e) = conn.close().await {
        warn!("关闭消息队列连接失败: {}", e);
    }
}
