use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use geodist_api::{create_app, routes::AppState};
use geodist_application::{DistanceService, LocationService};
use geodist_config::{AppConfig, DispatchMode};
use geodist_domain::MessageBroker;
use geodist_infrastructure::{LocationStoreFactory, MessageBrokerFactory};
use geodist_worker::DistanceWorker;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::{net::TcpListener, sync::broadcast};
use tracing::{error, info, warn};

/// 应用运行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    /// 仅运行API服务器
    Api,
    /// 仅运行距离计算Worker
    Worker,
    /// 运行API服务器，Worker按配置启用
    All,
}

/// 主应用程序
pub struct Application {
    config: AppConfig,
    mode: AppMode,
    broker: Arc<dyn MessageBroker>,
    distance_service: Arc<DistanceService>,
    location_service: Arc<LocationService>,
    metrics_handle: Option<PrometheusHandle>,
}

impl Application {
    /// 创建新的应用实例
    pub async fn new(
        config: AppConfig,
        mode: AppMode,
        metrics_handle: Option<PrometheusHandle>,
    ) -> Result<Self> {
        info!("初始化应用程序，模式: {:?}", mode);

        info!(
            "消息队列: {} ({})",
            config.message_queue.get_type_string(),
            mask_url(&config.message_queue.url)
        );
        let broker = MessageBrokerFactory::create(&config.message_queue);

        let store = LocationStoreFactory::create(&config.location_store)
            .await
            .with_context(|| {
                format!("连接位置存储失败: {}", mask_url(&config.location_store.url))
            })?;

        let distance_service = Arc::new(DistanceService::new(
            Arc::clone(&broker),
            Arc::clone(&store),
            &config.message_queue,
            config.distance.dispatch_mode,
        ));
        let location_service = Arc::new(LocationService::new(store));

        Ok(Self {
            config,
            mode,
            broker,
            distance_service,
            location_service,
            metrics_handle,
        })
    }

    /// 构建HTTP路由
    pub fn router(&self) -> Router {
        let state = AppState {
            distance_service: Arc::clone(&self.distance_service),
            location_service: Arc::clone(&self.location_service),
            metrics_handle: self.metrics_handle.clone(),
        };

        create_app(
            state,
            &self.config.api,
            &self.config.observability.metrics_endpoint,
        )
    }

    /// 运行应用程序直到收到关闭信号
    pub async fn run(&self, shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        info!("启动应用程序，模式: {:?}", self.mode);

        match self.mode {
            AppMode::Api => self.run_api(shutdown_rx).await,
            AppMode::Worker => {
                self.run_worker(shutdown_rx).await;
                Ok(())
            }
            AppMode::All => self.run_all_components(shutdown_rx).await,
        }
    }

    async fn run_api(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        let listener = TcpListener::bind(&self.config.api.bind_address)
            .await
            .with_context(|| format!("绑定地址失败: {}", self.config.api.bind_address))?;

        info!("API服务器启动在 http://{}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("API服务器收到关闭信号");
            })
            .await
            .context("API服务器运行失败")?;

        info!("API服务器已停止");
        Ok(())
    }

    async fn run_worker(&self, shutdown_rx: broadcast::Receiver<()>) {
        if self.config.distance.dispatch_mode == DispatchMode::Inline {
            warn!("当前为Inline派发模式，任务队列不会收到任务");
        }

        let worker = DistanceWorker::new(
            &self.config.worker,
            Arc::clone(&self.broker),
            Arc::clone(&self.distance_service),
        );
        worker.run(shutdown_rx).await;
    }

    async fn run_all_components(&self, shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        info!("启动所有组件");

        if !self.config.worker.enabled {
            if self.config.distance.dispatch_mode == DispatchMode::Queued {
                warn!("Worker未启用，Queued模式下的任务需要由外部Worker处理");
            }
            return self.run_api(shutdown_rx).await;
        }

        let worker_rx = shutdown_rx.resubscribe();
        let (api_result, ()) = tokio::join!(self.run_api(shutdown_rx), self.run_worker(worker_rx));

        if let Err(e) = &api_result {
            error!("API服务器运行失败: {}", e);
        }

        info!("所有组件已停止");
        api_result
    }
}

/// 屏蔽URL中的密码
fn mask_url(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            if !url[colon_pos + 1..].starts_with("//") {
                let mut masked = url.to_string();
                masked.replace_range(colon_pos + 1..at_pos, "***");
                return masked;
            }
        }
    }
    url.to_string()
}
