use crate::{
    config::{Config, SessionConfig},
    executor::PipelineExecutor,
    response::Responder,
    routes::api_routes,
    telemetry::Metrics,
};
use axum::Router;
use axum_otel_metrics::HttpMetricsLayerBuilder;
use sign_inference::{LandmarkProviderFactory, ModelHandle, Pipeline};
use std::{net::SocketAddr, sync::Arc};
use tokio::{
    net::TcpListener,
    sync::broadcast::{Receiver, Sender},
    task::JoinHandle,
};

#[derive(Clone)]
pub struct SharedState {
    pub model: ModelHandle,
    pub executor: PipelineExecutor,
    pub landmarks: Arc<dyn LandmarkProviderFactory>,
    pub session_config: SessionConfig,
    pub responder: Responder,
    pub metrics: Arc<Metrics>,
    pub shutdown_tx: Sender<()>,
}

impl SharedState {
    pub fn new(
        config: &Config,
        model: ModelHandle,
        landmarks: Arc<dyn LandmarkProviderFactory>,
        metrics: Arc<Metrics>,
        shutdown_tx: Sender<()>,
    ) -> Self {
        let executor =
            PipelineExecutor::new(Pipeline::new(model.clone()), config.pipeline.worker_threads);

        Self {
            model,
            executor,
            landmarks,
            session_config: config.session.clone(),
            responder: Responder::new(config.response.clone()),
            metrics,
            shutdown_tx,
        }
    }
}

pub struct HttpServer {
    router: Router,
    listener: TcpListener,
}

impl HttpServer {
    pub async fn new(state: SharedState, config: &Config) -> anyhow::Result<Self> {
        let addr = config.server.get_address();
        let metrics_layer = HttpMetricsLayerBuilder::new().build();

        let router = Router::new()
            .merge(api_routes())
            .with_state(state)
            .layer(metrics_layer);

        let listener = TcpListener::bind(addr).await?;

        Ok(Self { router, listener })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub async fn run(
        self,
        shutdown_rx: Receiver<()>,
    ) -> anyhow::Result<JoinHandle<anyhow::Result<()>>> {
        tracing::info!("Starting app on {}", self.local_addr()?);

        let listener = self.listener;
        let router = self.router;
        let server_handle = tokio::spawn({
            let mut shutdown_rx = shutdown_rx.resubscribe();
            async move {
                axum::serve(listener, router)
                    .with_graceful_shutdown(async move {
                        shutdown_rx.recv().await.ok();
                    })
                    .await?;
                Ok(())
            }
        });

        Ok(server_handle)
    }
}
