use crate::config::Config;
use crate::server::{HttpServer, SharedState};
use crate::telemetry::Metrics;

use sign_inference::{LandmarkProviderFactory, ModelHandle, OrtLandmarkerFactory};
use std::sync::Arc;
use tokio::{signal, sync::broadcast};

pub async fn start_app(config: Config) -> anyhow::Result<()> {
    let model = {
        let model_config = config.model.clone();
        tokio::task::spawn_blocking(move || ModelHandle::load(&model_config)).await?
    };
    if !model.is_available() {
        tracing::warn!("Serving in degraded mode, every frame will be answered as model-unavailable");
    }

    let landmarks: Arc<dyn LandmarkProviderFactory> =
        match OrtLandmarkerFactory::new(config.landmarks.clone()) {
            Ok(factory) => Arc::new(factory),
            Err(e) => {
                tracing::error!("Failed to initialize landmark tracker: {:?}", e);
                return Err(e.into());
            }
        };

    let metrics = Arc::new(Metrics::new()?);
    let (shutdown_tx, _) = broadcast::channel(1);
    let server_shutdown_rx = shutdown_tx.subscribe();

    let state = SharedState::new(&config, model, landmarks, metrics, shutdown_tx.clone());
    let server = HttpServer::new(state, &config).await?;
    let server_handle = server.run(server_shutdown_rx).await?;

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown.");

    let _ = shutdown_tx.send(());
    server_handle.await??;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
