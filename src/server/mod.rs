pub mod handlers;
mod types;

pub use types::HealthResponse;

use crate::{
    Result,
    backend::{ModelBackendHandle, ServingModelBackend},
    config::{Config, ServerConfig},
    domain_error::ErrorMapper,
    executor::{ConfiguredExecutorFactory, ExecutorFactory},
    health::HealthSupervisor,
    signal::shutdown_signal,
    worker::WorkerPool,
};
use axum::{
    Router,
    routing::{get, post},
};
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};
use tower_http::trace::TraceLayer;
use tracing::info;

pub fn router(state: handlers::AppState, config: &ServerConfig) -> Router {
    Router::new()
        .route(&config.predict_route, post(handlers::predict))
        .route(&config.health_route, get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// HTTP surface binding the prediction route to the worker pool and the
/// health route to the health supervisor.
pub struct ServingApplication {
    config: Config,
    factory: Arc<dyn ExecutorFactory>,
}

impl ServingApplication {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let factory = Arc::new(ConfiguredExecutorFactory::new(config.clone()));
        Ok(Self { config, factory })
    }

    pub async fn run(self) -> Result<()> {
        let Self { config, factory } = self;

        let host: IpAddr = config.server.host.parse()?;
        let addr = SocketAddr::new(host, config.server.port);

        let backend: Arc<dyn ModelBackendHandle> = Arc::new(ServingModelBackend::new(
            &config.backend,
            config.backend.probe_timeout(),
        )?);
        let health = HealthSupervisor::new(backend, config.backend.probe_timeout());

        // Workers finish initializing before the listener exists.
        let pool = Arc::new(WorkerPool::start(config.server.workers, factory).await?);

        let app_state = handlers::AppState {
            pool: pool.clone(),
            health: Arc::new(health),
            mapper: ErrorMapper::new(),
            request_timeout: config.server.request_timeout(),
        };
        let app = router(app_state, &config.server);

        info!(
            "Starting server on {} (predict: {}, health: {}, workers: {})",
            addr, config.server.predict_route, config.server.health_route, config.server.workers
        );

        let served = match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await,
            Err(e) => Err(e),
        };

        pool.shutdown().await;
        served?;

        Ok(())
    }
}

pub async fn run(config: Config) -> Result<()> {
    ServingApplication::new(config)?.run().await
}
