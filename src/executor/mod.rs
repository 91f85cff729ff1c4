mod inline;
pub mod stdio;
mod subprocess;

pub use inline::InlinePredictionExecutor;
pub use subprocess::SubprocessPredictionExecutor;

use crate::{
    Request, Response, Result,
    backend::{ModelBackendHandle, ServingModelBackend},
    config::{Config, ExecutorMode},
    predictor::{InstancePredictor, Predictor},
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Turns one request into one response.
///
/// `Ok` always carries a well-formed response, including mapped domain errors.
/// `Err` is reserved for failures nobody classified; callers must not convert
/// it into a regular response.
#[async_trait]
pub trait PredictionExecutor: Send {
    /// Per-worker initialization. Runs before the worker takes any traffic.
    async fn start(&mut self) -> Result<()>;
    async fn execute(&mut self, request: Request) -> Result<Response>;
    /// Releases everything acquired by `start`.
    async fn stop(&mut self) -> Result<()>;
}

/// Builds a fresh, not yet started executor for a worker.
#[async_trait]
pub trait ExecutorFactory: Send + Sync {
    async fn create(&self, worker_id: usize) -> Result<Box<dyn PredictionExecutor>>;
}

type PredictorBuilder = Arc<dyn Fn() -> Box<dyn Predictor> + Send + Sync>;

/// Chooses the executor variant from `executor.mode`.
pub struct ConfiguredExecutorFactory {
    config: Config,
    predictor: PredictorBuilder,
}

impl ConfiguredExecutorFactory {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            predictor: Arc::new(|| Box::new(InstancePredictor::new()) as Box<dyn Predictor>),
        }
    }

    pub fn with_predictor<F>(mut self, builder: F) -> Self
    where
        F: Fn() -> Box<dyn Predictor> + Send + Sync + 'static,
    {
        self.predictor = Arc::new(builder);
        self
    }

    /// Inline executor regardless of the configured mode, as run inside a delegated child.
    pub fn create_inline(&self) -> Result<InlinePredictionExecutor> {
        let backend: Arc<dyn ModelBackendHandle> = Arc::new(ServingModelBackend::new(
            &self.config.backend,
            self.config.server.request_timeout(),
        )?);
        Ok(InlinePredictionExecutor::new((self.predictor)(), backend))
    }
}

#[async_trait]
impl ExecutorFactory for ConfiguredExecutorFactory {
    async fn create(&self, worker_id: usize) -> Result<Box<dyn PredictionExecutor>> {
        debug!(
            "Creating {:?} executor for worker {}",
            self.config.executor.mode, worker_id
        );

        match self.config.executor.mode {
            ExecutorMode::Inline => Ok(Box::new(self.create_inline()?)),
            ExecutorMode::Subprocess => Ok(Box::new(SubprocessPredictionExecutor::new(
                self.config.executor.command.clone(),
                self.config.server.request_timeout(),
            )?
            .with_env(self.config.executor.env.clone()))),
        }
    }
}
