use super::PredictionExecutor;
use crate::{
    Error, Request, Response, Result,
    backend::ModelBackendHandle,
    domain_error::ErrorMapper,
    predictor::{PredictionError, Predictor},
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Runs prediction logic directly inside the worker.
pub struct InlinePredictionExecutor {
    predictor: Box<dyn Predictor>,
    backend: Arc<dyn ModelBackendHandle>,
    mapper: ErrorMapper,
    started: bool,
}

impl InlinePredictionExecutor {
    pub fn new(predictor: Box<dyn Predictor>, backend: Arc<dyn ModelBackendHandle>) -> Self {
        Self {
            predictor,
            backend,
            mapper: ErrorMapper::new(),
            started: false,
        }
    }

    pub fn with_mapper(mut self, mapper: ErrorMapper) -> Self {
        self.mapper = mapper;
        self
    }

    pub fn is_started(&self) -> bool {
        self.started
    }
}

#[async_trait]
impl PredictionExecutor for InlinePredictionExecutor {
    async fn start(&mut self) -> Result<()> {
        if self.started {
            return Ok(());
        }

        info!(
            "Starting inline executor against model server {}",
            self.backend.address()
        );
        self.predictor.start().await?;
        self.started = true;
        Ok(())
    }

    async fn execute(&mut self, request: Request) -> Result<Response> {
        if !self.started {
            return Err(Error::executor("Inline executor used before start()"));
        }

        match self.predictor.predict(&request, self.backend.as_ref()).await {
            Ok(body) => {
                debug!("Prediction succeeded");
                Ok(Response::Prediction(body))
            }
            Err(PredictionError::Domain(err)) => Ok(self.mapper.map(&err)),
            Err(PredictionError::Unexpected(err)) => {
                error!(
                    "Unexpected exception raised while processing request: {:#}",
                    err
                );
                Err(Error::Unexpected(err))
            }
        }
    }

    async fn stop(&mut self) -> Result<()> {
        if !self.started {
            return Ok(());
        }

        self.started = false;
        info!("Stopping inline executor");
        self.predictor.stop().await
    }
}
