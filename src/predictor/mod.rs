mod instance;

pub use instance::InstancePredictor;

use crate::{JsonObject, Request, Result, backend::ModelBackendHandle, domain_error::DomainError};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PredictionError {
    /// Classified, recoverable failure.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Anything prediction logic did not classify. Treated as a defect.
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type PredictionResult = std::result::Result<JsonObject, PredictionError>;

/// Prediction logic run by the inline executor.
#[async_trait]
pub trait Predictor: Send + Sync {
    /// Acquires anything the logic holds for the worker's lifetime.
    async fn start(&mut self) -> Result<()> {
        Ok(())
    }

    async fn predict(&self, request: &Request, backend: &dyn ModelBackendHandle) -> PredictionResult;

    async fn stop(&mut self) -> Result<()> {
        Ok(())
    }
}
