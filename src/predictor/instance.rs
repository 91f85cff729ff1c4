use super::{PredictionResult, Predictor};
use crate::{
    JsonObject, Request,
    backend::{BackendError, ModelBackendHandle},
    domain_error::{DomainError, DomainErrorKind},
};
use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, warn};

const INSTANCE_KEY: &str = "instance";
const INSTANCES_KEY: &str = "instances";
const PREDICTIONS_KEY: &str = "predictions";
const PREDICTION_KEY: &str = "prediction";

/// Forwards a single `instance` to the model server and returns its first prediction.
#[derive(Debug, Default)]
pub struct InstancePredictor;

impl InstancePredictor {
    pub fn new() -> Self {
        Self
    }

    fn build_backend_request(request: &Request) -> Result<Request, DomainError> {
        if request.get(INSTANCES_KEY).is_some() {
            return Err(DomainError::new(
                DomainErrorKind::UnsupportedRequestShape,
                "Batched 'instances' requests are not supported; send a single 'instance'",
            ));
        }

        let instance = request.get(INSTANCE_KEY).ok_or_else(|| {
            DomainError::malformed_input("Request is missing the 'instance' field")
        })?;

        let mut body = JsonObject::new();
        body.insert(INSTANCES_KEY.to_string(), json!([instance]));
        Ok(Request::new(body))
    }

    fn extract_prediction(raw: Value) -> Result<Value, DomainError> {
        raw.get(PREDICTIONS_KEY)
            .and_then(Value::as_array)
            .and_then(|predictions| predictions.first())
            .cloned()
            .ok_or_else(|| {
                DomainError::new(
                    DomainErrorKind::InvalidBackendResponse,
                    "Model server response did not contain any predictions",
                )
            })
    }
}

fn classify_backend_error(err: BackendError) -> DomainError {
    let kind = match err {
        BackendError::InvalidResponse(_) => DomainErrorKind::InvalidBackendResponse,
        _ => DomainErrorKind::BackendUnavailable,
    };
    DomainError::new(kind, "Model server failed to process the request")
        .with_context(err.to_string())
}

#[async_trait]
impl Predictor for InstancePredictor {
    async fn predict(&self, request: &Request, backend: &dyn ModelBackendHandle) -> PredictionResult {
        let backend_request = Self::build_backend_request(request)?;

        let raw = backend.run(&backend_request).await.map_err(|e| {
            warn!("Model server call failed: {}", e);
            classify_backend_error(e)
        })?;

        let prediction = Self::extract_prediction(raw)?;
        debug!("Model server returned prediction");

        let mut response = JsonObject::new();
        response.insert(PREDICTION_KEY.to_string(), prediction);
        Ok(response)
    }
}
