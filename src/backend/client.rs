use super::{BackendError, ModelBackendHandle, RawResult};
use crate::{Request, Result, config::BackendConfig};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// REST client for a TensorFlow-Serving style model server.
pub struct ServingModelBackend {
    client: reqwest::Client,
    base_url: String,
    address: String,
    model_name: String,
    probe_timeout: Duration,
    request_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct ModelStatusResponse {
    #[serde(default)]
    model_version_status: Vec<ModelVersionStatus>,
}

#[derive(Debug, Deserialize)]
struct ModelVersionStatus {
    #[serde(default)]
    state: String,
}

impl ServingModelBackend {
    pub fn new(config: &BackendConfig, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            client,
            base_url: format!("http://{}", config.address()),
            address: config.address(),
            model_name: config.model_name.clone(),
            probe_timeout: config.probe_timeout(),
            request_timeout,
        })
    }

    fn status_url(&self) -> String {
        format!("{}/v1/models/{}", self.base_url, self.model_name)
    }

    fn predict_url(&self) -> String {
        format!("{}/v1/models/{}:predict", self.base_url, self.model_name)
    }

    fn classify(&self, err: reqwest::Error, timeout: Duration) -> BackendError {
        if err.is_timeout() {
            BackendError::Timeout {
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }
        } else {
            BackendError::Unreachable {
                address: self.address.clone(),
                reason: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl ModelBackendHandle for ServingModelBackend {
    async fn probe(&self) -> bool {
        let response = match self
            .client
            .get(self.status_url())
            .timeout(self.probe_timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                debug!("Model server probe failed: {}", e);
                return false;
            }
        };

        if !response.status().is_success() {
            debug!("Model server probe returned HTTP {}", response.status());
            return false;
        }

        match response.json::<ModelStatusResponse>().await {
            Ok(status) => status
                .model_version_status
                .iter()
                .any(|version| version.state == "AVAILABLE"),
            Err(e) => {
                debug!("Model server probe returned unparseable status: {}", e);
                false
            }
        }
    }

    async fn run(&self, request: &Request) -> std::result::Result<RawResult, BackendError> {
        debug!("Issuing predict call to {}", self.predict_url());

        let response = self
            .client
            .post(self.predict_url())
            .timeout(self.request_timeout)
            .json(request.as_object())
            .send()
            .await
            .map_err(|e| self.classify(e, self.request_timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Model server predict call returned HTTP {}", status);
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<RawResult>()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))
    }

    fn address(&self) -> String {
        self.address.clone()
    }
}
