use crate::backend::ModelBackendHandle;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use tracing::{debug, warn};

/// Liveness of one model backend at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthState {
    pub alive: bool,
    pub backend: String,
    pub checked_at: DateTime<Utc>,
}

/// Answers liveness queries about the model backend.
///
/// Every call probes the backend again; nothing is cached between checks.
pub struct HealthSupervisor {
    backend: Arc<dyn ModelBackendHandle>,
    timeout: Duration,
}

impl HealthSupervisor {
    pub fn new(backend: Arc<dyn ModelBackendHandle>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn check(&self) -> HealthState {
        let alive = match tokio::time::timeout(self.timeout, self.backend.probe()).await {
            Ok(alive) => alive,
            Err(_) => {
                warn!(
                    "Model server probe exceeded {:?}, reporting not alive",
                    self.timeout
                );
                false
            }
        };

        debug!(alive, backend = %self.backend.address(), "Health check completed");

        HealthState {
            alive,
            backend: self.backend.address(),
            checked_at: Utc::now(),
        }
    }
}
