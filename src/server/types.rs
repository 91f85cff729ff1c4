use crate::health::HealthState;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub alive: bool,
    pub backend: String,
    pub checked_at: String,
}

impl From<HealthState> for HealthResponse {
    fn from(state: HealthState) -> Self {
        Self {
            alive: state.alive,
            backend: state.backend,
            checked_at: state.checked_at.to_rfc3339(),
        }
    }
}
