mod client;

pub use client::ServingModelBackend;

use crate::Request;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Raw, uninterpreted result returned by the model server.
pub type RawResult = Value;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("model server at {address} is unreachable: {reason}")]
    Unreachable { address: String, reason: String },

    #[error("model server did not answer within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("model server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("model server returned an invalid response: {0}")]
    InvalidResponse(String),
}

/// A running model server.
#[async_trait]
pub trait ModelBackendHandle: Send + Sync {
    /// Bounded liveness check. Never fails; unreachable is `false`.
    async fn probe(&self) -> bool;

    /// Issues `request` on the computation path.
    async fn run(&self, request: &Request) -> Result<RawResult, BackendError>;

    /// `host:port` the handle points at.
    fn address(&self) -> String;
}
