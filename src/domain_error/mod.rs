mod types;

pub use types::*;

use crate::{Error, Response, Result};
use std::collections::HashMap;
use tracing::{info, warn};

/// Translates domain errors into structured error responses.
#[derive(Debug, Clone)]
pub struct ErrorMapper {
    codes: HashMap<DomainErrorKind, ErrorCode>,
}

impl ErrorMapper {
    /// Mapper with every kind bound to its canonical code.
    pub fn new() -> Self {
        let codes = DomainErrorKind::ALL
            .into_iter()
            .map(|kind| (kind, ErrorCode::for_kind(kind)))
            .collect();
        Self { codes }
    }

    pub fn empty() -> Self {
        Self {
            codes: HashMap::new(),
        }
    }

    /// Binds `kind` to `code`. A code can belong to one kind only.
    pub fn register(&mut self, kind: DomainErrorKind, code: ErrorCode) -> Result<()> {
        if code.is_reserved() {
            return Err(Error::config(format!(
                "Error code {} is reserved and cannot be bound to {}",
                code, kind
            )));
        }
        if let Some((owner, _)) = self
            .codes
            .iter()
            .find(|(owner, existing)| **existing == code && **owner != kind)
        {
            return Err(Error::config(format!(
                "Error code {} is already bound to {}",
                code, owner
            )));
        }
        self.codes.insert(kind, code);
        Ok(())
    }

    pub fn code_for(&self, kind: DomainErrorKind) -> Option<ErrorCode> {
        self.codes.get(&kind).copied()
    }

    pub fn map(&self, error: &DomainError) -> Response {
        let error_code = match self.code_for(error.kind) {
            Some(code) => {
                info!(kind = %error.kind, code = %code, "Prediction failed with domain error");
                code
            }
            None => {
                warn!(kind = %error.kind, "No error code registered for domain error kind");
                ErrorCode::InternalError
            }
        };

        Response::Error(ErrorBody::new(error_code, error.message.clone()))
    }
}

impl Default for ErrorMapper {
    fn default() -> Self {
        Self::new()
    }
}
