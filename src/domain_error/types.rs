use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of failures prediction logic is allowed to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DomainErrorKind {
    MalformedInput,
    InvalidRequestField,
    UnsupportedRequestShape,
    InvalidCredentials,
    DataRetrieval,
    PayloadTooLarge,
    InvalidBackendResponse,
    BackendUnavailable,
}

impl DomainErrorKind {
    pub const ALL: [DomainErrorKind; 8] = [
        Self::MalformedInput,
        Self::InvalidRequestField,
        Self::UnsupportedRequestShape,
        Self::InvalidCredentials,
        Self::DataRetrieval,
        Self::PayloadTooLarge,
        Self::InvalidBackendResponse,
        Self::BackendUnavailable,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            Self::MalformedInput => "MALFORMED_INPUT",
            Self::InvalidRequestField => "INVALID_REQUEST_FIELD",
            Self::UnsupportedRequestShape => "UNSUPPORTED_REQUEST_SHAPE",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::DataRetrieval => "DATA_RETRIEVAL",
            Self::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            Self::InvalidBackendResponse => "INVALID_BACKEND_RESPONSE",
            Self::BackendUnavailable => "BACKEND_UNAVAILABLE",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }
}

impl fmt::Display for DomainErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Public, stable identifier API consumers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    MalformedInput,
    InvalidRequestField,
    UnsupportedRequestShape,
    InvalidCredentials,
    DataRetrieval,
    PayloadTooLarge,
    InvalidBackendResponse,
    BackendUnavailable,
    /// Fallback for kinds without a registered code and for unexpected failures.
    InternalError,
    /// Emitted by the serving layer, never by the mapper.
    RequestTimeout,
}

impl ErrorCode {
    /// Codes that are never bound to a domain error kind.
    pub const RESERVED: [ErrorCode; 2] = [Self::InternalError, Self::RequestTimeout];

    /// Canonical code for a kind.
    pub fn for_kind(kind: DomainErrorKind) -> Self {
        match kind {
            DomainErrorKind::MalformedInput => Self::MalformedInput,
            DomainErrorKind::InvalidRequestField => Self::InvalidRequestField,
            DomainErrorKind::UnsupportedRequestShape => Self::UnsupportedRequestShape,
            DomainErrorKind::InvalidCredentials => Self::InvalidCredentials,
            DomainErrorKind::DataRetrieval => Self::DataRetrieval,
            DomainErrorKind::PayloadTooLarge => Self::PayloadTooLarge,
            DomainErrorKind::InvalidBackendResponse => Self::InvalidBackendResponse,
            DomainErrorKind::BackendUnavailable => Self::BackendUnavailable,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InternalError => "INTERNAL_ERROR",
            Self::RequestTimeout => "REQUEST_TIMEOUT",
            Self::MalformedInput => DomainErrorKind::MalformedInput.tag(),
            Self::InvalidRequestField => DomainErrorKind::InvalidRequestField.tag(),
            Self::UnsupportedRequestShape => DomainErrorKind::UnsupportedRequestShape.tag(),
            Self::InvalidCredentials => DomainErrorKind::InvalidCredentials.tag(),
            Self::DataRetrieval => DomainErrorKind::DataRetrieval.tag(),
            Self::PayloadTooLarge => DomainErrorKind::PayloadTooLarge.tag(),
            Self::InvalidBackendResponse => DomainErrorKind::InvalidBackendResponse.tag(),
            Self::BackendUnavailable => DomainErrorKind::BackendUnavailable.tag(),
        }
    }

    pub fn is_reserved(&self) -> bool {
        Self::RESERVED.contains(self)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified, expected failure raised by prediction logic.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct DomainError {
    pub kind: DomainErrorKind,
    pub message: String,
    pub context: Option<String>,
}

impl DomainError {
    pub fn new(kind: DomainErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn malformed_input(message: impl Into<String>) -> Self {
        Self::new(DomainErrorKind::MalformedInput, message)
    }

    pub fn backend_unavailable(message: impl Into<String>) -> Self {
        Self::new(DomainErrorKind::BackendUnavailable, message)
    }
}

/// Wire shape of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error_code: ErrorCode,
    pub message: String,
}

impl ErrorBody {
    pub fn new(error_code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error_code,
            message: message.into(),
        }
    }

    pub fn internal() -> Self {
        Self::new(ErrorCode::InternalError, "Internal server error")
    }

    pub fn timeout(after_secs: u64) -> Self {
        Self::new(
            ErrorCode::RequestTimeout,
            format!("Request exceeded the {}s processing budget", after_secs),
        )
    }
}
