use axum::body::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain_error::ErrorBody;

pub type JsonObject = Map<String, Value>;

/// One inbound prediction call. Immutable once received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Request(JsonObject);

impl Request {
    pub fn new(body: JsonObject) -> Self {
        Self(body)
    }

    /// Builds a request from an arbitrary JSON value; only objects are accepted.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_object(&self) -> &JsonObject {
        &self.0
    }

    pub fn into_inner(self) -> JsonObject {
        self.0
    }

    pub fn to_json_line(&self) -> serde_json::Result<Vec<u8>> {
        let mut line = serde_json::to_vec(&self.0)?;
        line.push(b'\n');
        Ok(line)
    }
}

/// Outcome of one executor invocation. Every variant is JSON on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Prediction(JsonObject),
    Error(ErrorBody),
    /// Bytes produced by a delegated executor, relayed untouched.
    Relayed { body: Bytes },
}

impl Response {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn to_bytes(&self) -> serde_json::Result<Bytes> {
        match self {
            Self::Prediction(body) => serde_json::to_vec(body).map(Bytes::from),
            Self::Error(body) => serde_json::to_vec(body).map(Bytes::from),
            Self::Relayed { body } => Ok(body.clone()),
        }
    }
}

impl From<JsonObject> for Response {
    fn from(body: JsonObject) -> Self {
        Self::Prediction(body)
    }
}

impl From<ErrorBody> for Response {
    fn from(body: ErrorBody) -> Self {
        Self::Error(body)
    }
}
