pub mod backend;
pub mod config;
pub mod domain_error;
pub mod error;
pub mod executor;
pub mod health;
mod payload;
pub mod predictor;
pub mod server;
pub mod signal;
pub mod worker;

pub use error::{Error, Result};
pub use payload::{JsonObject, Request, Response};
