mod types;

pub use types::*;

use crate::{Error, Result};
use std::{env, fmt::Display, str::FromStr};
use tracing::debug;

pub const HTTP_PORT_VAR: &str = "AIP_HTTP_PORT";
pub const BACKEND_PORT_VAR: &str = "MODEL_REST_PORT";
pub const WORKERS_VAR: &str = "SERVER_WORKERS";
pub const TIMEOUT_VAR: &str = "SERVER_TIMEOUT_SECS";
pub const PREDICT_ROUTE_VAR: &str = "AIP_PREDICT_ROUTE";
pub const HEALTH_ROUTE_VAR: &str = "AIP_HEALTH_ROUTE";
pub const CONFIG_PATH_VAR: &str = "CONFIG_PATH";

const DEFAULT_CONFIG_PATH: &str = "config.yaml";

pub async fn load() -> Result<Config> {
    load_with(|key| env::var(key).ok()).await
}

/// Loads the optional YAML file, applies environment values from `lookup` and validates.
pub async fn load_with<F>(lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let explicit_path = lookup(CONFIG_PATH_VAR);
    let config_path = explicit_path
        .clone()
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    debug!("Loading configuration from: {}", config_path);

    let mut config = match tokio::fs::read_to_string(&config_path).await {
        Ok(config_str) => serde_yaml::from_str::<Config>(&config_str)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && explicit_path.is_none() => {
            debug!("No configuration file found, using defaults");
            Config::default()
        }
        Err(e) => {
            return Err(Error::config(format!(
                "Failed to read configuration file {}: {}",
                config_path, e
            )));
        }
    };

    apply_env(&mut config, &lookup)?;
    config.validate()?;

    Ok(config)
}

fn apply_env<F>(config: &mut Config, lookup: &F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    config.server.port = required(lookup, HTTP_PORT_VAR)?;
    config.backend.port = required(lookup, BACKEND_PORT_VAR)?;

    if let Some(workers) = optional(lookup, WORKERS_VAR)? {
        config.server.workers = workers;
    }
    if let Some(timeout) = optional(lookup, TIMEOUT_VAR)? {
        config.server.timeout_secs = timeout;
    }
    if let Some(route) = lookup(PREDICT_ROUTE_VAR) {
        config.server.predict_route = route;
    }
    if let Some(route) = lookup(HEALTH_ROUTE_VAR) {
        config.server.health_route = route;
    }

    Ok(())
}

fn required<T, F>(lookup: &F, key: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, key)?.ok_or_else(|| {
        Error::config(format!(
            "The environment variable {} needs to be specified.",
            key
        ))
    })
}

fn optional<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
            Error::config(format!(
                "The environment variable {} has an invalid value '{}': {}",
                key, raw, e
            ))
        }),
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        let server = &self.server;

        if server.port == 0 {
            return Err(Error::config(format!("{} must be a non-zero port", HTTP_PORT_VAR)));
        }
        if self.backend.port == 0 {
            return Err(Error::config(format!(
                "{} must be a non-zero port",
                BACKEND_PORT_VAR
            )));
        }
        if server.workers == 0 {
            return Err(Error::config("server.workers must be at least 1"));
        }
        if server.timeout_secs == 0 {
            return Err(Error::config("server.timeout_secs must be at least 1"));
        }
        for route in [&server.predict_route, &server.health_route] {
            if !route.starts_with('/') {
                return Err(Error::config(format!("Route '{}' must start with '/'", route)));
            }
        }
        if server.predict_route == server.health_route {
            return Err(Error::config(
                "Prediction and health routes must be different",
            ));
        }
        // The probe has to answer before the platform abandons the health check.
        if self.backend.probe_timeout() >= server.health_timeout() {
            return Err(Error::config(format!(
                "backend.probe_timeout_ms ({}) must be shorter than server.health_timeout_secs ({})",
                self.backend.probe_timeout_ms, server.health_timeout_secs
            )));
        }
        if self.executor.mode == ExecutorMode::Subprocess && self.executor.command.is_empty() {
            return Err(Error::config(
                "executor.command is required when executor.mode is 'subprocess'",
            ));
        }

        Ok(())
    }
}
