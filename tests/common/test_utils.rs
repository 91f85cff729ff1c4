use prediction_server::{
    Request,
    config::{BackendConfig, Config, ExecutorConfig, LogsConfig, ServerConfig},
};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tempfile::TempDir;
use tokio::fs;

/// Create a test configuration with sensible defaults
pub fn create_test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            workers: 2,
            timeout_secs: 5,
            health_timeout_secs: 5,
            predict_route: "/predict".to_string(),
            health_route: "/health".to_string(),
            logs: LogsConfig {
                level: "debug".to_string(),
            },
        },
        backend: BackendConfig {
            host: "127.0.0.1".to_string(),
            port: 8501,
            model_name: "default".to_string(),
            probe_timeout_ms: 500,
        },
        executor: ExecutorConfig::default(),
    }
}

/// Build an environment lookup from key/value pairs
pub fn env_lookup<K: ToString, V: ToString>(pairs: Vec<(K, V)>) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| vars.get(key).cloned()
}

/// Mandatory variables only
pub fn minimal_env() -> Vec<(String, String)> {
    vec![
        ("AIP_HTTP_PORT".to_string(), "8080".to_string()),
        ("MODEL_REST_PORT".to_string(), "8501".to_string()),
    ]
}

/// Create a test config YAML file
pub async fn create_test_config_file(dir: &TempDir, content: &str) -> String {
    let config_path = dir.path().join("config.yaml");
    fs::write(&config_path, content)
        .await
        .expect("Failed to write config file");
    config_path.to_string_lossy().to_string()
}

/// Create a temporary directory for test files
pub fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

pub fn request(value: Value) -> Request {
    Request::from_value(value).expect("test requests are JSON objects")
}

/// Poll `condition` until it holds or `timeout` elapses
pub async fn wait_until<F>(timeout: Duration, condition: F) -> bool
where
    F: Fn() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}

/// Sample configuration YAML for testing
pub const SAMPLE_CONFIG_YAML: &str = r#"
server:
  host: "127.0.0.1"
  workers: 4
  timeout_secs: 30
  health_timeout_secs: 10
  predict_route: "/v1/predict"
  health_route: "/v1/health"
  logs:
    level: "debug"

backend:
  host: "127.0.0.1"
  model_name: "encoder"
  probe_timeout_ms: 1500
"#;

/// Sample configuration with a delegated executor
pub const SAMPLE_CONFIG_WITH_SUBPROCESS: &str = r#"
executor:
  mode: "subprocess"
  command: ["/server-env/bin/prediction-server", "serve-stdio"]
  env:
    RUST_LOG: "info"
"#;

/// Probe budget that does not fit in the health check budget
pub const INVALID_PROBE_BUDGET_YAML: &str = r#"
server:
  health_timeout_secs: 2

backend:
  probe_timeout_ms: 2000
"#;
