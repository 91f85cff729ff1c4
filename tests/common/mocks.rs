use async_trait::async_trait;
use prediction_server::{
    JsonObject, Request, Result,
    backend::{BackendError, ModelBackendHandle, RawResult},
    domain_error::{DomainError, DomainErrorKind},
    executor::{ExecutorFactory, InlinePredictionExecutor, PredictionExecutor},
    predictor::{PredictionError, PredictionResult, Predictor},
};
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock model server
#[derive(Debug)]
pub struct MockBackend {
    pub alive: AtomicBool,
    pub probe_delay: Duration,
    pub result: Mutex<std::result::Result<RawResult, BackendError>>,
    pub requests: Mutex<Vec<Request>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            alive: AtomicBool::new(true),
            probe_delay: Duration::ZERO,
            result: Mutex::new(Ok(json!({"predictions": [0.87]}))),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn down() -> Self {
        let backend = Self::new();
        backend.alive.store(false, Ordering::SeqCst);
        *backend.result.lock().unwrap() = Err(BackendError::Unreachable {
            address: "127.0.0.1:8501".to_string(),
            reason: "connection refused".to_string(),
        });
        backend
    }

    pub fn with_probe_delay(mut self, delay: Duration) -> Self {
        self.probe_delay = delay;
        self
    }

    pub fn get_requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelBackendHandle for MockBackend {
    async fn probe(&self) -> bool {
        tokio::time::sleep(self.probe_delay).await;
        self.alive.load(Ordering::SeqCst)
    }

    async fn run(&self, request: &Request) -> std::result::Result<RawResult, BackendError> {
        self.requests.lock().unwrap().push(request.clone());
        self.result.lock().unwrap().clone()
    }

    fn address(&self) -> String {
        "127.0.0.1:8501".to_string()
    }
}

/// Shared counters observed by tests
#[derive(Debug, Default)]
pub struct PredictorCounters {
    pub started: AtomicUsize,
    pub stopped: AtomicUsize,
    pub predictions: AtomicUsize,
}

impl PredictorCounters {
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn stopped(&self) -> usize {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn predictions(&self) -> usize {
        self.predictions.load(Ordering::SeqCst)
    }
}

/// Predictor whose behaviour is driven by fields of the request:
///
/// - `"domain_error": "<KIND>"` fails with that domain error
/// - `"unexpected": true` fails with an unclassified error
/// - `"panic": true` panics
/// - `"sleep_ms": n` sleeps before answering
///
/// Otherwise it forwards `instance` to the backend and returns the first prediction.
pub struct ScenarioPredictor {
    pub counters: Arc<PredictorCounters>,
}

impl ScenarioPredictor {
    pub fn new(counters: Arc<PredictorCounters>) -> Self {
        Self { counters }
    }
}

#[async_trait]
impl Predictor for ScenarioPredictor {
    async fn start(&mut self) -> Result<()> {
        self.counters.started.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn predict(&self, request: &Request, backend: &dyn ModelBackendHandle) -> PredictionResult {
        self.counters.predictions.fetch_add(1, Ordering::SeqCst);

        if let Some(tag) = request.get("domain_error").and_then(|v| v.as_str()) {
            let kind = DomainErrorKind::from_tag(tag).expect("known domain error tag");
            return Err(DomainError::new(kind, format!("scripted {}", tag)).into());
        }
        if request.get("unexpected").is_some() {
            return Err(PredictionError::Unexpected(anyhow::anyhow!(
                "scripted unexpected failure"
            )));
        }
        if request.get("panic").is_some() {
            panic!("scripted panic");
        }
        if let Some(ms) = request.get("sleep_ms").and_then(|v| v.as_u64()) {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }

        let raw = backend
            .run(request)
            .await
            .map_err(|e| DomainError::backend_unavailable(e.to_string()))?;

        let mut body = JsonObject::new();
        body.insert("prediction".to_string(), raw["predictions"][0].clone());
        Ok(body)
    }

    async fn stop(&mut self) -> Result<()> {
        self.counters.stopped.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Factory building inline executors around [`ScenarioPredictor`]
pub struct MockExecutorFactory {
    pub backend: Arc<MockBackend>,
    pub counters: Arc<PredictorCounters>,
    pub created: AtomicUsize,
    /// Creation number (0-based) from which `create` starts failing.
    pub fail_from: Option<usize>,
}

impl MockExecutorFactory {
    pub fn new(backend: Arc<MockBackend>) -> Self {
        Self {
            backend,
            counters: Arc::new(PredictorCounters::default()),
            created: AtomicUsize::new(0),
            fail_from: None,
        }
    }

    pub fn failing_from(mut self, creation: usize) -> Self {
        self.fail_from = Some(creation);
        self
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExecutorFactory for MockExecutorFactory {
    async fn create(&self, worker_id: usize) -> Result<Box<dyn PredictionExecutor>> {
        let creation = self.created.fetch_add(1, Ordering::SeqCst);
        if self.fail_from.is_some_and(|from| creation >= from) {
            return Err(prediction_server::Error::executor(format!(
                "scripted initialization failure for worker {}",
                worker_id
            )));
        }

        let predictor = Box::new(ScenarioPredictor::new(self.counters.clone()));
        let backend: Arc<dyn ModelBackendHandle> = self.backend.clone();
        Ok(Box::new(InlinePredictionExecutor::new(predictor, backend)))
    }
}
