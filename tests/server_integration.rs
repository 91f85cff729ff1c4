use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use prediction_server::{
    backend::ModelBackendHandle,
    domain_error::ErrorMapper,
    executor::ExecutorFactory,
    health::HealthSupervisor,
    server::{self, handlers::AppState},
    worker::WorkerPool,
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower::ServiceExt; // for `oneshot`

mod common;
use common::mocks::{MockBackend, MockExecutorFactory};
use common::test_utils::create_test_config;

async fn create_test_app(backend: MockBackend, request_timeout: Duration) -> Router {
    let backend = Arc::new(backend);
    let factory: Arc<dyn ExecutorFactory> = Arc::new(MockExecutorFactory::new(backend.clone()));
    let pool = WorkerPool::start(2, factory).await.unwrap();

    let handle: Arc<dyn ModelBackendHandle> = backend;
    let app_state = AppState {
        pool: Arc::new(pool),
        health: Arc::new(HealthSupervisor::new(handle, Duration::from_millis(300))),
        mapper: ErrorMapper::new(),
        request_timeout,
    };

    server::router(app_state, &create_test_config().server)
}

fn predict_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn health_request() -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_predict_returns_prediction() {
    let app = create_test_app(MockBackend::new(), Duration::from_secs(5)).await;

    let response = app
        .oneshot(predict_request(json!({"instance": "abc"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({"prediction": 0.87}));
}

#[tokio::test]
async fn test_predict_maps_domain_error() {
    let app = create_test_app(MockBackend::new(), Duration::from_secs(5)).await;

    let response = app
        .oneshot(predict_request(
            json!({"instance": "abc", "domain_error": "MALFORMED_INPUT"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["error_code"], json!("MALFORMED_INPUT"));
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_predict_unexpected_error_is_generic_server_failure() {
    let app = create_test_app(MockBackend::new(), Duration::from_secs(5)).await;

    let response = app
        .oneshot(predict_request(json!({"unexpected": true})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(response).await,
        json!({"error_code": "INTERNAL_ERROR", "message": "Internal server error"})
    );
}

#[tokio::test]
async fn test_predict_times_out() {
    let app = create_test_app(MockBackend::new(), Duration::from_millis(100)).await;

    let response = app
        .oneshot(predict_request(json!({"instance": "abc", "sleep_ms": 5000})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(json_body(response).await["error_code"], json!("REQUEST_TIMEOUT"));
}

#[rstest]
#[case::array(Body::from("[1, 2, 3]"))]
#[case::not_json(Body::from("not json"))]
#[case::empty(Body::empty())]
#[tokio::test]
async fn test_predict_maps_unusable_body_to_malformed_input(#[case] body: Body) {
    let app = create_test_app(MockBackend::new(), Duration::from_secs(5)).await;

    let request = Request::builder()
        .method("POST")
        .uri("/predict")
        .header("content-type", "application/json")
        .body(body)
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "application/json");
    let body = json_body(response).await;
    assert_eq!(body["error_code"], json!("MALFORMED_INPUT"));
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_predict_without_json_content_type_is_malformed_input() {
    let app = create_test_app(MockBackend::new(), Duration::from_secs(5)).await;

    let request = Request::builder()
        .method("POST")
        .uri("/predict")
        .body(Body::from(r#"{"instance": "abc"}"#))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(json_body(response).await["error_code"], json!("MALFORMED_INPUT"));
}

#[tokio::test]
async fn test_predict_route_rejects_get() {
    let app = create_test_app(MockBackend::new(), Duration::from_secs(5)).await;

    let request = Request::builder()
        .method("GET")
        .uri("/predict")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_health_reports_alive_backend() {
    let app = create_test_app(MockBackend::new(), Duration::from_secs(5)).await;

    let response = app.oneshot(health_request()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["alive"], json!(true));
    assert_eq!(body["backend"], json!("127.0.0.1:8501"));
}

#[tokio::test]
async fn test_health_reports_dead_backend_quickly() {
    let app = create_test_app(
        MockBackend::down().with_probe_delay(Duration::from_secs(30)),
        Duration::from_secs(5),
    )
    .await;

    let started = Instant::now();
    let response = app.oneshot(health_request()).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(response).await["alive"], json!(false));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = create_test_app(MockBackend::new(), Duration::from_secs(5)).await;

    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
