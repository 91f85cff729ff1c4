use super::types::HealthResponse;
use crate::{
    JsonObject, Request, Response,
    domain_error::{DomainError, ErrorBody, ErrorMapper},
    health::HealthSupervisor,
    worker::WorkerPool,
};
use axum::{
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Json},
};
use std::{sync::Arc, time::Duration};
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<WorkerPool>,
    pub health: Arc<HealthSupervisor>,
    pub mapper: ErrorMapper,
    pub request_timeout: Duration,
}

pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<JsonObject>, JsonRejection>,
) -> axum::response::Response {
    let request_id = Uuid::new_v4();
    let span = info_span!("predict", %request_id);

    async move {
        let body = match payload {
            Ok(Json(body)) => body,
            Err(rejection) => {
                warn!("Rejected prediction request body: {}", rejection.body_text());
                return into_http(state.mapper.map(&DomainError::malformed_input(
                    "Request body must be a JSON object",
                )));
            }
        };

        info!("Received prediction request with {} fields", body.len());

        match tokio::time::timeout(state.request_timeout, state.pool.submit(Request::new(body)))
            .await
        {
            Ok(Ok(response)) => {
                info!(error = response.is_error(), "Prediction request completed");
                into_http(response)
            }
            Ok(Err(e)) => {
                error!("Prediction request failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody::internal()),
                )
                    .into_response()
            }
            Err(_) => {
                warn!(
                    "Prediction request exceeded {:?}, aborting",
                    state.request_timeout
                );
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    Json(ErrorBody::timeout(state.request_timeout.as_secs())),
                )
                    .into_response()
            }
        }
    }
    .instrument(span)
    .await
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let health = state.health.check().await;
    let status = if health.alive {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(HealthResponse::from(health)))
}

fn into_http(response: Response) -> axum::response::Response {
    match response {
        Response::Prediction(body) => (StatusCode::OK, Json(body)).into_response(),
        Response::Error(body) => (StatusCode::OK, Json(body)).into_response(),
        Response::Relayed { body } => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response(),
    }
}
