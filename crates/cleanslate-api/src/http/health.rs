//! Health, status and metrics endpoints.

use std::sync::Arc;

use axum::{Json, body::Body, extract::State, http::StatusCode, response::Response};
use chrono::Utc;
use cleanslate_telemetry::build_sha;
use tracing::error;

use crate::http::constants::STATUS_RECENT_EVENTS;
use crate::http::errors::ApiError;
use crate::models::{HealthResponse, StatusResponse};
use crate::state::ApiState;

pub(crate) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        build: build_sha().to_string(),
    })
}

pub(crate) async fn status(State(state): State<Arc<ApiState>>) -> Json<StatusResponse> {
    let pipeline = state.dispatcher.status();
    let degraded = pipeline.degraded.clone();
    Json(StatusResponse {
        status: if degraded.is_empty() {
            "running"
        } else {
            "degraded"
        },
        timestamp: Utc::now(),
        build: build_sha().to_string(),
        services: state.services.clone(),
        pipeline,
        degraded,
        recent_events: state.events.recent(STATUS_RECENT_EVENTS),
    })
}

pub(crate) async fn metrics(State(state): State<Arc<ApiState>>) -> Result<Response, ApiError> {
    match state.telemetry.render() {
        Ok(body) => Response::builder()
            .status(StatusCode::OK)
            .header(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4",
            )
            .body(Body::from(body))
            .map_err(|err| {
                error!(error = %err, "failed to build metrics response");
                ApiError::internal("failed to build metrics response")
            }),
        Err(err) => {
            error!(error = %err, "failed to render metrics");
            Err(ApiError::internal("failed to render metrics"))
        }
    }
}
