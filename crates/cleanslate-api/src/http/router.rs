//! Router construction and server host for the API.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderName, Method, Request, header::CONTENT_TYPE},
    routing::{get, post},
};
use cleanslate_pipeline::Shutdown;
use cleanslate_telemetry::build_sha;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{Span, info};

use crate::http::constants::{HEADER_REQUEST_ID, MAX_UPLOAD_BYTES};
use crate::http::health::{health, metrics, status};
use crate::http::sanitize::{backup, sanitize};
use crate::http::telemetry::HttpMetricsLayer;
use crate::state::ApiState;

/// Axum router wrapper that hosts the `CleanSlate` API.
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    /// Build the router with request-id, tracing, CORS and metrics layers.
    #[must_use]
    pub fn new(state: Arc<ApiState>) -> Self {
        let telemetry = state.telemetry.clone();
        let cors_layer = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([CONTENT_TYPE, HeaderName::from_static(HEADER_REQUEST_ID)]);
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get(HEADER_REQUEST_ID)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                tracing::info_span!(
                    "http.request",
                    method = %request.method(),
                    route = %request.uri().path(),
                    request_id = %request_id,
                    build_sha = %build_sha(),
                    status_code = tracing::field::Empty,
                    latency_ms = tracing::field::Empty
                )
            })
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &Span| {
                    span.record("status_code", response.status().as_u16());
                    let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
                    span.record("latency_ms", latency_ms);
                },
            );
        let layered = ServiceBuilder::new()
            .layer(cleanslate_telemetry::propagate_request_id_layer())
            .layer(cleanslate_telemetry::set_request_id_layer())
            .layer(trace_layer)
            .layer(HttpMetricsLayer::new(telemetry));

        let router = Self::routes()
            .layer(cors_layer)
            .route_layer(layered)
            .with_state(state);
        Self { router }
    }

    fn routes() -> Router<Arc<ApiState>> {
        Router::new()
            .route("/health", get(health))
            .route("/status", get(status))
            .route("/metrics", get(metrics))
            .route(
                "/sanitize",
                post(sanitize).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
            )
            .route("/backup", post(backup))
    }

    /// Consume the server and return the underlying router.
    #[must_use]
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Serve the API on the provided address until `shutdown` fires.
    ///
    /// # Errors
    ///
    /// Returns an error if binding the listener or serving requests fails.
    pub async fn serve(self, addr: SocketAddr, mut shutdown: Shutdown) -> Result<()> {
        info!("Starting API on {}", addr);
        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await?;
        info!("API stopped");
        Ok(())
    }
}
