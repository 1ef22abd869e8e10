use crate::domain::change::RefTemplate;
use crate::services::availability_service::AvailabilityService;
use crate::services::health_service::HealthService;
use axum::body::Body;
use axum::http::{HeaderName, Request, StatusCode};
use axum::{Router, routing::get, routing::post};
use std::time::Duration;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub mod health;
pub mod middleware;
pub mod schemas;
pub mod triggers;

#[derive(Clone, Debug)]
pub struct AppState {
    pub availability_service: AvailabilityService,
    pub trigger_ref: RefTemplate,
}

#[derive(Clone, Debug)]
pub struct MgmtState {
    pub health_service: HealthService,
}

/// Configures and returns the router that receives trigger deliveries.
pub fn app_router(state: AppState, invocation_timeout: Duration) -> Router {
    let request_id_header = HeaderName::from_static(middleware::REQUEST_ID_HEADER);

    Router::new()
        .route("/v1/triggers/availability", post(triggers::availability_written))
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, invocation_timeout))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(move |request: &Request<Body>| {
                    let request_id = request
                        .extensions()
                        .get::<tower_http::request_id::RequestId>()
                        .map(|id| id.header_value().to_str().unwrap_or_default())
                        .unwrap_or_default()
                        .to_string();

                    tracing::info_span!(
                        "request",
                        "request_id" = %request_id,
                        "http.request.method" = %request.method(),
                        "url.path" = %request.uri().path(),
                        "http.response.status_code" = tracing::field::Empty,
                        "otel.kind" = "server",
                        "uid" = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, _span: &tracing::Span| {
                        let status = response.status();
                        tracing::Span::current().record("http.response.status_code", status.as_u16());

                        tracing::info!(
                            latency_ms = %latency.as_millis(),
                            status = %status.as_u16(),
                            "request completed"
                        );
                    },
                )
                .on_failure(|error, _latency, _span: &tracing::Span| {
                    tracing::error!(error = %error, "request failed");
                }),
        )
        .layer(SetRequestIdLayer::new(request_id_header, middleware::MakeRequestUuidOrHeader))
        .with_state(state)
}

pub fn mgmt_router(state: MgmtState) -> Router {
    Router::new().route("/livez", get(health::livez)).route("/readyz", get(health::readyz)).with_state(state)
}
