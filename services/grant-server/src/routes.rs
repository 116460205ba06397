//! HTTP surface over the credential server
//!
//! Handlers are thin: they turn transport parameters into core requests,
//! then record metrics and map errors on the way out.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Instant;

use axum::extract::{Form, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use oauth_grant::{RequestParams, Server};
use tracing::{error, warn};

use crate::error::ApiError;
use crate::metrics::{ServiceMetrics, record_request};

/// Shared application state accessible from all handlers
#[derive(Clone)]
pub struct AppState {
    pub server: Arc<Server>,
    pub metrics: ServiceMetrics,
    pub prometheus: PrometheusHandle,
}

type Params = HashMap<String, String>;

/// Build the axum router with all routes and shared state.
///
/// `max_connections` bounds concurrently processed requests.
pub fn build_router(state: AppState, max_connections: usize) -> Router {
    Router::new()
        .route("/authorize", get(authorize_handler))
        .route("/grant", post(grant_handler))
        .route("/refresh", post(refresh_handler))
        .route("/verify", get(verify_handler))
        .route("/revoke", post(revoke_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

async fn authorize_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<Params>,
) -> Response {
    let started = Instant::now();
    let result = authorize(&state, &headers, query);
    finish(&state, "authorize", started, result)
}

/// `sid` stands in for the authenticated end-user session.
fn authorize(state: &AppState, headers: &HeaderMap, mut query: Params) -> Result<Response, ApiError> {
    let session_id = take_param(&mut query, "sid")?;
    let params = request_params(headers, query);
    let response = state.server.authorize_from_params(&params, &session_id)?;
    Ok((StatusCode::FOUND, [(header::LOCATION, response.callback_url())]).into_response())
}

async fn grant_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<Params>,
) -> Response {
    let started = Instant::now();
    let params = request_params(&headers, form);
    let result = state
        .server
        .grant_from_params(&params)
        .map(|response| Json(response).into_response())
        .map_err(ApiError::from);
    finish(&state, "grant", started, result)
}

async fn refresh_handler(State(state): State<AppState>, Form(mut form): Form<Params>) -> Response {
    let started = Instant::now();
    let result = take_param(&mut form, "refresh_token").and_then(|token| {
        let response = state.server.refresh(&token)?;
        Ok(Json(response).into_response())
    });
    finish(&state, "refresh", started, result)
}

async fn verify_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(mut query): Query<Params>,
) -> Response {
    let started = Instant::now();
    let token = match bearer_token(&headers) {
        Some(token) => Ok(token.to_owned()),
        None => take_param(&mut query, "access_token"),
    };
    let result = token.and_then(|token| {
        let response = state.server.verify_access_token(&token)?;
        Ok(Json(response).into_response())
    });
    finish(&state, "verify", started, result)
}

async fn revoke_handler(State(state): State<AppState>, Form(mut form): Form<Params>) -> Response {
    let started = Instant::now();
    let result = take_param(&mut form, "access_token").and_then(|token| {
        state.server.revoke(&token)?;
        Ok(StatusCode::NO_CONTENT.into_response())
    });
    finish(&state, "revoke", started, result)
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "uptime_seconds": state.metrics.started_at.elapsed().as_secs(),
        "requests_served": state.metrics.requests_total.load(Ordering::Relaxed),
        "errors_total": state.metrics.errors_total.load(Ordering::Relaxed),
    }))
}

/// Prometheus metrics endpoint in text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}

/// Count the request, record its metrics and attach a request id.
fn finish(
    state: &AppState,
    endpoint: &'static str,
    started: Instant,
    result: Result<Response, ApiError>,
) -> Response {
    let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());
    let elapsed = started.elapsed().as_secs_f64();
    state.metrics.requests_total.fetch_add(1, Ordering::Relaxed);

    let mut response = match result {
        Ok(response) => {
            record_request(endpoint, "ok", elapsed);
            response
        }
        Err(err) => {
            state.metrics.errors_total.fetch_add(1, Ordering::Relaxed);
            record_request(endpoint, err.kind(), elapsed);
            if err.status().is_server_error() {
                error!(request_id = %request_id, endpoint, error = %err, "request failed");
            } else {
                warn!(request_id = %request_id, endpoint, kind = err.kind(), "request rejected");
            }
            err.into_response()
        }
    };
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

fn take_param(params: &mut Params, name: &'static str) -> Result<String, ApiError> {
    params
        .remove(name)
        .filter(|value| !value.is_empty())
        .ok_or(ApiError::MissingParam(name))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn request_params(headers: &HeaderMap, form: Params) -> RequestParams {
    let headers = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_owned(), value.to_owned()))
        })
        .collect();
    RequestParams { headers, form }
}
