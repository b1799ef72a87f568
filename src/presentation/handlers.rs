// HTTP request handlers
use crate::application::chart_service::RequestContext;
use crate::domain::error::ChartError;
use crate::domain::telemetry::ChartRequest;
use crate::infrastructure::http_response::{accepts_brotli, json_response};
use crate::presentation::app_state::AppState;
use crate::presentation::dto::{ChartQuery, ErrorBody};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

/// Set by the gateway once the caller is authenticated
pub const PRINCIPAL_HEADER: &str = "x-authenticated-user";

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Build a chart payload for the requested sensors and date range
pub async fn build_chart(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(query): Json<ChartQuery>,
) -> Response {
    let compress = accepts_brotli(&headers);
    let context = request_context(&headers);

    let result = match ChartRequest::try_from(query) {
        Ok(request) => state.chart_service.build_chart(&context, request).await,
        Err(e) => Err(e),
    };

    let response = match result {
        Ok(payload) => json_response(StatusCode::OK, &payload, compress).await,
        Err(e) => {
            tracing::warn!("Chart request failed: {}", e);
            json_response(error_status(&e), &ErrorBody::from(&e), false).await
        }
    };

    match response {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

fn request_context(headers: &HeaderMap) -> RequestContext {
    headers
        .get(PRINCIPAL_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(RequestContext::for_principal)
        .unwrap_or_default()
}

fn error_status(err: &ChartError) -> StatusCode {
    match err {
        e if e.is_input_error() => StatusCode::BAD_REQUEST,
        ChartError::QueryTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::SERVICE_UNAVAILABLE,
    }
}
