use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sourcing_gateway::{
    resolve_active, CredentialSource, GatewayClient, GatewayError, GatewayRequest,
    UPSTREAM_STATUS_HEADER, USER_ID_HEADER,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::middleware::{request_id, require_proxy_key, ErrorBody, ProxyAuthState, RequestId};

#[derive(Clone)]
pub struct AppState {
    pub client: GatewayClient,
    pub credentials: Arc<dyn CredentialSource>,
}

#[derive(Debug, Serialize)]
struct HealthData {
    ok: bool,
    service: &'static str,
    timestamp: DateTime<Utc>,
}

pub fn build_app(state: AppState, auth: ProxyAuthState) -> Router {
    let protected = Router::new()
        .route("/api/marketplace/{*path}", any(forward))
        .layer(axum::middleware::from_fn_with_state(auth, require_proxy_key));

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(HealthData {
        ok: true,
        service: "sourcing-proxy",
        timestamp: Utc::now(),
    })
}

/// Signs the call with the user's stored credential, forwards it to the
/// marketplace and relays status and body verbatim.
async fn forward(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    method: Method,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let user_id = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let Some(user_id) = user_id else {
        return (StatusCode::UNAUTHORIZED, Json(ErrorBody::new("NO_USER_ID"))).into_response();
    };

    let credentials = match resolve_active(state.credentials.as_ref(), user_id) {
        Ok(c) => c,
        Err(e) => return credential_error(&req_id, user_id, &e),
    };

    let mut request =
        GatewayRequest::new(method, format!("/{path}")).with_query(query.unwrap_or_default());
    if !body.is_empty() {
        match serde_json::from_slice(&body) {
            Ok(json) => request = request.with_body(json),
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ErrorBody::with_message("INVALID_JSON_BODY", e.to_string())),
                )
                    .into_response()
            }
        }
    }

    match state.client.send(&credentials, &request).await {
        Ok(upstream) => {
            tracing::info!(
                request_id = %req_id.0,
                user_id,
                method = %request.method,
                path = %request.path,
                status = upstream.status,
                "relayed marketplace response"
            );
            let status = StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::BAD_GATEWAY);
            let mut response = (status, Json(upstream.body)).into_response();
            response.headers_mut().insert(
                UPSTREAM_STATUS_HEADER,
                HeaderValue::from(upstream.status),
            );
            response
        }
        Err(e) => {
            tracing::error!(
                request_id = %req_id.0,
                user_id,
                path = %request.path,
                error = %e,
                "marketplace call failed"
            );
            (
                StatusCode::BAD_GATEWAY,
                Json(ErrorBody::with_message("UPSTREAM_UNAVAILABLE", e.to_string())),
            )
                .into_response()
        }
    }
}

fn credential_error(req_id: &RequestId, user_id: &str, error: &GatewayError) -> Response {
    match error {
        GatewayError::NoCredentials { .. } => {
            (StatusCode::BAD_REQUEST, Json(ErrorBody::new("NO_CREDENTIALS"))).into_response()
        }
        GatewayError::AmbiguousCredentials { count, .. } => (
            StatusCode::CONFLICT,
            Json(ErrorBody::with_message(
                "AMBIGUOUS_CREDENTIALS",
                format!("{count} active credentials"),
            )),
        )
            .into_response(),
        other => {
            tracing::error!(
                request_id = %req_id.0,
                user_id,
                error = %other,
                "credential lookup failed"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new("CREDENTIAL_LOOKUP_FAILED")),
            )
                .into_response()
        }
    }
}
