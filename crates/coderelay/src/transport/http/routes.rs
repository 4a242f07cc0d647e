//! HTTP route handlers.

use std::sync::Arc;

use axum::{
    Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{Html, IntoResponse, Json},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::compiler::BridgeStatus;
use crate::health::HealthResponse;
use crate::service::{CompileService, HealthSnapshot, SubmitError};
use crate::version::VersionInfo;

#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: HealthResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compiler: Option<BridgeStatus>,
    pub version: VersionInfo,
}

impl HealthCheckResponse {
    pub fn from_snapshot(snapshot: HealthSnapshot) -> Self {
        let status = if snapshot.is_busy() {
            HealthResponse::Busy
        } else {
            snapshot.state.into()
        };

        Self {
            status,
            compiler: snapshot.compiler,
            version: snapshot.version,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CompileRequest {
    pub code: Option<String>,
}

async fn landing_page(State(service): State<Arc<CompileService>>) -> Html<String> {
    Html(service.landing_page().to_string())
}

async fn health_check(State(service): State<Arc<CompileService>>) -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse::from_snapshot(service.health().await))
}

/// Forward `code` to the compiler and answer with whatever it printed.
///
/// The body is plain text: the captured output, or `No output produced`.
async fn compile(
    State(service): State<Arc<CompileService>>,
    body: Result<Json<CompileRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::debug!(error = %rejection.body_text(), "Rejected compile request");
            return (rejection.status(), rejection.body_text());
        }
    };

    let Some(code) = request.code else {
        return (
            StatusCode::BAD_REQUEST,
            "Missing required field: code".to_string(),
        );
    };

    match service.submit(&code).await {
        Ok(result) => (StatusCode::OK, result.into_body()),
        Err(SubmitError::NotReady) => (
            StatusCode::SERVICE_UNAVAILABLE,
            SubmitError::NotReady.to_string(),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Compile request failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

pub fn routes(service: Arc<CompileService>) -> Router {
    Router::new()
        .route("/", get(landing_page))
        .route("/compile", post(compile))
        .route("/health-check", get(health_check))
        .with_state(service)
}
