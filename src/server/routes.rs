//! HTTP routes.
//!
//! - `GET /api/status`: model state and cache statistics
//! - `POST /api/generate`: `{prompt, count?}` to statements
//!
//! Responses use camelCase JSON field names and millisecond timings.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::MuninError;
use crate::model::ModelStatus;
use crate::service::{PROMPT_REQUIRED, PointService};
use crate::types::{PointCount, Statement};

/// Shared handler state.
pub type AppState = Arc<PointService>;

/// Build the application router.
pub fn router(service: AppState) -> Router {
    Router::new()
        .route("/api/status", get(status))
        .route("/api/generate", post(generate))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub prompt: Option<String>,
    /// Kept as raw JSON so non-numeric values fall back to the default count.
    pub count: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub success: bool,
    pub topic: String,
    pub requested_count: usize,
    pub generated_count: usize,
    pub points: Vec<Statement>,
    pub generation_time: u64,
    pub total_time: u64,
    pub cached: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: ModelStatus,
    pub message: String,
    pub cache_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_hit_rate: Option<f64>,
}

async fn status(State(service): State<AppState>) -> Json<StatusResponse> {
    let status = service.status();
    Json(StatusResponse {
        status: status.status,
        message: status.message,
        cache_size: status.cache_size,
        cache_hit_rate: status.cache_hit_rate,
    })
}

async fn generate(
    State(service): State<AppState>,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> Response {
    let started = Instant::now();

    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            debug!(error = %rejection, "rejected generate body");
            return bad_request(PROMPT_REQUIRED);
        }
    };
    let Some(prompt) = request.prompt else {
        return bad_request(PROMPT_REQUIRED);
    };
    let count = PointCount::from_json(request.count.as_ref());

    match service.generate(&prompt, count).await {
        Ok(result) => Json(GenerateResponse {
            success: true,
            topic: result.topic,
            requested_count: result.requested.get(),
            generated_count: result.points.len(),
            points: result.points,
            generation_time: result.generation_time.as_millis() as u64,
            total_time: started.elapsed().as_millis() as u64,
            cached: result.cached,
        })
        .into_response(),
        Err(MuninError::InvalidInput(message)) => bad_request(&message),
        Err(e) => {
            warn!(error = %e, "generate request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "error": e.to_string(),
                    "totalTime": started.elapsed().as_millis() as u64,
                })),
            )
                .into_response()
        }
    }
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}
