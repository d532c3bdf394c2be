//! REST API handlers for scoring, feedback, model inspection and
//! operational endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, warn};
use venture_core::types::{Action, BaselineResponse, ResetResponse, ScoreResponse, UpdateResponse};
use venture_core::RecommenderError;
use venture_recommender::RecommendationService;
use venture_rl_engine::ModelExplanation;

/// Maximum length of investor and candidate ids.
const MAX_FIELD_LEN: usize = 256;

/// Upper bound on recommendations per request.
const MAX_TOP_N: usize = 100;

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RecommendationService>,
    pub node_id: String,
    pub start_time: Instant,
    pub ready: Arc<AtomicBool>,
}

#[derive(Debug, Deserialize)]
pub struct ScoreRequest {
    pub investor_id: String,
    #[serde(default)]
    pub top_n: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub investor_id: String,
    pub candidate_id: String,
    pub reward: f64,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub investor_id: String,
    pub candidate_id: String,
    pub action: Action,
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub reason: String,
}

/// Error body plus the status it maps to.
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    fn invalid(message: &str) -> Self {
        metrics::counter!("api.validation_errors").increment(1);
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorResponse {
                error: "invalid_request".to_string(),
                message: message.to_string(),
            },
        }
    }
}

impl From<RecommenderError> for ApiError {
    fn from(err: RecommenderError) -> Self {
        let status = match &err {
            RecommenderError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RecommenderError::CandidateNotFound(_) => StatusCode::NOT_FOUND,
            RecommenderError::StateCorrupted { .. } => StatusCode::CONFLICT,
            RecommenderError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %err, "Request processing failed");
            metrics::counter!("api.errors").increment(1);
            "Internal processing error".to_string()
        } else {
            err.to_string()
        };

        Self {
            status,
            body: ErrorResponse {
                error: err.kind().to_string(),
                message,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn validate_id(field: &'static str, value: &str) -> Result<(), ApiError> {
    if value.is_empty() {
        return Err(ApiError::invalid(&format!("'{field}' must not be empty")));
    }
    if value.len() > MAX_FIELD_LEN {
        return Err(ApiError::invalid(&format!("'{field}' exceeds maximum length")));
    }
    Ok(())
}

fn validate_top_n(top_n: Option<usize>) -> Result<(), ApiError> {
    match top_n {
        Some(n) if n == 0 || n > MAX_TOP_N => Err(ApiError::invalid(&format!(
            "'top_n' must be between 1 and {MAX_TOP_N}"
        ))),
        _ => Ok(()),
    }
}

/// POST /v1/score: LinUCB recommendations for an investor.
pub async fn handle_score(
    State(state): State<AppState>,
    Json(request): Json<ScoreRequest>,
) -> Result<Json<ScoreResponse>, ApiError> {
    validate_id("investor_id", &request.investor_id)?;
    validate_top_n(request.top_n)?;

    let response = state
        .service
        .score(&request.investor_id, request.top_n)
        .await?;
    Ok(Json(response))
}

/// POST /v1/update: numeric reward for a candidate.
pub async fn handle_update(
    State(state): State<AppState>,
    Json(request): Json<UpdateRequest>,
) -> Result<Json<UpdateResponse>, ApiError> {
    validate_id("investor_id", &request.investor_id)?;
    validate_id("candidate_id", &request.candidate_id)?;

    let response = state
        .service
        .update(&request.investor_id, &request.candidate_id, request.reward)
        .await?;
    Ok(Json(response))
}

/// POST /v1/feedback: invest/pass decision mapped through the reward policy.
pub async fn handle_feedback(
    State(state): State<AppState>,
    Json(request): Json<FeedbackRequest>,
) -> Result<Json<UpdateResponse>, ApiError> {
    validate_id("investor_id", &request.investor_id)?;
    validate_id("candidate_id", &request.candidate_id)?;

    let response = state
        .service
        .feedback(&request.investor_id, &request.candidate_id, request.action)
        .await?;
    Ok(Json(response))
}

/// POST /v1/baseline: heuristic ranking for comparison only.
pub async fn handle_baseline(
    State(state): State<AppState>,
    Json(request): Json<ScoreRequest>,
) -> Result<Json<BaselineResponse>, ApiError> {
    validate_id("investor_id", &request.investor_id)?;
    validate_top_n(request.top_n)?;

    let response = state
        .service
        .baseline(&request.investor_id, request.top_n)
        .await?;
    Ok(Json(response))
}

/// GET /v1/investors/:investor_id/model
pub async fn handle_explain(
    State(state): State<AppState>,
    Path(investor_id): Path<String>,
) -> Result<Json<ModelExplanation>, ApiError> {
    validate_id("investor_id", &investor_id)?;
    Ok(Json(state.service.explain(&investor_id).await?))
}

/// POST /v1/investors/:investor_id/reset: discard learned state. Audited via logs.
pub async fn handle_reset(
    State(state): State<AppState>,
    Path(investor_id): Path<String>,
    Json(request): Json<ResetRequest>,
) -> Result<Json<ResetResponse>, ApiError> {
    validate_id("investor_id", &investor_id)?;
    warn!(investor_id = %investor_id, node_id = %state.node_id, "State reset requested");
    Ok(Json(state.service.reset(&investor_id, &request.reason).await?))
}

/// GET /health: Health check endpoint.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        node_id: state.node_id.clone(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        feature_dimension: state.service.dimension(),
    })
}

/// GET /ready: Readiness probe for Kubernetes.
/// Returns 200 only once the listener is bound.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.ready.load(Ordering::Acquire) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /live: Liveness probe for Kubernetes.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub node_id: String,
    pub uptime_secs: u64,
    pub feature_dimension: usize,
}
