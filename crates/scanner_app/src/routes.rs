use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use engine_logging::{engine_info, engine_warn};
use scanner_core::{ScanConfig, ScanError};
use scanner_engine::{
    ContinueRequest, CoordinatorError, ProviderRegistry, ScanResponse, SessionCoordinator,
};
use serde_json::{json, Value};

#[derive(Debug, Clone)]
pub struct AppState {
    registry: ProviderRegistry,
    config: ScanConfig,
}

impl AppState {
    pub fn new(registry: ProviderRegistry, config: ScanConfig) -> Self {
        Self { registry, config }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/platforms/{platform}/continue", post(continue_scan))
        .with_state(state)
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    fn unknown_platform(platform: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "unknown_platform",
            message: format!("no card provider configured for platform '{platform}'"),
        }
    }
}

impl From<CoordinatorError> for ApiError {
    fn from(error: CoordinatorError) -> Self {
        let (status, code) = match &error {
            CoordinatorError::InvalidCursor(_)
            | CoordinatorError::Scan(ScanError::CursorOverflow { .. }) => {
                (StatusCode::BAD_REQUEST, "invalid_cursor")
            }
            CoordinatorError::EmptyProfile => (StatusCode::BAD_REQUEST, "invalid_profile"),
            CoordinatorError::Scan(_) => (StatusCode::BAD_REQUEST, "invalid_session"),
        };
        Self {
            status,
            code,
            message: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = Json(json!({
            "error": self.code,
            "message": self.message,
        }));
        (self.status, payload).into_response()
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn continue_scan(
    State(state): State<AppState>,
    Path(platform): Path<String>,
    Json(request): Json<ContinueRequest>,
) -> Result<Json<ScanResponse>, ApiError> {
    engine_info!(
        "Continue {} profile={} next_index={} fails={}",
        platform,
        request.profile_ref,
        request.next_index,
        request.consecutive_failures
    );
    let provider = state
        .registry
        .get(&platform)
        .ok_or_else(|| ApiError::unknown_platform(&platform))?;
    let coordinator = SessionCoordinator::new(provider, state.config);
    let step = coordinator.continue_scan(&request).await.map_err(|err| {
        engine_warn!("Continue {} rejected: {}", platform, err);
        ApiError::from(err)
    })?;
    Ok(Json(ScanResponse::from(&step)))
}
