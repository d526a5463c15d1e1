//! HTTP route definitions

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::debug;
use uuid::Uuid;

use crate::app::AppState;
use crate::game::physics::Vec3;
use crate::game::{ArenaSnapshot, ArenaSummary, Intent, IntentOutcome, MoveIntent, WeaponDef};
use crate::session::{JoinResult, SessionError};
use crate::util::time::uptime_secs;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // CORS configuration - explicit origins from CLIENT_ORIGIN, otherwise any
    let allowed_origins: Vec<HeaderValue> = state
        .config
        .client_origins
        .iter()
        .filter_map(|s| s.parse::<HeaderValue>().ok())
        .collect();

    let cors = if allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    } else {
        CorsLayer::new()
            .allow_origin(allowed_origins)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
            .allow_credentials(true)
    };

    let arena_routes = Router::new()
        .route("/arenas", get(list_arenas_handler))
        .route("/arenas/join", post(join_handler))
        .route("/arenas/leave", post(leave_handler))
        .route("/arenas/:arena_id", delete(teardown_handler))
        .route("/arenas/:arena_id/snapshot", get(snapshot_handler));

    let intent_routes = Router::new()
        .route("/intents/move", post(move_handler))
        .route("/intents/fire", post(fire_handler))
        .route("/intents/purchase", post(purchase_handler))
        .route("/intents/plant", post(plant_handler))
        .route("/intents/defuse", post(defuse_handler));

    Router::new()
        .route("/health", get(health_handler))
        .route("/weapons", get(weapons_handler))
        .merge(arena_routes)
        .merge(intent_routes)
        .layer(TimeoutLayer::new(state.config.request_timeout))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    active_arenas: usize,
    active_participants: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        active_arenas: state.sessions.arena_count(),
        active_participants: state.sessions.total_participants(),
    })
}

async fn weapons_handler() -> Json<&'static [WeaponDef]> {
    Json(WeaponDef::all())
}

// ============================================================================
// Arena endpoints
// ============================================================================

const MAX_ARENA_ID_LEN: usize = 64;

#[derive(Deserialize)]
struct JoinRequest {
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    arena_id: Option<String>,
}

async fn join_handler(
    State(state): State<AppState>,
    Json(req): Json<JoinRequest>,
) -> Result<Json<JoinResult>, AppError> {
    if req
        .arena_id
        .as_deref()
        .is_some_and(|id| id.len() > MAX_ARENA_ID_LEN || id.contains('/'))
    {
        return Err(AppError::BadRequest(format!(
            "arena_id must be at most {MAX_ARENA_ID_LEN} characters without '/'"
        )));
    }

    let joined = state
        .sessions
        .join(req.arena_id.as_deref(), &req.display_name)
        .await?;
    state.intent_limiter.prune();
    Ok(Json(joined))
}

#[derive(Deserialize)]
struct ParticipantRequest {
    participant_id: Uuid,
}

#[derive(Serialize)]
struct LeaveResponse {
    left: bool,
}

async fn leave_handler(
    State(state): State<AppState>,
    Json(req): Json<ParticipantRequest>,
) -> Json<LeaveResponse> {
    let left = state.sessions.leave(&req.participant_id).await;
    state.intent_limiter.prune();
    Json(LeaveResponse { left })
}

async fn list_arenas_handler(State(state): State<AppState>) -> Json<Vec<ArenaSummary>> {
    Json(state.sessions.list().await)
}

async fn teardown_handler(
    State(state): State<AppState>,
    Path(arena_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.sessions.teardown(&arena_id).await?;
    state.intent_limiter.prune();
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct SnapshotQuery {
    since: Option<u64>,
}

async fn snapshot_handler(
    State(state): State<AppState>,
    Path(arena_id): Path<String>,
    Query(query): Query<SnapshotQuery>,
) -> Result<Json<ArenaSnapshot>, AppError> {
    let snapshot = state.sessions.snapshot(&arena_id, query.since).await?;
    Ok(Json(snapshot))
}

// ============================================================================
// Intent endpoints
// ============================================================================

#[derive(Deserialize)]
struct MoveRequest {
    participant_id: Uuid,
    #[serde(flatten)]
    movement: MoveIntent,
}

#[derive(Deserialize)]
struct FireRequest {
    participant_id: Uuid,
    direction: Vec3,
}

#[derive(Deserialize)]
struct PurchaseRequest {
    participant_id: Uuid,
    weapon_id: String,
}

async fn move_handler(
    State(state): State<AppState>,
    Json(req): Json<MoveRequest>,
) -> Result<Json<IntentOutcome>, AppError> {
    submit(&state, req.participant_id, Intent::Move(req.movement)).await
}

async fn fire_handler(
    State(state): State<AppState>,
    Json(req): Json<FireRequest>,
) -> Result<Json<IntentOutcome>, AppError> {
    submit(
        &state,
        req.participant_id,
        Intent::Fire {
            direction: req.direction,
        },
    )
    .await
}

async fn purchase_handler(
    State(state): State<AppState>,
    Json(req): Json<PurchaseRequest>,
) -> Result<Json<IntentOutcome>, AppError> {
    submit(
        &state,
        req.participant_id,
        Intent::Purchase {
            weapon_id: req.weapon_id,
        },
    )
    .await
}

async fn plant_handler(
    State(state): State<AppState>,
    Json(req): Json<ParticipantRequest>,
) -> Result<Json<IntentOutcome>, AppError> {
    submit(&state, req.participant_id, Intent::PlantObjective).await
}

async fn defuse_handler(
    State(state): State<AppState>,
    Json(req): Json<ParticipantRequest>,
) -> Result<Json<IntentOutcome>, AppError> {
    submit(&state, req.participant_id, Intent::DefuseObjective).await
}

/// Throttle seated participants, then route an intent to their arena
async fn submit(
    state: &AppState,
    participant_id: Uuid,
    intent: Intent,
) -> Result<Json<IntentOutcome>, AppError> {
    if state.sessions.arena_of(&participant_id).is_none() {
        return Err(SessionError::ParticipantNotFound(participant_id).into());
    }
    if !state.intent_limiter.check(&participant_id) {
        debug!(participant_id = %participant_id, "Intent flood throttled");
        return Err(AppError::TooManyRequests);
    }
    let outcome = state.sessions.apply_intent(&participant_id, intent).await?;
    Ok(Json(outcome))
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Too many requests")]
    TooManyRequests,

    #[error("Unavailable: {0}")]
    Unavailable(String),
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::ArenaNotFound(_) | SessionError::ParticipantNotFound(_) => {
                AppError::NotFound(err.to_string())
            }
            SessionError::ArenaClosed(_) | SessionError::ArenaFull(_) => {
                AppError::Conflict(err.to_string())
            }
            SessionError::ArenaUnavailable(_) => AppError::Unavailable(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::TooManyRequests => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many requests".to_string(),
            ),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
