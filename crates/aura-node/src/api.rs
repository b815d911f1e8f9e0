use crate::metrics::Metrics;
use crate::node::{AuraNode, NodeStats};
use aura_groups::CreateGroup;
use aura_rank::{GroupResults, LeaderboardView};
use aura_types::{
    AuraError, ContentId, DimensionScores, GroupId, Scope, TargetRef, UserId, LIFETIME_BUDGET,
};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

#[derive(Clone)]
struct AppState {
    node: Arc<AuraNode>,
    metrics: Metrics,
}

struct ApiError(AuraError);

impl From<AuraError> for ApiError {
    fn from(e: AuraError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AuraError::TargetNotFound(_)
            | AuraError::GroupNotFound(_)
            | AuraError::ContentNotFound(_)
            | AuraError::IdentityNotFound(_) => StatusCode::NOT_FOUND,
            AuraError::SelfTarget | AuraError::OutOfBounds(_) | AuraError::InvalidScope(_) => {
                StatusCode::BAD_REQUEST
            }
            AuraError::OutOfRange(_) => StatusCode::BAD_REQUEST,
            AuraError::DuplicateEdge
            | AuraError::BudgetExceeded { .. }
            | AuraError::SlotTaken(_)
            | AuraError::GroupFull
            | AuraError::AlreadyMember
            | AuraError::GroupInactive => StatusCode::CONFLICT,
            AuraError::NotAMember(_) | AuraError::NotPermitted(_) => StatusCode::FORBIDDEN,
            AuraError::Storage(_) | AuraError::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(ErrorResponse {
            error: self.0.to_string(),
            kind: self.0.kind().to_owned(),
        });
        (status, body).into_response()
    }
}

#[derive(Serialize, Deserialize)]
struct ErrorResponse {
    error: String,
    kind: String,
}

#[derive(Serialize, Deserialize)]
struct SubmitRatingRequest {
    /// Absent for the direct peer-to-peer scope.
    group_id: Option<String>,
    /// Exactly one of `target_user` and `slot_index`.
    target_user: Option<String>,
    slot_index: Option<usize>,
    points: i64,
    reason: Option<String>,
    #[serde(default)]
    dimensions: DimensionScores,
}

#[derive(Serialize, Deserialize)]
struct SubmitRatingResponse {
    rating_id: String,
    remaining_budget: i64,
}

#[derive(Serialize, Deserialize)]
struct CreateGroupRequest {
    name: String,
    capacity: usize,
    slot_labels: Option<Vec<String>>,
    min_voters_to_close: Option<usize>,
}

#[derive(Serialize, Deserialize)]
struct DisplayNameRequest {
    display_name: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct AdjustCounterRequest {
    step: i64,
}

#[derive(Serialize, Deserialize)]
struct RegisterContentRequest {
    content_id: String,
}

#[derive(Serialize, Deserialize)]
struct BudgetResponse {
    budget: i64,
    spent: i64,
    remaining: i64,
}

pub fn start_api_server(node: Arc<AuraNode>, port: u16) -> JoinHandle<()> {
    let host = node.config.api.host.clone();
    let metrics = Metrics::new();
    let state = AppState { node, metrics };

    let app = router(state);
    let addr = format!("{}:{}", host, port);
    info!("Starting API server on {}", addr);

    tokio::spawn(async move {
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind API server");
        axum::serve(listener, app).await.expect("API server failed");
    })
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(get_status))
        .route("/metrics", get(get_metrics))
        .route("/v1/ratings", post(submit_rating))
        .route("/v1/budget", get(get_budget))
        .route("/v1/groups", post(create_group))
        .route("/v1/groups/:id/join", post(join_group))
        .route("/v1/groups/:id/slots/:index/claim", post(claim_slot))
        .route("/v1/groups/:id/close", post(close_voting))
        .route("/v1/groups/:id/results", get(group_results))
        .route("/v1/leaderboard", get(leaderboard))
        .route("/v1/content", post(register_content))
        .route("/v1/counters/:content_id/adjust", post(adjust_counter))
        .with_state(Arc::new(state))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Verified identity or 401.
async fn require_auth(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<crate::auth::AuthContext, Response> {
    let unauthorized = || {
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "missing or invalid bearer token".into(),
                kind: "unauthorized".into(),
            }),
        )
            .into_response()
    };
    let Some(token) = bearer_token(headers) else {
        return Err(unauthorized());
    };
    match state.node.authenticate(token).await {
        Ok(Some(ctx)) => Ok(ctx),
        Ok(None) => Err(unauthorized()),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR.into_response()),
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn get_status(State(state): State<Arc<AppState>>) -> Result<Json<NodeStats>, StatusCode> {
    match state.node.stats().await {
        Ok(stats) => Ok(Json(stats)),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

async fn get_metrics(State(state): State<Arc<AppState>>) -> String {
    state.metrics.gather()
}

async fn submit_rating(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<SubmitRatingRequest>,
) -> Response {
    let ctx = match require_auth(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(resp) => return resp,
    };

    let scope = match req.group_id {
        Some(id) => Scope::group(GroupId::new(id)),
        None => Scope::Direct,
    };
    let target = match (req.target_user, req.slot_index) {
        (Some(user), None) => TargetRef::user(UserId::new(user)),
        (None, Some(index)) => TargetRef::slot(scope.clone(), index),
        _ => {
            return ApiError(AuraError::InvalidScope(
                "exactly one of target_user and slot_index".into(),
            ))
            .into_response()
        }
    };

    match state
        .node
        .ledger
        .submit(ctx.user_id.clone(), scope, target, req.points, req.reason, req.dimensions)
        .await
    {
        Ok(entry) => {
            state.metrics.ratings_accepted.inc();
            let remaining = state
                .node
                .ledger
                .remaining(&ctx.user_id)
                .await
                .unwrap_or(0);
            Json(SubmitRatingResponse {
                rating_id: entry.id.to_hex(),
                remaining_budget: remaining,
            })
            .into_response()
        }
        Err(e) => {
            state.metrics.ratings_rejected.with_label_values(&[e.kind()]).inc();
            ApiError(e).into_response()
        }
    }
}

async fn get_budget(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let ctx = match require_auth(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(resp) => return resp,
    };
    match state.node.ledger.spent(&ctx.user_id).await {
        Ok(spent) => Json(BudgetResponse {
            budget: LIFETIME_BUDGET,
            spent,
            remaining: LIFETIME_BUDGET - spent,
        })
        .into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

async fn create_group(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateGroupRequest>,
) -> Response {
    let ctx = match require_auth(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(resp) => return resp,
    };
    let params = CreateGroup {
        name: req.name,
        capacity: req.capacity,
        slot_labels: req.slot_labels,
        min_voters_to_close: req.min_voters_to_close,
        voting_window: None,
    };
    match state
        .node
        .groups
        .create_group(ctx.user_id, &ctx.display_name, params)
        .await
    {
        Ok(group) => {
            state.metrics.groups_created.inc();
            Json(group).into_response()
        }
        Err(e) => ApiError(e).into_response(),
    }
}

async fn join_group(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<DisplayNameRequest>,
) -> Response {
    let ctx = match require_auth(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(resp) => return resp,
    };
    let name = req.display_name.unwrap_or_else(|| ctx.display_name.clone());
    match state
        .node
        .groups
        .join_group(&GroupId::new(id), ctx.user_id, &name)
        .await
    {
        Ok(group) => Json(group).into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

async fn claim_slot(
    State(state): State<Arc<AppState>>,
    Path((id, index)): Path<(String, usize)>,
    headers: HeaderMap,
    Json(req): Json<DisplayNameRequest>,
) -> Response {
    let ctx = match require_auth(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(resp) => return resp,
    };
    let name = req.display_name.unwrap_or_else(|| ctx.display_name.clone());
    match state
        .node
        .groups
        .claim_slot(&GroupId::new(id), index, ctx.user_id, &name)
        .await
    {
        Ok(outcome) => {
            state.metrics.slots_claimed.inc();
            state.metrics.entries_migrated.inc_by(outcome.migrated as u64);
            Json(outcome.group).into_response()
        }
        Err(e) => ApiError(e).into_response(),
    }
}

async fn close_voting(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let ctx = match require_auth(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(resp) => return resp,
    };
    match state
        .node
        .groups
        .close_voting(&GroupId::new(id), &ctx.user_id)
        .await
    {
        Ok(group) => Json(group).into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

async fn group_results(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<GroupResults>, ApiError> {
    let results = state
        .node
        .rank
        .group_results(&GroupId::new(id), Utc::now())
        .await?;
    Ok(Json(results))
}

/// Anonymized branch taken when the bearer token is absent or invalid.
async fn leaderboard(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<LeaderboardView>, ApiError> {
    let authenticated = match bearer_token(&headers) {
        Some(token) => state
            .node
            .authenticate(token)
            .await
            .map_err(|e| AuraError::Storage(e.to_string()))?
            .is_some(),
        None => false,
    };

    let (view, cache_hit) = state
        .node
        .rank
        .global_leaderboard(Utc::now(), authenticated)
        .await?;
    if cache_hit {
        state.metrics.leaderboard_cache_hits.inc();
    } else {
        state.metrics.leaderboard_cache_misses.inc();
    }
    Ok(Json(view))
}

async fn register_content(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<RegisterContentRequest>,
) -> Response {
    let ctx = match require_auth(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(resp) => return resp,
    };
    match state
        .node
        .counters
        .register_content(ContentId::new(req.content_id), ctx.user_id)
        .await
    {
        Ok(item) => Json(item).into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

async fn adjust_counter(
    State(state): State<Arc<AppState>>,
    Path(content_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<AdjustCounterRequest>,
) -> Response {
    let ctx = match require_auth(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(resp) => return resp,
    };
    match state
        .node
        .counters
        .adjust(&ContentId::new(content_id), &ctx.user_id, req.step)
        .await
    {
        Ok(adjustment) => {
            state.metrics.counter_adjustments.inc();
            Json(adjustment).into_response()
        }
        Err(e) => ApiError(e).into_response(),
    }
}
