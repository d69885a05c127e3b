//! Resolution queue endpoints
//!
//! `POST /api/resolutions` upserts a matching batch, `GET /api/resolutions`
//! lists the queue for any review channel, and
//! `POST /api/resolutions/{id}/resolve` records a human decision. Losing a
//! resolve race returns 409 with a distinct code so channels can tell
//! "already handled elsewhere" apart from an actual error.

use crate::services::resolution_queue::{
    CreateOutcome, NewResolutionItem, PendingFilter, QueueStats, ResolutionQueue, ResolveOutcome,
};
use crate::{ApiError, ApiResult, AppState};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use opsd_common::model::{
    Channel, Decision, ResolutionItem, ResolutionKind, ResolutionStatus,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateItemsRequest {
    pub items: Vec<NewResolutionItem>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub kind: Option<String>,
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    #[serde(flatten)]
    pub decision: Decision,
    pub channel: Channel,
}

#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub resolved: bool,
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ResolutionStatus>,
}

/// POST /api/resolutions
pub async fn create_items(
    State(state): State<AppState>,
    Json(payload): Json<CreateItemsRequest>,
) -> ApiResult<Json<CreateOutcome>> {
    let queue = ResolutionQueue::new(state.db.clone());
    let outcome = queue.create_items(&payload.items).await?;
    Ok(Json(outcome))
}

/// GET /api/resolutions
pub async fn list_items(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<ResolutionItem>>> {
    let mut filter = PendingFilter::default();
    if let Some(kind) = query.kind.as_deref() {
        filter.kind = Some(ResolutionKind::parse(kind).map_err(ApiError::from)?);
    }
    if let Some(status) = query.status.as_deref() {
        filter.status = ResolutionStatus::parse(status).map_err(ApiError::from)?;
    }
    if let Some(limit) = query.limit {
        filter.limit = limit;
    }
    if let Some(offset) = query.offset {
        filter.offset = offset;
    }

    let queue = ResolutionQueue::new(state.db.clone());
    let items = queue.pending_items(&filter).await?;
    Ok(Json(items))
}

/// GET /api/resolutions/stats
pub async fn stats(State(state): State<AppState>) -> ApiResult<Json<QueueStats>> {
    let queue = ResolutionQueue::new(state.db.clone());
    Ok(Json(queue.stats().await?))
}

/// POST /api/resolutions/{id}/resolve
pub async fn resolve_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ResolveRequest>,
) -> ApiResult<Json<ResolveResponse>> {
    let queue = ResolutionQueue::new(state.db.clone());
    let outcome = queue
        .resolve_item(id, &payload.decision, payload.channel)
        .await?;

    let response = match outcome {
        ResolveOutcome::Resolved { status } => ResolveResponse {
            resolved: true,
            skipped: false,
            status: Some(status),
        },
        ResolveOutcome::Skipped => ResolveResponse {
            resolved: false,
            skipped: true,
            status: None,
        },
    };
    Ok(Json(response))
}

/// Build resolution routes
pub fn resolution_routes() -> Router<AppState> {
    Router::new()
        .route("/api/resolutions", post(create_items).get(list_items))
        .route("/api/resolutions/stats", get(stats))
        .route("/api/resolutions/:id/resolve", post(resolve_item))
}
