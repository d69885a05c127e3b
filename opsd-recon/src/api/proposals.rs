//! Proposal review endpoints

use crate::services::ProposalEngine;
use crate::{ApiError, ApiResult, AppState};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use opsd_common::model::{ProposalStatus, SystemProposal};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct ListProposalsQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalAction {
    Approve,
    Reject,
}

#[derive(Debug, Deserialize)]
pub struct ResolveProposalRequest {
    pub action: ProposalAction,
}

#[derive(Debug, Serialize)]
pub struct ResolveProposalResponse {
    pub status: ProposalStatus,
}

/// GET /api/proposals
pub async fn list_proposals(
    State(state): State<AppState>,
    Query(query): Query<ListProposalsQuery>,
) -> ApiResult<Json<Vec<SystemProposal>>> {
    let status = match query.status.as_deref() {
        None => ProposalStatus::Pending,
        Some(s) => ProposalStatus::parse(s).map_err(ApiError::from)?,
    };

    let engine = ProposalEngine::new(state.db.clone());
    Ok(Json(engine.list_proposals(status).await?))
}

/// POST /api/proposals/{id}/resolve
pub async fn resolve_proposal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ResolveProposalRequest>,
) -> ApiResult<Json<ResolveProposalResponse>> {
    let engine = ProposalEngine::new(state.db.clone());
    let approve = matches!(payload.action, ProposalAction::Approve);
    let status = engine.resolve_proposal(id, approve).await?;
    Ok(Json(ResolveProposalResponse { status }))
}

/// Build proposal routes
pub fn proposal_routes() -> Router<AppState> {
    Router::new()
        .route("/api/proposals", get(list_proposals))
        .route("/api/proposals/:id/resolve", post(resolve_proposal))
}
