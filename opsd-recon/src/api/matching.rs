//! Match preview endpoints
//!
//! Lets ingestion jobs and the dashboard review UI run the pure matchers
//! against the live candidate pool and the currently active rules.

use crate::matching::{
    categorize_vendor, classify_domain, match_customer, match_sheet_customer,
    DomainClassification, MatchResult, VendorMatch,
};
use crate::services::{catalog, rules};
use crate::{ApiResult, AppState};
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct MatchQuery {
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct DomainQuery {
    pub domain: String,
}

/// GET /api/match/customer
pub async fn preview_customer(
    State(state): State<AppState>,
    Query(query): Query<MatchQuery>,
) -> ApiResult<Json<Vec<MatchResult>>> {
    let customers = catalog::matchable_customers(&state.db).await?;
    let suppressions = rules::active_suppressions(&state.db).await?;
    Ok(Json(match_customer(&query.q, &customers, &suppressions)))
}

/// GET /api/match/sheet-customer
pub async fn preview_sheet_customer(
    State(state): State<AppState>,
    Query(query): Query<MatchQuery>,
) -> ApiResult<Json<Vec<MatchResult>>> {
    let customers = catalog::matchable_customers(&state.db).await?;
    Ok(Json(match_sheet_customer(&query.q, &customers)))
}

/// GET /api/match/domain
pub async fn preview_domain(
    State(state): State<AppState>,
    Query(query): Query<DomainQuery>,
) -> ApiResult<Json<Option<DomainClassification>>> {
    let customers = catalog::matchable_customers(&state.db).await?;
    let mappings = rules::active_domain_mappings(&state.db).await?;
    Ok(Json(classify_domain(
        &query.domain,
        &state.config.company_domain,
        &customers,
        &mappings,
    )))
}

/// GET /api/match/vendor
pub async fn preview_vendor(
    State(state): State<AppState>,
    Query(query): Query<MatchQuery>,
) -> ApiResult<Json<Vec<VendorMatch>>> {
    let vendor_rules = rules::active_vendor_rules(&state.db).await?;
    Ok(Json(categorize_vendor(&query.q, &vendor_rules)))
}

/// Build match preview routes
pub fn match_routes() -> Router<AppState> {
    Router::new()
        .route("/api/match/customer", get(preview_customer))
        .route("/api/match/sheet-customer", get(preview_sheet_customer))
        .route("/api/match/domain", get(preview_domain))
        .route("/api/match/vendor", get(preview_vendor))
}
