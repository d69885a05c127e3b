//! HTTP surface tests: status-code mapping and basic flows

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use common::{seed_customer, setup_db};
use http_body_util::BodyExt;
use opsd_recon::config::ServiceConfig;
use opsd_recon::{build_router, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

async fn test_app() -> (axum::Router, sqlx::SqlitePool, tempfile::TempDir) {
    let (pool, dir) = setup_db().await;
    let state = AppState::new(pool.clone(), ServiceConfig::default());
    (build_router(state), pool, dir)
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let (app, _pool, _dir) = test_app().await;

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "opsd-recon");
}

#[tokio::test]
async fn test_create_and_list_flow() {
    let (app, _pool, _dir) = test_app().await;

    let response = app
        .clone()
        .oneshot(post(
            "/api/resolutions",
            json!({
                "items": [{
                    "kind": "customer_match",
                    "source_entity": "ACME GLOBAL LLC",
                    "confidence": 64
                }]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["created"], 1);
    assert_eq!(body["auto_resolved"], 0);

    let response = app
        .clone()
        .oneshot(get("/api/resolutions?kind=customer_match"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let items = body_json(response).await;
    assert_eq!(items.as_array().unwrap().len(), 1);
    assert_eq!(items[0]["source_entity"], "ACME GLOBAL LLC");

    let response = app.oneshot(get("/api/resolutions/stats")).await.unwrap();
    let stats = body_json(response).await;
    assert_eq!(stats["pending"], 1);
}

#[tokio::test]
async fn test_invalid_kind_is_bad_request() {
    let (app, _pool, _dir) = test_app().await;

    let response = app
        .oneshot(get("/api/resolutions?kind=vendor_match"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_resolve_unknown_item_is_not_found() {
    let (app, _pool, _dir) = test_app().await;

    let response = app
        .oneshot(post(
            &format!("/api/resolutions/{}/resolve", Uuid::new_v4()),
            json!({ "action": "approve", "channel": "dashboard" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_stale_resolve_is_conflict() {
    let (app, pool, _dir) = test_app().await;
    let customer = seed_customer(&pool, "Acme", None, &[]).await;

    let response = app
        .clone()
        .oneshot(post(
            "/api/resolutions",
            json!({
                "items": [{
                    "kind": "customer_match",
                    "source_entity": "ACME GLOBAL LLC",
                    "confidence": 64
                }]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.clone().oneshot(get("/api/resolutions")).await.unwrap();
    let items = body_json(response).await;
    let id = items[0]["id"].as_str().unwrap().to_string();

    let decision = json!({
        "action": "approve",
        "customer_id": customer,
        "channel": "dashboard"
    });
    let response = app
        .clone()
        .oneshot(post(&format!("/api/resolutions/{}/resolve", id), decision.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["resolved"], true);
    assert_eq!(body["status"], "confirmed");

    // A second channel acting on stale state gets the distinct 409
    let response = app
        .oneshot(post(&format!("/api/resolutions/{}/resolve", id), decision))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "ALREADY_RESOLVED");
}

#[tokio::test]
async fn test_skip_via_api() {
    let (app, _pool, _dir) = test_app().await;

    app.clone()
        .oneshot(post(
            "/api/resolutions",
            json!({
                "items": [{
                    "kind": "customer_match",
                    "source_entity": "MYSTERY VENDOR",
                    "confidence": 40
                }]
            }),
        ))
        .await
        .unwrap();

    let response = app.clone().oneshot(get("/api/resolutions")).await.unwrap();
    let items = body_json(response).await;
    let id = items[0]["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(post(
            &format!("/api/resolutions/{}/resolve", id),
            json!({ "action": "skip", "channel": "cli" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["skipped"], true);

    // Still listed as pending
    let response = app.oneshot(get("/api/resolutions")).await.unwrap();
    let items = body_json(response).await;
    assert_eq!(items.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_match_preview_endpoints() {
    let (pool, _dir) = setup_db().await;
    let config = ServiceConfig {
        company_domain: "meridianworks.io".to_string(),
        ..ServiceConfig::default()
    };
    let app = build_router(AppState::new(pool.clone(), config));
    seed_customer(&pool, "Nouri Health", Some("NOURI HEALTH INC"), &[]).await;

    let response = app
        .clone()
        .oneshot(get("/api/match/customer?q=NOURI%20HEALTH%20INC"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let results = body_json(response).await;
    assert_eq!(results[0]["confidence"], 95);
    assert_eq!(results[0]["matched_on"], "bank_name");

    let response = app
        .clone()
        .oneshot(get("/api/match/domain?domain=google.com"))
        .await
        .unwrap();
    let result = body_json(response).await;
    assert_eq!(result["meeting_kind"], "ignore");
    assert_eq!(result["confidence"], 90);

    let response = app
        .clone()
        .oneshot(get("/api/match/domain?domain=meridianworks.io"))
        .await
        .unwrap();
    let result = body_json(response).await;
    assert_eq!(result["meeting_kind"], "internal");

    let response = app
        .oneshot(get("/api/match/vendor?q=GUSTO%20PAYROLL%208821"))
        .await
        .unwrap();
    let results = body_json(response).await;
    assert_eq!(results[0]["category"], "labor");
    assert_eq!(results[0]["confidence"], 70);
}

#[tokio::test]
async fn test_proposals_endpoint() {
    let (app, _pool, _dir) = test_app().await;

    let response = app
        .clone()
        .oneshot(get("/api/proposals"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 0);

    let response = app
        .oneshot(post(
            &format!("/api/proposals/{}/resolve", Uuid::new_v4()),
            json!({ "action": "approve" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
