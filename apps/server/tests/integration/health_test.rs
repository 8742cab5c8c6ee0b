//! Integration tests for Health endpoints
//!
//! Tests the liveness and readiness health check endpoints.

use actix_web::{test, web, App};
use promptmeter::routes;
use serde_json::Value;

use crate::common::TestDb;

// =============================================================================
// Liveness Endpoint Tests
// =============================================================================

#[actix_web::test]
async fn test_liveness_returns_ok() {
    let db = TestDb::new().await;

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(db.pool.clone()))
            .configure(routes::health::configure),
    )
    .await;

    let req = test::TestRequest::get().uri("/health").to_request();

    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let content_type = resp
        .headers()
        .get("content-type")
        .expect("Content-Type header missing");
    assert!(content_type.to_str().unwrap().contains("application/json"));

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
}

// =============================================================================
// Readiness Endpoint Tests
// =============================================================================

#[actix_web::test]
async fn test_readiness_returns_ready_with_migrated_db() {
    let db = TestDb::new().await;

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(db.pool.clone()))
            .configure(routes::health::configure),
    )
    .await;

    // No identity header provided
    let req = test::TestRequest::get().uri("/health/ready").to_request();

    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ready");
    assert_eq!(body["checks"]["database"], "ok");
    assert_eq!(body["checks"]["ledger"], "ok");
}

#[actix_web::test]
async fn test_readiness_reports_missing_ledger_table() {
    let db = TestDb::new().await;

    sqlx::query("DROP TABLE subscriptions")
        .execute(&db.pool)
        .await
        .expect("Failed to drop subscriptions");

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(db.pool.clone()))
            .configure(routes::health::configure),
    )
    .await;

    let req = test::TestRequest::get().uri("/health/ready").to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 503);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "not_ready");
    assert_eq!(body["checks"]["database"], "ok");
    assert_eq!(body["checks"]["ledger"], "error");
}

#[actix_web::test]
async fn test_readiness_returns_not_ready_with_closed_pool() {
    let db = TestDb::new().await;

    // Close the pool to simulate unhealthy database
    db.pool.close().await;

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(db.pool.clone()))
            .configure(routes::health::configure),
    )
    .await;

    let req = test::TestRequest::get().uri("/health/ready").to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 503);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "not_ready");
    assert_eq!(body["checks"]["database"], "error");
    assert_eq!(body["checks"]["ledger"], "error");
}
