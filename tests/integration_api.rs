//! API Integration Tests
//!
//! Requests that are answered before storage is touched, so these run
//! without a database.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::json;
use tower::util::ServiceExt;
use uuid::Uuid;

use aptitude_ledger::api::{self, AppState, AuthSettings};
use aptitude_ledger::audit::sha256_hex;
use aptitude_ledger::domain::Role;

mod common;

#[tokio::test]
async fn test_health_is_public() {
    let app = common::app(common::lazy_pool());

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"OK");
}

#[tokio::test]
async fn test_missing_principal_is_unauthenticated() {
    let app = common::app(common::lazy_pool());

    let (status, body) = common::send(&app, "GET", "/api/test/history", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
    assert_eq!(body["error_code"], "unauthenticated");
}

#[tokio::test]
async fn test_unknown_role_is_unauthenticated() {
    let app = common::app(common::lazy_pool());

    let request = Request::builder()
        .uri("/api/test/questions")
        .header("X-Request-User-Id", Uuid::new_v4().to_string())
        .header("X-Request-User-Role", "superuser")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_gateway_key_enforced_when_configured() {
    let mut state = AppState::new(common::lazy_pool());
    state.auth = AuthSettings {
        api_key_sha256: Some(sha256_hex("gateway-secret")),
    };
    let app = api::build_router(state, None);

    let user = (Uuid::new_v4(), Role::Admin);
    let (status, _) = common::send(&app, "GET", "/api/admin/stats", Some(user), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .method("POST")
        .uri("/api/test/submit")
        .header("X-API-Key", "gateway-secret")
        .header("X-Request-User-Id", user.0.to_string())
        .header("X-Request-User-Role", "admin")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "answers": [] }).to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    // Past the key check, rejected by body validation.
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_submit_requires_answers() {
    let app = common::app(common::lazy_pool());
    let user = Some((Uuid::new_v4(), Role::User));

    let (status, body) =
        common::send(&app, "POST", "/api/test/submit", user, Some(json!({ "answers": [] }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = common::send(&app, "POST", "/api/test/submit", user, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = common::app(common::lazy_pool());

    let request = Request::builder()
        .method("POST")
        .uri("/api/transactions/transfer")
        .header("X-Request-User-Id", Uuid::new_v4().to_string())
        .header("X-Request-User-Role", "user")
        .header("content-type", "application/json")
        .body(Body::from("{\"receiverId\": "))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error_code"], "invalid_request");
}

#[tokio::test]
async fn test_transfer_validation() {
    let app = common::app(common::lazy_pool());
    let me = Uuid::new_v4();
    let user = Some((me, Role::User));

    let (status, body) = common::send(
        &app,
        "POST",
        "/api/transactions/transfer",
        user,
        Some(json!({ "receiverId": me, "amount": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "self_transfer");

    for amount in [json!(0), json!("-5"), json!("abc"), json!(1.234)] {
        let (status, body) = common::send(
            &app,
            "POST",
            "/api/transactions/transfer",
            user,
            Some(json!({ "receiverId": Uuid::new_v4(), "amount": amount })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "amount {}", amount);
        assert_eq!(body["error_code"], "invalid_amount");
    }
}

#[tokio::test]
async fn test_non_admin_is_forbidden_from_control_plane() {
    let app = common::app(common::lazy_pool());
    let user = Some((Uuid::new_v4(), Role::User));
    let target = Uuid::new_v4();

    let cases = [
        ("GET", "/api/admin/users".to_string(), None),
        ("GET", format!("/api/admin/users/{}", target), None),
        ("GET", "/api/admin/stats".to_string(), None),
        ("GET", "/api/admin/audit/verify".to_string(), None),
        ("GET", "/api/transactions/admin/all".to_string(), None),
        (
            "PATCH",
            format!("/api/admin/users/{}/balance", target),
            Some(json!({ "amount": 500 })),
        ),
        (
            "PATCH",
            format!("/api/transactions/admin/{}/status", target),
            Some(json!({ "status": "completed" })),
        ),
    ];

    for (method, uri, body) in cases {
        let (status, _) = common::send(&app, method, &uri, user, body).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{} {}", method, uri);
    }
}

#[tokio::test]
async fn test_adjust_balance_rejects_non_numeric_amount() {
    let app = common::app(common::lazy_pool());
    let admin = Some((Uuid::new_v4(), Role::Admin));
    let uri = format!("/api/admin/users/{}/balance", Uuid::new_v4());

    let (status, body) =
        common::send(&app, "PATCH", &uri, admin, Some(json!({ "amount": "100" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "invalid_amount");

    let (status, _) = common::send(&app, "PATCH", &uri, admin, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_settle_rejects_non_terminal_status() {
    let app = common::app(common::lazy_pool());
    let admin = Some((Uuid::new_v4(), Role::Admin));
    let uri = format!("/api/transactions/admin/{}/status", Uuid::new_v4());

    let (status, body) =
        common::send(&app, "PATCH", &uri, admin, Some(json!({ "status": "pending" }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "invalid_status");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = common::app(common::lazy_pool());

    let (status, body) = common::send(&app, "GET", "/nope", None, None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_malformed_path_and_query_render_json_errors() {
    let app = common::app(common::lazy_pool());
    let admin = (Uuid::new_v4(), Role::Admin);

    let (status, body) =
        common::send(&app, "GET", "/api/test/result/not-a-uuid", Some(admin), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string(), "{}", body);
    assert_eq!(body["error_code"], "invalid_request");

    let (status, body) = common::send(
        &app,
        "PATCH",
        "/api/transactions/admin/42/status",
        Some(admin),
        Some(json!({ "status": "completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "invalid_request");

    let (status, body) =
        common::send(&app, "GET", "/api/admin/audit/verify?limit=abc", Some(admin), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string(), "{}", body);
    assert_eq!(body["error_code"], "invalid_request");
}
