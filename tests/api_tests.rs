/// HTTP API tests driven through the full router
mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Utc};
use common::{TestApp, UnavailableAnalyzer};
use photo_moderation::{
    auth::Scope,
    moderation::{ModerationStatus, Priority},
    server::build_router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt; // for oneshot

async fn send(
    router: &Router,
    method: Method,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

fn tiny_png() -> Vec<u8> {
    let image = image::RgbImage::new(4, 3);
    let mut bytes = std::io::Cursor::new(Vec::new());
    image.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
    bytes.into_inner()
}

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new().await;
    let router = build_router(app.ctx.clone());

    let (status, body) = send(&router, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_queue_requires_reviewer() {
    let app = TestApp::new().await;
    let router = build_router(app.ctx.clone());

    let (status, body) = send(&router, Method::GET, "/api/moderation/queue", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "AuthenticationRequired");

    let user = app.token("user-1", Scope::User);
    let (status, _) = send(&router, Method::GET, "/api/moderation/queue", Some(&user), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &router,
        Method::GET,
        "/api/moderation/queue",
        Some("not-a-jwt"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_queue_filters_and_orders() {
    let app = TestApp::new().await;
    let router = build_router(app.ctx.clone());
    let moderator = app.token("mod-1", Scope::Moderator);

    app.seed("user-1", ModerationStatus::Pending, Priority::Normal).await;
    let high = app.seed("user-2", ModerationStatus::Pending, Priority::High).await;
    let done = app.seed("user-3", ModerationStatus::Pending, Priority::Urgent).await;
    app.ctx.moderation.approve(&done.id, "mod-2", None).await.unwrap();

    let (status, body) = send(&router, Method::GET, "/api/moderation/queue", Some(&moderator), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 2);
    assert_eq!(body["pagination"]["hasMore"], false);
    assert_eq!(body["items"][0]["id"], high.id.as_str());

    let (_, body) = send(
        &router,
        Method::GET,
        "/api/moderation/queue?priority=high",
        Some(&moderator),
        None,
    )
    .await;
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["items"][0]["priority"], "high");

    let (_, body) = send(
        &router,
        Method::GET,
        "/api/moderation/queue?status=all&limit=2",
        Some(&moderator),
        None,
    )
    .await;
    assert_eq!(body["pagination"]["total"], 3);
    assert_eq!(body["pagination"]["hasMore"], true);
    assert_eq!(body["items"].as_array().unwrap().len(), 2);

    let (status, _) = send(
        &router,
        Method::GET,
        "/api/moderation/queue?limit=500",
        Some(&moderator),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reject_requires_reason_and_known_category() {
    let app = TestApp::new().await;
    let router = build_router(app.ctx.clone());
    let moderator = app.token("mod-1", Scope::Moderator);
    let record = app.seed("user-1", ModerationStatus::Pending, Priority::Normal).await;
    let path = format!("/api/moderation/{}/reject", record.id);

    let (status, body) = send(&router, Method::POST, &path, Some(&moderator), Some(json!({"category": "spam"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidRequest");

    let (status, _) = send(
        &router,
        Method::POST,
        &path,
        Some(&moderator),
        Some(json!({"reason": "Off topic", "category": "nonsense"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let stored = app.ctx.store.get(&record.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ModerationStatus::Pending);
    assert_eq!(app.outcome_count(), 0);
}

#[tokio::test]
async fn test_reject_sets_ninety_day_expiry() {
    let app = TestApp::new().await;
    let router = build_router(app.ctx.clone());
    let moderator = app.token("mod-1", Scope::Moderator);
    let record = app.seed("user-1", ModerationStatus::UnderReview, Priority::Medium).await;

    let (status, body) = send(
        &router,
        Method::POST,
        &format!("/api/moderation/{}/reject", record.id),
        Some(&moderator),
        Some(json!({"reason": "Nudity", "category": "explicit"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "rejected");
    assert_eq!(body["rejection"]["category"], "explicit");
    assert_eq!(body["reviewedBy"], "mod-1");

    let expires: DateTime<Utc> = body["expiresAt"].as_str().unwrap().parse().unwrap();
    let days = (expires - Utc::now()).num_days();
    assert!((89..=91).contains(&days), "expiry {} days out", days);

    // Rejected asset is gone from quarantine
    assert!(!app.dir.path().join("assets").join(&record.storage_id).exists());
}

#[tokio::test]
async fn test_second_decision_conflicts_with_current_status() {
    let app = TestApp::new().await;
    let router = build_router(app.ctx.clone());
    let moderator = app.token("mod-1", Scope::Moderator);
    let record = app.seed("user-1", ModerationStatus::Pending, Priority::Normal).await;
    let path = format!("/api/moderation/{}/approve", record.id);

    let (status, body) = send(&router, Method::POST, &path, Some(&moderator), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "approved");
    assert_eq!(body["reviewNotes"], "Approved by moderator");

    let (status, body) = send(
        &router,
        Method::POST,
        &format!("/api/moderation/{}/reject", record.id),
        Some(&moderator),
        Some(json!({"reason": "Changed my mind", "category": "other"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "AlreadyModerated");
    assert_eq!(body["currentStatus"], "approved");

    let (status, _) = send(
        &router,
        Method::POST,
        "/api/moderation/missing-id/approve",
        Some(&moderator),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_batch_approve_reports_partial_failure() {
    let app = TestApp::new().await;
    let router = build_router(app.ctx.clone());
    let moderator = app.token("mod-1", Scope::Moderator);
    let open = app.seed("user-1", ModerationStatus::Pending, Priority::Normal).await;
    let done = app.seed("user-2", ModerationStatus::Pending, Priority::Normal).await;
    app.ctx.moderation.approve(&done.id, "mod-2", None).await.unwrap();

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/moderation/batch-approve",
        Some(&moderator),
        Some(json!({"ids": [open.id, done.id, "missing-id"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["successful"], 1);
    assert_eq!(body["failed"], 2);
    assert_eq!(body["results"][0]["success"], true);
    assert_eq!(body["results"][1]["success"], false);
    assert_eq!(body["results"][2]["error"], "not found");

    let (status, _) = send(
        &router,
        Method::POST,
        "/api/moderation/batch-approve",
        Some(&moderator),
        Some(json!({"ids": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_flag_escalates_priority() {
    let app = TestApp::new().await;
    let router = build_router(app.ctx.clone());
    let moderator = app.token("mod-1", Scope::Moderator);
    let record = app.seed("user-1", ModerationStatus::Pending, Priority::Low).await;

    let (status, body) = send(
        &router,
        Method::POST,
        &format!("/api/moderation/{}/flag", record.id),
        Some(&moderator),
        Some(json!({"notes": "Second opinion", "newPriority": "urgent"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "under-review");
    assert_eq!(body["priority"], "urgent");
    assert!(body["reviewedBy"].is_null());
}

#[tokio::test]
async fn test_appeal_round_trip_over_http() {
    let app = TestApp::new().await;
    let router = build_router(app.ctx.clone());
    let moderator = app.token("mod-1", Scope::Moderator);
    let owner = app.token("user-1", Scope::User);
    let stranger = app.token("user-9", Scope::User);
    let record = app.seed("user-1", ModerationStatus::Pending, Priority::Normal).await;

    send(
        &router,
        Method::POST,
        &format!("/api/moderation/{}/reject", record.id),
        Some(&moderator),
        Some(json!({"reason": "Spam text", "category": "spam"})),
    )
    .await;

    let appeal_path = format!("/api/uploads/{}/appeal", record.id);
    let (status, _) = send(&router, Method::POST, &appeal_path, Some(&stranger), Some(json!({"reason": "mine"}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &router,
        Method::POST,
        &appeal_path,
        Some(&owner),
        Some(json!({"reason": "That is my shop sign"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["appeal"]["decision"], "pending");

    let resolve_path = format!("/api/moderation/{}/appeal/resolve", record.id);
    let (status, body) = send(
        &router,
        Method::POST,
        &resolve_path,
        Some(&moderator),
        Some(json!({"decision": "overturned", "notes": "Legit signage"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "approved");
    assert!(body["expiresAt"].is_null());

    let (status, _) = send(
        &router,
        Method::POST,
        &resolve_path,
        Some(&moderator),
        Some(json!({"decision": "upheld"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(
        &router,
        Method::GET,
        &format!("/api/uploads/{}", record.id),
        Some(&owner),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["appeal"]["decision"], "overturned");
}

#[tokio::test]
async fn test_upload_falls_back_to_review_when_analysis_is_down() {
    let app = TestApp::with_analyzer(Arc::new(UnavailableAnalyzer)).await;
    let router = build_router(app.ctx.clone());
    let owner = app.token("user-1", Scope::User);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/uploads?photoType=profile")
        .header(header::AUTHORIZATION, format!("Bearer {}", owner))
        .header(header::CONTENT_TYPE, "image/png")
        .body(Body::from(tiny_png()))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "under-review");
    assert_eq!(body["priority"], "high");
    assert_eq!(body["userId"], "user-1");
    assert_eq!(body["imageMetadata"]["width"], 4);
    assert_eq!(body["imageMetadata"]["format"], "png");
    assert!(body["reviewNotes"].as_str().unwrap().contains("manual review"));
    assert!(body["storageId"]
        .as_str()
        .unwrap()
        .starts_with("moderation-queue/user-1/"));
}

#[tokio::test]
async fn test_upload_rejects_unquarantined_storage_id() {
    let app = TestApp::new().await;
    let router = build_router(app.ctx.clone());
    let owner = app.token("user-1", Scope::User);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/uploads?photoType=profile&storageId=approved/user-1/a.png")
        .header(header::AUTHORIZATION, format!("Bearer {}", owner))
        .body(Body::from(tiny_png()))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_storage_id_is_scoped_to_the_uploader() {
    let app = TestApp::new().await;
    let router = build_router(app.ctx.clone());
    let owner = app.token("user-1", Scope::User);
    let victim = app.seed("user-2", ModerationStatus::Pending, Priority::Normal).await;

    let post = |storage_id: String| {
        Request::builder()
            .method(Method::POST)
            .uri(format!("/api/uploads?photoType=profile&storageId={}", storage_id))
            .header(header::AUTHORIZATION, format!("Bearer {}", owner))
            .body(Body::from(tiny_png()))
            .unwrap()
    };

    let response = router.clone().oneshot(post(victim.storage_id.clone())).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = router
        .clone()
        .oneshot(post("moderation-queue/user-1/../user-2/a.png".to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // The other user's asset and record are untouched
    assert!(app
        .ctx
        .config
        .storage
        .asset_directory
        .join(&victim.storage_id)
        .exists());
    let stored = app.ctx.store.get(&victim.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ModerationStatus::Pending);

    let response = router
        .clone()
        .oneshot(post("moderation-queue/user-1/own.png".to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}
