// ABOUTME: HTTP-level tests for the webhook, form, job and health routes
// ABOUTME: Drives the assembled router in-process with tower's oneshot
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

#![allow(missing_docs, clippy::unwrap_used)]

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use common::{doc_url, month, setup, setup_with};
use serde_json::{json, Value};
use shift_sync::routes::webhook::{sign_body, SIGNATURE_HEADER};
use shift_sync::server::build_router;
use tower::ServiceExt;

const SECRET: &str = "channel-secret";

fn text_event(user: &str, text: &str) -> String {
    json!({
        "destination": "Ubot",
        "events": [{
            "type": "message",
            "replyToken": "r1",
            "source": {"type": "user", "userId": user},
            "message": {"type": "text", "id": "1", "text": text}
        }]
    })
    .to_string()
}

fn post(uri: &str, body: String, signature: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(signature) = signature {
        builder = builder.header(SIGNATURE_HEADER, signature);
    }
    builder.body(Body::from(body)).unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

#[tokio::test]
async fn text_event_is_routed_and_acknowledged() {
    let env = setup().await;
    let app = build_router(&env.ctx);

    let (status, body) = send(
        app,
        post("/webhook/line", text_event("U1", "山田太郎 taro@gmail.com"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");

    let replies = env.chat.replies();
    assert_eq!(replies.len(), 1);
    assert!(replies[0].contains("登録OK"));
}

#[tokio::test]
async fn garbage_and_non_text_events_still_get_ok() {
    let env = setup().await;

    let (status, _) = send(
        build_router(&env.ctx),
        post("/webhook/line", "not json".to_owned(), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let sticker = json!({"events": [{
        "type": "message",
        "replyToken": "r1",
        "source": {"userId": "U1"},
        "message": {"type": "sticker"}
    }]})
    .to_string();
    let (status, _) = send(build_router(&env.ctx), post("/webhook/line", sticker, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(env.chat.sent().is_empty());
}

#[tokio::test]
async fn router_failure_alert_carries_the_event_context() {
    let env = setup().await;
    sqlx::query("DROP TABLE conversation_states")
        .execute(env.ctx.database.pool())
        .await
        .unwrap();

    let (status, body) = send(
        build_router(&env.ctx),
        post("/webhook/line", text_event("U1", "山田太郎"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");

    let alerts = env.chat.pushes_to(common::ADMIN);
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].contains("handle_webhook"));
    assert!(alerts[0].contains("詳細:"));
    assert!(alerts[0].contains("\"userId\": \"U1\""));
    assert!(alerts[0].contains("\"text\": \"山田太郎\""));
    assert!(alerts[0].contains("replyToken"));
}

#[tokio::test]
async fn signature_is_enforced_when_secret_configured() {
    let env = setup_with(&[("LINE_CHANNEL_SECRET", SECRET)]).await;
    let body = text_event("U1", "山田太郎 taro@gmail.com");

    let (status, _) = send(
        build_router(&env.ctx),
        post("/webhook/line", body.clone(), Some("bm90LWEtc2lnbmF0dXJl")),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(build_router(&env.ctx), post("/webhook/line", body.clone(), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(env.chat.sent().is_empty());

    let signature = sign_body(SECRET, body.as_bytes());
    let (status, _) = send(
        build_router(&env.ctx),
        post("/webhook/line", body, Some(&signature)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(env.chat.replies().len(), 1);
}

#[tokio::test]
async fn form_route_provisions_a_document() {
    let env = setup().await;
    env.teacher("山田 太郎", Some("U1"), None).await;
    env.docs.add_template(month(2025, 5));

    let form = json!({"teacher_name": "山田 太郎", "month_key": "2025-05"}).to_string();
    let (status, body) = send(
        build_router(&env.ctx),
        post("/api/forms/submission", form, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let outcome: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(outcome["outcome"], "created");
    assert_eq!(outcome["key"], "2025-05-T001");
    assert_eq!(outcome["url"], doc_url("doc1"));
}

#[tokio::test]
async fn form_route_rejects_blank_name_and_alerts_admin() {
    let env = setup().await;

    let form = json!({"teacher_name": "  "}).to_string();
    let (status, _) = send(
        build_router(&env.ctx),
        post("/api/forms/submission", form, None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let alerts = env.chat.pushes_to(common::ADMIN);
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].contains("request_document"));
}

#[tokio::test]
async fn job_route_reports_the_batch() {
    let env = setup().await;

    let (status, body) = send(
        build_router(&env.ctx),
        post("/api/jobs/poll", String::new(), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let report: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(report["processed"], 0);
    assert_eq!(report["failures"], json!([]));
}

#[tokio::test]
async fn health_reports_database_status() {
    let env = setup().await;
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(build_router(&env.ctx), request).await;
    assert_eq!(status, StatusCode::OK);
    let health: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["service"]["name"], "shift_sync");
    assert_eq!(health["checks"][0]["name"], "database");
}
