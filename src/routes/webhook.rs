// ABOUTME: Messaging webhook endpoint feeding text events to the conversation router
// ABOUTME: Verifies the channel signature when configured and always acknowledges with 200 OK
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

//! Webhook routes
//!
//! The platform retries any non-2xx delivery, so once a request is
//! authenticated every outcome (parse failures, router errors) is logged
//! and acknowledged with `200 OK`. Only a bad signature is refused.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use ring::hmac;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::constants::limits::ALERT_BODY_EXCERPT_CHARS;
use crate::context::ServerContext;
use crate::router::InboundMessage;

/// Header carrying the base64 HMAC-SHA256 of the raw body
pub const SIGNATURE_HEADER: &str = "x-line-signature";

/// Webhook delivery envelope
#[derive(Debug, Deserialize)]
struct WebhookBody {
    #[serde(default)]
    events: Vec<WebhookEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebhookEvent {
    #[serde(rename = "type")]
    kind: String,
    message: Option<EventMessage>,
    source: Option<EventSource>,
    reply_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventMessage {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventSource {
    user_id: Option<String>,
}

impl WebhookEvent {
    /// Text message events with a sender and a reply token; everything else is skipped
    fn into_inbound(self) -> Option<InboundMessage> {
        if self.kind != "message" {
            return None;
        }
        let message = self.message.filter(|m| m.kind == "text")?;
        Some(InboundMessage {
            chat_user_id: self.source?.user_id.filter(|id| !id.trim().is_empty())?,
            reply_token: self.reply_token.filter(|token| !token.trim().is_empty())?,
            text: message.text?,
        })
    }
}

/// Alert details for a failed event: sender, text and the head of the raw body
fn alert_context(message: &InboundMessage, body: &[u8]) -> Value {
    let excerpt: String = String::from_utf8_lossy(body)
        .chars()
        .take(ALERT_BODY_EXCERPT_CHARS)
        .collect();
    json!({
        "event": "message/text",
        "userId": message.chat_user_id,
        "text": message.text,
        "body": excerpt,
    })
}

/// Base64 HMAC-SHA256 signature of `body` under `secret`
#[must_use]
pub fn sign_body(secret: &str, body: &[u8]) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    STANDARD.encode(hmac::sign(&key, body).as_ref())
}

/// Constant-time check of a delivery signature
#[must_use]
pub fn verify_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(tag) = STANDARD.decode(signature.trim()) else {
        return false;
    };
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    hmac::verify(&key, body, &tag).is_ok()
}

/// Messaging webhook routes
pub struct WebhookRoutes;

impl WebhookRoutes {
    /// Create the webhook route
    pub fn routes(ctx: Arc<ServerContext>) -> Router {
        Router::new()
            .route("/webhook/line", post(Self::handle_webhook))
            .with_state(ctx)
    }

    async fn handle_webhook(
        State(ctx): State<Arc<ServerContext>>,
        headers: HeaderMap,
        body: Bytes,
    ) -> Response {
        if let Some(secret) = ctx.config.line.channel_secret.as_deref() {
            let signature = headers
                .get(SIGNATURE_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            if !verify_signature(secret, &body, signature) {
                warn!("Rejected webhook delivery with an invalid signature");
                return StatusCode::UNAUTHORIZED.into_response();
            }
        }

        let delivery: WebhookBody = match serde_json::from_slice(&body) {
            Ok(delivery) => delivery,
            Err(e) => {
                warn!(error = %e, "Unparseable webhook body");
                return (StatusCode::OK, "OK").into_response();
            }
        };

        for event in delivery.events {
            let Some(message) = event.into_inbound() else {
                debug!("Skipping non-text or incomplete webhook event");
                continue;
            };
            let context = alert_context(&message, &body);
            ctx.alerter
                .guard(
                    "handle_webhook",
                    Some(&context),
                    ctx.router.dispatch(&message, Utc::now()),
                )
                .await;
        }

        (StatusCode::OK, "OK").into_response()
    }
}
