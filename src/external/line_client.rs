// ABOUTME: LINE Messaging API client for reply and push text messages
// ABOUTME: Bearer-token authenticated; non-2xx responses are logged and surfaced as errors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use super::ChatTransport;
use crate::config::LineConfig;
use crate::constants::{limits, service_names};
use crate::errors::{AppError, AppResult};

/// Longest body excerpt kept in error messages
const ERROR_BODY_EXCERPT: usize = 300;

#[derive(Debug, Serialize)]
struct TextMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: [TextMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct PushRequest<'a> {
    to: &'a str,
    messages: [TextMessage<'a>; 1],
}

/// Messaging API client
pub struct LineClient {
    config: LineConfig,
    http_client: Client,
}

impl LineClient {
    /// Create a client with the configured token and base URL
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn new(config: LineConfig) -> AppResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(limits::HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            config,
            http_client,
        })
    }

    async fn post<T: Serialize + Sync>(&self, path: &str, body: &T) -> AppResult<()> {
        if self.config.channel_access_token.is_empty() {
            return Err(AppError::config("LINE channel access token is not configured"));
        }

        let url = format!("{}{path}", self.config.api_base_url.trim_end_matches('/'));
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.config.channel_access_token)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::external_service(service_names::LINE_API, e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!(path, "LINE request accepted");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let excerpt: String = body.chars().take(ERROR_BODY_EXCERPT).collect();
        warn!(path, %status, body = %excerpt, "LINE request rejected");
        Err(AppError::external_service(
            service_names::LINE_API,
            format!("{path} failed with HTTP {status}: {excerpt}"),
        ))
    }
}

#[async_trait]
impl ChatTransport for LineClient {
    async fn reply_to(&self, reply_token: &str, text: &str) -> AppResult<()> {
        self.post(
            "/v2/bot/message/reply",
            &ReplyRequest {
                reply_token,
                messages: [TextMessage { kind: "text", text }],
            },
        )
        .await
    }

    async fn push_to(&self, user_id: &str, text: &str) -> AppResult<()> {
        self.post(
            "/v2/bot/message/push",
            &PushRequest {
                to: user_id,
                messages: [TextMessage { kind: "text", text }],
            },
        )
        .await
    }
}
