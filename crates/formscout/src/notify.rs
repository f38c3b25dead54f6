// Copyright 2026 Formscout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Chat notifications: run start and end-of-sequence reports.
//!
//! Delivery is best-effort. `send_text` reports success as a bool and never
//! fails the caller.

use crate::error::ScoutError;
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{info, warn};

/// Fire-and-forget text delivery.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send `message`; `true` when the channel accepted it.
    async fn send_text(&self, message: &str) -> bool;
}

/// Group-bot webhook (`{"msgtype": "text", ...}`); success iff `errcode == 0`.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct WebhookReply {
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            url: url.into(),
        }
    }

    async fn post(&self, message: &str) -> Result<()> {
        let body = json!({
            "msgtype": "text",
            "text": {
                "content": message,
                "mentioned_mobile_list": [],
                "mentioned_user_list": [],
            }
        });
        let reply: WebhookReply = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if reply.errcode != 0 {
            return Err(ScoutError::Notify(format!("errcode {}: {}", reply.errcode, reply.errmsg)).into());
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send_text(&self, message: &str) -> bool {
        match self.post(message).await {
            Ok(()) => {
                info!("notification sent");
                true
            }
            Err(e) => {
                warn!("notification failed: {e:#}");
                false
            }
        }
    }
}

/// Writes messages to the log; used when no webhook is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_text(&self, message: &str) -> bool {
        info!("notification:\n{message}");
        true
    }
}
