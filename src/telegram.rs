//! Minimal Telegram Bot API client: the two calls the relay needs.

use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::types::{SendMessageRequest, SetWebhookRequest, TelegramResponse};

pub struct TelegramClient {
    http: Client,
    base_url: String,
}

impl TelegramClient {
    pub fn new(api_url: &str, bot_token: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: format!("{}/bot{}", api_url.trim_end_matches('/'), bot_token),
        }
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<(), String> {
        let body = SendMessageRequest {
            chat_id,
            text,
            reply_to_message_id: reply_to,
        };
        self.call("sendMessage", &body).await
    }

    /// Points Telegram at our webhook endpoint.
    pub async fn set_webhook(&self, url: &str, secret_token: Option<&str>) -> Result<(), String> {
        let body = SetWebhookRequest {
            url,
            secret_token,
            allowed_updates: vec!["message", "channel_post"],
        };
        self.call("setWebhook", &body).await
    }

    async fn call<B: Serialize>(&self, method: &str, body: &B) -> Result<(), String> {
        debug!(method, "telegram call");
        let res = self
            .http
            .post(format!("{}/{}", self.base_url, method))
            .json(body)
            .send()
            .await
            .map_err(|e| e.without_url().to_string())?;

        let answer: TelegramResponse = res.json().await.map_err(|e| e.without_url().to_string())?;
        if answer.ok {
            Ok(())
        } else {
            Err(answer
                .description
                .unwrap_or_else(|| format!("{method} failed")))
        }
    }
}
