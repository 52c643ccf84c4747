//! Telegram Bot API notifier

use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;

use crate::ports::alerts::{AlertError, MilestoneAlert, MilestoneNotifier};
use super::format::format_alert;

pub const TELEGRAM_API: &str = "https://api.telegram.org";

#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    http: Client,
    api_base: String,
    bot_token: Option<String>,
    chat_id: Option<String>,
}

impl TelegramNotifier {
    /// Blank credentials count as missing
    pub fn new(bot_token: Option<String>, chat_id: Option<String>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            http,
            api_base: TELEGRAM_API.to_string(),
            bot_token: bot_token.filter(|t| !t.trim().is_empty()),
            chat_id: chat_id.filter(|c| !c.trim().is_empty()),
        }
    }

    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.bot_token.is_some() && self.chat_id.is_some()
    }

    /// `sendMessage` request body
    pub fn build_payload(&self, text: &str) -> Option<serde_json::Value> {
        let chat_id = self.chat_id.as_ref()?;
        Some(serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "disable_web_page_preview": true
        }))
    }

    /// Send a plain-text message
    pub async fn send_message(&self, text: &str) -> Result<(), AlertError> {
        let (Some(token), Some(payload)) = (self.bot_token.as_ref(), self.build_payload(text)) else {
            return Err(AlertError::Disabled("telegram credentials not configured".into()));
        };

        let url = format!("{}/bot{}/sendMessage", self.api_base, token);
        let response = self
            .http
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AlertError::Delivery(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Telegram API error: Status {}", status);
            return Err(AlertError::Delivery(format!("Telegram API {}: {}", status, body)));
        }

        tracing::debug!("Telegram notification sent successfully");
        Ok(())
    }
}

#[async_trait]
impl MilestoneNotifier for TelegramNotifier {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn notify(&self, alert: &MilestoneAlert) -> Result<(), AlertError> {
        self.send_message(&format_alert(alert)).await
    }
}
