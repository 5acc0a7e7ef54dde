//! Staff notification channel.
//!
//! Operational alerts (overdue scans, fines) go to a Telegram group chat.
//! The [`Notifier`] trait keeps the transport swappable; delivery is always
//! best-effort and never blocks or fails the triggering request.

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    config::TelegramConfig,
    error::{AppError, AppResult},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> AppResult<()>;
}

/// Spawn a delivery without waiting for it. Failures are logged and dropped.
pub fn notify_detached(notifier: Arc<dyn Notifier>, text: String) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = notifier.send(&text).await {
            tracing::warn!("Notification delivery failed: {}", e);
        }
    })
}

#[derive(Clone)]
pub struct TelegramNotifier {
    http: Client,
    config: TelegramConfig,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> AppResult<Self> {
        let timeout = Duration::from_millis(if config.timeout_ms > 0 {
            config.timeout_ms
        } else {
            10_000
        });

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build notifier HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    fn is_configured(&self) -> bool {
        !self.config.bot_token.is_empty() && !self.config.chat_id.is_empty()
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> AppResult<()> {
        if !self.is_configured() {
            tracing::debug!("Telegram notifier not configured, dropping message");
            return Ok(());
        }

        let url = format!(
            "{}/bot{}/sendMessage",
            self.config.api_base, self.config.bot_token
        );

        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({
                "chat_id": self.config.chat_id,
                "text": text,
            }))
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Telegram request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Internal(format!(
                "Telegram returned {}: {}",
                status, body
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_notifier_drops_silently() {
        let notifier = TelegramNotifier::new(TelegramConfig {
            bot_token: String::new(),
            chat_id: String::new(),
            api_base: "https://api.telegram.org".to_string(),
            timeout_ms: 1_000,
        })
        .unwrap();

        assert!(notifier.send("hello").await.is_ok());
    }

    #[tokio::test]
    async fn test_detached_delivery_failure_is_swallowed() {
        let mut mock = MockNotifier::new();
        mock.expect_send()
            .times(1)
            .returning(|_| Err(AppError::Internal("chat unreachable".to_string())));

        let handle = notify_detached(Arc::new(mock), "Borrowing overdue".to_string());
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_detached_delivery_success() {
        let mut mock = MockNotifier::new();
        mock.expect_send().times(1).returning(|_| Ok(()));

        let handle = notify_detached(Arc::new(mock), "all good".to_string());
        handle.await.unwrap();
    }
}
