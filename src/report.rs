//! 結果の出力とWebhook通知

use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::CheckerConfig;
use crate::error::CheckerError;
use crate::probe::Slot;

const WEBHOOK_TIMEOUT_SECS: u64 = 10;

/// Slack互換のメッセージ本文
#[derive(Debug, Serialize)]
struct WebhookMessage<'a> {
    text: &'a str,
}

/// Webhookへのテキスト送信
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self, CheckerError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(WEBHOOK_TIMEOUT_SECS))
            .build()
            .map_err(|e| CheckerError::Notification(format!("HTTPクライアント作成エラー: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub async fn send(&self, text: &str) -> Result<(), CheckerError> {
        let response = self
            .client
            .post(&self.url)
            .json(&WebhookMessage { text })
            .send()
            .await
            .map_err(|e| CheckerError::Notification(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CheckerError::Notification(format!(
                "webhook returned {}: {}",
                status, body
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoSlots,
    NotConfigured,
    /// 手動実行（CI以外）では共有チャンネルに送らない
    NotAutomated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationStatus {
    Delivered,
    Failed(String),
    Skipped(SkipReason),
}

/// 標準出力用のまとめ
pub fn render_summary(slots: &[Slot], window_days: u32) -> String {
    if slots.is_empty() {
        return format!("No available slots within the next {} days.", window_days);
    }

    let mut out = format!("Available slots within {} days:", window_days);
    for slot in slots {
        out.push_str("\n  ");
        out.push_str(&slot.to_string());
    }
    out
}

/// Webhookに送る本文（見出し1行＋1枠1行）
pub fn notification_text(slots: &[Slot], window_days: u32) -> String {
    let mut text = format!("NCT slots available within {} days:", window_days);
    for slot in slots {
        text.push_str("\n• ");
        text.push_str(&slot.to_string());
    }
    text
}

pub struct Reporter {
    notifier: Option<WebhookNotifier>,
    automated: bool,
    window_days: u32,
}

impl Reporter {
    pub fn new(notifier: Option<WebhookNotifier>, automated: bool, window_days: u32) -> Self {
        Self {
            notifier,
            automated,
            window_days,
        }
    }

    pub fn from_config(config: &CheckerConfig) -> Result<Self, CheckerError> {
        let notifier = config
            .webhook_url
            .as_deref()
            .map(WebhookNotifier::new)
            .transpose()?;
        Ok(Self::new(notifier, config.automated, config.window_days))
    }

    /// まとめを標準出力に書き、条件を満たせば通知する
    ///
    /// 通知の失敗はログに残すだけで、呼び出し側には返さない。
    pub async fn report(&self, slots: &[Slot]) -> NotificationStatus {
        println!("{}", render_summary(slots, self.window_days));
        self.notify(slots).await
    }

    pub async fn notify(&self, slots: &[Slot]) -> NotificationStatus {
        if slots.is_empty() {
            return NotificationStatus::Skipped(SkipReason::NoSlots);
        }

        let Some(notifier) = &self.notifier else {
            info!("No webhook configured, skipping notification");
            return NotificationStatus::Skipped(SkipReason::NotConfigured);
        };

        if !self.automated {
            info!("Manual run, skipping webhook notification");
            return NotificationStatus::Skipped(SkipReason::NotAutomated);
        }

        let text = notification_text(slots, self.window_days);
        match notifier.send(&text).await {
            Ok(()) => {
                info!("Webhook notification sent ({} slots)", slots.len());
                NotificationStatus::Delivered
            }
            Err(e) => {
                warn!("Failed to send webhook notification: {}", e);
                NotificationStatus::Failed(e.to_string())
            }
        }
    }
}
