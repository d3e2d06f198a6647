/// Terminal-outcome events for the user notification subsystem
use crate::{
    error::{ModerationError, ModerationResult},
    moderation::{ModerationRecord, RejectionCategory},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Approved,
    Rejected,
}

/// Emitted once per terminal transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeEvent {
    pub user_id: String,
    pub moderation_id: String,
    pub outcome: Outcome,
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<RejectionCategory>,
}

impl OutcomeEvent {
    pub fn approved(record: &ModerationRecord) -> Self {
        Self {
            user_id: record.user_id.clone(),
            moderation_id: record.id.clone(),
            outcome: Outcome::Approved,
            title: "Photo Approved".to_string(),
            body: "Your photo has been approved and is now visible on your profile.".to_string(),
            reason: None,
            category: None,
        }
    }

    pub fn rejected(record: &ModerationRecord, reason: &str, category: RejectionCategory) -> Self {
        Self {
            user_id: record.user_id.clone(),
            moderation_id: record.id.clone(),
            outcome: Outcome::Rejected,
            title: "Photo Rejected".to_string(),
            body: format!(
                "Your photo was rejected: {}. Category: {}. Please review our community guidelines.",
                reason, category
            ),
            reason: Some(reason.to_string()),
            category: Some(category),
        }
    }
}

/// Delivery of outcome events
#[async_trait]
pub trait OutcomeSink: Send + Sync {
    async fn publish(&self, event: &OutcomeEvent) -> ModerationResult<()>;
}

/// Writes events to the log only
#[derive(Debug, Clone, Default)]
pub struct LogOutcomeSink;

#[async_trait]
impl OutcomeSink for LogOutcomeSink {
    async fn publish(&self, event: &OutcomeEvent) -> ModerationResult<()> {
        tracing::info!(
            user_id = %event.user_id,
            moderation_id = %event.moderation_id,
            outcome = ?event.outcome,
            "User notification: {}",
            event.title
        );
        Ok(())
    }
}

/// POSTs events as JSON to a webhook
#[derive(Clone)]
pub struct WebhookOutcomeSink {
    client: reqwest::Client,
    url: String,
}

impl WebhookOutcomeSink {
    pub fn new(url: impl Into<String>) -> ModerationResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ModerationError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl OutcomeSink for WebhookOutcomeSink {
    async fn publish(&self, event: &OutcomeEvent) -> ModerationResult<()> {
        let response = self
            .client
            .post(&self.url)
            .json(event)
            .send()
            .await
            .map_err(|e| ModerationError::Notification(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ModerationError::Notification(format!(
                "webhook returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}
