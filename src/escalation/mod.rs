/// Escalation Notifier
///
/// Decides when a queue-depth or urgent-item alert should fire and hands it to
/// an `AlertSink`. Delivery failures never reach the caller.
pub mod email;

pub use email::EmailAlertSink;

use crate::{error::ModerationResult, metrics, moderation::ModerationRecord};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc};

pub const DEFAULT_QUEUE_THRESHOLD: i64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Warning,
    High,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Warning => "warning",
            AlertSeverity::High => "high",
            AlertSeverity::Critical => "critical",
        }
    }
}

/// Alert handed to the delivery collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationAlert {
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    pub metadata: BTreeMap<String, String>,
}

/// Alert delivery
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send(&self, alert: &EscalationAlert) -> ModerationResult<()>;
}

/// Writes alerts to the log
#[derive(Debug, Clone, Default)]
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    async fn send(&self, alert: &EscalationAlert) -> ModerationResult<()> {
        match alert.severity {
            AlertSeverity::Warning => {
                tracing::warn!(severity = alert.severity.as_str(), metadata = ?alert.metadata, "{}: {}", alert.title, alert.message)
            }
            _ => {
                tracing::error!(severity = alert.severity.as_str(), metadata = ?alert.metadata, "{}: {}", alert.title, alert.message)
            }
        }
        Ok(())
    }
}

/// Fans an alert out to several sinks; one failing sink does not stop the rest
pub struct FanoutAlertSink {
    sinks: Vec<Arc<dyn AlertSink>>,
}

impl FanoutAlertSink {
    pub fn new(sinks: Vec<Arc<dyn AlertSink>>) -> Self {
        Self { sinks }
    }
}

#[async_trait]
impl AlertSink for FanoutAlertSink {
    async fn send(&self, alert: &EscalationAlert) -> ModerationResult<()> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.send(alert).await {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Alert decision and dispatch
#[derive(Clone)]
pub struct EscalationNotifier {
    threshold: i64,
    sink: Arc<dyn AlertSink>,
}

impl EscalationNotifier {
    pub fn new(threshold: i64, sink: Arc<dyn AlertSink>) -> Self {
        Self { threshold, sink }
    }

    pub fn threshold(&self) -> i64 {
        self.threshold
    }

    /// Alert for the current open-queue size, if one is due
    pub fn queue_depth_alert(&self, depth: i64) -> Option<EscalationAlert> {
        if depth <= self.threshold {
            return None;
        }

        let severity = if depth > self.threshold.saturating_mul(2) {
            AlertSeverity::High
        } else {
            AlertSeverity::Warning
        };

        Some(EscalationAlert {
            severity,
            title: "Moderation queue backlog".to_string(),
            message: format!(
                "{} photos are awaiting review (threshold {})",
                depth, self.threshold
            ),
            metadata: BTreeMap::from([
                ("queueDepth".to_string(), depth.to_string()),
                ("threshold".to_string(), self.threshold.to_string()),
            ]),
        })
    }

    /// Alert for a record that was assigned urgent priority
    pub fn urgent_alert(record: &ModerationRecord) -> EscalationAlert {
        EscalationAlert {
            severity: AlertSeverity::Critical,
            title: "Urgent photo awaiting review".to_string(),
            message: format!(
                "Photo {} from user {} was queued as urgent",
                record.id, record.user_id
            ),
            metadata: BTreeMap::from([
                ("moderationId".to_string(), record.id.clone()),
                ("userId".to_string(), record.user_id.clone()),
                ("status".to_string(), record.status.to_string()),
            ]),
        }
    }

    /// Evaluate the depth rule and deliver any resulting alert
    pub fn check_queue_depth(&self, depth: i64) {
        if let Some(alert) = self.queue_depth_alert(depth) {
            self.dispatch(alert);
        }
    }

    pub fn notify_urgent(&self, record: &ModerationRecord) {
        self.dispatch(Self::urgent_alert(record));
    }

    /// Delivery runs on its own task; callers never wait on the sink.
    fn dispatch(&self, alert: EscalationAlert) {
        metrics::record_escalation_alert(alert.severity.as_str());
        let sink = Arc::clone(&self.sink);
        tokio::spawn(async move {
            if let Err(e) = sink.send(&alert).await {
                metrics::record_side_effect_failure("alert");
                tracing::warn!(error = %e, title = %alert.title, "Escalation alert delivery failed");
            }
        });
    }
}
