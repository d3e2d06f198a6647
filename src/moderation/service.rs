/// Reviewer operations
///
/// Wraps the store's conditional writes with the work that follows a decision:
/// moving or deleting the asset and telling the uploader. Those side effects are
/// best-effort. A failure is logged and counted, and the decision stands.
use crate::{
    assets::{approved_location, AssetStorage},
    error::{ModerationError, ModerationResult},
    metrics,
    moderation::{
        models::{AppealDecision, ModerationRecord, Priority, Rejection},
        store::{ModerationStore, TransitionOutcome},
    },
    notify::{OutcomeEvent, OutcomeSink},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

pub const DEFAULT_APPROVE_NOTE: &str = "Approved by moderator";

/// Per-id outcome of a batch approval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemResult {
    pub id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchApproveResult {
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<BatchItemResult>,
}

#[derive(Clone)]
pub struct ModerationService {
    store: ModerationStore,
    assets: Arc<dyn AssetStorage>,
    outcomes: Arc<dyn OutcomeSink>,
}

impl ModerationService {
    pub fn new(
        store: ModerationStore,
        assets: Arc<dyn AssetStorage>,
        outcomes: Arc<dyn OutcomeSink>,
    ) -> Self {
        Self {
            store,
            assets,
            outcomes,
        }
    }

    pub fn store(&self) -> &ModerationStore {
        &self.store
    }

    pub async fn get(&self, id: &str) -> ModerationResult<ModerationRecord> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| ModerationError::NotFound(format!("Moderation record {} not found", id)))
    }

    /// Approve an open record. Losing a race yields `AlreadyModerated`.
    pub async fn approve(
        &self,
        id: &str,
        reviewer: &str,
        notes: Option<&str>,
    ) -> ModerationResult<ModerationRecord> {
        let notes = notes.unwrap_or(DEFAULT_APPROVE_NOTE);
        let outcome = self.store.approve(id, reviewer, Some(notes)).await?;
        let record = Self::applied("approved", outcome)?;

        info!(moderation_id = %record.id, reviewer = %reviewer, user_id = %record.user_id, "Photo approved");

        let record = self.release_asset(record).await;
        self.publish(OutcomeEvent::approved(&record));
        Ok(record)
    }

    /// Reject an open record and delete its asset
    pub async fn reject(
        &self,
        id: &str,
        reviewer: &str,
        rejection: &Rejection,
        notes: Option<&str>,
    ) -> ModerationResult<ModerationRecord> {
        let default_note = format!("Rejected as {}", rejection.category);
        let notes = notes.unwrap_or(default_note.as_str());
        let outcome = self.store.reject(id, reviewer, rejection, Some(notes)).await?;
        let record = Self::applied("rejected", outcome)?;

        info!(
            moderation_id = %record.id,
            reviewer = %reviewer,
            user_id = %record.user_id,
            category = %rejection.category,
            "Photo rejected"
        );

        self.discard_asset(&record).await;
        self.publish(OutcomeEvent::rejected(
            &record,
            &rejection.reason,
            rejection.category,
        ));
        Ok(record)
    }

    /// Send an open record to review
    pub async fn flag(
        &self,
        id: &str,
        reviewer: &str,
        notes: Option<&str>,
        new_priority: Option<Priority>,
    ) -> ModerationResult<ModerationRecord> {
        let outcome = self.store.flag(id, notes, new_priority).await?;
        let record = Self::applied("under-review", outcome)?;

        info!(
            moderation_id = %record.id,
            reviewer = %reviewer,
            priority = %record.priority,
            "Photo flagged for review"
        );
        Ok(record)
    }

    /// Approve each id independently; one failure never stops the rest
    pub async fn batch_approve(
        &self,
        ids: &[String],
        reviewer: &str,
        notes: Option<&str>,
    ) -> BatchApproveResult {
        let mut results = Vec::with_capacity(ids.len());

        for id in ids {
            let result = match self.approve(id, reviewer, notes).await {
                Ok(_) => BatchItemResult {
                    id: id.clone(),
                    success: true,
                    error: None,
                },
                Err(e) => {
                    let error = match e {
                        ModerationError::AlreadyModerated { .. } => "already moderated".to_string(),
                        ModerationError::NotFound(_) => "not found".to_string(),
                        other => {
                            warn!(moderation_id = %id, error = %other, "Batch approval item failed");
                            other.to_string()
                        }
                    };
                    BatchItemResult {
                        id: id.clone(),
                        success: false,
                        error: Some(error),
                    }
                }
            };
            results.push(result);
        }

        let successful = results.iter().filter(|r| r.success).count();
        info!(reviewer = %reviewer, successful, failed = results.len() - successful, "Batch approval finished");

        BatchApproveResult {
            successful,
            failed: results.len() - successful,
            results,
        }
    }

    pub async fn submit_appeal(
        &self,
        id: &str,
        user_id: &str,
        reason: &str,
    ) -> ModerationResult<ModerationRecord> {
        if reason.trim().is_empty() {
            return Err(ModerationError::Validation(
                "reason: appeal reason is required".to_string(),
            ));
        }

        let record = self.store.submit_appeal(id, user_id, reason).await?;
        info!(moderation_id = %record.id, user_id = %user_id, "Appeal submitted");
        Ok(record)
    }

    /// Resolve a pending appeal; overturning approves the record
    pub async fn resolve_appeal(
        &self,
        id: &str,
        reviewer: &str,
        decision: AppealDecision,
        notes: Option<&str>,
    ) -> ModerationResult<ModerationRecord> {
        let outcome = self.store.resolve_appeal(id, reviewer, decision, notes).await?;
        let record = match outcome {
            TransitionOutcome::Applied(record) => record,
            TransitionOutcome::AlreadyModerated(current) => {
                metrics::record_transition("appeal", "already_resolved");
                return Err(ModerationError::Conflict {
                    message: match current.appeal {
                        Some(_) => "Appeal already resolved".to_string(),
                        None => "No appeal was submitted for this photo".to_string(),
                    },
                    current_status: Some(current.status),
                });
            }
        };

        metrics::record_transition("appeal", decision.as_str());
        info!(
            moderation_id = %record.id,
            reviewer = %reviewer,
            decision = decision.as_str(),
            "Appeal resolved"
        );

        if decision == AppealDecision::Overturned {
            self.publish(OutcomeEvent::approved(&record));
        }
        Ok(record)
    }

    /// Turn a store outcome into the caller-facing result, counting it either way
    fn applied(target: &str, outcome: TransitionOutcome) -> ModerationResult<ModerationRecord> {
        match outcome {
            TransitionOutcome::Applied(record) => {
                metrics::record_transition(target, "applied");
                Ok(record)
            }
            TransitionOutcome::AlreadyModerated(current) => {
                metrics::record_transition(target, "already_moderated");
                Err(ModerationError::AlreadyModerated {
                    id: current.id,
                    current_status: current.status,
                })
            }
        }
    }

    /// Move a quarantined asset to its approved location
    pub(crate) async fn release_asset(&self, record: ModerationRecord) -> ModerationRecord {
        let Some(target) = approved_location(&record.storage_id) else {
            return record;
        };

        if let Err(e) = self.assets.relocate(&record.storage_id, &target).await {
            metrics::record_side_effect_failure("asset_relocate");
            warn!(moderation_id = %record.id, storage_id = %record.storage_id, error = %e, "Failed to relocate approved asset");
            return record;
        }

        let url = self.assets.public_url(&target);
        match self.store.update_location(&record.id, &url, &target).await {
            Ok(true) => ModerationRecord {
                photo_url: url,
                storage_id: target,
                ..record
            },
            Ok(false) => record,
            Err(e) => {
                metrics::record_side_effect_failure("asset_bookkeeping");
                warn!(moderation_id = %record.id, error = %e, "Failed to record approved asset location");
                record
            }
        }
    }

    pub(crate) async fn discard_asset(&self, record: &ModerationRecord) {
        if let Err(e) = self.assets.delete(&record.storage_id).await {
            metrics::record_side_effect_failure("asset_delete");
            warn!(moderation_id = %record.id, storage_id = %record.storage_id, error = %e, "Failed to delete rejected asset");
        }
    }

    /// Hand the event to the outcome sink on its own task; the decision is
    /// already committed and does not wait for delivery.
    pub(crate) fn publish(&self, event: OutcomeEvent) {
        let outcomes = Arc::clone(&self.outcomes);
        tokio::spawn(async move {
            if let Err(e) = outcomes.publish(&event).await {
                metrics::record_side_effect_failure("notification");
                warn!(moderation_id = %event.moderation_id, error = %e, "Failed to publish outcome notification");
            }
        });
    }
}
