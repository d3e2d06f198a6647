//! Shared fixtures for integration tests
//!
//! Every test gets its own file-backed WAL database in a temp directory, so
//! concurrent writers really do contend for the same rows.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Duration;
use photo_moderation::{
    analysis::{AnalysisUnavailable, ContentAnalyzer, RawLabel},
    assets::{AssetStorage, DiskAssetStorage},
    auth::{issue_token, Scope},
    config::ServerConfig,
    context::{AppContext, Collaborators},
    db::{self, DatabaseOptions},
    escalation::{AlertSink, EscalationAlert},
    moderation::{ImageRef, ModerationRecord, ModerationStatus, NewModerationRecord, PhotoType, Priority},
    notify::{OutcomeEvent, OutcomeSink},
    trust::TrustProfile,
    ModerationResult,
};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const TEST_SECRET: &str = "integration-secret-0123456789abcdef";

#[derive(Default)]
pub struct RecordingOutcomes {
    pub events: Mutex<Vec<OutcomeEvent>>,
}

#[async_trait]
impl OutcomeSink for RecordingOutcomes {
    async fn publish(&self, event: &OutcomeEvent) -> ModerationResult<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingAlerts {
    pub alerts: Mutex<Vec<EscalationAlert>>,
}

#[async_trait]
impl AlertSink for RecordingAlerts {
    async fn send(&self, alert: &EscalationAlert) -> ModerationResult<()> {
        self.alerts.lock().unwrap().push(alert.clone());
        Ok(())
    }
}

/// Analyzer that is always down
pub struct UnavailableAnalyzer;

#[async_trait]
impl ContentAnalyzer for UnavailableAnalyzer {
    async fn detect_labels(&self, _image: &[u8]) -> Result<Vec<RawLabel>, AnalysisUnavailable> {
        Err(AnalysisUnavailable("connection refused".to_string()))
    }
}

pub struct TestApp {
    pub ctx: AppContext,
    pub outcomes: Arc<RecordingOutcomes>,
    pub alerts: Arc<RecordingAlerts>,
    pub dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::build(None).await
    }

    pub async fn with_analyzer(analyzer: Arc<dyn ContentAnalyzer>) -> Self {
        Self::build(Some(analyzer)).await
    }

    async fn build(analyzer: Option<Arc<dyn ContentAnalyzer>>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().display().to_string();
        let config = ServerConfig::from_vars(|key| match key {
            "MODERATION_JWT_SECRET" => Some(TEST_SECRET.to_string()),
            "MODERATION_DATA_DIRECTORY" => Some(data_dir.clone()),
            _ => None,
        })
        .unwrap();

        let pool = db::create_pool(&config.storage.database, DatabaseOptions::default())
            .await
            .unwrap();
        db::run_migrations(&pool).await.unwrap();

        let outcomes = Arc::new(RecordingOutcomes::default());
        let alerts = Arc::new(RecordingAlerts::default());
        let assets: Arc<dyn AssetStorage> = Arc::new(DiskAssetStorage::new(
            config.storage.asset_directory.clone(),
            "https://cdn.test",
        ));

        let ctx = AppContext::from_parts(
            config,
            pool,
            Collaborators {
                assets,
                analyzer,
                alerts: alerts.clone(),
                outcomes: outcomes.clone(),
            },
        );

        Self {
            ctx,
            outcomes,
            alerts,
            dir,
        }
    }

    /// Insert an open record with its asset in quarantine
    pub async fn seed(&self, user_id: &str, status: ModerationStatus, priority: Priority) -> ModerationRecord {
        let storage_id = format!("moderation-queue/{}/{}.jpg", user_id, uuid::Uuid::new_v4());
        self.ctx.assets.put(&storage_id, b"jpeg bytes").await.unwrap();

        self.ctx
            .store
            .insert(NewModerationRecord {
                user_id: user_id.to_string(),
                image: ImageRef {
                    url: self.ctx.assets.public_url(&storage_id),
                    storage_id,
                },
                photo_type: PhotoType::Profile,
                image_metadata: Default::default(),
                status,
                priority,
                review_notes: None,
                auto_rejection: None,
                category_scores: None,
                user_history: TrustProfile::default(),
            })
            .await
            .unwrap()
    }

    pub fn token(&self, subject: &str, scope: Scope) -> String {
        issue_token(TEST_SECRET, subject, scope, Duration::hours(1)).unwrap()
    }

    pub fn outcome_count(&self) -> usize {
        self.outcomes.events.lock().unwrap().len()
    }

    /// Outcome count once delivery has settled on `expected`
    pub async fn settled_outcome_count(&self, expected: usize) -> usize {
        for _ in 0..200 {
            if self.outcome_count() >= expected {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        // Give stray deliveries a chance to show up
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        self.outcome_count()
    }
}
