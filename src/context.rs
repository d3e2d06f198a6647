/// Application context and dependency injection
use crate::{
    accounts::SqliteAccountDirectory,
    analysis::{ContentAnalyzer, DecisionEngine, HttpContentAnalyzer},
    assets::{AssetStorage, DiskAssetStorage},
    config::ServerConfig,
    db,
    error::{ModerationError, ModerationResult},
    escalation::{AlertSink, EmailAlertSink, EscalationNotifier, FanoutAlertSink, LogAlertSink},
    ingest::IngestionPipeline,
    moderation::{ModerationService, ModerationStore, StatsService},
    notify::{LogOutcomeSink, OutcomeSink, WebhookOutcomeSink},
};
use chrono::Duration as ChronoDuration;
use sqlx::SqlitePool;
use std::{sync::Arc, time::Duration};

/// External collaborators, swappable in tests
#[derive(Clone)]
pub struct Collaborators {
    pub assets: Arc<dyn AssetStorage>,
    pub analyzer: Option<Arc<dyn ContentAnalyzer>>,
    pub alerts: Arc<dyn AlertSink>,
    pub outcomes: Arc<dyn OutcomeSink>,
}

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub store: ModerationStore,
    pub moderation: ModerationService,
    pub stats: StatsService,
    pub ingestion: IngestionPipeline,
    pub accounts: Arc<SqliteAccountDirectory>,
    pub assets: Arc<dyn AssetStorage>,
    pub escalation: EscalationNotifier,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> ModerationResult<Self> {
        // Validate configuration
        config.validate()?;

        // Create data directories if they don't exist
        Self::ensure_directories(&config).await?;

        let options = db::DatabaseOptions {
            max_connections: config.storage.db_max_connections,
            enable_wal: true,
            busy_timeout: Duration::from_millis(config.storage.db_busy_timeout_ms),
            acquire_timeout: Duration::from_millis(config.storage.db_acquire_timeout_ms),
        };
        let pool = db::create_pool(&config.storage.database, options).await?;
        db::run_migrations(&pool).await?;
        db::test_connection(&pool).await?;

        let collaborators = Self::collaborators_from_config(&config)?;
        Ok(Self::from_parts(config, pool, collaborators))
    }

    /// Build collaborators from configuration
    fn collaborators_from_config(config: &ServerConfig) -> ModerationResult<Collaborators> {
        let assets: Arc<dyn AssetStorage> = Arc::new(DiskAssetStorage::new(
            config.storage.asset_directory.clone(),
            config.storage.public_asset_url.clone(),
        ));

        let analyzer: Option<Arc<dyn ContentAnalyzer>> = match &config.analysis.endpoint {
            Some(endpoint) => {
                tracing::info!(endpoint = %endpoint, "Content analysis enabled");
                Some(Arc::new(HttpContentAnalyzer::new(
                    endpoint.clone(),
                    config.analysis.api_key.clone(),
                    Duration::from_millis(config.analysis.timeout_ms),
                    config.analysis.min_confidence,
                )?))
            }
            None => {
                tracing::warn!("No content analysis endpoint configured - all uploads go to the manual queue");
                None
            }
        };

        let mut sinks: Vec<Arc<dyn AlertSink>> = vec![Arc::new(LogAlertSink)];
        if let Some(email) = &config.escalation.email {
            tracing::info!(recipients = email.recipients.len(), "Escalation email enabled");
            sinks.push(Arc::new(EmailAlertSink::new(
                email,
                config.escalation.alerts_per_minute,
            )?));
        }
        let alerts: Arc<dyn AlertSink> = Arc::new(FanoutAlertSink::new(sinks));

        let outcomes: Arc<dyn OutcomeSink> = match &config.notifications.webhook_url {
            Some(url) => Arc::new(WebhookOutcomeSink::new(url.clone())?),
            None => Arc::new(LogOutcomeSink),
        };

        Ok(Collaborators {
            assets,
            analyzer,
            alerts,
            outcomes,
        })
    }

    /// Wire services around an existing pool
    pub fn from_parts(config: ServerConfig, db: SqlitePool, collaborators: Collaborators) -> Self {
        let store = ModerationStore::new(db.clone())
            .with_retention(ChronoDuration::days(config.retention.rejected_days));
        let moderation = ModerationService::new(
            store.clone(),
            collaborators.assets.clone(),
            collaborators.outcomes,
        );
        let stats = StatsService::new(db.clone());
        let accounts = Arc::new(SqliteAccountDirectory::new(db.clone()));
        let escalation =
            EscalationNotifier::new(config.escalation.queue_threshold, collaborators.alerts);
        let ingestion = IngestionPipeline::new(
            moderation.clone(),
            accounts.clone(),
            collaborators.analyzer,
            DecisionEngine::new(config.thresholds.clone()),
            escalation.clone(),
            Duration::from_millis(config.analysis.timeout_ms),
        );

        Self {
            config: Arc::new(config),
            db,
            store,
            moderation,
            stats,
            ingestion,
            accounts,
            assets: collaborators.assets,
            escalation,
        }
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> ModerationResult<()> {
        for dir in [
            &config.storage.data_directory,
            &config.storage.asset_directory,
        ] {
            if !dir.exists() {
                tokio::fs::create_dir_all(dir).await.map_err(|e| {
                    ModerationError::Internal(format!("Failed to create directory {:?}: {}", dir, e))
                })?;
            }
        }

        Ok(())
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
