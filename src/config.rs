/// Configuration management for the photo moderation service
use crate::{
    analysis::{ContentCategory, Thresholds},
    error::{ModerationError, ModerationResult},
    moderation::store::DEFAULT_REJECTED_RETENTION_DAYS,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub analysis: AnalysisConfig,
    pub thresholds: Thresholds,
    pub escalation: EscalationConfig,
    pub notifications: NotificationConfig,
    pub authentication: AuthConfig,
    pub retention: RetentionConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
    /// Largest accepted upload body in bytes
    pub upload_limit: usize,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub database: PathBuf,
    pub asset_directory: PathBuf,
    pub public_asset_url: String,
    pub db_max_connections: u32,
    pub db_busy_timeout_ms: u64,
    pub db_acquire_timeout_ms: u64,
}

/// Content analysis service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// No endpoint means every upload goes to the manual queue
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub timeout_ms: u64,
    pub min_confidence: f32,
}

/// Escalation alerts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationConfig {
    pub queue_threshold: i64,
    pub email: Option<AlertEmailConfig>,
    pub alerts_per_minute: u32,
}

/// SMTP delivery for escalation alerts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEmailConfig {
    pub smtp_url: String,
    pub from_address: String,
    pub recipients: Vec<String>,
}

/// User outcome notifications
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub webhook_url: Option<String>,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

/// Record retention
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    pub rejected_days: i64,
    pub purge_interval_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn split_list(value: Option<String>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ModerationResult<Self> {
        dotenv::dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_vars<F>(var: F) -> ModerationResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let hostname = var("MODERATION_HOSTNAME").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = var("MODERATION_PORT")
            .unwrap_or_else(|| "3080".to_string())
            .parse()
            .map_err(|_| ModerationError::Validation("Invalid port number".to_string()))?;
        let version = var("MODERATION_VERSION")
            .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());
        let upload_limit = parse_or(var("MODERATION_UPLOAD_LIMIT"), 10 * 1024 * 1024);

        let data_directory: PathBuf = var("MODERATION_DATA_DIRECTORY")
            .unwrap_or_else(|| "./data".to_string())
            .into();
        let database = var("MODERATION_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_directory.join("moderation.sqlite"));
        let asset_directory = var("MODERATION_ASSET_DIRECTORY")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_directory.join("assets"));
        let public_asset_url = var("MODERATION_PUBLIC_ASSET_URL")
            .unwrap_or_else(|| format!("http://localhost:{}/assets", port));

        let mut thresholds = Thresholds::default();
        for category in ContentCategory::ALL {
            let key = format!("MODERATION_AUTO_REJECT_{}", category.env_key());
            if let Some(value) = var(&key) {
                thresholds
                    .auto_reject
                    .insert(category, Self::parse_threshold(&key, &value)?);
            }
            let key = format!("MODERATION_FLAG_{}", category.env_key());
            if let Some(value) = var(&key) {
                thresholds
                    .flag
                    .insert(category, Self::parse_threshold(&key, &value)?);
            }
        }

        let email = var("MODERATION_ALERT_SMTP_URL").map(|smtp_url| AlertEmailConfig {
            smtp_url,
            from_address: var("MODERATION_ALERT_FROM_ADDRESS")
                .unwrap_or_else(|| format!("moderation-alerts@{}", hostname)),
            recipients: split_list(var("MODERATION_ALERT_RECIPIENTS")),
        });

        let jwt_secret = var("MODERATION_JWT_SECRET")
            .ok_or_else(|| ModerationError::Validation("JWT secret required".to_string()))?;

        let log_level = var("RUST_LOG").unwrap_or_else(|| "info".to_string());
        let json_logs = var("MODERATION_LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                version,
                upload_limit,
            },
            storage: StorageConfig {
                data_directory,
                database,
                asset_directory,
                public_asset_url,
                db_max_connections: parse_or(var("MODERATION_DB_MAX_CONNECTIONS"), 10),
                db_busy_timeout_ms: parse_or(var("MODERATION_DB_BUSY_TIMEOUT_MS"), 5_000),
                db_acquire_timeout_ms: parse_or(var("MODERATION_DB_ACQUIRE_TIMEOUT_MS"), 10_000),
            },
            analysis: AnalysisConfig {
                endpoint: var("MODERATION_ANALYSIS_URL").filter(|s| !s.is_empty()),
                api_key: var("MODERATION_ANALYSIS_API_KEY").filter(|s| !s.is_empty()),
                timeout_ms: parse_or(var("MODERATION_ANALYSIS_TIMEOUT_MS"), 10_000),
                min_confidence: parse_or(var("MODERATION_ANALYSIS_MIN_CONFIDENCE"), 50.0),
            },
            thresholds,
            escalation: EscalationConfig {
                queue_threshold: parse_or(var("MODERATION_QUEUE_ALERT_THRESHOLD"), 50),
                email,
                alerts_per_minute: parse_or(var("MODERATION_ALERTS_PER_MINUTE"), 2),
            },
            notifications: NotificationConfig {
                webhook_url: var("MODERATION_OUTCOME_WEBHOOK_URL").filter(|s| !s.is_empty()),
            },
            authentication: AuthConfig { jwt_secret },
            retention: RetentionConfig {
                rejected_days: parse_or(
                    var("MODERATION_REJECTED_RETENTION_DAYS"),
                    DEFAULT_REJECTED_RETENTION_DAYS,
                ),
                purge_interval_secs: parse_or(var("MODERATION_PURGE_INTERVAL_SECS"), 3600),
            },
            logging: LoggingConfig {
                level: log_level,
                json: json_logs,
            },
        })
    }

    fn parse_threshold(key: &str, value: &str) -> ModerationResult<f32> {
        value
            .trim()
            .parse()
            .map_err(|_| ModerationError::Validation(format!("{} must be a number", key)))
    }

    /// Validate configuration
    pub fn validate(&self) -> ModerationResult<()> {
        if self.service.hostname.is_empty() {
            return Err(ModerationError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.authentication.jwt_secret.len() < 32 {
            return Err(ModerationError::Validation(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        if !(0.0..=100.0).contains(&self.analysis.min_confidence) {
            return Err(ModerationError::Validation(
                "Minimum confidence must be between 0 and 100".to_string(),
            ));
        }

        self.thresholds.validate()?;

        if self.escalation.queue_threshold <= 0 {
            return Err(ModerationError::Validation(
                "Queue alert threshold must be positive".to_string(),
            ));
        }

        if let Some(email) = &self.escalation.email {
            if email.recipients.is_empty() {
                return Err(ModerationError::Validation(
                    "MODERATION_ALERT_RECIPIENTS is required when SMTP alerts are enabled"
                        .to_string(),
                ));
            }
        }

        if self.retention.rejected_days <= 0 {
            return Err(ModerationError::Validation(
                "Rejected retention must be at least one day".to_string(),
            ));
        }

        Ok(())
    }
}
