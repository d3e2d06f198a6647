/// Upload ingestion
///
/// Turns an uploaded image into a moderation record: analyze, decide, pick a
/// priority, persist, then run the post-decision side effects and escalation
/// checks. Analysis problems never fail an upload; they route it to review.
use crate::{
    accounts::AccountDirectory,
    analysis::{AnalysisUnavailable, CategoryScores, ContentAnalyzer, DecisionEngine},
    error::ModerationResult,
    escalation::EscalationNotifier,
    metrics,
    moderation::{
        ImageMetadata, ImageRef, ModerationRecord, ModerationService, ModerationStatus,
        NewModerationRecord, PhotoType, Priority,
    },
    notify::OutcomeEvent,
    priority::{HistoryPriority, ScorePriority},
    trust::TrustProfile,
};
use chrono::Utc;
use std::{io::Cursor, sync::Arc, time::Duration, time::Instant};
use tracing::{debug, info, warn};

/// An upload handed over by the ingestion boundary
#[derive(Debug, Clone)]
pub struct Upload {
    pub user_id: String,
    pub photo_type: PhotoType,
    /// Where the raw bytes were quarantined
    pub image: ImageRef,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct IngestionPipeline {
    service: ModerationService,
    accounts: Arc<dyn AccountDirectory>,
    analyzer: Option<Arc<dyn ContentAnalyzer>>,
    engine: DecisionEngine,
    escalation: EscalationNotifier,
    analysis_timeout: Duration,
}

impl IngestionPipeline {
    pub fn new(
        service: ModerationService,
        accounts: Arc<dyn AccountDirectory>,
        analyzer: Option<Arc<dyn ContentAnalyzer>>,
        engine: DecisionEngine,
        escalation: EscalationNotifier,
        analysis_timeout: Duration,
    ) -> Self {
        Self {
            service,
            accounts,
            analyzer,
            engine,
            escalation,
            analysis_timeout,
        }
    }

    /// Create the moderation record for one upload
    pub async fn ingest(&self, upload: Upload) -> ModerationResult<ModerationRecord> {
        let image_metadata = extract_metadata(&upload.bytes);
        let trust = self.trust_profile(&upload.user_id).await?;

        let new = match &self.analyzer {
            Some(analyzer) => {
                let analysis = self.analyze(analyzer.as_ref(), &upload.bytes).await;
                let disposition = self.engine.route(&analysis, &trust);
                let priority = match (disposition.forced_priority, &analysis) {
                    (Some(forced), _) => forced,
                    (None, Ok(scores)) => ScorePriority.calculate(scores, &trust),
                    (None, Err(_)) => HistoryPriority.calculate(&trust),
                };

                metrics::record_decision(
                    disposition
                        .action
                        .map(|a| a.as_str())
                        .unwrap_or("fail-safe"),
                );

                NewModerationRecord {
                    user_id: upload.user_id.clone(),
                    image: upload.image.clone(),
                    photo_type: upload.photo_type,
                    image_metadata,
                    status: disposition.status,
                    priority,
                    review_notes: disposition.review_notes,
                    auto_rejection: disposition.rejection,
                    category_scores: analysis.ok(),
                    user_history: trust,
                }
            }
            None => {
                // No analyzer configured: everything waits for a human
                metrics::record_decision("manual");
                NewModerationRecord {
                    user_id: upload.user_id.clone(),
                    image: upload.image.clone(),
                    photo_type: upload.photo_type,
                    image_metadata,
                    status: ModerationStatus::Pending,
                    priority: HistoryPriority.calculate(&trust),
                    review_notes: None,
                    auto_rejection: None,
                    category_scores: None,
                    user_history: trust,
                }
            }
        };

        let record = self.service.store().insert(new).await?;
        info!(
            moderation_id = %record.id,
            user_id = %record.user_id,
            status = %record.status,
            priority = %record.priority,
            "Moderation record created"
        );

        let record = self.after_decision(record).await;
        self.escalate(&record).await;
        Ok(record)
    }

    /// Trust snapshot for the uploader; unknown accounts are new and unverified
    pub async fn trust_profile(&self, user_id: &str) -> ModerationResult<TrustProfile> {
        let now = Utc::now();
        let counts = self.service.store().upload_counts(user_id).await?;
        let account = self.accounts.lookup(user_id).await?;
        let (created_at, verified) = match account {
            Some(info) => (info.created_at, info.identity_verified),
            None => (now, false),
        };

        Ok(TrustProfile::from_counts(counts, created_at, verified, now))
    }

    async fn analyze(
        &self,
        analyzer: &dyn ContentAnalyzer,
        bytes: &[u8],
    ) -> Result<CategoryScores, AnalysisUnavailable> {
        let started = Instant::now();
        let result = match tokio::time::timeout(self.analysis_timeout, analyzer.analyze(bytes)).await
        {
            Ok(result) => result,
            Err(_) => Err(AnalysisUnavailable(format!(
                "timed out after {}ms",
                self.analysis_timeout.as_millis()
            ))),
        };

        metrics::record_analysis(started.elapsed().as_secs_f64(), result.is_ok());
        if let Err(e) = &result {
            warn!(error = %e, "Content analysis unavailable, routing to manual review");
        }
        result
    }

    /// Asset and notification work for records created already decided
    async fn after_decision(&self, record: ModerationRecord) -> ModerationRecord {
        match record.status {
            ModerationStatus::Approved => {
                let record = self.service.release_asset(record).await;
                self.service.publish(OutcomeEvent::approved(&record));
                record
            }
            ModerationStatus::Rejected => {
                self.service.discard_asset(&record).await;
                if let Some(rejection) = &record.rejection {
                    self.service.publish(OutcomeEvent::rejected(
                        &record,
                        &rejection.reason,
                        rejection.category,
                    ));
                }
                record
            }
            ModerationStatus::Pending | ModerationStatus::UnderReview => record,
        }
    }

    async fn escalate(&self, record: &ModerationRecord) {
        if record.priority == Priority::Urgent && record.status.is_open() {
            self.escalation.notify_urgent(record);
        }

        match self.service.store().count_open().await {
            Ok(depth) => {
                metrics::set_queue_depth(depth);
                self.escalation.check_queue_depth(depth);
            }
            Err(e) => warn!(error = %e, "Failed to count open queue for escalation"),
        }
    }
}

/// Width, height and format read from the image header. Unreadable bytes
/// yield zero dimensions and an "unknown" format; metadata is informational.
pub fn extract_metadata(bytes: &[u8]) -> ImageMetadata {
    let file_size = bytes.len() as u64;

    let format = match image::guess_format(bytes) {
        Ok(format) => format,
        Err(e) => {
            debug!(error = %e, "Could not detect image format");
            return ImageMetadata {
                width: 0,
                height: 0,
                format: "unknown".to_string(),
                file_size,
            };
        }
    };

    let (width, height) = image::ImageReader::with_format(Cursor::new(bytes), format)
        .into_dimensions()
        .unwrap_or_else(|e| {
            debug!(error = %e, "Could not read image dimensions");
            (0, 0)
        });

    ImageMetadata {
        width,
        height,
        format: format
            .extensions_str()
            .first()
            .copied()
            .unwrap_or("unknown")
            .to_string(),
        file_size,
    }
}
