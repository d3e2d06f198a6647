/// Queue & Stats Service
///
/// Read-only aggregation over `photo_moderation`. Empty tables yield zeroes.
use crate::{
    db::format_timestamp,
    error::ModerationResult,
    moderation::models::{ModerationStatus, Priority},
};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;

pub const DEFAULT_STATS_WINDOW_DAYS: i64 = 30;

/// Queue composition
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueBreakdown {
    /// Every status, including zero counts
    pub by_status: BTreeMap<String, i64>,
    /// Open records only
    pub by_priority: BTreeMap<String, i64>,
    pub total: i64,
}

/// One reviewer's throughput over the window
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeratorStats {
    pub moderator: String,
    pub approved: i64,
    pub rejected: i64,
    pub total: i64,
    /// Mean of reviewedAt - uploadedAt
    pub avg_review_time_ms: f64,
}

/// Full stats payload
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationStats {
    pub queue: QueueBreakdown,
    pub moderator: ModeratorStats,
    pub moderators: Vec<ModeratorStats>,
    pub window_days: i64,
    pub avg_review_time_ms: f64,
    pub avg_review_time_hours: f64,
}

/// Stats queries
#[derive(Clone)]
pub struct StatsService {
    db: SqlitePool,
}

impl StatsService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Counts by status and by open-record priority
    pub async fn queue_breakdown(&self) -> ModerationResult<QueueBreakdown> {
        let mut breakdown = QueueBreakdown {
            by_status: ModerationStatus::ALL
                .iter()
                .map(|s| (s.as_str().to_string(), 0))
                .collect(),
            by_priority: Priority::ALL
                .iter()
                .map(|p| (p.as_str().to_string(), 0))
                .collect(),
            total: 0,
        };

        let rows = sqlx::query(
            "SELECT status, COUNT(*) AS count FROM photo_moderation GROUP BY status",
        )
        .fetch_all(&self.db)
        .await?;
        for row in rows {
            let count: i64 = row.try_get("count")?;
            breakdown.by_status.insert(row.try_get("status")?, count);
            breakdown.total += count;
        }

        let rows = sqlx::query(
            r#"
            SELECT priority, COUNT(*) AS count
            FROM photo_moderation
            WHERE status IN ('pending', 'under-review')
            GROUP BY priority
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        for row in rows {
            breakdown
                .by_priority
                .insert(row.try_get("priority")?, row.try_get("count")?);
        }

        Ok(breakdown)
    }

    /// Per-reviewer decisions since `since`, busiest first
    pub async fn moderator_stats(
        &self,
        since: DateTime<Utc>,
    ) -> ModerationResult<Vec<ModeratorStats>> {
        // julianday() difference is in days; scale to milliseconds
        let rows = sqlx::query(
            r#"
            SELECT reviewed_by,
                   SUM(CASE WHEN status = 'approved' THEN 1 ELSE 0 END) AS approved,
                   SUM(CASE WHEN status = 'rejected' THEN 1 ELSE 0 END) AS rejected,
                   COUNT(*) AS total,
                   AVG((julianday(reviewed_at) - julianday(uploaded_at)) * 86400000.0) AS avg_ms
            FROM photo_moderation
            WHERE reviewed_by IS NOT NULL
              AND reviewed_at IS NOT NULL
              AND reviewed_at >= ?
              AND status IN ('approved', 'rejected')
            GROUP BY reviewed_by
            ORDER BY total DESC, reviewed_by ASC
            "#,
        )
        .bind(format_timestamp(since))
        .fetch_all(&self.db)
        .await?;

        rows.iter()
            .map(|row| -> ModerationResult<ModeratorStats> {
                Ok(ModeratorStats {
                    moderator: row.try_get("reviewed_by")?,
                    approved: row.try_get("approved")?,
                    rejected: row.try_get("rejected")?,
                    total: row.try_get("total")?,
                    avg_review_time_ms: row
                        .try_get::<Option<f64>, _>("avg_ms")?
                        .unwrap_or(0.0)
                        .max(0.0),
                })
            })
            .collect()
    }

    /// Mean review latency across all decided records
    pub async fn average_review_time_ms(&self) -> ModerationResult<f64> {
        let avg: Option<f64> = sqlx::query_scalar(
            r#"
            SELECT AVG((julianday(reviewed_at) - julianday(uploaded_at)) * 86400000.0)
            FROM photo_moderation
            WHERE status IN ('approved', 'rejected') AND reviewed_at IS NOT NULL
            "#,
        )
        .fetch_one(&self.db)
        .await?;

        Ok(avg.unwrap_or(0.0).max(0.0))
    }

    /// Queue breakdown plus reviewer stats over the trailing window
    pub async fn summary(&self, reviewer: &str, window_days: i64) -> ModerationResult<ModerationStats> {
        let window_days = window_days.max(1);
        let since = Utc::now() - Duration::days(window_days);

        let queue = self.queue_breakdown().await?;
        let moderators = self.moderator_stats(since).await?;
        let moderator = moderators
            .iter()
            .find(|m| m.moderator == reviewer)
            .cloned()
            .unwrap_or_else(|| ModeratorStats {
                moderator: reviewer.to_string(),
                ..ModeratorStats::default()
            });
        let avg_review_time_ms = self.average_review_time_ms().await?;
        let avg_review_time_hours = (avg_review_time_ms / 3_600_000.0 * 100.0).round() / 100.0;

        Ok(ModerationStats {
            queue,
            moderator,
            moderators,
            window_days,
            avg_review_time_ms,
            avg_review_time_hours,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::CategoryScores,
        db::memory_pool,
        moderation::{
            models::{ImageMetadata, ImageRef, NewModerationRecord, PhotoType},
            store::ModerationStore,
        },
        trust::TrustProfile,
    };

    fn pending(priority: Priority) -> NewModerationRecord {
        NewModerationRecord {
            user_id: "u".to_string(),
            image: ImageRef {
                url: "https://cdn.example.com/temp/x.png".to_string(),
                storage_id: "temp/x.png".to_string(),
            },
            photo_type: PhotoType::Gallery,
            image_metadata: ImageMetadata::default(),
            status: ModerationStatus::Pending,
            priority,
            review_notes: None,
            auto_rejection: None,
            category_scores: Some(CategoryScores::default()),
            user_history: TrustProfile::default(),
        }
    }

    #[tokio::test]
    async fn test_empty_tables_yield_zeroes() {
        let stats = StatsService::new(memory_pool().await.unwrap());

        let summary = stats.summary("mod-a", DEFAULT_STATS_WINDOW_DAYS).await.unwrap();
        assert_eq!(summary.queue.total, 0);
        assert_eq!(summary.queue.by_status["pending"], 0);
        assert_eq!(summary.queue.by_priority["urgent"], 0);
        assert!(summary.moderators.is_empty());
        assert_eq!(summary.moderator.total, 0);
        assert_eq!(summary.avg_review_time_ms, 0.0);
    }

    #[tokio::test]
    async fn test_breakdown_and_moderator_throughput() {
        let pool = memory_pool().await.unwrap();
        let store = ModerationStore::new(pool.clone());
        let stats = StatsService::new(pool);

        let a = store.insert(pending(Priority::High)).await.unwrap();
        let b = store.insert(pending(Priority::Low)).await.unwrap();
        store.insert(pending(Priority::Urgent)).await.unwrap();
        store.approve(&a.id, "mod-a", None).await.unwrap();
        store.approve(&b.id, "mod-a", None).await.unwrap();

        let summary = stats.summary("mod-a", 30).await.unwrap();
        assert_eq!(summary.queue.total, 3);
        assert_eq!(summary.queue.by_status["approved"], 2);
        assert_eq!(summary.queue.by_status["pending"], 1);
        // Priority counts cover open records only
        assert_eq!(summary.queue.by_priority["urgent"], 1);
        assert_eq!(summary.queue.by_priority["high"], 0);

        assert_eq!(summary.moderator.approved, 2);
        assert_eq!(summary.moderator.rejected, 0);
        assert!(summary.moderator.avg_review_time_ms >= 0.0);
        assert_eq!(summary.moderators.len(), 1);
    }
}
