/// Moderation Record Store
///
/// Every move into a terminal state is one conditional `UPDATE ... RETURNING`
/// guarded on the open states. SQLite applies each statement atomically, so of
/// any number of concurrent attempts exactly one gets a row back; the rest see
/// no row and report the state the winner left behind.
use crate::{
    analysis::CategoryScores,
    db::{format_timestamp, parse_optional_timestamp, parse_timestamp},
    error::{ModerationError, ModerationResult},
    moderation::models::{
        Appeal, AppealDecision, ImageMetadata, ModerationRecord, ModerationStatus,
        NewModerationRecord, PhotoType, Priority, Rejection, RejectionCategory,
    },
    trust::{TrustProfile, UploadCounts},
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, SqlitePool};

/// Default retention for rejected records
pub const DEFAULT_REJECTED_RETENTION_DAYS: i64 = 90;

/// Reviewer id recorded on decisions made by the pipeline itself
pub const SYSTEM_REVIEWER: &str = "system";

/// Result of a conditional write
#[derive(Debug, Clone)]
pub enum TransitionOutcome {
    /// This caller's write won; carries the updated record
    Applied(ModerationRecord),
    /// The guard matched nothing; carries the current stored record
    AlreadyModerated(ModerationRecord),
}

impl TransitionOutcome {
    pub fn record(&self) -> &ModerationRecord {
        match self {
            TransitionOutcome::Applied(r) | TransitionOutcome::AlreadyModerated(r) => r,
        }
    }

    pub fn into_record(self) -> ModerationRecord {
        match self {
            TransitionOutcome::Applied(r) | TransitionOutcome::AlreadyModerated(r) => r,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, TransitionOutcome::Applied(_))
    }
}

/// Queue sort column
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QueueSort {
    #[default]
    UploadedAt,
    ReviewedAt,
    Priority,
}

impl QueueSort {
    fn column(&self) -> &'static str {
        match self {
            QueueSort::UploadedAt => "uploaded_at",
            QueueSort::ReviewedAt => "reviewed_at",
            QueueSort::Priority => "priority_rank",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    fn sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Queue listing filter
#[derive(Debug, Clone)]
pub struct QueueFilter {
    /// `None` lists every status
    pub status: Option<ModerationStatus>,
    pub priority: Option<Priority>,
    pub sort_by: QueueSort,
    pub sort_order: SortOrder,
    pub limit: i64,
    pub skip: i64,
}

impl Default for QueueFilter {
    fn default() -> Self {
        Self {
            status: Some(ModerationStatus::Pending),
            priority: None,
            sort_by: QueueSort::default(),
            sort_order: SortOrder::default(),
            limit: 50,
            skip: 0,
        }
    }
}

/// One page of the queue
#[derive(Debug, Clone)]
pub struct QueuePage {
    pub items: Vec<ModerationRecord>,
    pub total: i64,
}

/// Persistence for moderation records
#[derive(Clone)]
pub struct ModerationStore {
    db: SqlitePool,
    rejected_retention: Duration,
}

impl ModerationStore {
    pub fn new(db: SqlitePool) -> Self {
        Self {
            db,
            rejected_retention: Duration::days(DEFAULT_REJECTED_RETENTION_DAYS),
        }
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.rejected_retention = retention;
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db
    }

    /// Create a record with its initial disposition
    pub async fn insert(&self, new: NewModerationRecord) -> ModerationResult<ModerationRecord> {
        if (new.status == ModerationStatus::Rejected) != new.auto_rejection.is_some() {
            return Err(ModerationError::Validation(
                "Rejection reason and category are required exactly when status is rejected"
                    .to_string(),
            ));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let terminal = !new.status.is_open();
        let reviewed_at = terminal.then_some(now);
        let reviewed_by = terminal.then(|| SYSTEM_REVIEWER.to_string());
        let expires_at = new
            .auto_rejection
            .as_ref()
            .map(|_| now + self.rejected_retention);
        let scores = new
            .category_scores
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| ModerationError::Internal(format!("Failed to encode scores: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO photo_moderation
            (id, user_id, photo_url, storage_id, photo_type,
             width, height, format, file_size,
             status, priority, priority_rank, uploaded_at,
             reviewed_by, reviewed_at, review_notes,
             rejection_reason, rejection_category, category_scores,
             history_total_uploads, history_rejected_uploads, history_approved_uploads,
             history_is_trusted, history_account_age_days, expires_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&new.user_id)
        .bind(&new.image.url)
        .bind(&new.image.storage_id)
        .bind(new.photo_type.as_str())
        .bind(new.image_metadata.width as i64)
        .bind(new.image_metadata.height as i64)
        .bind(&new.image_metadata.format)
        .bind(new.image_metadata.file_size as i64)
        .bind(new.status.as_str())
        .bind(new.priority.as_str())
        .bind(new.priority.rank())
        .bind(format_timestamp(now))
        .bind(&reviewed_by)
        .bind(reviewed_at.map(format_timestamp))
        .bind(&new.review_notes)
        .bind(new.auto_rejection.as_ref().map(|r| r.reason.clone()))
        .bind(new.auto_rejection.as_ref().map(|r| r.category.as_str()))
        .bind(&scores)
        .bind(new.user_history.total_uploads)
        .bind(new.user_history.rejected_uploads)
        .bind(new.user_history.approved_uploads)
        .bind(new.user_history.is_trusted_user)
        .bind(new.user_history.account_age_days)
        .bind(expires_at.map(format_timestamp))
        .execute(&self.db)
        .await?;

        Ok(ModerationRecord {
            id,
            user_id: new.user_id,
            photo_url: new.image.url,
            storage_id: new.image.storage_id,
            photo_type: new.photo_type,
            image_metadata: new.image_metadata,
            status: new.status,
            priority: new.priority,
            uploaded_at: now,
            reviewed_by,
            reviewed_at,
            review_notes: new.review_notes,
            rejection: new.auto_rejection,
            category_scores: new.category_scores,
            user_history: new.user_history,
            appeal: None,
            expires_at,
        })
    }

    /// Fetch one record by id
    pub async fn get(&self, id: &str) -> ModerationResult<Option<ModerationRecord>> {
        let row = sqlx::query("SELECT * FROM photo_moderation WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        row.as_ref().map(parse_record).transpose()
    }

    /// Approve an open record
    pub async fn approve(
        &self,
        id: &str,
        reviewer: &str,
        notes: Option<&str>,
    ) -> ModerationResult<TransitionOutcome> {
        let row = sqlx::query(
            r#"
            UPDATE photo_moderation
            SET status = 'approved',
                reviewed_by = ?,
                reviewed_at = ?,
                review_notes = ?
            WHERE id = ? AND status IN ('pending', 'under-review')
            RETURNING *
            "#,
        )
        .bind(reviewer)
        .bind(format_timestamp(Utc::now()))
        .bind(notes)
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        self.outcome(id, row).await
    }

    /// Reject an open record; starts the retention clock
    pub async fn reject(
        &self,
        id: &str,
        reviewer: &str,
        rejection: &Rejection,
        notes: Option<&str>,
    ) -> ModerationResult<TransitionOutcome> {
        if rejection.reason.trim().is_empty() {
            return Err(ModerationError::Validation(
                "reason: rejection reason is required".to_string(),
            ));
        }

        let now = Utc::now();
        let row = sqlx::query(
            r#"
            UPDATE photo_moderation
            SET status = 'rejected',
                reviewed_by = ?,
                reviewed_at = ?,
                review_notes = ?,
                rejection_reason = ?,
                rejection_category = ?,
                expires_at = ?
            WHERE id = ? AND status IN ('pending', 'under-review')
            RETURNING *
            "#,
        )
        .bind(reviewer)
        .bind(format_timestamp(now))
        .bind(notes)
        .bind(&rejection.reason)
        .bind(rejection.category.as_str())
        .bind(format_timestamp(now + self.rejected_retention))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        self.outcome(id, row).await
    }

    /// Send an open record to review, optionally re-prioritized.
    ///
    /// Terminal records are left untouched.
    pub async fn flag(
        &self,
        id: &str,
        notes: Option<&str>,
        new_priority: Option<Priority>,
    ) -> ModerationResult<TransitionOutcome> {
        let row = sqlx::query(
            r#"
            UPDATE photo_moderation
            SET status = 'under-review',
                priority = COALESCE(?, priority),
                priority_rank = COALESCE(?, priority_rank),
                review_notes = COALESCE(?, review_notes)
            WHERE id = ? AND status IN ('pending', 'under-review')
            RETURNING *
            "#,
        )
        .bind(new_priority.map(|p| p.as_str()))
        .bind(new_priority.map(|p| p.rank()))
        .bind(notes)
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        self.outcome(id, row).await
    }

    /// Record where an approved asset now lives
    pub async fn update_location(
        &self,
        id: &str,
        photo_url: &str,
        storage_id: &str,
    ) -> ModerationResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE photo_moderation
            SET photo_url = ?, storage_id = ?
            WHERE id = ? AND status = 'approved'
            "#,
        )
        .bind(photo_url)
        .bind(storage_id)
        .bind(id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Attach an appeal to the owner's rejected record. One appeal per record.
    pub async fn submit_appeal(
        &self,
        id: &str,
        user_id: &str,
        reason: &str,
    ) -> ModerationResult<ModerationRecord> {
        let row = sqlx::query(
            r#"
            UPDATE photo_moderation
            SET appeal_submitted_at = ?,
                appeal_reason = ?,
                appeal_decision = 'pending'
            WHERE id = ? AND user_id = ? AND status = 'rejected' AND appeal_decision IS NULL
            RETURNING *
            "#,
        )
        .bind(format_timestamp(Utc::now()))
        .bind(reason)
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        if let Some(row) = row {
            return parse_record(&row);
        }

        let current = self.require(id).await?;
        if current.user_id != user_id {
            return Err(ModerationError::Authorization(
                "Only the uploader may appeal this decision".to_string(),
            ));
        }
        let message = if current.status != ModerationStatus::Rejected {
            "Only rejected photos can be appealed"
        } else {
            "An appeal was already submitted for this photo"
        };
        Err(ModerationError::Conflict {
            message: message.to_string(),
            current_status: Some(current.status),
        })
    }

    /// Resolve a pending appeal. Overturning is the only way out of `rejected`.
    pub async fn resolve_appeal(
        &self,
        id: &str,
        reviewer: &str,
        decision: AppealDecision,
        notes: Option<&str>,
    ) -> ModerationResult<TransitionOutcome> {
        let now = format_timestamp(Utc::now());

        let row = match decision {
            AppealDecision::Pending => {
                return Err(ModerationError::Validation(
                    "decision: must be upheld or overturned".to_string(),
                ));
            }
            AppealDecision::Upheld => {
                sqlx::query(
                    r#"
                    UPDATE photo_moderation
                    SET appeal_decision = 'upheld',
                        appeal_reviewed_by = ?,
                        appeal_reviewed_at = ?,
                        appeal_notes = ?
                    WHERE id = ? AND appeal_decision = 'pending'
                    RETURNING *
                    "#,
                )
                .bind(reviewer)
                .bind(&now)
                .bind(notes)
                .bind(id)
                .fetch_optional(&self.db)
                .await?
            }
            AppealDecision::Overturned => {
                sqlx::query(
                    r#"
                    UPDATE photo_moderation
                    SET appeal_decision = 'overturned',
                        appeal_reviewed_by = ?,
                        appeal_reviewed_at = ?,
                        appeal_notes = ?,
                        status = 'approved',
                        reviewed_by = ?,
                        reviewed_at = ?,
                        rejection_reason = NULL,
                        rejection_category = NULL,
                        expires_at = NULL
                    WHERE id = ? AND appeal_decision = 'pending' AND status = 'rejected'
                    RETURNING *
                    "#,
                )
                .bind(reviewer)
                .bind(&now)
                .bind(notes)
                .bind(reviewer)
                .bind(&now)
                .bind(id)
                .fetch_optional(&self.db)
                .await?
            }
        };

        self.outcome(id, row).await
    }

    /// Queue listing, most urgent first
    pub async fn list_queue(&self, filter: &QueueFilter) -> ModerationResult<QueuePage> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM photo_moderation");
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.db).await?;

        let mut select = QueryBuilder::<Sqlite>::new("SELECT * FROM photo_moderation");
        push_filters(&mut select, filter);
        select
            .push(" ORDER BY priority_rank DESC, ")
            .push(filter.sort_by.column())
            .push(" ")
            .push(filter.sort_order.sql())
            .push(", id ASC LIMIT ")
            .push_bind(filter.limit.max(0))
            .push(" OFFSET ")
            .push_bind(filter.skip.max(0));

        let rows = select.build().fetch_all(&self.db).await?;
        let items = rows.iter().map(parse_record).collect::<ModerationResult<Vec<_>>>()?;

        Ok(QueuePage { items, total })
    }

    /// Per-status totals for one uploader
    pub async fn upload_counts(&self, user_id: &str) -> ModerationResult<UploadCounts> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total,
                   COALESCE(SUM(CASE WHEN status = 'approved' THEN 1 ELSE 0 END), 0) AS approved,
                   COALESCE(SUM(CASE WHEN status = 'rejected' THEN 1 ELSE 0 END), 0) AS rejected
            FROM photo_moderation
            WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        Ok(UploadCounts {
            total: row.try_get("total")?,
            approved: row.try_get("approved")?,
            rejected: row.try_get("rejected")?,
        })
    }

    /// Records still awaiting a decision (`pending` + `under-review`)
    pub async fn count_open(&self) -> ModerationResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM photo_moderation WHERE status IN ('pending', 'under-review')",
        )
        .fetch_one(&self.db)
        .await?;

        Ok(count)
    }

    /// Delete rejected records past their retention; pending appeals hold expiry
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> ModerationResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM photo_moderation
            WHERE expires_at IS NOT NULL
              AND expires_at < ?
              AND (appeal_decision IS NULL OR appeal_decision <> 'pending')
            "#,
        )
        .bind(format_timestamp(now))
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }

    async fn require(&self, id: &str) -> ModerationResult<ModerationRecord> {
        self.get(id)
            .await?
            .ok_or_else(|| ModerationError::NotFound(format!("Moderation record {} not found", id)))
    }

    /// Turn a conditional write's result into an outcome
    async fn outcome(
        &self,
        id: &str,
        row: Option<SqliteRow>,
    ) -> ModerationResult<TransitionOutcome> {
        match row {
            Some(row) => Ok(TransitionOutcome::Applied(parse_record(&row)?)),
            None => Ok(TransitionOutcome::AlreadyModerated(self.require(id).await?)),
        }
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &QueueFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(priority) = filter.priority {
        qb.push(" AND priority = ").push_bind(priority.as_str());
    }
}

/// Parse a `photo_moderation` row
fn parse_record(row: &SqliteRow) -> ModerationResult<ModerationRecord> {
    let status = ModerationStatus::from_str(&row.try_get::<String, _>("status")?)?;
    let priority = Priority::from_str(&row.try_get::<String, _>("priority")?)?;
    let photo_type = PhotoType::from_str(&row.try_get::<String, _>("photo_type")?)?;

    let rejection = match (
        row.try_get::<Option<String>, _>("rejection_reason")?,
        row.try_get::<Option<String>, _>("rejection_category")?,
    ) {
        (Some(reason), Some(category)) => Some(Rejection {
            reason,
            category: RejectionCategory::from_str(&category)?,
        }),
        _ => None,
    };

    let category_scores = row
        .try_get::<Option<String>, _>("category_scores")?
        .map(|json| serde_json::from_str::<CategoryScores>(&json))
        .transpose()
        .map_err(|e| ModerationError::Internal(format!("Invalid category scores: {}", e)))?;

    let appeal = match row.try_get::<Option<String>, _>("appeal_decision")? {
        Some(decision) => Some(Appeal {
            submitted_at: parse_timestamp(&row.try_get::<String, _>("appeal_submitted_at")?)?,
            reason: row.try_get("appeal_reason")?,
            reviewed_by: row.try_get("appeal_reviewed_by")?,
            reviewed_at: parse_optional_timestamp(row.try_get("appeal_reviewed_at")?)?,
            decision: AppealDecision::from_str(&decision)?,
            notes: row.try_get("appeal_notes")?,
        }),
        None => None,
    };

    Ok(ModerationRecord {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        photo_url: row.try_get("photo_url")?,
        storage_id: row.try_get("storage_id")?,
        photo_type,
        image_metadata: ImageMetadata {
            width: row.try_get::<i64, _>("width")? as u32,
            height: row.try_get::<i64, _>("height")? as u32,
            format: row.try_get("format")?,
            file_size: row.try_get::<i64, _>("file_size")? as u64,
        },
        status,
        priority,
        uploaded_at: parse_timestamp(&row.try_get::<String, _>("uploaded_at")?)?,
        reviewed_by: row.try_get("reviewed_by")?,
        reviewed_at: parse_optional_timestamp(row.try_get("reviewed_at")?)?,
        review_notes: row.try_get("review_notes")?,
        rejection,
        category_scores,
        user_history: TrustProfile {
            total_uploads: row.try_get("history_total_uploads")?,
            rejected_uploads: row.try_get("history_rejected_uploads")?,
            approved_uploads: row.try_get("history_approved_uploads")?,
            is_trusted_user: row.try_get("history_is_trusted")?,
            account_age_days: row.try_get("history_account_age_days")?,
        },
        appeal,
        expires_at: parse_optional_timestamp(row.try_get("expires_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::memory_pool, moderation::models::ImageRef};

    fn new_record(user_id: &str, status: ModerationStatus, priority: Priority) -> NewModerationRecord {
        NewModerationRecord {
            user_id: user_id.to_string(),
            image: ImageRef {
                url: "https://cdn.example.com/moderation-queue/a.jpg".to_string(),
                storage_id: "moderation-queue/a.jpg".to_string(),
            },
            photo_type: PhotoType::Profile,
            image_metadata: ImageMetadata {
                width: 640,
                height: 480,
                format: "jpeg".to_string(),
                file_size: 1024,
            },
            status,
            priority,
            review_notes: None,
            auto_rejection: None,
            category_scores: Some(CategoryScores::default()),
            user_history: TrustProfile::default(),
        }
    }

    fn spam() -> Rejection {
        Rejection {
            reason: "Advertising".to_string(),
            category: RejectionCategory::Spam,
        }
    }

    async fn store() -> ModerationStore {
        ModerationStore::new(memory_pool().await.unwrap())
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = store().await;
        let created = store
            .insert(new_record("user-1", ModerationStatus::Pending, Priority::Normal))
            .await
            .unwrap();

        let fetched = store.get(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.user_id, "user-1");
        assert_eq!(fetched.status, ModerationStatus::Pending);
        assert_eq!(fetched.image_metadata.width, 640);
        assert_eq!(fetched.category_scores, Some(CategoryScores::default()));
        assert!(fetched.reviewed_by.is_none());

        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_rejects_inconsistent_rejection() {
        let store = store().await;
        let err = store
            .insert(new_record("u", ModerationStatus::Rejected, Priority::Low))
            .await
            .unwrap_err();
        assert!(matches!(err, ModerationError::Validation(_)));
    }

    #[tokio::test]
    async fn test_auto_rejected_insert_sets_expiry() {
        let store = store().await;
        let mut new = new_record("u", ModerationStatus::Rejected, Priority::Low);
        new.auto_rejection = Some(spam());

        let record = store.insert(new).await.unwrap();
        assert_eq!(record.reviewed_by.as_deref(), Some(SYSTEM_REVIEWER));
        let days = (record.expires_at.unwrap() - record.uploaded_at).num_days();
        assert_eq!(days, DEFAULT_REJECTED_RETENTION_DAYS);
    }

    #[tokio::test]
    async fn test_approve_then_reject_is_already_moderated() {
        let store = store().await;
        let record = store
            .insert(new_record("u", ModerationStatus::Pending, Priority::Normal))
            .await
            .unwrap();

        let first = store.approve(&record.id, "mod-a", Some("ok")).await.unwrap();
        assert!(first.is_applied());
        assert_eq!(first.record().status, ModerationStatus::Approved);
        assert_eq!(first.record().reviewed_by.as_deref(), Some("mod-a"));

        let second = store.reject(&record.id, "mod-b", &spam(), None).await.unwrap();
        match second {
            TransitionOutcome::AlreadyModerated(current) => {
                assert_eq!(current.status, ModerationStatus::Approved);
                assert_eq!(current.reviewed_by.as_deref(), Some("mod-a"));
                assert!(current.rejection.is_none());
            }
            TransitionOutcome::Applied(_) => panic!("second decision must not apply"),
        }
    }

    #[tokio::test]
    async fn test_missing_record_is_not_found() {
        let store = store().await;
        let err = store.approve("nope", "mod", None).await.unwrap_err();
        assert!(matches!(err, ModerationError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_reject_sets_fields_and_expiry() {
        let store = store().await;
        let record = store
            .insert(new_record("u", ModerationStatus::UnderReview, Priority::High))
            .await
            .unwrap();

        let outcome = store
            .reject(&record.id, "mod", &spam(), Some("Rejected as spam"))
            .await
            .unwrap();
        let rejected = outcome.into_record();
        assert_eq!(rejected.status, ModerationStatus::Rejected);
        assert_eq!(rejected.rejection, Some(spam()));

        let days = (rejected.expires_at.unwrap() - rejected.reviewed_at.unwrap()).num_days();
        assert!((89..=91).contains(&days));
    }

    #[tokio::test]
    async fn test_flag_never_touches_terminal_records() {
        let store = store().await;
        let record = store
            .insert(new_record("u", ModerationStatus::Pending, Priority::Normal))
            .await
            .unwrap();

        let flagged = store
            .flag(&record.id, Some("looks off"), Some(Priority::Urgent))
            .await
            .unwrap();
        assert!(flagged.is_applied());
        assert_eq!(flagged.record().status, ModerationStatus::UnderReview);
        assert_eq!(flagged.record().priority, Priority::Urgent);

        store.approve(&record.id, "mod", None).await.unwrap();

        let again = store.flag(&record.id, None, Some(Priority::Low)).await.unwrap();
        assert!(!again.is_applied());
        assert_eq!(again.record().status, ModerationStatus::Approved);
        assert_eq!(again.record().priority, Priority::Urgent);
    }

    #[tokio::test]
    async fn test_appeal_lifecycle() {
        let store = store().await;
        let record = store
            .insert(new_record("owner", ModerationStatus::Pending, Priority::Normal))
            .await
            .unwrap();

        // Open records cannot be appealed
        let err = store.submit_appeal(&record.id, "owner", "why").await.unwrap_err();
        assert!(matches!(err, ModerationError::Conflict { .. }));

        store.reject(&record.id, "mod", &spam(), None).await.unwrap();

        let err = store.submit_appeal(&record.id, "someone-else", "mine").await.unwrap_err();
        assert!(matches!(err, ModerationError::Authorization(_)));

        let appealed = store
            .submit_appeal(&record.id, "owner", "It is my cat")
            .await
            .unwrap();
        assert_eq!(appealed.status, ModerationStatus::Rejected);
        assert_eq!(appealed.appeal.as_ref().unwrap().decision, AppealDecision::Pending);

        let err = store.submit_appeal(&record.id, "owner", "again").await.unwrap_err();
        assert!(matches!(err, ModerationError::Conflict { .. }));

        let resolved = store
            .resolve_appeal(&record.id, "senior", AppealDecision::Overturned, Some("fine"))
            .await
            .unwrap();
        assert!(resolved.is_applied());
        let record = resolved.into_record();
        assert_eq!(record.status, ModerationStatus::Approved);
        assert!(record.rejection.is_none());
        assert!(record.expires_at.is_none());
        assert_eq!(record.appeal.unwrap().decision, AppealDecision::Overturned);

        let twice = store
            .resolve_appeal(&record.id, "other", AppealDecision::Upheld, None)
            .await
            .unwrap();
        assert!(!twice.is_applied());
    }

    #[tokio::test]
    async fn test_upheld_appeal_keeps_rejection() {
        let store = store().await;
        let record = store
            .insert(new_record("owner", ModerationStatus::Pending, Priority::Normal))
            .await
            .unwrap();
        store.reject(&record.id, "mod", &spam(), None).await.unwrap();
        store.submit_appeal(&record.id, "owner", "please").await.unwrap();

        let upheld = store
            .resolve_appeal(&record.id, "senior", AppealDecision::Upheld, None)
            .await
            .unwrap()
            .into_record();
        assert_eq!(upheld.status, ModerationStatus::Rejected);
        assert_eq!(upheld.rejection, Some(spam()));
        assert_eq!(upheld.appeal.unwrap().reviewed_by.as_deref(), Some("senior"));
    }

    #[tokio::test]
    async fn test_queue_filter_and_ordering() {
        let store = store().await;
        let low = store
            .insert(new_record("a", ModerationStatus::Pending, Priority::Low))
            .await
            .unwrap();
        let urgent = store
            .insert(new_record("b", ModerationStatus::Pending, Priority::Urgent))
            .await
            .unwrap();
        let done = store
            .insert(new_record("c", ModerationStatus::Pending, Priority::High))
            .await
            .unwrap();
        store.approve(&done.id, "mod", None).await.unwrap();

        let page = store.list_queue(&QueueFilter::default()).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].id, urgent.id);
        assert_eq!(page.items[1].id, low.id);

        let all = store
            .list_queue(&QueueFilter {
                status: None,
                limit: 1,
                ..QueueFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(all.total, 3);
        assert_eq!(all.items.len(), 1);
    }

    #[tokio::test]
    async fn test_counts_and_purge() {
        let store = store().await;
        let a = store
            .insert(new_record("u", ModerationStatus::Pending, Priority::Normal))
            .await
            .unwrap();
        let b = store
            .insert(new_record("u", ModerationStatus::Pending, Priority::Normal))
            .await
            .unwrap();
        let c = store
            .insert(new_record("u", ModerationStatus::UnderReview, Priority::Normal))
            .await
            .unwrap();
        store.approve(&a.id, "mod", None).await.unwrap();
        store.reject(&b.id, "mod", &spam(), None).await.unwrap();

        let counts = store.upload_counts("u").await.unwrap();
        assert_eq!(counts, UploadCounts { total: 3, approved: 1, rejected: 1 });

        // Folding the records themselves agrees with the SQL aggregate
        let mut records = Vec::new();
        for id in [&a.id, &b.id, &c.id] {
            records.push(store.get(id).await.unwrap().unwrap());
        }
        assert_eq!(UploadCounts::from_records(&records), counts);
        let created = Utc::now() - Duration::days(400);
        let now = Utc::now();
        let profile = TrustProfile::from_records(&records, created, true, now);
        assert_eq!(profile, TrustProfile::from_counts(counts, created, true, now));
        assert!(!profile.is_trusted_user);
        assert_eq!(store.count_open().await.unwrap(), 1);

        assert_eq!(store.purge_expired(Utc::now()).await.unwrap(), 0);
        let later = Utc::now() + Duration::days(DEFAULT_REJECTED_RETENTION_DAYS + 1);
        assert_eq!(store.purge_expired(later).await.unwrap(), 1);
        assert!(store.get(&b.id).await.unwrap().is_none());
    }
}
