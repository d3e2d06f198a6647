/// Moderator queue API
///
/// Every route requires a reviewer token. Request bodies are validated before
/// anything touches the store.
use crate::{
    api::Pagination,
    auth::ReviewerContext,
    context::AppContext,
    error::{ModerationError, ModerationResult},
    moderation::{
        models::{AppealDecision, ModerationRecord, ModerationStatus, Priority, Rejection, RejectionCategory},
        service::BatchApproveResult,
        stats::{ModerationStats, DEFAULT_STATS_WINDOW_DAYS},
        store::{QueueFilter, QueueSort, SortOrder},
    },
};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub const DEFAULT_QUEUE_LIMIT: i64 = 50;
pub const MAX_QUEUE_LIMIT: i64 = 200;

/// Build moderation routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/moderation/queue", get(get_queue))
        .route("/api/moderation/stats", get(get_stats))
        .route("/api/moderation/batch-approve", post(batch_approve))
        .route("/api/moderation/:id", get(get_record))
        .route("/api/moderation/:id/approve", post(approve))
        .route("/api/moderation/:id/reject", post(reject))
        .route("/api/moderation/:id/flag", post(flag))
        .route("/api/moderation/:id/appeal/resolve", post(resolve_appeal))
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QueueQuery {
    /// A status name, or `all`
    pub status: Option<String>,
    pub priority: Option<String>,
    pub sort_by: Option<QueueSort>,
    pub sort_order: Option<SortOrder>,
    #[validate(range(min = 1, max = 200, message = "must be between 1 and 200"))]
    pub limit: Option<i64>,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub skip: Option<i64>,
}

impl QueueQuery {
    pub fn into_filter(self) -> ModerationResult<QueueFilter> {
        self.validate()?;

        let status = match self.status.as_deref() {
            None => Some(ModerationStatus::Pending),
            Some(s) if s.eq_ignore_ascii_case("all") => None,
            Some(s) => Some(ModerationStatus::from_str(s)?),
        };
        let priority = self.priority.as_deref().map(Priority::from_str).transpose()?;

        Ok(QueueFilter {
            status,
            priority,
            sort_by: self.sort_by.unwrap_or_default(),
            sort_order: self.sort_order.unwrap_or_default(),
            limit: self.limit.unwrap_or(DEFAULT_QUEUE_LIMIT).min(MAX_QUEUE_LIMIT),
            skip: self.skip.unwrap_or(0),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueResponse {
    pub items: Vec<ModerationRecord>,
    pub pagination: Pagination,
}

async fn get_queue(
    State(ctx): State<AppContext>,
    _reviewer: ReviewerContext,
    Query(query): Query<QueueQuery>,
) -> ModerationResult<Json<QueueResponse>> {
    let filter = query.into_filter()?;
    let page = ctx.store.list_queue(&filter).await?;

    Ok(Json(QueueResponse {
        items: page.items,
        pagination: Pagination::new(page.total, filter.limit, filter.skip),
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct StatsQuery {
    #[validate(range(min = 1, max = 365, message = "must be between 1 and 365"))]
    pub days: Option<i64>,
}

async fn get_stats(
    State(ctx): State<AppContext>,
    reviewer: ReviewerContext,
    Query(query): Query<StatsQuery>,
) -> ModerationResult<Json<ModerationStats>> {
    query.validate()?;
    let days = query.days.unwrap_or(DEFAULT_STATS_WINDOW_DAYS);
    Ok(Json(ctx.stats.summary(&reviewer.reviewer_id, days).await?))
}

async fn get_record(
    State(ctx): State<AppContext>,
    _reviewer: ReviewerContext,
    Path(id): Path<String>,
) -> ModerationResult<Json<ModerationRecord>> {
    Ok(Json(ctx.moderation.get(&id).await?))
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ApproveRequest {
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub notes: Option<String>,
}

async fn approve(
    State(ctx): State<AppContext>,
    reviewer: ReviewerContext,
    Path(id): Path<String>,
    body: Option<Json<ApproveRequest>>,
) -> ModerationResult<Json<ModerationRecord>> {
    let req = body.map(|Json(b)| b).unwrap_or_default();
    req.validate()?;

    let record = ctx
        .moderation
        .approve(&id, &reviewer.reviewer_id, req.notes.as_deref())
        .await?;
    Ok(Json(record))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RejectRequest {
    #[validate(
        required(message = "rejection reason is required"),
        length(min = 1, max = 1000, message = "must be 1 to 1000 characters")
    )]
    pub reason: Option<String>,
    #[validate(required(message = "rejection category is required"))]
    pub category: Option<String>,
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub notes: Option<String>,
}

impl RejectRequest {
    /// Reason and category are both required; the category must be a known one
    pub fn rejection(&self) -> ModerationResult<Rejection> {
        self.validate()?;

        let reason = self.reason.as_deref().unwrap_or_default().trim();
        if reason.is_empty() {
            return Err(ModerationError::Validation(
                "reason: rejection reason is required".to_string(),
            ));
        }
        let category = RejectionCategory::from_str(self.category.as_deref().unwrap_or_default())?;

        Ok(Rejection {
            reason: reason.to_string(),
            category,
        })
    }
}

async fn reject(
    State(ctx): State<AppContext>,
    reviewer: ReviewerContext,
    Path(id): Path<String>,
    Json(req): Json<RejectRequest>,
) -> ModerationResult<Json<ModerationRecord>> {
    let rejection = req.rejection()?;

    let record = ctx
        .moderation
        .reject(&id, &reviewer.reviewer_id, &rejection, req.notes.as_deref())
        .await?;
    Ok(Json(record))
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FlagRequest {
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub notes: Option<String>,
    pub new_priority: Option<Priority>,
}

async fn flag(
    State(ctx): State<AppContext>,
    reviewer: ReviewerContext,
    Path(id): Path<String>,
    body: Option<Json<FlagRequest>>,
) -> ModerationResult<Json<ModerationRecord>> {
    let req = body.map(|Json(b)| b).unwrap_or_default();
    req.validate()?;

    let record = ctx
        .moderation
        .flag(&id, &reviewer.reviewer_id, req.notes.as_deref(), req.new_priority)
        .await?;
    Ok(Json(record))
}

#[derive(Debug, Deserialize, Validate)]
pub struct BatchApproveRequest {
    #[validate(length(min = 1, max = 100, message = "must contain 1 to 100 ids"))]
    pub ids: Vec<String>,
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub notes: Option<String>,
}

async fn batch_approve(
    State(ctx): State<AppContext>,
    reviewer: ReviewerContext,
    Json(req): Json<BatchApproveRequest>,
) -> ModerationResult<Json<BatchApproveResult>> {
    req.validate()?;

    let result = ctx
        .moderation
        .batch_approve(&req.ids, &reviewer.reviewer_id, req.notes.as_deref())
        .await;
    Ok(Json(result))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResolveAppealRequest {
    pub decision: AppealDecision,
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub notes: Option<String>,
}

async fn resolve_appeal(
    State(ctx): State<AppContext>,
    reviewer: ReviewerContext,
    Path(id): Path<String>,
    Json(req): Json<ResolveAppealRequest>,
) -> ModerationResult<Json<ModerationRecord>> {
    req.validate()?;

    let record = ctx
        .moderation
        .resolve_appeal(&id, &reviewer.reviewer_id, req.decision, req.notes.as_deref())
        .await?;
    Ok(Json(record))
}
