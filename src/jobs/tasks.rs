/// Background task implementations
use crate::{context::AppContext, error::ModerationResult, metrics};
use chrono::Utc;

/// Delete rejected records whose retention elapsed. Records with an
/// unresolved appeal are kept until the appeal is decided.
pub async fn purge_expired_rejections(ctx: &AppContext) -> ModerationResult<u64> {
    let purged = ctx.store.purge_expired(Utc::now()).await?;
    metrics::record_purged(purged);
    Ok(purged)
}

/// Publish the open-queue size
pub async fn refresh_queue_depth(ctx: &AppContext) -> ModerationResult<i64> {
    let depth = ctx.store.count_open().await?;
    metrics::set_queue_depth(depth);
    Ok(depth)
}

/// Health check - verify all systems are operational
pub async fn health_check(ctx: &AppContext) -> ModerationResult<()> {
    sqlx::query("SELECT 1").fetch_one(&ctx.db).await?;
    Ok(())
}
