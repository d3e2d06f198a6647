/// API routes and handlers
pub mod health;
pub mod middleware;
pub mod moderation;
pub mod uploads;

use crate::context::AppContext;
use axum::Router;
use serde::Serialize;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(health::routes())
        .merge(moderation::routes())
        .merge(uploads::routes())
}

/// Paging metadata for list responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: i64,
    pub limit: i64,
    pub skip: i64,
    pub has_more: bool,
}

impl Pagination {
    pub fn new(total: i64, limit: i64, skip: i64) -> Self {
        Self {
            total,
            limit,
            skip,
            has_more: skip + limit < total,
        }
    }
}
