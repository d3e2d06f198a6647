/// Photo moderation service library
///
/// Content analysis routing, the moderator review queue with single-winner
/// decisions, appeals, escalation alerts and the HTTP API around them.
pub mod accounts;
pub mod analysis;
pub mod api;
pub mod assets;
pub mod auth;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod escalation;
pub mod ingest;
pub mod jobs;
pub mod metrics;
pub mod moderation;
pub mod notify;
pub mod priority;
pub mod server;
pub mod trust;

#[cfg(test)]
pub(crate) mod test_support;

pub use context::AppContext;
pub use error::{ModerationError, ModerationResult};
