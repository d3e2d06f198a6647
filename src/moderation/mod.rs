/// Photo moderation records, reviewer operations and queue statistics
pub mod models;
pub mod service;
pub mod stats;
pub mod store;

pub use models::{
    Appeal, AppealDecision, ImageMetadata, ImageRef, ModerationRecord, ModerationStatus,
    NewModerationRecord, PhotoType, Priority, Rejection, RejectionCategory,
};
pub use service::{BatchApproveResult, BatchItemResult, ModerationService};
pub use stats::StatsService;
pub use store::{ModerationStore, QueueFilter, QueuePage, QueueSort, SortOrder, TransitionOutcome};
