/// Photo moderation data models
use crate::{
    analysis::CategoryScores,
    error::{ModerationError, ModerationResult},
    trust::TrustProfile,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Review lifecycle state of a moderation record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModerationStatus {
    Pending,
    UnderReview,
    Approved,
    Rejected,
}

impl ModerationStatus {
    pub const ALL: [ModerationStatus; 4] = [
        ModerationStatus::Pending,
        ModerationStatus::UnderReview,
        ModerationStatus::Approved,
        ModerationStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationStatus::Pending => "pending",
            ModerationStatus::UnderReview => "under-review",
            ModerationStatus::Approved => "approved",
            ModerationStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> ModerationResult<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ModerationStatus::Pending),
            "under-review" | "flagged" => Ok(ModerationStatus::UnderReview),
            "approved" => Ok(ModerationStatus::Approved),
            "rejected" => Ok(ModerationStatus::Rejected),
            _ => Err(ModerationError::Validation(format!(
                "Invalid moderation status: {}",
                s
            ))),
        }
    }

    /// Only open records may be the origin of a moderator decision
    pub fn is_open(&self) -> bool {
        matches!(self, ModerationStatus::Pending | ModerationStatus::UnderReview)
    }
}

impl fmt::Display for ModerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Queue priority
///
/// `Normal`/`High` come from the history-only strategy, `Low`/`Medium`/`High`/`Urgent`
/// from the score-driven strategy. Both share one ordering so a single queue can hold them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Normal,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 5] = [
        Priority::Low,
        Priority::Normal,
        Priority::Medium,
        Priority::High,
        Priority::Urgent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }

    pub fn from_str(s: &str) -> ModerationResult<Self> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "normal" => Ok(Priority::Normal),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            _ => Err(ModerationError::Validation(format!("Invalid priority: {}", s))),
        }
    }

    /// Sort key stored next to the label; higher is reviewed first
    pub fn rank(&self) -> i64 {
        match self {
            Priority::Low => 0,
            Priority::Normal => 1,
            Priority::Medium => 2,
            Priority::High => 3,
            Priority::Urgent => 4,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the photo is used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoType {
    Profile,
    Pet,
    Gallery,
    Chat,
}

impl PhotoType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhotoType::Profile => "profile",
            PhotoType::Pet => "pet",
            PhotoType::Gallery => "gallery",
            PhotoType::Chat => "chat",
        }
    }

    pub fn from_str(s: &str) -> ModerationResult<Self> {
        match s.to_lowercase().as_str() {
            "profile" => Ok(PhotoType::Profile),
            "pet" => Ok(PhotoType::Pet),
            "gallery" => Ok(PhotoType::Gallery),
            "chat" => Ok(PhotoType::Chat),
            _ => Err(ModerationError::Validation(format!("Invalid photo type: {}", s))),
        }
    }
}

/// Closed set of rejection categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectionCategory {
    Explicit,
    Violence,
    SelfHarm,
    Drugs,
    HateSpeech,
    Spam,
    Other,
}

impl RejectionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionCategory::Explicit => "explicit",
            RejectionCategory::Violence => "violence",
            RejectionCategory::SelfHarm => "self-harm",
            RejectionCategory::Drugs => "drugs",
            RejectionCategory::HateSpeech => "hate-speech",
            RejectionCategory::Spam => "spam",
            RejectionCategory::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> ModerationResult<Self> {
        match s {
            "explicit" => Ok(RejectionCategory::Explicit),
            "violence" => Ok(RejectionCategory::Violence),
            "self-harm" => Ok(RejectionCategory::SelfHarm),
            "drugs" => Ok(RejectionCategory::Drugs),
            "hate-speech" => Ok(RejectionCategory::HateSpeech),
            "spam" => Ok(RejectionCategory::Spam),
            "other" => Ok(RejectionCategory::Other),
            _ => Err(ModerationError::Validation(format!(
                "category: invalid rejection category '{}'",
                s
            ))),
        }
    }
}

impl fmt::Display for RejectionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of an appeal review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppealDecision {
    Pending,
    Upheld,
    Overturned,
}

impl AppealDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppealDecision::Pending => "pending",
            AppealDecision::Upheld => "upheld",
            AppealDecision::Overturned => "overturned",
        }
    }

    pub fn from_str(s: &str) -> ModerationResult<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(AppealDecision::Pending),
            "upheld" => Ok(AppealDecision::Upheld),
            "overturned" => Ok(AppealDecision::Overturned),
            _ => Err(ModerationError::Validation(format!(
                "Invalid appeal decision: {}",
                s
            ))),
        }
    }
}

/// Image metadata (informational only)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub file_size: u64,
}

/// Reference to the stored asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRef {
    pub url: String,
    pub storage_id: String,
}

/// Reason and category, always set together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rejection {
    pub reason: String,
    pub category: RejectionCategory,
}

/// Appeal attached to a rejected record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appeal {
    pub submitted_at: DateTime<Utc>,
    pub reason: String,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub decision: AppealDecision,
    pub notes: Option<String>,
}

/// One uploaded image's review lifecycle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationRecord {
    pub id: String,
    pub user_id: String,
    pub photo_url: String,
    pub storage_id: String,
    pub photo_type: PhotoType,
    pub image_metadata: ImageMetadata,
    pub status: ModerationStatus,
    pub priority: Priority,
    pub uploaded_at: DateTime<Utc>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_notes: Option<String>,
    pub rejection: Option<Rejection>,
    pub category_scores: Option<CategoryScores>,
    /// Captured at creation, never recomputed
    pub user_history: TrustProfile,
    pub appeal: Option<Appeal>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Everything needed to insert a new record
#[derive(Debug, Clone)]
pub struct NewModerationRecord {
    pub user_id: String,
    pub image: ImageRef,
    pub photo_type: PhotoType,
    pub image_metadata: ImageMetadata,
    pub status: ModerationStatus,
    pub priority: Priority,
    pub review_notes: Option<String>,
    /// Set for records created already rejected by the decision engine
    pub auto_rejection: Option<Rejection>,
    pub category_scores: Option<CategoryScores>,
    pub user_history: TrustProfile,
}
