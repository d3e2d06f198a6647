/// Trust Profile Calculator
///
/// Derives an uploader's trust signal from their moderation history, account
/// age and identity verification. Trust is a hard AND of every rule; a single
/// historical rejection disqualifies the user with no decay.
use crate::moderation::{ModerationRecord, ModerationStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MIN_APPROVED_UPLOADS: i64 = 10;
pub const MIN_ACCOUNT_AGE_DAYS: i64 = 30;

/// Snapshot of a user's upload history
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustProfile {
    pub total_uploads: i64,
    pub rejected_uploads: i64,
    pub approved_uploads: i64,
    pub is_trusted_user: bool,
    pub account_age_days: i64,
}

/// Raw per-status counts for one user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadCounts {
    pub total: i64,
    pub approved: i64,
    pub rejected: i64,
}

impl UploadCounts {
    pub fn from_records(records: &[ModerationRecord]) -> Self {
        records.iter().fold(Self::default(), |mut acc, r| {
            acc.total += 1;
            match r.status {
                ModerationStatus::Approved => acc.approved += 1,
                ModerationStatus::Rejected => acc.rejected += 1,
                _ => {}
            }
            acc
        })
    }
}

impl TrustProfile {
    /// Build a profile from aggregated counts
    pub fn from_counts(
        counts: UploadCounts,
        account_created_at: DateTime<Utc>,
        identity_verified: bool,
        now: DateTime<Utc>,
    ) -> Self {
        // Clock skew must not yield a negative age
        let account_age_days = (now - account_created_at).num_days().max(0);

        let is_trusted_user = counts.approved >= MIN_APPROVED_UPLOADS
            && counts.rejected == 0
            && account_age_days >= MIN_ACCOUNT_AGE_DAYS
            && identity_verified;

        Self {
            total_uploads: counts.total,
            rejected_uploads: counts.rejected,
            approved_uploads: counts.approved,
            is_trusted_user,
            account_age_days,
        }
    }

    /// Build a profile from a user's full record set
    pub fn from_records(
        records: &[ModerationRecord],
        account_created_at: DateTime<Utc>,
        identity_verified: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self::from_counts(
            UploadCounts::from_records(records),
            account_created_at,
            identity_verified,
            now,
        )
    }
}
