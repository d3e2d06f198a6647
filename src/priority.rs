/// Priority Calculator
///
/// Two separate strategies:
/// - `ScorePriority` for records that went through content analysis
/// - `HistoryPriority` for the manual queue where no scores exist yet
use crate::{analysis::CategoryScores, moderation::Priority, trust::TrustProfile};

const REPEAT_OFFENDER_REJECTIONS: i64 = 2;

/// Four-level priority from category scores and uploader history
#[derive(Debug, Clone, Copy, Default)]
pub struct ScorePriority;

impl ScorePriority {
    pub fn calculate(&self, scores: &CategoryScores, trust: &TrustProfile) -> Priority {
        let max = scores.max();

        if scores.self_harm > 70.0 || scores.violence > 80.0 {
            Priority::Urgent
        } else if max > 70.0 || trust.rejected_uploads > REPEAT_OFFENDER_REJECTIONS {
            Priority::High
        } else if max > 50.0 {
            Priority::Medium
        } else {
            Priority::Low
        }
    }
}

/// Two-level priority from uploader history alone
#[derive(Debug, Clone, Copy, Default)]
pub struct HistoryPriority;

impl HistoryPriority {
    pub fn calculate(&self, trust: &TrustProfile) -> Priority {
        if trust.rejected_uploads > REPEAT_OFFENDER_REJECTIONS {
            Priority::High
        } else {
            Priority::Normal
        }
    }
}
