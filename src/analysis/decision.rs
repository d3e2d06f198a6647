/// Decision Engine
///
/// Maps category confidences and the uploader's trust profile into an initial
/// record disposition. Two threshold tables drive it:
/// - auto-reject: any category at or above its cutoff rejects outright
/// - flag: any category at or above its (lower) cutoff sends the photo to review
///
/// Categories without an auto-reject cutoff (suggestive nudity, weapons) can only
/// ever be flagged.
use crate::{
    analysis::{AnalysisUnavailable, CategoryScores, ContentCategory},
    error::{ModerationError, ModerationResult},
    moderation::{ModerationStatus, Priority, Rejection, RejectionCategory},
    trust::TrustProfile,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-category confidence cutoffs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub auto_reject: BTreeMap<ContentCategory, f32>,
    pub flag: BTreeMap<ContentCategory, f32>,
}

impl Default for Thresholds {
    fn default() -> Self {
        use ContentCategory::*;

        let auto_reject = BTreeMap::from([
            (ExplicitNudity, 80.0),
            (Violence, 85.0),
            (Gore, 80.0),
            (SelfHarm, 90.0),
            (Drugs, 75.0),
            (HateSpeech, 85.0),
        ]);

        let flag = BTreeMap::from([
            (ExplicitNudity, 60.0),
            (SuggestiveNudity, 70.0),
            (Violence, 60.0),
            (Gore, 60.0),
            (SelfHarm, 50.0),
            (Drugs, 50.0),
            (HateSpeech, 60.0),
            (Weapons, 70.0),
        ]);

        Self { auto_reject, flag }
    }
}

impl Thresholds {
    /// Reject tables that cannot route sensibly
    pub fn validate(&self) -> ModerationResult<()> {
        for (category, value) in self.auto_reject.iter().chain(self.flag.iter()) {
            if !(*value > 0.0 && *value <= 100.0) {
                return Err(ModerationError::Validation(format!(
                    "Threshold for {} must be in (0, 100], got {}",
                    category, value
                )));
            }
        }

        for (category, reject_at) in &self.auto_reject {
            if let Some(flag_at) = self.flag.get(category) {
                if flag_at > reject_at {
                    return Err(ModerationError::Validation(format!(
                        "Flag threshold for {} ({}) is above its auto-reject threshold ({})",
                        category, flag_at, reject_at
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Raw engine verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecisionAction {
    Approve,
    Flag,
    AutoReject,
}

impl DecisionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionAction::Approve => "approve",
            DecisionAction::Flag => "flag",
            DecisionAction::AutoReject => "auto-reject",
        }
    }
}

/// Verdict plus the categories that caused it
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub action: DecisionAction,
    pub triggered: Vec<(ContentCategory, f32)>,
    pub reason: Option<String>,
}

/// How a new record starts out
#[derive(Debug, Clone, PartialEq)]
pub struct InitialDisposition {
    pub action: Option<DecisionAction>,
    pub status: ModerationStatus,
    /// Overrides the priority calculator when set (fail-safe path)
    pub forced_priority: Option<Priority>,
    pub review_notes: Option<String>,
    pub rejection: Option<Rejection>,
}

/// Threshold-driven decision engine
#[derive(Debug, Clone, Default)]
pub struct DecisionEngine {
    thresholds: Thresholds,
}

impl DecisionEngine {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Evaluate confidences against both tables
    pub fn evaluate(&self, scores: &CategoryScores) -> Decision {
        let rejected = Self::triggered(&self.thresholds.auto_reject, scores);
        if !rejected.is_empty() {
            let reason = format!("Auto-rejected: {}", Self::describe(&rejected));
            return Decision {
                action: DecisionAction::AutoReject,
                triggered: rejected,
                reason: Some(reason),
            };
        }

        let flagged = Self::triggered(&self.thresholds.flag, scores);
        if !flagged.is_empty() {
            let reason = format!("Flagged for review: {}", Self::describe(&flagged));
            return Decision {
                action: DecisionAction::Flag,
                triggered: flagged,
                reason: Some(reason),
            };
        }

        Decision {
            action: DecisionAction::Approve,
            triggered: Vec::new(),
            reason: None,
        }
    }

    /// Combine the analysis outcome with the uploader's trust profile.
    ///
    /// Trust only relaxes `approve` into a final approval; it never overrides a
    /// flag or a reject. An unavailable analysis forces review at high priority.
    pub fn route(
        &self,
        analysis: &Result<CategoryScores, AnalysisUnavailable>,
        trust: &TrustProfile,
    ) -> InitialDisposition {
        let scores = match analysis {
            Ok(scores) => scores,
            Err(failure) => {
                return InitialDisposition {
                    action: None,
                    status: ModerationStatus::UnderReview,
                    forced_priority: Some(Priority::High),
                    review_notes: Some(format!(
                        "Automatic analysis failed, manual review required: {}",
                        failure.0
                    )),
                    rejection: None,
                };
            }
        };

        let decision = self.evaluate(scores);
        match decision.action {
            DecisionAction::AutoReject => {
                let category = decision
                    .triggered
                    .iter()
                    .max_by(|a, b| a.1.total_cmp(&b.1))
                    .map(|(c, _)| rejection_category_for(*c))
                    .unwrap_or(RejectionCategory::Other);
                let reason = decision.reason.unwrap_or_default();
                InitialDisposition {
                    action: Some(DecisionAction::AutoReject),
                    status: ModerationStatus::Rejected,
                    forced_priority: None,
                    review_notes: Some(reason.clone()),
                    rejection: Some(Rejection { reason, category }),
                }
            }
            DecisionAction::Flag => InitialDisposition {
                action: Some(DecisionAction::Flag),
                status: ModerationStatus::UnderReview,
                forced_priority: None,
                review_notes: decision.reason,
                rejection: None,
            },
            DecisionAction::Approve => InitialDisposition {
                action: Some(DecisionAction::Approve),
                status: if trust.is_trusted_user {
                    ModerationStatus::Approved
                } else {
                    ModerationStatus::Pending
                },
                forced_priority: None,
                review_notes: trust
                    .is_trusted_user
                    .then(|| "Auto-approved: trusted user, no policy signals".to_string()),
                rejection: None,
            },
        }
    }

    fn triggered(
        table: &BTreeMap<ContentCategory, f32>,
        scores: &CategoryScores,
    ) -> Vec<(ContentCategory, f32)> {
        table
            .iter()
            .filter_map(|(category, threshold)| {
                let confidence = scores.get(*category);
                (confidence >= *threshold).then_some((*category, confidence))
            })
            .collect()
    }

    fn describe(triggered: &[(ContentCategory, f32)]) -> String {
        triggered
            .iter()
            .map(|(c, v)| format!("{} ({:.1}%)", c.label(), v))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Closed rejection category for an analysis category
pub fn rejection_category_for(category: ContentCategory) -> RejectionCategory {
    match category {
        ContentCategory::ExplicitNudity | ContentCategory::SuggestiveNudity => {
            RejectionCategory::Explicit
        }
        ContentCategory::Violence | ContentCategory::Gore | ContentCategory::Weapons => {
            RejectionCategory::Violence
        }
        ContentCategory::SelfHarm => RejectionCategory::SelfHarm,
        ContentCategory::Drugs => RejectionCategory::Drugs,
        ContentCategory::HateSpeech => RejectionCategory::HateSpeech,
    }
}
