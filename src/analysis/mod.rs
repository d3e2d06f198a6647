/// Content Analysis
///
/// Normalizes the raw label output of an external image classifier into the
/// eight fixed moderation categories, and decides how a photo is routed.

pub mod decision;
pub mod http;

pub use decision::{Decision, DecisionAction, DecisionEngine, InitialDisposition, Thresholds};
pub use http::HttpContentAnalyzer;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Fixed moderation categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentCategory {
    ExplicitNudity,
    SuggestiveNudity,
    Violence,
    Gore,
    SelfHarm,
    Drugs,
    HateSpeech,
    Weapons,
}

impl ContentCategory {
    pub const ALL: [ContentCategory; 8] = [
        ContentCategory::ExplicitNudity,
        ContentCategory::SuggestiveNudity,
        ContentCategory::Violence,
        ContentCategory::Gore,
        ContentCategory::SelfHarm,
        ContentCategory::Drugs,
        ContentCategory::HateSpeech,
        ContentCategory::Weapons,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentCategory::ExplicitNudity => "explicitNudity",
            ContentCategory::SuggestiveNudity => "suggestiveNudity",
            ContentCategory::Violence => "violence",
            ContentCategory::Gore => "gore",
            ContentCategory::SelfHarm => "selfHarm",
            ContentCategory::Drugs => "drugs",
            ContentCategory::HateSpeech => "hateSpeech",
            ContentCategory::Weapons => "weapons",
        }
    }

    /// Human-readable name used in decision reasons
    pub fn label(&self) -> &'static str {
        match self {
            ContentCategory::ExplicitNudity => "explicit nudity",
            ContentCategory::SuggestiveNudity => "suggestive nudity",
            ContentCategory::Violence => "violence",
            ContentCategory::Gore => "gore",
            ContentCategory::SelfHarm => "self-harm",
            ContentCategory::Drugs => "drugs",
            ContentCategory::HateSpeech => "hate speech",
            ContentCategory::Weapons => "weapons",
        }
    }

    /// Environment variable suffix, e.g. `EXPLICIT_NUDITY`
    pub fn env_key(&self) -> &'static str {
        match self {
            ContentCategory::ExplicitNudity => "EXPLICIT_NUDITY",
            ContentCategory::SuggestiveNudity => "SUGGESTIVE_NUDITY",
            ContentCategory::Violence => "VIOLENCE",
            ContentCategory::Gore => "GORE",
            ContentCategory::SelfHarm => "SELF_HARM",
            ContentCategory::Drugs => "DRUGS",
            ContentCategory::HateSpeech => "HATE_SPEECH",
            ContentCategory::Weapons => "WEAPONS",
        }
    }

    fn patterns(&self) -> &'static [LabelPattern] {
        use LabelPattern::{Exact, Phrase};
        match self {
            ContentCategory::ExplicitNudity => &[
                Exact("nudity"),
                Exact("explicit"),
                Phrase("explicit nudity"),
                Phrase("explicit sexual"),
                Phrase("graphic male nudity"),
                Phrase("graphic female nudity"),
                Phrase("sexual activity"),
                Phrase("sex toys"),
                Phrase("illustrated explicit"),
            ],
            ContentCategory::SuggestiveNudity => &[
                Phrase("suggestive"),
                Phrase("partial nudity"),
                Phrase("revealing clothes"),
                Phrase("swimwear"),
                Phrase("underwear"),
                Phrase("barechested"),
            ],
            ContentCategory::Violence => &[Phrase("violence")],
            ContentCategory::Gore => &[
                Phrase("gore"),
                Phrase("visually disturbing"),
                Phrase("emaciated bodies"),
                Phrase("corpses"),
                Exact("corpse"),
                Exact("blood"),
                Phrase("air crash"),
                Phrase("explosions and blasts"),
            ],
            ContentCategory::SelfHarm => &[
                Phrase("self injury"),
                Phrase("self harm"),
                Exact("hanging"),
            ],
            ContentCategory::Drugs => &[
                Exact("drug"),
                Exact("drugs"),
                Phrase("drug use"),
                Phrase("drug products"),
                Phrase("drug paraphernalia"),
                Exact("pills"),
                Phrase("marijuana"),
            ],
            ContentCategory::HateSpeech => &[
                Phrase("hate symbol"),
                Phrase("hate symbols"),
                Phrase("hate speech"),
                Phrase("nazi"),
                Phrase("nazi party"),
                Phrase("white supremacy"),
                Phrase("extremist"),
                Phrase("rude gestures"),
            ],
            ContentCategory::Weapons => &[
                Phrase("weapon"),
                Phrase("weapons"),
                Phrase("firearm"),
                Phrase("firearms"),
                Exact("knife"),
            ],
        }
    }

    /// Whether a raw classifier label belongs to this category
    ///
    /// Labels are compared word by word, so "Bloodhound" is not "blood" and
    /// "Hanging Basket" is not "hanging".
    pub fn matches(&self, label: &str) -> bool {
        let words = label_words(label);
        self.patterns().iter().any(|p| p.matches(&words))
    }
}

impl fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowercased alphanumeric words of a label; "Self-Injury" becomes `[self, injury]`
fn label_words(label: &str) -> Vec<String> {
    label
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, Copy)]
enum LabelPattern {
    /// The whole label, nothing more
    Exact(&'static str),
    /// A run of whole words anywhere in the label
    Phrase(&'static str),
}

impl LabelPattern {
    fn matches(&self, words: &[String]) -> bool {
        match self {
            LabelPattern::Exact(p) => {
                let wanted: Vec<&str> = p.split(' ').collect();
                words.len() == wanted.len() && words.iter().zip(&wanted).all(|(w, p)| w == p)
            }
            LabelPattern::Phrase(p) => {
                let wanted: Vec<&str> = p.split(' ').collect();
                words
                    .windows(wanted.len())
                    .any(|run| run.iter().zip(&wanted).all(|(w, p)| w == p))
            }
        }
    }
}

/// Raw label as returned by the analysis service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLabel {
    pub name: String,
    /// 0-100
    pub confidence: f32,
    #[serde(default)]
    pub instance_count: u32,
}

impl RawLabel {
    pub fn new(name: impl Into<String>, confidence: f32) -> Self {
        Self {
            name: name.into(),
            confidence,
            instance_count: 0,
        }
    }
}

/// Confidence per category, 0-100
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryScores {
    pub explicit_nudity: f32,
    pub suggestive_nudity: f32,
    pub violence: f32,
    pub gore: f32,
    pub self_harm: f32,
    pub drugs: f32,
    pub hate_speech: f32,
    pub weapons: f32,
}

impl CategoryScores {
    pub fn get(&self, category: ContentCategory) -> f32 {
        match category {
            ContentCategory::ExplicitNudity => self.explicit_nudity,
            ContentCategory::SuggestiveNudity => self.suggestive_nudity,
            ContentCategory::Violence => self.violence,
            ContentCategory::Gore => self.gore,
            ContentCategory::SelfHarm => self.self_harm,
            ContentCategory::Drugs => self.drugs,
            ContentCategory::HateSpeech => self.hate_speech,
            ContentCategory::Weapons => self.weapons,
        }
    }

    fn slot(&mut self, category: ContentCategory) -> &mut f32 {
        match category {
            ContentCategory::ExplicitNudity => &mut self.explicit_nudity,
            ContentCategory::SuggestiveNudity => &mut self.suggestive_nudity,
            ContentCategory::Violence => &mut self.violence,
            ContentCategory::Gore => &mut self.gore,
            ContentCategory::SelfHarm => &mut self.self_harm,
            ContentCategory::Drugs => &mut self.drugs,
            ContentCategory::HateSpeech => &mut self.hate_speech,
            ContentCategory::Weapons => &mut self.weapons,
        }
    }

    /// Builder-style setter, mostly for tests and fixtures
    pub fn with(mut self, category: ContentCategory, confidence: f32) -> Self {
        *self.slot(category) = confidence.clamp(0.0, 100.0);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (ContentCategory, f32)> + '_ {
        ContentCategory::ALL.iter().map(move |c| (*c, self.get(*c)))
    }

    /// Highest confidence across all categories
    pub fn max(&self) -> f32 {
        self.iter().map(|(_, v)| v).fold(0.0, f32::max)
    }

    /// Fold raw labels into category scores.
    ///
    /// Each category takes the maximum confidence of its matching labels; a single
    /// strong label is never averaged down by weak ones. Unmapped labels and labels
    /// under `min_confidence` are ignored.
    pub fn from_labels(labels: &[RawLabel], min_confidence: f32) -> Self {
        let mut scores = CategoryScores::default();
        for label in labels {
            if !label.confidence.is_finite() || label.confidence < min_confidence {
                continue;
            }
            let confidence = label.confidence.clamp(0.0, 100.0);
            for category in ContentCategory::ALL {
                if category.matches(&label.name) {
                    let slot = scores.slot(category);
                    if confidence > *slot {
                        *slot = confidence;
                    }
                }
            }
        }
        scores
    }
}

/// The analysis service could not produce a result
#[derive(Debug, Clone, Error)]
#[error("analysis unavailable: {0}")]
pub struct AnalysisUnavailable(pub String);

impl From<AnalysisUnavailable> for crate::error::ModerationError {
    fn from(e: AnalysisUnavailable) -> Self {
        crate::error::ModerationError::AnalysisUnavailable(e.0)
    }
}

/// External image content-analysis service
///
/// Implementations must not retry silently; any failure is reported as
/// `AnalysisUnavailable` so the decision engine can apply its fail-safe.
#[async_trait]
pub trait ContentAnalyzer: Send + Sync {
    /// Classify the image and return raw labels
    async fn detect_labels(&self, image: &[u8]) -> Result<Vec<RawLabel>, AnalysisUnavailable>;

    /// Confidence floor applied both on the request and when folding labels
    fn min_confidence(&self) -> f32 {
        50.0
    }

    /// Classify and normalize into category scores
    async fn analyze(&self, image: &[u8]) -> Result<CategoryScores, AnalysisUnavailable> {
        let labels = self.detect_labels(image).await?;
        Ok(CategoryScores::from_labels(&labels, self.min_confidence()))
    }
}
