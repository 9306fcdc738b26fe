//! Closed emotion label set produced by the classifier.
//!
//! The classifier head emits one logit per label. The position of each logit
//! is fixed by [`EMOTION_LABELS`]; it is declared here rather than read from
//! the model so that swapping the model file cannot silently reorder labels.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Emotions the classifier can produce.
///
/// # Example
///
/// ```rust
/// use emotale_gateway::core::classifier::EmotionLabel;
///
/// let label = EmotionLabel::Joy;
/// assert_eq!(label.to_string(), "joy");
/// assert_eq!(label.index(), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmotionLabel {
    /// Anger, frustration
    Anger,
    /// Fear, anxiety
    Fear,
    /// Joy, happiness
    Joy,
    /// Love, affection
    Love,
    /// No dominant emotion
    #[default]
    Neutral,
    /// Sadness, grief
    Sadness,
    /// Surprise, astonishment
    Surprise,
}

/// Number of labels in the classifier head.
pub const LABEL_COUNT: usize = 7;

/// Label order of the classifier head: logit `i` scores `EMOTION_LABELS[i]`.
pub const EMOTION_LABELS: [EmotionLabel; LABEL_COUNT] = [
    EmotionLabel::Anger,
    EmotionLabel::Fear,
    EmotionLabel::Joy,
    EmotionLabel::Love,
    EmotionLabel::Neutral,
    EmotionLabel::Sadness,
    EmotionLabel::Surprise,
];

impl EmotionLabel {
    /// Returns all labels in head order.
    #[inline]
    pub const fn all() -> &'static [EmotionLabel] {
        &EMOTION_LABELS
    }

    /// Position of this label in the classifier head.
    #[inline]
    pub const fn index(&self) -> usize {
        match self {
            EmotionLabel::Anger => 0,
            EmotionLabel::Fear => 1,
            EmotionLabel::Joy => 2,
            EmotionLabel::Love => 3,
            EmotionLabel::Neutral => 4,
            EmotionLabel::Sadness => 5,
            EmotionLabel::Surprise => 6,
        }
    }

    /// Label at the given head position.
    #[inline]
    pub fn from_index(index: usize) -> Option<Self> {
        EMOTION_LABELS.get(index).copied()
    }

    /// Returns the label as the lowercase string used on the wire.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            EmotionLabel::Anger => "anger",
            EmotionLabel::Fear => "fear",
            EmotionLabel::Joy => "joy",
            EmotionLabel::Love => "love",
            EmotionLabel::Neutral => "neutral",
            EmotionLabel::Sadness => "sadness",
            EmotionLabel::Surprise => "surprise",
        }
    }

    /// Parses a label (case-insensitive, surrounding whitespace ignored).
    ///
    /// Only the seven canonical names are accepted.
    ///
    /// ```rust
    /// use emotale_gateway::core::classifier::EmotionLabel;
    ///
    /// assert_eq!(EmotionLabel::parse("Joy"), Some(EmotionLabel::Joy));
    /// assert_eq!(EmotionLabel::parse(" sadness "), Some(EmotionLabel::Sadness));
    /// assert_eq!(EmotionLabel::parse("happy"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "anger" => Some(EmotionLabel::Anger),
            "fear" => Some(EmotionLabel::Fear),
            "joy" => Some(EmotionLabel::Joy),
            "love" => Some(EmotionLabel::Love),
            "neutral" => Some(EmotionLabel::Neutral),
            "sadness" => Some(EmotionLabel::Sadness),
            "surprise" => Some(EmotionLabel::Surprise),
            _ => None,
        }
    }

    /// Parses a label, falling back to [`EmotionLabel::Neutral`] for absent or
    /// unrecognized input.
    pub fn parse_or_neutral(s: Option<&str>) -> Self {
        s.and_then(Self::parse).unwrap_or_default()
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One logit per label, in head order.
pub type LabelScores = [f32; LABEL_COUNT];

/// Selects the label with the highest score.
///
/// Ties resolve to the lowest head index. NaN scores never win; a vector of
/// only NaN scores resolves to index 0.
pub fn select_label(scores: &LabelScores) -> EmotionLabel {
    let mut best = 0usize;
    for (i, score) in scores.iter().enumerate().skip(1) {
        // Strict comparison keeps the earliest index on ties
        if *score > scores[best] || (scores[best].is_nan() && !score.is_nan()) {
            best = i;
        }
    }
    EMOTION_LABELS[best]
}
