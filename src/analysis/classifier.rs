// Classifier - cosine-similarity matching against calibrated signatures
//
// A live normalized reading is white-balanced with the calibration's white
// reference, then compared to each colour signature:
//
//   similarity = dot(a, b) / (|a| * |b|),  0 when either norm is 0
//
// The best-scoring colour wins if its similarity reaches the threshold
// (inclusive); otherwise the reading is Unknown. Equal scores resolve in
// red, green, blue order because only a strictly greater score replaces the
// current best.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::acquisition::{ChannelTriple, ColorLabel};
use crate::calibration::CalibrationProfile;

/// Classification outcome for one reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectedColor {
    Red,
    Green,
    Blue,
    /// No signature reached the similarity threshold
    Unknown,
}

impl From<ColorLabel> for DetectedColor {
    fn from(label: ColorLabel) -> Self {
        match label {
            ColorLabel::Red => DetectedColor::Red,
            ColorLabel::Green => DetectedColor::Green,
            ColorLabel::Blue => DetectedColor::Blue,
        }
    }
}

impl DetectedColor {
    pub fn label(self) -> Option<ColorLabel> {
        match self {
            DetectedColor::Red => Some(ColorLabel::Red),
            DetectedColor::Green => Some(ColorLabel::Green),
            DetectedColor::Blue => Some(ColorLabel::Blue),
            DetectedColor::Unknown => None,
        }
    }
}

impl fmt::Display for DetectedColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DetectedColor::Red => "Red",
            DetectedColor::Green => "Green",
            DetectedColor::Blue => "Blue",
            DetectedColor::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Similarity of a reading to one signature
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimilarityScore {
    pub label: ColorLabel,
    pub similarity: f64,
}

/// Result of classifying one reading
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    /// Reported colour after thresholding
    pub color: DetectedColor,
    /// Highest-scoring signature, even when below threshold
    pub best_match: ColorLabel,
    /// Similarity of `best_match`
    pub confidence: f64,
    /// Reading after white balance
    pub balanced: ChannelTriple,
    /// Per-signature similarity, in red, green, blue order
    pub scores: [SimilarityScore; 3],
}

/// Classifier matches readings against a finished calibration
///
/// Holds the calibration profile behind an `Arc`; the profile is never
/// mutated after calibration, so classification is a pure function of the
/// reading.
#[derive(Debug, Clone)]
pub struct Classifier {
    profile: Arc<CalibrationProfile>,
    threshold: f64,
}

impl Classifier {
    /// # Arguments
    /// * `profile` - Completed calibration
    /// * `threshold` - Minimum similarity (inclusive) for a confident match
    pub fn new(profile: Arc<CalibrationProfile>, threshold: f64) -> Self {
        Self { profile, threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn profile(&self) -> &Arc<CalibrationProfile> {
        &self.profile
    }

    /// Classify a normalized reading
    pub fn classify(&self, normalized: &ChannelTriple) -> Classification {
        let balanced = self.profile.white().balance(normalized);
        self.classify_balanced(balanced)
    }

    /// Classify a reading that is already white-balanced
    pub fn classify_balanced(&self, balanced: ChannelTriple) -> Classification {
        let signatures = self.profile.signatures();
        let scores = ColorLabel::ALL.map(|label| SimilarityScore {
            label,
            similarity: balanced.cosine_similarity(signatures.get(label).values()),
        });

        let mut best = scores[0];
        for score in &scores[1..] {
            if score.similarity > best.similarity {
                best = *score;
            }
        }

        let color = if best.similarity >= self.threshold {
            DetectedColor::from(best.label)
        } else {
            DetectedColor::Unknown
        };

        tracing::debug!(
            "[Classifier] red={:.3} green={:.3} blue={:.3} -> {}",
            scores[0].similarity,
            scores[1].similarity,
            scores[2].similarity,
            color
        );

        Classification {
            color,
            best_match: best.label,
            confidence: best.similarity,
            balanced,
            scores,
        }
    }
}

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod tests;
