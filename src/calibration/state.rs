// Calibration state - white reference and colour signatures
//
// The white reference is the normalized reading of a neutral surface. Every
// later reading is divided by it channel by channel ("white balance") to
// cancel photodiode and illumination bias. A colour signature is the
// white-balanced reading of one primary reference.
//
// SignatureSet is Incomplete until all three primaries are recorded. Only a
// CalibrationProfile, which holds complete signatures, can drive the
// classifier.

use serde::Serialize;

use crate::acquisition::{ChannelTriple, ColorLabel};
use crate::error::CalibrationError;

/// Normalized reading of the white reference, fixed once captured
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct WhiteReference(ChannelTriple);

impl WhiteReference {
    pub fn capture(normalized: ChannelTriple) -> Self {
        Self(normalized)
    }

    pub fn values(&self) -> &ChannelTriple {
        &self.0
    }

    /// Divide each channel of `reading` by the reference
    ///
    /// A zero reference channel (e.g. a timed-out white capture) yields 0 for
    /// that channel instead of infinity or NaN.
    pub fn balance(&self, reading: &ChannelTriple) -> ChannelTriple {
        reading.divide_by(&self.0)
    }
}

/// White-balance `reading`, failing if no reference has been captured
pub fn white_balance(
    reading: &ChannelTriple,
    white: Option<&WhiteReference>,
) -> Result<ChannelTriple, CalibrationError> {
    white
        .map(|reference| reference.balance(reading))
        .ok_or(CalibrationError::WhiteReferenceMissing)
}

/// White-balanced reading of one primary reference
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ColorSignature(ChannelTriple);

impl ColorSignature {
    pub fn new(balanced: ChannelTriple) -> Self {
        Self(balanced)
    }

    pub fn values(&self) -> &ChannelTriple {
        &self.0
    }
}

/// Signatures recorded so far
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PartialSignatures {
    pub red: Option<ColorSignature>,
    pub green: Option<ColorSignature>,
    pub blue: Option<ColorSignature>,
}

impl PartialSignatures {
    fn get(&self, label: ColorLabel) -> Option<&ColorSignature> {
        match label {
            ColorLabel::Red => self.red.as_ref(),
            ColorLabel::Green => self.green.as_ref(),
            ColorLabel::Blue => self.blue.as_ref(),
        }
    }

    fn slot(&mut self, label: ColorLabel) -> &mut Option<ColorSignature> {
        match label {
            ColorLabel::Red => &mut self.red,
            ColorLabel::Green => &mut self.green,
            ColorLabel::Blue => &mut self.blue,
        }
    }
}

/// One signature per primary colour
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompleteSignatures {
    pub red: ColorSignature,
    pub green: ColorSignature,
    pub blue: ColorSignature,
}

impl CompleteSignatures {
    pub fn get(&self, label: ColorLabel) -> &ColorSignature {
        match label {
            ColorLabel::Red => &self.red,
            ColorLabel::Green => &self.green,
            ColorLabel::Blue => &self.blue,
        }
    }

    /// Signatures in red, green, blue order
    pub fn iter(&self) -> impl Iterator<Item = (ColorLabel, &ColorSignature)> {
        ColorLabel::ALL.into_iter().map(move |label| (label, self.get(label)))
    }
}

/// Signature collection during and after calibration
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SignatureSet {
    Incomplete(PartialSignatures),
    Complete(CompleteSignatures),
}

impl Default for SignatureSet {
    fn default() -> Self {
        SignatureSet::Incomplete(PartialSignatures::default())
    }
}

impl SignatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `signature` for `label`, completing the set once all three are present
    pub fn with_signature(self, label: ColorLabel, signature: ColorSignature) -> Self {
        let mut partial = match self {
            SignatureSet::Incomplete(partial) => partial,
            SignatureSet::Complete(complete) => PartialSignatures {
                red: Some(complete.red),
                green: Some(complete.green),
                blue: Some(complete.blue),
            },
        };
        *partial.slot(label) = Some(signature);

        match (partial.red, partial.green, partial.blue) {
            (Some(red), Some(green), Some(blue)) => {
                SignatureSet::Complete(CompleteSignatures { red, green, blue })
            }
            _ => SignatureSet::Incomplete(partial),
        }
    }

    pub fn get(&self, label: ColorLabel) -> Option<&ColorSignature> {
        match self {
            SignatureSet::Incomplete(partial) => partial.get(label),
            SignatureSet::Complete(complete) => Some(complete.get(label)),
        }
    }

    /// Colours without a signature, in calibration order
    pub fn missing(&self) -> Vec<ColorLabel> {
        ColorLabel::ALL
            .into_iter()
            .filter(|&label| self.get(label).is_none())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, SignatureSet::Complete(_))
    }

    pub fn complete(&self) -> Option<&CompleteSignatures> {
        match self {
            SignatureSet::Complete(complete) => Some(complete),
            SignatureSet::Incomplete(_) => None,
        }
    }
}

/// Result of a finished calibration, shared read-only with the classifier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationProfile {
    white: WhiteReference,
    signatures: CompleteSignatures,
}

impl CalibrationProfile {
    pub fn new(white: WhiteReference, signatures: CompleteSignatures) -> Self {
        Self { white, signatures }
    }

    pub fn white(&self) -> &WhiteReference {
        &self.white
    }

    pub fn signatures(&self) -> &CompleteSignatures {
        &self.signatures
    }

    /// Split into the white reference and a complete signature set
    pub fn into_parts(self) -> (WhiteReference, SignatureSet) {
        (self.white, SignatureSet::Complete(self.signatures))
    }
}
