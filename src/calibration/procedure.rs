// CalibrationProcedure - reference capture workflow
//
// The procedure follows a fixed 4-step sequence:
// 1. WHITE  - normalized reading stored as the white reference
// 2. RED    - white-balanced reading stored as the red signature
// 3. GREEN  - likewise
// 4. BLUE   - likewise
//
// Readings for any other step than the current one are rejected, so the white
// reference always exists before the first signature is balanced.

use serde::{Serialize, Serializer};

use crate::acquisition::{ChannelAggregator, ChannelTriple, ColorLabel, RawSampler};
use crate::calibration::state::{
    white_balance, CalibrationProfile, ColorSignature, SignatureSet, WhiteReference,
};
use crate::error::{log_calibration_error, CalibrationError, ColorSensorError};

/// Reference material expected under the sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalibrationStep {
    White,
    Color(ColorLabel),
}

impl CalibrationStep {
    /// Calibration order
    pub const SEQUENCE: [CalibrationStep; 4] = [
        CalibrationStep::White,
        CalibrationStep::Color(ColorLabel::Red),
        CalibrationStep::Color(ColorLabel::Green),
        CalibrationStep::Color(ColorLabel::Blue),
    ];

    /// Get the next step in the calibration sequence
    ///
    /// # Returns
    /// * `Some(CalibrationStep)` - Next step
    /// * `None` - Sequence complete
    pub fn next(&self) -> Option<CalibrationStep> {
        match self {
            CalibrationStep::White => Some(CalibrationStep::Color(ColorLabel::Red)),
            CalibrationStep::Color(ColorLabel::Red) => {
                Some(CalibrationStep::Color(ColorLabel::Green))
            }
            CalibrationStep::Color(ColorLabel::Green) => {
                Some(CalibrationStep::Color(ColorLabel::Blue))
            }
            CalibrationStep::Color(ColorLabel::Blue) => None,
        }
    }

    /// Get human-readable name for display
    pub fn display_name(&self) -> &'static str {
        match self {
            CalibrationStep::White => "WHITE",
            CalibrationStep::Color(label) => label.display_name(),
        }
    }

    /// Lowercase identifier used in reports: `white`, `red`, `green`, `blue`
    pub fn as_str(&self) -> &'static str {
        match self {
            CalibrationStep::White => "white",
            CalibrationStep::Color(label) => label.as_str(),
        }
    }
}

impl Serialize for CalibrationStep {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Operator interaction during calibration
///
/// Implementations block until the requested material is under the sensor.
pub trait CalibrationPrompt {
    /// Ask for `step`'s reference material and wait for confirmation
    ///
    /// # Errors
    /// `CalibrationError::Aborted` if the operator cancels
    fn request_material(&mut self, step: CalibrationStep) -> Result<(), CalibrationError>;

    /// Values stored for `step` (white reference or balanced signature)
    fn report_capture(&mut self, _step: CalibrationStep, _values: &ChannelTriple) {}
}

/// Prompt that confirms every step immediately
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoConfirm;

impl CalibrationPrompt for AutoConfirm {
    fn request_material(&mut self, _step: CalibrationStep) -> Result<(), CalibrationError> {
        Ok(())
    }
}

/// CalibrationProcedure owns the white reference and signatures while they
/// are being captured
#[derive(Debug, Clone, Default)]
pub struct CalibrationProcedure {
    white: Option<WhiteReference>,
    signatures: SignatureSet,
    completed: usize,
}

impl CalibrationProcedure {
    pub fn new() -> Self {
        Self::default()
    }

    /// Step waiting for a reading, `None` once all steps are recorded
    pub fn current_step(&self) -> Option<CalibrationStep> {
        CalibrationStep::SEQUENCE.get(self.completed).copied()
    }

    /// Steps not yet recorded, in order
    pub fn pending_steps(&self) -> Vec<CalibrationStep> {
        CalibrationStep::SEQUENCE[self.completed..].to_vec()
    }

    pub fn white_reference(&self) -> Option<&WhiteReference> {
        self.white.as_ref()
    }

    pub fn signatures(&self) -> &SignatureSet {
        &self.signatures
    }

    /// Record the normalized reading taken for `step`
    ///
    /// # Returns
    /// * `Ok(ChannelTriple)` - Stored values (white reference or balanced signature)
    /// * `Err(CalibrationError)` - Step out of order
    pub fn record(
        &mut self,
        step: CalibrationStep,
        normalized: ChannelTriple,
    ) -> Result<ChannelTriple, CalibrationError> {
        let expected = self.current_step();
        if expected != Some(step) {
            return Err(CalibrationError::OutOfOrder {
                expected,
                got: step,
            });
        }

        let stored = match step {
            CalibrationStep::White => {
                let reference = WhiteReference::capture(normalized);
                self.white = Some(reference);
                normalized
            }
            CalibrationStep::Color(label) => {
                let balanced = white_balance(&normalized, self.white.as_ref())?;
                self.signatures = self
                    .signatures
                    .with_signature(label, ColorSignature::new(balanced));
                balanced
            }
        };

        self.completed += 1;
        Ok(stored)
    }

    /// Finalize into a profile usable by the classifier
    ///
    /// # Errors
    /// `CalibrationError::Incomplete` listing the steps still pending
    pub fn finalize(self) -> Result<CalibrationProfile, CalibrationError> {
        match (self.white, self.signatures.complete()) {
            (Some(white), Some(signatures)) => Ok(CalibrationProfile::new(white, *signatures)),
            _ => Err(CalibrationError::Incomplete {
                pending: self.pending_steps(),
            }),
        }
    }

    /// Run the full sequence: prompt, acquire and record each step
    ///
    /// # Arguments
    /// * `aggregator` - Source of normalized readings
    /// * `prompt` - Operator interaction for each step
    pub fn run<S: RawSampler, P: CalibrationPrompt + ?Sized>(
        mut self,
        aggregator: &mut ChannelAggregator<S>,
        prompt: &mut P,
    ) -> Result<CalibrationProfile, ColorSensorError> {
        while let Some(step) = self.current_step() {
            prompt.request_material(step).inspect_err(|err| {
                log_calibration_error(err, "request_material");
            })?;

            tracing::info!("[Calibration] Capturing {}", step.display_name());
            let normalized = aggregator.acquire_normalized()?;
            let stored = self.record(step, normalized)?;

            tracing::info!(
                "[Calibration] {} stored: red={:.3} green={:.3} blue={:.3}",
                step.display_name(),
                stored.red,
                stored.green,
                stored.blue
            );
            prompt.report_capture(step, &stored);
        }

        tracing::info!("[Calibration] Calibration complete");
        Ok(self.finalize()?)
    }
}

#[cfg(test)]
#[path = "procedure_tests.rs"]
mod tests;
