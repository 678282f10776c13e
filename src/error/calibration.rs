// Calibration error types and constants

use crate::calibration::CalibrationStep;
use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Calibration error code constants
///
/// Error code range: 2001-2006
pub struct CalibrationErrorCodes {}

impl CalibrationErrorCodes {
    /// White-balancing attempted without a captured white reference
    pub const WHITE_REFERENCE_MISSING: i32 = 2001;

    /// A reference was recorded for the wrong step
    pub const OUT_OF_ORDER: i32 = 2002;

    /// Calibration finalized before every step was recorded
    pub const INCOMPLETE: i32 = 2003;

    /// Detection attempted before calibration completed
    pub const NOT_CALIBRATED: i32 = 2004;

    /// Session was already calibrated
    pub const ALREADY_CALIBRATED: i32 = 2005;

    /// Operator aborted the calibration prompt
    pub const ABORTED: i32 = 2006;
}

/// Log a calibration error with structured context
///
/// Logs the numeric code, the component and the human-readable message.
pub fn log_calibration_error(err: &CalibrationError, context: &str) {
    error!(
        "Calibration error in {}: code={}, component=CalibrationProcedure, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Calibration-related errors
///
/// These are sequencing faults: they abort the operation that raised them
/// instead of degrading to a default value.
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// White-balance requested before the white reference was captured
    WhiteReferenceMissing,

    /// Reference recorded for a step other than the current one
    OutOfOrder {
        expected: Option<CalibrationStep>,
        got: CalibrationStep,
    },

    /// Finalize called with steps still pending
    Incomplete { pending: Vec<CalibrationStep> },

    /// Session has no calibration profile yet
    NotCalibrated,

    /// Session already holds a calibration profile
    AlreadyCalibrated,

    /// Operator cancelled at a prompt
    Aborted { step: CalibrationStep },
}

impl ErrorCode for CalibrationError {
    fn code(&self) -> i32 {
        match self {
            CalibrationError::WhiteReferenceMissing => {
                CalibrationErrorCodes::WHITE_REFERENCE_MISSING
            }
            CalibrationError::OutOfOrder { .. } => CalibrationErrorCodes::OUT_OF_ORDER,
            CalibrationError::Incomplete { .. } => CalibrationErrorCodes::INCOMPLETE,
            CalibrationError::NotCalibrated => CalibrationErrorCodes::NOT_CALIBRATED,
            CalibrationError::AlreadyCalibrated => CalibrationErrorCodes::ALREADY_CALIBRATED,
            CalibrationError::Aborted { .. } => CalibrationErrorCodes::ABORTED,
        }
    }

    fn message(&self) -> String {
        match self {
            CalibrationError::WhiteReferenceMissing => {
                "White reference not captured. Calibrate white first.".to_string()
            }
            CalibrationError::OutOfOrder { expected, got } => match expected {
                Some(expected) => format!(
                    "Calibration step out of order: expected {}, got {}",
                    expected.display_name(),
                    got.display_name()
                ),
                None => format!(
                    "Calibration already finished, cannot record {}",
                    got.display_name()
                ),
            },
            CalibrationError::Incomplete { pending } => {
                let names: Vec<&str> = pending.iter().map(|s| s.display_name()).collect();
                format!("Calibration incomplete: pending {}", names.join(", "))
            }
            CalibrationError::NotCalibrated => "Sensor not calibrated".to_string(),
            CalibrationError::AlreadyCalibrated => {
                "Sensor already calibrated. Open a new session to recalibrate.".to_string()
            }
            CalibrationError::Aborted { step } => {
                format!("Calibration aborted at {} step", step.display_name())
            }
        }
    }
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CalibrationError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for CalibrationError {}
