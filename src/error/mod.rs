// Error types for the colour sensor
//
// Transport failures and calibration sequencing faults are kept in separate
// enums with their own code ranges. ColorSensorError wraps both for session
// operations that can hit either.

mod calibration;
mod sensor;

pub use calibration::{log_calibration_error, CalibrationError, CalibrationErrorCodes};
pub use sensor::{log_sensor_error, SensorError, SensorErrorCodes};

use std::fmt;

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}

/// Error returned by session-level operations
#[derive(Debug, Clone, PartialEq)]
pub enum ColorSensorError {
    Sensor(SensorError),
    Calibration(CalibrationError),
}

impl ErrorCode for ColorSensorError {
    fn code(&self) -> i32 {
        match self {
            ColorSensorError::Sensor(err) => err.code(),
            ColorSensorError::Calibration(err) => err.code(),
        }
    }

    fn message(&self) -> String {
        match self {
            ColorSensorError::Sensor(err) => err.message(),
            ColorSensorError::Calibration(err) => err.message(),
        }
    }
}

impl fmt::Display for ColorSensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorSensorError::Sensor(err) => err.fmt(f),
            ColorSensorError::Calibration(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for ColorSensorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ColorSensorError::Sensor(err) => Some(err),
            ColorSensorError::Calibration(err) => Some(err),
        }
    }
}

impl From<SensorError> for ColorSensorError {
    fn from(err: SensorError) -> Self {
        ColorSensorError::Sensor(err)
    }
}

impl From<CalibrationError> for ColorSensorError {
    fn from(err: CalibrationError) -> Self {
        ColorSensorError::Calibration(err)
    }
}
