// Sensor transport error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Sensor error code constants
///
/// Single source of truth for the numeric codes reported by [`SensorError`].
///
/// Error code range: 1001-1005
pub struct SensorErrorCodes {}

impl SensorErrorCodes {
    /// Pin interface could not be opened
    pub const TRANSPORT_INIT: i32 = 1001;

    /// A digital read or write failed on the transport
    pub const PIN_IO: i32 = 1002;

    /// Pin id is not known to the board
    pub const INVALID_PIN: i32 = 1003;

    /// Pin interface was already released
    pub const RELEASED: i32 = 1004;

    /// Sensor configuration is unusable
    pub const INVALID_CONFIG: i32 = 1005;
}

/// Log a sensor error with structured context
///
/// Logs the numeric code, the component and the human-readable message.
pub fn log_sensor_error(err: &SensorError, context: &str) {
    error!(
        "Sensor error in {}: code={}, component=PinInterface, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Transport and hardware errors
///
/// Sampling timeouts are not represented here: a missing edge degrades to a
/// zero reading. These variants cover failures of the pin transport itself.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorError {
    /// Pin interface could not be opened or configured at startup
    TransportInit { reason: String },

    /// A read or write on a pin failed
    PinIo { pin: u8, reason: String },

    /// Pin id outside the board's range
    InvalidPin { pin: u8 },

    /// Pin interface has been released by shutdown()
    Released,

    /// Configuration rejected by validation
    InvalidConfig { reason: String },
}

impl ErrorCode for SensorError {
    fn code(&self) -> i32 {
        match self {
            SensorError::TransportInit { .. } => SensorErrorCodes::TRANSPORT_INIT,
            SensorError::PinIo { .. } => SensorErrorCodes::PIN_IO,
            SensorError::InvalidPin { .. } => SensorErrorCodes::INVALID_PIN,
            SensorError::Released => SensorErrorCodes::RELEASED,
            SensorError::InvalidConfig { .. } => SensorErrorCodes::INVALID_CONFIG,
        }
    }

    fn message(&self) -> String {
        match self {
            SensorError::TransportInit { reason } => {
                format!("Failed to open pin interface: {}", reason)
            }
            SensorError::PinIo { pin, reason } => {
                format!("I/O failure on pin {}: {}", pin, reason)
            }
            SensorError::InvalidPin { pin } => format!("Pin {} is not available", pin),
            SensorError::Released => {
                "Pin interface already released. Open a new session.".to_string()
            }
            SensorError::InvalidConfig { reason } => {
                format!("Invalid sensor configuration: {}", reason)
            }
        }
    }
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SensorError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for SensorError {}

impl From<std::io::Error> for SensorError {
    fn from(err: std::io::Error) -> Self {
        SensorError::TransportInit {
            reason: err.to_string(),
        }
    }
}
