// Color Sensor Core - TCS3200 colour detection pipeline
// Pulse sampling, white-balanced calibration and cosine-similarity matching

// Module declarations
pub mod acquisition;
pub mod analysis;
pub mod calibration;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod pins;

// Re-exports for convenience
pub use acquisition::{ChannelAggregator, ChannelTriple, ColorLabel, FrequencySampler};
pub use analysis::{Classification, Classifier, DetectedColor};
pub use calibration::{
    AutoConfirm, CalibrationProcedure, CalibrationProfile, CalibrationPrompt, CalibrationStep,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SensorConfig;
pub use engine::{ColorSensor, Detection, SensorPhase};
pub use error::{CalibrationError, ColorSensorError, ErrorCode, SensorError};
pub use pins::{BoardHandle, PinInterface, PinLevel, PinMode, SimulatedBoard, Swatch};
