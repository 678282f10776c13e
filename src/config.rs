//! Configuration management for the sensor pipeline
//!
//! Every numeric constant of the acquisition and classification pipeline lives
//! here so it can be overridden from a JSON file without recompilation. The
//! defaults match the TCS3200 wiring and timings the pipeline was tuned for.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::SensorError;
use crate::pins::PinId;

/// Complete sensor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SensorConfig {
    pub pins: PinAssignment,
    pub scaling: FrequencyScaling,
    pub timing: TimingConfig,
    pub acquisition: AcquisitionConfig,
    pub classification: ClassificationConfig,
}

/// Board pin assigned to each sensor role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinAssignment {
    /// Frequency scaling bit 0
    pub s0: PinId,
    /// Frequency scaling bit 1
    pub s1: PinId,
    /// Filter select bit 0
    pub s2: PinId,
    /// Filter select bit 1
    pub s3: PinId,
    /// Square-wave output of the sensor (input on the board side)
    pub out: PinId,
}

impl Default for PinAssignment {
    fn default() -> Self {
        Self {
            s0: 4,
            s1: 5,
            s2: 6,
            s3: 7,
            out: 8,
        }
    }
}

impl PinAssignment {
    fn all(&self) -> [PinId; 5] {
        [self.s0, self.s1, self.s2, self.s3, self.out]
    }
}

/// Output frequency scaling selected through S0/S1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyScaling {
    PowerDown,
    TwoPercent,
    #[default]
    TwentyPercent,
    Full,
}

impl FrequencyScaling {
    /// Levels written to (S0, S1)
    pub fn select_bits(self) -> (bool, bool) {
        match self {
            FrequencyScaling::PowerDown => (false, false),
            FrequencyScaling::TwoPercent => (false, true),
            FrequencyScaling::TwentyPercent => (true, false),
            FrequencyScaling::Full => (true, true),
        }
    }

    /// Fraction of the full-scale output frequency
    pub fn factor(self) -> f64 {
        match self {
            FrequencyScaling::PowerDown => 0.0,
            FrequencyScaling::TwoPercent => 0.02,
            FrequencyScaling::TwentyPercent => 0.2,
            FrequencyScaling::Full => 1.0,
        }
    }

    pub fn from_select_bits(s0: bool, s1: bool) -> Self {
        match (s0, s1) {
            (false, false) => FrequencyScaling::PowerDown,
            (false, true) => FrequencyScaling::TwoPercent,
            (true, false) => FrequencyScaling::TwentyPercent,
            (true, true) => FrequencyScaling::Full,
        }
    }
}

/// Delays and timeouts, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Wait after switching filters before measuring
    pub settle_ms: u64,
    /// Bound on each of the rising and falling edge waits
    pub edge_timeout_ms: u64,
    /// Pause between detection cycles
    pub cycle_delay_ms: u64,
    /// Wait after configuring the pins at startup
    pub stabilization_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            settle_ms: 100,
            edge_timeout_ms: 500,
            cycle_delay_ms: 500,
            stabilization_ms: 1000,
        }
    }
}

impl TimingConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn edge_timeout(&self) -> Duration {
        Duration::from_millis(self.edge_timeout_ms)
    }

    pub fn cycle_delay(&self) -> Duration {
        Duration::from_millis(self.cycle_delay_ms)
    }

    pub fn stabilization(&self) -> Duration {
        Duration::from_millis(self.stabilization_ms)
    }
}

/// Channel aggregation parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    /// Raw samples taken per channel for one normalized reading
    pub samples_per_channel: usize,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            samples_per_channel: 10,
        }
    }
}

/// Classifier parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationConfig {
    /// Minimum cosine similarity (inclusive) for a confident match
    pub similarity_threshold: f64,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.85,
        }
    }
}

impl SensorConfig {
    /// Load configuration from JSON file
    ///
    /// Missing sections fall back to their defaults. If the file cannot be
    /// read or parsed, the complete default configuration is returned.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Reject configurations the pipeline cannot run with
    pub fn validate(&self) -> Result<(), SensorError> {
        let pins = self.pins.all();
        for (i, pin) in pins.iter().enumerate() {
            if pins[i + 1..].contains(pin) {
                return Err(SensorError::InvalidConfig {
                    reason: format!("pin {} assigned to more than one role", pin),
                });
            }
        }

        if self.acquisition.samples_per_channel == 0 {
            return Err(SensorError::InvalidConfig {
                reason: "samples_per_channel must be at least 1".to_string(),
            });
        }

        let threshold = self.classification.similarity_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(SensorError::InvalidConfig {
                reason: format!("similarity_threshold {} outside (0, 1]", threshold),
            });
        }

        if self.timing.edge_timeout_ms == 0 {
            return Err(SensorError::InvalidConfig {
                reason: "edge_timeout_ms must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}
