//! ColorSensor: session owning the board and driving the pipeline.
//!
//! Lifecycle:
//!
//! ```text
//! (unopened) --open--> Calibrating --calibrate--> Ready --detect/run--> Ready
//!                          |                        |
//!                          +-------shutdown---------+--> ShutDown
//! ```
//!
//! There is no way back from `Ready` to `Calibrating`; recalibrating means
//! opening a new session. The calibration profile is published once as an
//! `Arc` and never mutated afterwards.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::acquisition::{ChannelAggregator, ChannelTriple, FrequencySampler};
use crate::analysis::{Classification, Classifier};
use crate::calibration::{CalibrationProcedure, CalibrationProfile, CalibrationPrompt};
use crate::clock::Clock;
use crate::config::SensorConfig;
use crate::error::{
    log_calibration_error, log_sensor_error, CalibrationError, ColorSensorError, SensorError,
};
use crate::pins::{BoardHandle, PinInterface, PinLevel, PinMode};

/// Session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorPhase {
    /// Board configured, no calibration profile yet
    Calibrating,
    /// Calibrated, detection cycles allowed
    Ready,
    /// Pin interface released
    ShutDown,
}

/// One detection cycle's result, for reporting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    /// 1-based cycle counter for this session
    pub cycle: u64,
    /// Normalized ratios before white balance
    pub ratios: ChannelTriple,
    pub classification: Classification,
}

/// ColorSensor owns the pin interface and the calibration profile
pub struct ColorSensor<P: PinInterface, C: Clock> {
    board: BoardHandle<P>,
    clock: C,
    config: SensorConfig,
    profile: Option<Arc<CalibrationProfile>>,
    cycles: u64,
}

impl<P: PinInterface, C: Clock> ColorSensor<P, C> {
    /// Configure the board and wait for the sensor to stabilize
    ///
    /// Sets S0-S3 as outputs, OUT as input, and writes the frequency scaling
    /// bits.
    ///
    /// # Errors
    /// * `SensorError::InvalidConfig` - configuration rejected by validation
    /// * Any transport error raised while configuring the pins
    ///
    /// The pin interface is released before an error is returned.
    pub fn open(pins: P, clock: C, config: SensorConfig) -> Result<Self, SensorError> {
        let mut board = BoardHandle::new(pins);

        let configured = config
            .validate()
            .and_then(|()| Self::configure(&mut board, &config));
        if let Err(err) = configured {
            log_sensor_error(&err, "open");
            board.shutdown();
            return Err(err);
        }

        tracing::info!(
            "[Sensor] Pins configured (out={}, scaling={:?}), stabilizing for {:?}",
            config.pins.out,
            config.scaling,
            config.timing.stabilization()
        );
        clock.sleep(config.timing.stabilization());

        Ok(Self {
            board,
            clock,
            config,
            profile: None,
            cycles: 0,
        })
    }

    fn configure(board: &mut BoardHandle<P>, config: &SensorConfig) -> Result<(), SensorError> {
        let pins = board.pins_mut()?;
        let assignment = config.pins;

        for pin in [assignment.s0, assignment.s1, assignment.s2, assignment.s3] {
            pins.set_mode(pin, PinMode::Output)?;
        }
        pins.set_mode(assignment.out, PinMode::Input)?;

        let (s0, s1) = config.scaling.select_bits();
        pins.write(assignment.s0, PinLevel::from(s0))?;
        pins.write(assignment.s1, PinLevel::from(s1))?;
        Ok(())
    }

    pub fn phase(&self) -> SensorPhase {
        if !self.board.is_open() {
            SensorPhase::ShutDown
        } else if self.profile.is_some() {
            SensorPhase::Ready
        } else {
            SensorPhase::Calibrating
        }
    }

    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Calibration profile, once calibrated
    pub fn profile(&self) -> Option<&Arc<CalibrationProfile>> {
        self.profile.as_ref()
    }

    /// Number of completed detection cycles
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Acquire one averaged reading (mean raw value per channel)
    pub fn read_averaged(&mut self) -> Result<ChannelTriple, SensorError> {
        self.aggregator()?.acquire_averaged()
    }

    /// Acquire one normalized reading (ratios summing to 1, or all zero)
    pub fn read_normalized(&mut self) -> Result<ChannelTriple, SensorError> {
        self.aggregator()?.acquire_normalized()
    }

    fn aggregator(
        &mut self,
    ) -> Result<ChannelAggregator<FrequencySampler<'_, P, C>>, SensorError> {
        let pins = self.board.pins_mut()?;
        let sampler = FrequencySampler::new(pins, &self.clock, self.config.pins, self.config.timing);
        Ok(ChannelAggregator::new(
            sampler,
            self.config.acquisition.samples_per_channel,
        ))
    }

    /// Capture the white reference and the three colour signatures
    ///
    /// # Arguments
    /// * `prompt` - Operator interaction, asked once per step in
    ///   WHITE, RED, GREEN, BLUE order
    ///
    /// # Errors
    /// * `CalibrationError::AlreadyCalibrated` - session already Ready
    /// * `CalibrationError::Aborted` - operator cancelled
    /// * `SensorError` - transport failure or session shut down
    pub fn calibrate<Q: CalibrationPrompt + ?Sized>(
        &mut self,
        prompt: &mut Q,
    ) -> Result<Arc<CalibrationProfile>, ColorSensorError> {
        match self.phase() {
            SensorPhase::Calibrating => {}
            SensorPhase::Ready => {
                let err = CalibrationError::AlreadyCalibrated;
                log_calibration_error(&err, "calibrate");
                return Err(err.into());
            }
            SensorPhase::ShutDown => return Err(SensorError::Released.into()),
        }

        tracing::info!("[Sensor] Starting colour calibration");
        let mut aggregator = self.aggregator()?;
        let profile = Arc::new(CalibrationProcedure::new().run(&mut aggregator, prompt)?);

        self.profile = Some(profile.clone());
        Ok(profile)
    }

    /// Classifier bound to this session's calibration
    ///
    /// # Errors
    /// `CalibrationError::NotCalibrated` before `calibrate()` succeeded
    pub fn classifier(&self) -> Result<Classifier, CalibrationError> {
        self.profile
            .as_ref()
            .map(|profile| {
                Classifier::new(
                    profile.clone(),
                    self.config.classification.similarity_threshold,
                )
            })
            .ok_or(CalibrationError::NotCalibrated)
    }

    /// Run one detection cycle: acquire, white-balance, classify
    pub fn detect(&mut self) -> Result<Detection, ColorSensorError> {
        let classifier = self.classifier()?;
        self.detect_with(&classifier)
    }

    fn detect_with(&mut self, classifier: &Classifier) -> Result<Detection, ColorSensorError> {
        let ratios = self.read_normalized()?;
        let classification = classifier.classify(&ratios);
        self.cycles += 1;

        tracing::info!(
            "[Sensor] Cycle {}: red={:.3} green={:.3} blue={:.3} -> {} ({:.3})",
            self.cycles,
            ratios.red,
            ratios.green,
            ratios.blue,
            classification.color,
            classification.confidence
        );

        Ok(Detection {
            cycle: self.cycles,
            ratios,
            classification,
        })
    }

    /// Repeat detection cycles until `stop` is set or `max_cycles` is reached
    ///
    /// `stop` is checked between cycles; an in-flight acquisition always
    /// completes. Each outcome is handed to `on_cycle`, including failed
    /// cycles, which are logged and skipped. The loop only aborts on
    /// `SensorError::Released`.
    ///
    /// # Returns
    /// Number of cycles run
    pub fn run<F>(
        &mut self,
        stop: &AtomicBool,
        max_cycles: Option<u64>,
        mut on_cycle: F,
    ) -> Result<u64, ColorSensorError>
    where
        F: FnMut(&Result<Detection, ColorSensorError>),
    {
        let classifier = self.classifier()?;
        let mut completed = 0;

        loop {
            if stop.load(Ordering::SeqCst) {
                tracing::info!("[Sensor] Stop requested after {} cycles", completed);
                break;
            }
            if max_cycles.is_some_and(|max| completed >= max) {
                break;
            }

            let outcome = self.detect_with(&classifier);
            completed += 1;
            on_cycle(&outcome);

            match outcome {
                Err(ColorSensorError::Sensor(SensorError::Released)) => {
                    return Err(SensorError::Released.into());
                }
                Err(ColorSensorError::Sensor(err)) => log_sensor_error(&err, "detect"),
                Err(ColorSensorError::Calibration(err)) => log_calibration_error(&err, "detect"),
                Ok(_) => {}
            }

            if stop.load(Ordering::SeqCst) || max_cycles.is_some_and(|max| completed >= max) {
                continue;
            }
            self.clock.sleep(self.config.timing.cycle_delay());
        }

        Ok(completed)
    }

    /// Release the pin interface
    ///
    /// Idempotent; later calls and the eventual drop are no-ops. The
    /// calibration profile stays readable.
    pub fn shutdown(&mut self) {
        if self.board.shutdown() {
            tracing::info!("[Sensor] Shut down after {} cycles", self.cycles);
        }
    }
}

#[cfg(test)]
mod tests;
