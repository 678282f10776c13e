// SimulatedBoard - software model of a TCS3200 wired to a microcontroller
//
// Stands in for the board transport in the CLI demo and in tests. The output
// pin produces a square wave whose frequency is
//
//   full_scale_hz * scaling(S0, S1) * gain[channel] * reflectance[channel]
//
// for the filter selected by S2/S3 and the swatch currently placed under the
// sensor. The wave restarts low at the first read after a filter change, so
// every pulse measurement sees one complete high phase.

use std::collections::HashMap;
use std::io;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::acquisition::{ChannelTriple, ColorLabel, FilterSelect};
use crate::clock::Clock;
use crate::config::{FrequencyScaling, PinAssignment};
use crate::error::SensorError;
use crate::pins::{PinId, PinInterface, PinLevel, PinMode};

/// Digital pins available on the simulated board
const PIN_COUNT: PinId = 20;

/// Output frequency at 100% scaling for a perfectly reflective surface
const DEFAULT_FULL_SCALE_HZ: f64 = 12_000.0;

/// Material under the sensor, as per-channel reflectance in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Swatch {
    pub reflectance: ChannelTriple,
}

impl Swatch {
    pub const WHITE: Swatch = Swatch::new(0.92, 0.92, 0.92);
    pub const RED: Swatch = Swatch::new(0.85, 0.14, 0.12);
    pub const GREEN: Swatch = Swatch::new(0.16, 0.72, 0.22);
    pub const BLUE: Swatch = Swatch::new(0.10, 0.24, 0.80);
    pub const BLACK: Swatch = Swatch::new(0.0, 0.0, 0.0);

    pub const fn new(red: f64, green: f64, blue: f64) -> Self {
        Self {
            reflectance: ChannelTriple::new(red, green, blue),
        }
    }

    /// Reference swatch for a calibration colour
    pub fn primary(label: ColorLabel) -> Self {
        match label {
            ColorLabel::Red => Swatch::RED,
            ColorLabel::Green => Swatch::GREEN,
            ColorLabel::Blue => Swatch::BLUE,
        }
    }
}

impl FromStr for Swatch {
    type Err = String;

    /// Accepts a preset name or `r/g/b` reflectances
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "white" => Ok(Swatch::WHITE),
            "red" => Ok(Swatch::RED),
            "green" => Ok(Swatch::GREEN),
            "blue" => Ok(Swatch::BLUE),
            "black" => Ok(Swatch::BLACK),
            other => {
                let parts: Vec<&str> = other.split('/').collect();
                if parts.len() != 3 {
                    return Err(format!(
                        "unknown swatch '{}': expected white|red|green|blue|black or r/g/b",
                        s
                    ));
                }
                let mut values = [0.0; 3];
                for (value, part) in values.iter_mut().zip(&parts) {
                    *value = part
                        .trim()
                        .parse::<f64>()
                        .map_err(|err| format!("invalid reflectance '{}': {}", part, err))?;
                    if !(0.0..=1.0).contains(value) {
                        return Err(format!("reflectance {} outside [0, 1]", value));
                    }
                }
                Ok(Swatch::new(values[0], values[1], values[2]))
            }
        }
    }
}

/// Shared slot holding the swatch currently under the sensor
#[derive(Debug, Clone)]
pub struct SwatchHandle(Arc<Mutex<Swatch>>);

impl SwatchHandle {
    pub fn new(swatch: Swatch) -> Self {
        Self(Arc::new(Mutex::new(swatch)))
    }

    pub fn place(&self, swatch: Swatch) {
        *self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = swatch;
    }

    pub fn current(&self) -> Swatch {
        *self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Simulated board exposing the sensor through [`PinInterface`]
pub struct SimulatedBoard<C: Clock> {
    clock: C,
    assignment: PinAssignment,
    swatch: SwatchHandle,
    full_scale_hz: f64,
    /// Photodiode responsivity per channel
    gain: ChannelTriple,
    modes: HashMap<PinId, PinMode>,
    outputs: HashMap<PinId, PinLevel>,
    /// Start of the current square wave, set lazily by the first OUT read
    phase_origin: Option<Duration>,
    jitter: Option<(f64, StdRng)>,
    jitter_factor: f64,
    stuck_output: Option<PinLevel>,
    failing_pin: Option<PinId>,
    /// Port the board cannot be reached through, if any
    missing_port: Option<String>,
    released: bool,
    releases: Arc<AtomicUsize>,
}

impl<C: Clock> SimulatedBoard<C> {
    pub fn new(clock: C, assignment: PinAssignment, swatch: SwatchHandle) -> Self {
        Self {
            clock,
            assignment,
            swatch,
            full_scale_hz: DEFAULT_FULL_SCALE_HZ,
            gain: ChannelTriple::new(1.0, 0.85, 0.72),
            modes: HashMap::new(),
            outputs: HashMap::new(),
            phase_origin: None,
            jitter: None,
            jitter_factor: 1.0,
            stuck_output: None,
            failing_pin: None,
            missing_port: None,
            released: false,
            releases: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Override the full-scale output frequency
    pub fn with_full_scale_hz(mut self, hz: f64) -> Self {
        self.full_scale_hz = hz;
        self
    }

    /// Override the per-channel photodiode responsivity
    pub fn with_gain(mut self, gain: ChannelTriple) -> Self {
        self.gain = gain;
        self
    }

    /// Randomly scale the frequency by up to +/-`amplitude` on every filter change
    pub fn with_jitter(mut self, amplitude: f64, seed: u64) -> Self {
        self.jitter = Some((amplitude.abs(), StdRng::seed_from_u64(seed)));
        self
    }

    /// Hold the output at a fixed level regardless of light
    pub fn with_stuck_output(mut self, level: PinLevel) -> Self {
        self.stuck_output = Some(level);
        self
    }

    /// Make every operation on `pin` fail with a transport error
    pub fn with_failing_pin(mut self, pin: PinId) -> Self {
        self.failing_pin = Some(pin);
        self
    }

    /// Behave as if the board's serial port does not exist
    pub fn with_missing_port(mut self, port: &str) -> Self {
        self.missing_port = Some(port.to_string());
        self
    }

    /// Counter of `release()` calls, observable after the board is moved
    pub fn release_counter(&self) -> Arc<AtomicUsize> {
        self.releases.clone()
    }

    /// Frequency the output would currently produce, in Hz
    pub fn output_frequency(&self) -> f64 {
        let scaling = FrequencyScaling::from_select_bits(
            self.output_level(self.assignment.s0).is_high(),
            self.output_level(self.assignment.s1).is_high(),
        );
        let filter = FilterSelect::new(
            self.output_level(self.assignment.s2).is_high(),
            self.output_level(self.assignment.s3).is_high(),
        );
        let reflectance = self.swatch.current().reflectance;
        let response = match filter.channel() {
            Some(channel) => self.gain.get(channel) * reflectance.get(channel),
            None => {
                ColorLabel::ALL
                    .iter()
                    .map(|&c| self.gain.get(c) * reflectance.get(c))
                    .sum::<f64>()
                    / 3.0
            }
        };

        self.full_scale_hz * scaling.factor() * response * self.jitter_factor
    }

    fn output_level(&self, pin: PinId) -> PinLevel {
        self.outputs.get(&pin).copied().unwrap_or(PinLevel::Low)
    }

    fn check_pin(&self, pin: PinId) -> Result<(), SensorError> {
        if self.released {
            return Err(SensorError::Released);
        }
        if let Some(port) = &self.missing_port {
            let err = io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such port: {}", port),
            );
            return Err(err.into());
        }
        if pin >= PIN_COUNT {
            return Err(SensorError::InvalidPin { pin });
        }
        if self.failing_pin == Some(pin) {
            return Err(SensorError::PinIo {
                pin,
                reason: "injected fault".to_string(),
            });
        }
        Ok(())
    }

    fn sensor_output(&mut self) -> PinLevel {
        if let Some(level) = self.stuck_output {
            return level;
        }

        let frequency = self.output_frequency();
        let now = self.clock.now();
        if frequency <= 0.0 {
            return PinLevel::Low;
        }

        let origin = *self.phase_origin.get_or_insert(now);
        let half_period = 0.5 / frequency;
        let elapsed = now.saturating_sub(origin).as_secs_f64();
        let half_periods = (elapsed / half_period).floor() as u64;
        PinLevel::from(half_periods % 2 == 1)
    }

    fn restart_wave(&mut self) {
        self.phase_origin = None;
        if let Some((amplitude, rng)) = self.jitter.as_mut() {
            self.jitter_factor = if *amplitude > 0.0 {
                1.0 + rng.gen_range(-*amplitude..=*amplitude)
            } else {
                1.0
            };
        }
    }
}

impl<C: Clock> PinInterface for SimulatedBoard<C> {
    fn set_mode(&mut self, pin: PinId, mode: PinMode) -> Result<(), SensorError> {
        self.check_pin(pin)?;
        self.modes.insert(pin, mode);
        Ok(())
    }

    fn write(&mut self, pin: PinId, level: PinLevel) -> Result<(), SensorError> {
        self.check_pin(pin)?;
        if self.modes.get(&pin) != Some(&PinMode::Output) {
            return Err(SensorError::PinIo {
                pin,
                reason: "pin not configured as output".to_string(),
            });
        }

        self.outputs.insert(pin, level);
        if pin == self.assignment.s2 || pin == self.assignment.s3 {
            self.restart_wave();
        }
        Ok(())
    }

    fn read(&mut self, pin: PinId) -> Result<PinLevel, SensorError> {
        self.check_pin(pin)?;
        if pin != self.assignment.out {
            return Ok(self.output_level(pin));
        }
        if self.modes.get(&pin) != Some(&PinMode::Input) {
            return Err(SensorError::PinIo {
                pin,
                reason: "pin not configured as input".to_string(),
            });
        }
        Ok(self.sensor_output())
    }

    fn release(&mut self) -> Result<(), SensorError> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        if self.released {
            return Err(SensorError::Released);
        }
        self.released = true;
        Ok(())
    }
}
