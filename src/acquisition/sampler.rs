// FrequencySampler - single pulse measurement on the sensor output
//
// The TCS3200 emits a square wave whose frequency tracks the light reaching
// the selected photodiodes. One high phase is timed and its inverse is used
// as the intensity, which avoids a full-cycle counter at the cost of some
// precision.
//
// Sequence per sample:
// 1. Drive S2/S3 for the requested filter
// 2. Sleep the settling delay
// 3. Poll until OUT is high (own deadline), record start
// 4. Poll until OUT is low (fresh deadline), record end
// 5. Return 1 / (end - start) in 1/s
//
// A missing edge is a zero reading, not an error.

use std::time::Duration;

use crate::acquisition::channel::FilterSelect;
use crate::clock::Clock;
use crate::config::{PinAssignment, TimingConfig};
use crate::error::SensorError;
use crate::pins::{PinId, PinInterface, PinLevel};

/// Source of raw, frequency-proportional readings
pub trait RawSampler {
    /// Take one raw reading through `filter`
    ///
    /// # Returns
    /// * `Ok(0.0)` - no pulse seen before a timeout
    /// * `Ok(x)` - intensity, higher means more light
    /// * `Err(SensorError)` - transport failure
    fn sample(&mut self, filter: FilterSelect) -> Result<f64, SensorError>;
}

impl<S: RawSampler + ?Sized> RawSampler for &mut S {
    fn sample(&mut self, filter: FilterSelect) -> Result<f64, SensorError> {
        (**self).sample(filter)
    }
}

/// Pulse-width sampler driving the board pins directly
pub struct FrequencySampler<'a, P: PinInterface, C: Clock> {
    pins: &'a mut P,
    clock: &'a C,
    assignment: PinAssignment,
    timing: TimingConfig,
}

impl<'a, P: PinInterface, C: Clock> FrequencySampler<'a, P, C> {
    pub fn new(
        pins: &'a mut P,
        clock: &'a C,
        assignment: PinAssignment,
        timing: TimingConfig,
    ) -> Self {
        Self {
            pins,
            clock,
            assignment,
            timing,
        }
    }

    /// Poll `pin` until it reads `level` or `timeout` elapses
    ///
    /// The deadline is computed when this call starts, so consecutive waits
    /// each get their own full window.
    ///
    /// # Returns
    /// Time at which the level was observed, `None` on timeout
    fn wait_for_level(
        &mut self,
        pin: PinId,
        level: PinLevel,
        timeout: Duration,
    ) -> Result<Option<Duration>, SensorError> {
        let deadline = self.clock.now() + timeout;
        loop {
            if self.pins.read(pin)? == level {
                return Ok(Some(self.clock.now()));
            }
            if self.clock.now() > deadline {
                return Ok(None);
            }
        }
    }
}

impl<P: PinInterface, C: Clock> RawSampler for FrequencySampler<'_, P, C> {
    fn sample(&mut self, filter: FilterSelect) -> Result<f64, SensorError> {
        self.pins
            .write(self.assignment.s2, PinLevel::from(filter.s2))?;
        self.pins
            .write(self.assignment.s3, PinLevel::from(filter.s3))?;
        self.clock.sleep(self.timing.settle());

        let out = self.assignment.out;
        let timeout = self.timing.edge_timeout();

        let Some(start) = self.wait_for_level(out, PinLevel::High, timeout)? else {
            tracing::debug!("[Sampler] No rising edge within {:?} ({:?})", timeout, filter);
            return Ok(0.0);
        };

        let Some(end) = self.wait_for_level(out, PinLevel::Low, timeout)? else {
            tracing::debug!("[Sampler] No falling edge within {:?} ({:?})", timeout, filter);
            return Ok(0.0);
        };

        if end > start {
            Ok(1.0 / (end - start).as_secs_f64())
        } else {
            Ok(0.0)
        }
    }
}
