// Pin interface - digital I/O capability of the microcontroller board
//
// The transport behind the board (serial protocol, background refresh) is
// not modelled here. The pipeline only needs blocking digital reads and
// writes plus a release hook, provided through PinInterface.
//
// BoardHandle owns the interface and guarantees it is released exactly once,
// whether the session ends normally, on error or on drop.

pub mod simulated;

pub use simulated::{SimulatedBoard, Swatch, SwatchHandle};

use crate::error::{log_sensor_error, SensorError};

/// Board pin number
pub type PinId = u8;

/// Binary digital state of a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinLevel {
    Low,
    High,
}

impl PinLevel {
    pub fn is_high(self) -> bool {
        self == PinLevel::High
    }
}

impl From<bool> for PinLevel {
    fn from(high: bool) -> Self {
        if high {
            PinLevel::High
        } else {
            PinLevel::Low
        }
    }
}

/// Direction of a digital pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    Input,
    Output,
}

/// Digital I/O exposed by the board transport
///
/// All calls are synchronous and may block on the transport.
pub trait PinInterface {
    /// Configure pin direction
    fn set_mode(&mut self, pin: PinId, mode: PinMode) -> Result<(), SensorError>;

    /// Drive an output pin
    fn write(&mut self, pin: PinId, level: PinLevel) -> Result<(), SensorError>;

    /// Sample an input pin
    fn read(&mut self, pin: PinId) -> Result<PinLevel, SensorError>;

    /// Close the transport. Called at most once by [`BoardHandle`].
    fn release(&mut self) -> Result<(), SensorError>;
}

/// Owned pin interface with idempotent release
pub struct BoardHandle<P: PinInterface> {
    pins: Option<P>,
}

impl<P: PinInterface> BoardHandle<P> {
    pub fn new(pins: P) -> Self {
        Self { pins: Some(pins) }
    }

    /// Whether the interface has not been released yet
    pub fn is_open(&self) -> bool {
        self.pins.is_some()
    }

    /// Mutable access to the interface
    ///
    /// # Errors
    /// `SensorError::Released` after `shutdown()`
    pub fn pins_mut(&mut self) -> Result<&mut P, SensorError> {
        self.pins.as_mut().ok_or(SensorError::Released)
    }

    /// Release the interface
    ///
    /// Safe to call any number of times; only the first call reaches the
    /// transport. Release failures are logged, not returned, since this runs
    /// on error and drop paths.
    ///
    /// # Returns
    /// `true` if this call performed the release
    pub fn shutdown(&mut self) -> bool {
        match self.pins.take() {
            Some(mut pins) => {
                if let Err(err) = pins.release() {
                    log_sensor_error(&err, "shutdown");
                } else {
                    tracing::info!("[Board] Pin interface released");
                }
                true
            }
            None => false,
        }
    }
}

impl<P: PinInterface> Drop for BoardHandle<P> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
