//! Engine module housing the sensor session.
//!
//! `ColorSensor` ties the pin interface, the acquisition pipeline, the
//! calibration procedure and the classifier together behind one owned handle.

pub mod core;

pub use core::{ColorSensor, Detection, SensorPhase};
