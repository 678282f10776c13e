use super::*;
use crate::acquisition::ColorLabel;
use crate::analysis::DetectedColor;
use crate::calibration::CalibrationStep;
use crate::clock::ManualClock;
use crate::error::ErrorCode;
use crate::pins::{SimulatedBoard, Swatch, SwatchHandle};
use std::sync::atomic::AtomicUsize;
use std::time::Duration;

type SimSensor = ColorSensor<SimulatedBoard<ManualClock>, ManualClock>;

struct Rig {
    sensor: SimSensor,
    swatch: SwatchHandle,
    clock: ManualClock,
    releases: Arc<AtomicUsize>,
}

/// Default timings, with a short edge timeout so dark readings stay cheap
fn test_config() -> SensorConfig {
    let mut config = SensorConfig::default();
    config.timing.edge_timeout_ms = 20;
    config
}

fn open_rig(config: SensorConfig) -> Rig {
    let clock = ManualClock::new(Duration::from_micros(1));
    let swatch = SwatchHandle::new(Swatch::BLACK);
    let board = SimulatedBoard::new(clock.clone(), config.pins, swatch.clone());
    let releases = board.release_counter();
    let sensor = match ColorSensor::open(board, clock.clone(), config) {
        Ok(sensor) => sensor,
        Err(err) => panic!("open failed: {}", err),
    };
    Rig {
        sensor,
        swatch,
        clock,
        releases,
    }
}

/// Places the matching reference swatch for every calibration step
struct SwatchPrompt {
    swatch: SwatchHandle,
    requested: Vec<CalibrationStep>,
}

impl SwatchPrompt {
    fn new(swatch: SwatchHandle) -> Self {
        Self {
            swatch,
            requested: Vec::new(),
        }
    }
}

impl CalibrationPrompt for SwatchPrompt {
    fn request_material(&mut self, step: CalibrationStep) -> Result<(), CalibrationError> {
        self.requested.push(step);
        let swatch = match step {
            CalibrationStep::White => Swatch::WHITE,
            CalibrationStep::Color(label) => Swatch::primary(label),
        };
        self.swatch.place(swatch);
        Ok(())
    }
}

fn calibrated_rig() -> Rig {
    let mut rig = open_rig(test_config());
    let mut prompt = SwatchPrompt::new(rig.swatch.clone());
    rig.sensor.calibrate(&mut prompt).unwrap();
    rig
}

#[test]
fn test_open_configures_and_stabilizes() {
    let rig = open_rig(test_config());

    assert_eq!(rig.sensor.phase(), SensorPhase::Calibrating);
    assert!(rig.sensor.profile().is_none());
    assert!(rig.clock.elapsed() >= Duration::from_millis(1000));
}

#[test]
fn test_detect_before_calibration_fails() {
    let mut rig = open_rig(test_config());

    assert_eq!(
        rig.sensor.detect(),
        Err(ColorSensorError::Calibration(CalibrationError::NotCalibrated))
    );
    assert!(matches!(
        rig.sensor.classifier(),
        Err(CalibrationError::NotCalibrated)
    ));
}

#[test]
fn test_calibration_prompts_white_then_primaries() {
    let mut rig = open_rig(test_config());
    let mut prompt = SwatchPrompt::new(rig.swatch.clone());

    let profile = rig.sensor.calibrate(&mut prompt).unwrap();

    assert_eq!(prompt.requested, CalibrationStep::SEQUENCE.to_vec());
    assert_eq!(rig.sensor.phase(), SensorPhase::Ready);
    assert!((profile.white().values().sum() - 1.0).abs() < 1e-9);
    assert!(Arc::ptr_eq(&profile, rig.sensor.profile().unwrap()));
}

#[test]
fn test_primary_swatches_are_detected() {
    let mut rig = calibrated_rig();

    for label in ColorLabel::ALL {
        rig.swatch.place(Swatch::primary(label));
        let detection = rig.sensor.detect().unwrap();

        assert_eq!(
            detection.classification.color,
            DetectedColor::from(label),
            "scores {:?}",
            detection.classification.scores
        );
        assert!(detection.classification.confidence >= 0.85);
        assert!((detection.ratios.sum() - 1.0).abs() < 1e-9);
    }
    assert_eq!(rig.sensor.cycles(), 3);
}

#[test]
fn test_white_swatch_is_unknown() {
    let mut rig = calibrated_rig();
    rig.swatch.place(Swatch::WHITE);

    let detection = rig.sensor.detect().unwrap();

    assert_eq!(detection.classification.color, DetectedColor::Unknown);
    for channel in ColorLabel::ALL {
        assert!((detection.classification.balanced.get(channel) - 1.0).abs() < 1e-6);
    }
}

#[test]
fn test_dark_sensor_reads_zero_and_unknown() {
    let mut rig = calibrated_rig();
    rig.swatch.place(Swatch::BLACK);

    let detection = rig.sensor.detect().unwrap();

    assert_eq!(detection.ratios, ChannelTriple::ZERO);
    assert_eq!(detection.classification.color, DetectedColor::Unknown);
    assert_eq!(detection.classification.confidence, 0.0);
}

#[test]
fn test_calibrate_twice_is_rejected() {
    let mut rig = calibrated_rig();
    let mut prompt = SwatchPrompt::new(rig.swatch.clone());

    assert_eq!(
        rig.sensor.calibrate(&mut prompt),
        Err(ColorSensorError::Calibration(
            CalibrationError::AlreadyCalibrated
        ))
    );
    assert!(prompt.requested.is_empty());
}

#[test]
fn test_run_stops_after_max_cycles() {
    let mut rig = calibrated_rig();
    rig.swatch.place(Swatch::RED);
    let stop = AtomicBool::new(false);
    let mut seen = Vec::new();

    let before = rig.clock.elapsed();
    let cycles = rig
        .sensor
        .run(&stop, Some(3), |outcome| {
            seen.push(outcome.as_ref().map(|d| d.classification.color).ok());
        })
        .unwrap();

    assert_eq!(cycles, 3);
    assert_eq!(seen, vec![Some(DetectedColor::Red); 3]);
    // two inter-cycle delays, none after the last cycle
    let elapsed = rig.clock.elapsed() - before;
    assert!(elapsed >= Duration::from_millis(1000));
}

#[test]
fn test_run_honours_stop_flag_between_cycles() {
    let mut rig = calibrated_rig();
    rig.swatch.place(Swatch::GREEN);
    let stop = AtomicBool::new(false);

    let cycles = rig
        .sensor
        .run(&stop, None, |_| stop.store(true, Ordering::SeqCst))
        .unwrap();

    assert_eq!(cycles, 1);
}

#[test]
fn test_run_with_stop_already_set_does_nothing() {
    let mut rig = calibrated_rig();
    let stop = AtomicBool::new(true);

    let cycles = rig.sensor.run(&stop, None, |_| panic!("no cycle expected")).unwrap();

    assert_eq!(cycles, 0);
    assert_eq!(rig.sensor.cycles(), 0);
}

#[test]
fn test_run_requires_calibration() {
    let mut rig = open_rig(test_config());
    let stop = AtomicBool::new(false);

    let result = rig.sensor.run(&stop, Some(1), |_| {});
    assert_eq!(
        result,
        Err(ColorSensorError::Calibration(CalibrationError::NotCalibrated))
    );
}

#[test]
fn test_shutdown_is_idempotent() {
    let mut rig = calibrated_rig();

    rig.sensor.shutdown();
    rig.sensor.shutdown();
    assert_eq!(rig.sensor.phase(), SensorPhase::ShutDown);
    assert!(rig.sensor.profile().is_some());

    assert_eq!(
        rig.sensor.detect(),
        Err(ColorSensorError::Sensor(SensorError::Released))
    );

    drop(rig.sensor);
    assert_eq!(rig.releases.load(Ordering::SeqCst), 1);
}

#[test]
fn test_drop_releases_board() {
    let rig = open_rig(test_config());
    let releases = rig.releases.clone();
    drop(rig);
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

#[test]
fn test_calibrate_after_shutdown_fails() {
    let mut rig = open_rig(test_config());
    rig.sensor.shutdown();
    let mut prompt = SwatchPrompt::new(rig.swatch.clone());

    assert_eq!(
        rig.sensor.calibrate(&mut prompt),
        Err(ColorSensorError::Sensor(SensorError::Released))
    );
}

#[test]
fn test_open_failure_releases_board() {
    let config = test_config();
    let clock = ManualClock::default();
    let board = SimulatedBoard::new(clock.clone(), config.pins, SwatchHandle::new(Swatch::WHITE))
        .with_failing_pin(config.pins.s2);
    let releases = board.release_counter();

    match ColorSensor::open(board, clock, config) {
        Err(SensorError::PinIo { pin, .. }) => assert_eq!(pin, 6),
        Err(other) => panic!("unexpected error {}", other),
        Ok(_) => panic!("open should fail"),
    }
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

#[test]
fn test_open_unreachable_board_is_transport_init() {
    let config = test_config();
    let clock = ManualClock::default();
    let board = SimulatedBoard::new(clock.clone(), config.pins, SwatchHandle::new(Swatch::WHITE))
        .with_missing_port("/dev/ttyUSB3");
    let releases = board.release_counter();

    match ColorSensor::open(board, clock.clone(), config) {
        Err(err @ SensorError::TransportInit { .. }) => assert_eq!(err.code(), 1001),
        Err(other) => panic!("unexpected error {}", other),
        Ok(_) => panic!("open should fail"),
    }
    assert_eq!(releases.load(Ordering::SeqCst), 1);
    // no stabilization wait on failure
    assert!(clock.elapsed() < Duration::from_millis(1000));
}

#[test]
fn test_open_rejects_invalid_config() {
    let mut config = test_config();
    config.acquisition.samples_per_channel = 0;
    let clock = ManualClock::default();
    let board = SimulatedBoard::new(clock.clone(), config.pins, SwatchHandle::new(Swatch::WHITE));
    let releases = board.release_counter();

    assert!(matches!(
        ColorSensor::open(board, clock, config),
        Err(SensorError::InvalidConfig { .. })
    ));
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

#[test]
fn test_stuck_output_reads_zero() {
    let config = test_config();
    let clock = ManualClock::new(Duration::from_micros(10));
    let board = SimulatedBoard::new(clock.clone(), config.pins, SwatchHandle::new(Swatch::WHITE))
        .with_stuck_output(PinLevel::High);
    let mut sensor = match ColorSensor::open(board, clock, config) {
        Ok(sensor) => sensor,
        Err(err) => panic!("open failed: {}", err),
    };

    assert_eq!(sensor.read_averaged().unwrap(), ChannelTriple::ZERO);
}
