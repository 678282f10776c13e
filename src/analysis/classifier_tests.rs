use super::*;
use crate::calibration::{
    CalibrationProcedure, CalibrationStep, ColorSignature, CompleteSignatures, WhiteReference,
};

const THRESHOLD: f64 = 0.85;

fn triple(r: f64, g: f64, b: f64) -> ChannelTriple {
    ChannelTriple::new(r, g, b)
}

/// Profile calibrated from raw normalized readings, as the procedure would
fn calibrated_profile() -> Arc<CalibrationProfile> {
    let mut procedure = CalibrationProcedure::new();
    procedure
        .record(CalibrationStep::White, triple(0.40, 0.32, 0.28))
        .unwrap();
    procedure
        .record(
            CalibrationStep::Color(ColorLabel::Red),
            triple(0.72, 0.15, 0.13),
        )
        .unwrap();
    procedure
        .record(
            CalibrationStep::Color(ColorLabel::Green),
            triple(0.20, 0.58, 0.22),
        )
        .unwrap();
    procedure
        .record(
            CalibrationStep::Color(ColorLabel::Blue),
            triple(0.12, 0.25, 0.63),
        )
        .unwrap();
    Arc::new(procedure.finalize().unwrap())
}

/// Profile with a neutral white and unit-axis signatures
fn axis_profile() -> Arc<CalibrationProfile> {
    Arc::new(CalibrationProfile::new(
        WhiteReference::capture(triple(1.0, 1.0, 1.0)),
        CompleteSignatures {
            red: ColorSignature::new(triple(1.0, 0.0, 0.0)),
            green: ColorSignature::new(triple(0.0, 1.0, 0.0)),
            blue: ColorSignature::new(triple(0.0, 0.0, 1.0)),
        },
    ))
}

fn create_classifier() -> Classifier {
    Classifier::new(calibrated_profile(), THRESHOLD)
}

#[test]
fn test_calibration_readings_classify_as_themselves() {
    let classifier = create_classifier();

    let cases = [
        (triple(0.72, 0.15, 0.13), DetectedColor::Red),
        (triple(0.20, 0.58, 0.22), DetectedColor::Green),
        (triple(0.12, 0.25, 0.63), DetectedColor::Blue),
    ];

    for (reading, expected) in cases {
        let result = classifier.classify(&reading);
        assert_eq!(
            result.color, expected,
            "Expected {} for reading {:?}, scores {:?}",
            expected, reading, result.scores
        );
        assert!(
            (result.confidence - 1.0).abs() < 1e-9,
            "Self-similarity should be 1.0, got {}",
            result.confidence
        );
    }
}

#[test]
fn test_classification_is_idempotent() {
    let classifier = create_classifier();
    let reading = triple(0.55, 0.25, 0.20);

    let first = classifier.classify(&reading);
    let second = classifier.classify(&reading);

    assert_eq!(first, second);
}

#[test]
fn test_threshold_is_inclusive() {
    assert_eq!(create_classifier().threshold(), THRESHOLD);
    let profile = calibrated_profile();
    let reading = triple(0.45, 0.35, 0.20);

    let probe = Classifier::new(profile.clone(), THRESHOLD).classify(&reading);
    let exact = probe.confidence;

    let at_threshold = Classifier::new(profile.clone(), exact).classify(&reading);
    assert_eq!(at_threshold.color, DetectedColor::from(probe.best_match));

    let above = Classifier::new(profile, exact + 1e-9).classify(&reading);
    assert_eq!(above.color, DetectedColor::Unknown);
    assert_eq!(above.best_match, probe.best_match);
}

#[test]
fn test_below_threshold_is_unknown() {
    let classifier = Classifier::new(axis_profile(), THRESHOLD);

    // Equal parts of every channel: similarity 1/sqrt(3) to each axis
    let result = classifier.classify(&triple(1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0));

    assert_eq!(result.color, DetectedColor::Unknown);
    assert!((result.confidence - 1.0 / 3f64.sqrt()).abs() < 1e-12);
}

#[test]
fn test_ties_resolve_red_green_blue() {
    let classifier = Classifier::new(axis_profile(), 0.5);

    let red_green = classifier.classify(&triple(0.5, 0.5, 0.0));
    assert_eq!(red_green.best_match, ColorLabel::Red);
    assert_eq!(red_green.color, DetectedColor::Red);

    let green_blue = classifier.classify(&triple(0.0, 0.5, 0.5));
    assert_eq!(green_blue.best_match, ColorLabel::Green);

    let all = classifier.classify(&triple(1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0));
    assert_eq!(all.best_match, ColorLabel::Red);
}

#[test]
fn test_dark_reading_is_unknown() {
    let classifier = create_classifier();
    let result = classifier.classify(&ChannelTriple::ZERO);

    assert_eq!(result.color, DetectedColor::Unknown);
    assert_eq!(result.confidence, 0.0);
    for score in result.scores {
        assert_eq!(score.similarity, 0.0);
    }
}

#[test]
fn test_scores_are_reported_in_channel_order() {
    let classifier = create_classifier();
    let result = classifier.classify(&triple(0.3, 0.3, 0.4));

    let labels: Vec<ColorLabel> = result.scores.iter().map(|s| s.label).collect();
    assert_eq!(labels, ColorLabel::ALL.to_vec());
    for score in result.scores {
        assert!((-1.0..=1.0 + 1e-12).contains(&score.similarity));
    }
}

#[test]
fn test_balanced_reading_is_exposed() {
    let classifier = Classifier::new(axis_profile(), THRESHOLD);
    let result = classifier.classify(&triple(0.2, 0.3, 0.5));
    assert_eq!(result.balanced, triple(0.2, 0.3, 0.5));
    assert_eq!(result.color, DetectedColor::Unknown);
}

#[test]
fn test_detected_color_display_and_label() {
    assert_eq!(DetectedColor::Red.to_string(), "Red");
    assert_eq!(DetectedColor::Unknown.to_string(), "Unknown");
    assert_eq!(DetectedColor::Blue.label(), Some(ColorLabel::Blue));
    assert_eq!(DetectedColor::Unknown.label(), None);
    assert_eq!(
        serde_json::to_string(&DetectedColor::Unknown).unwrap(),
        "\"unknown\""
    );
}
