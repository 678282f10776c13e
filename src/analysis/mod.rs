// Analysis module - colour classification of live readings
//
// Pipeline per detection cycle:
// ChannelAggregator (normalized reading) -> white balance -> Classifier
// The classifier only exists once a CalibrationProfile is available.

pub mod classifier;

pub use classifier::{Classification, Classifier, DetectedColor, SimilarityScore};
