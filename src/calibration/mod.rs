// Calibration module - reference capture and stored signatures
//
// This module provides two main components:
// 1. CalibrationProcedure: walks WHITE -> RED -> GREEN -> BLUE and records
//    one normalized reading per step
// 2. CalibrationProfile: white reference plus complete signature set, shared
//    read-only with the classifier once calibration finishes

pub mod procedure;
pub mod state;

pub use procedure::{AutoConfirm, CalibrationPrompt, CalibrationProcedure, CalibrationStep};
pub use state::{
    white_balance, CalibrationProfile, ColorSignature, CompleteSignatures, PartialSignatures,
    SignatureSet, WhiteReference,
};
