//! Response models for the lag strategy
//!
//! How many cents does the market reprice per dollar of spot move? Two
//! online estimators answer that: an EMA calibrator over observed responses
//! and a small linear regressor over book and flow features. Their blend is
//! the predicted repricing used to admit lag entries.

mod calibrator;
mod linear;

pub use calibrator::ResponseCalibrator;
pub use linear::{FeatureVector, OnlineLinearModel, FEATURE_COUNT};
