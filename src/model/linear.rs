//! Online linear model for predicted repricing

use crate::config::LinearModelConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Number of model features
pub const FEATURE_COUNT: usize = 9;

/// Normalized inputs for one prediction
///
/// Spot deltas arrive normalized (cents of implied repricing), book features
/// in natural units, flow features from [`crate::history::FlowMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FeatureVector {
    /// Fast-window spot delta, normalized
    pub fast_delta: Decimal,
    /// Slow-window spot delta, normalized
    pub slow_delta: Decimal,
    /// Baseline-window spot delta, normalized
    pub baseline_delta: Decimal,
    /// Favored book spread in cents
    pub spread: Decimal,
    /// Top-of-book imbalance in [-1, 1]
    pub imbalance: Decimal,
    /// Microprice minus mid in cents
    pub micro_pressure: Decimal,
    /// Flow volume ratio
    pub flow_ratio: Decimal,
    /// Flow buy/sell imbalance in [-1, 1]
    pub flow_imbalance: Decimal,
    /// Flow price delta in cents
    pub flow_price_delta: Decimal,
}

impl FeatureVector {
    fn as_array(&self) -> [Decimal; FEATURE_COUNT] {
        [
            self.fast_delta,
            self.slow_delta,
            self.baseline_delta,
            self.spread,
            self.imbalance,
            self.micro_pressure,
            self.flow_ratio,
            self.flow_imbalance,
            self.flow_price_delta,
        ]
    }
}

/// Tiny online-learned regressor over the feature vector
///
/// Predicts the favored side's repricing in cents. Trained by SGD with L2
/// shrinkage only when an actual response is observed; weights are clamped
/// so one bad target cannot blow up the model. Never reset mid-run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnlineLinearModel {
    learning_rate: Decimal,
    l2: Decimal,
    max_abs_weight: Decimal,
    min_samples: u32,
    mix_fraction: Decimal,
    bias: Decimal,
    weights: [Decimal; FEATURE_COUNT],
    samples: u32,
}

/// Prediction clamp in cents
const MIN_PREDICTION: Decimal = Decimal::ZERO;
const MAX_PREDICTION: Decimal = Decimal::from_parts(20, 0, 0, false, 0);

impl OnlineLinearModel {
    /// Create a model from configuration
    pub fn from_config(config: &LinearModelConfig) -> Self {
        Self {
            learning_rate: config.learning_rate,
            l2: config.l2,
            max_abs_weight: config.max_abs_weight,
            min_samples: config.min_samples,
            mix_fraction: config.mix_fraction,
            bias: Decimal::ZERO,
            weights: [Decimal::ZERO; FEATURE_COUNT],
            samples: 0,
        }
    }

    /// Predicted repricing in cents, clamped to [0, 20]
    pub fn predict(&self, features: &FeatureVector) -> Decimal {
        let raw = self
            .weights
            .iter()
            .zip(features.as_array())
            .fold(self.bias, |acc, (w, f)| acc + *w * f);
        raw.max(MIN_PREDICTION).min(MAX_PREDICTION)
    }

    /// One SGD step toward an observed response
    pub fn update(&mut self, features: &FeatureVector, target_cents: Decimal) {
        let err = target_cents - self.predict(features);
        self.bias += self.learning_rate * err;

        for (weight, feature) in self.weights.iter_mut().zip(features.as_array()) {
            let step = self.learning_rate * (err * feature - self.l2 * *weight);
            *weight = (*weight + step)
                .max(-self.max_abs_weight)
                .min(self.max_abs_weight);
        }
        self.samples += 1;
    }

    /// Blend the model with the calibrator heuristic
    ///
    /// Until the model has seen enough updates the heuristic passes through
    /// untouched.
    pub fn blend(&self, heuristic_cents: Decimal, features: &FeatureVector) -> Decimal {
        if self.samples < self.min_samples {
            return heuristic_cents;
        }
        let model = self.predict(features);
        heuristic_cents + self.mix_fraction * (model - heuristic_cents)
    }

    /// Number of SGD updates applied
    pub fn samples(&self) -> u32 {
        self.samples
    }
}
