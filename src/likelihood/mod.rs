//! Anomaly likelihood: how unusual a raw score is given the recent ones.

mod estimator;
mod stats;

pub use estimator::{log_likelihood, AnomalyLikelihood};
pub use stats::{filter_likelihoods, MovingAverage, NormalDistribution};

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikelihoodSettings {
    pub learning_period: usize,
    pub estimation_samples: usize,
    /// Re-fit the distribution every this many records
    pub reestimation_period: usize,
    pub historic_window_size: usize,
    pub averaging_window: usize,
}

/// Online estimator; every call advances its sample window.
pub trait LikelihoodEstimator: Send {
    /// Probability that the point is anomalous, in [0, 1].
    fn anomaly_probability(
        &mut self,
        value: f64,
        raw_score: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<f64>;

    fn compute_log_likelihood(&self, probability: f64) -> f64;
}

pub trait EstimatorFactory: Send + Sync {
    fn create(&self, settings: &LikelihoodSettings) -> Result<Box<dyn LikelihoodEstimator>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AnomalyLikelihoodFactory;

impl EstimatorFactory for AnomalyLikelihoodFactory {
    fn create(&self, settings: &LikelihoodSettings) -> Result<Box<dyn LikelihoodEstimator>> {
        Ok(Box::new(AnomalyLikelihood::new(*settings)?))
    }
}
