//! Scoring pipeline: record → model raw score → (optional) log likelihood.

use crate::error::{DetectorError, Result};
use crate::likelihood::LikelihoodEstimator;
use crate::model::AnomalyModel;
use crate::record::{Record, ScoreResult};

pub struct ScoringPipeline {
    model: Box<dyn AnomalyModel>,
    likelihood: Option<Box<dyn LikelihoodEstimator>>,
}

impl ScoringPipeline {
    pub fn new(
        model: Box<dyn AnomalyModel>,
        likelihood: Option<Box<dyn LikelihoodEstimator>>,
    ) -> Self {
        Self { model, likelihood }
    }

    /// Run one record through the model and, when configured, the estimator.
    pub fn score(&mut self, record: &Record) -> Result<ScoreResult> {
        let inference = self.model.run(record)?;
        let raw_score = inference.anomaly_score;
        if !(0.0..=1.0).contains(&raw_score) {
            return Err(DetectorError::upstream(format!(
                "model returned raw score {} outside [0, 1]",
                raw_score
            )));
        }

        let anomaly_score = match self.likelihood.as_mut() {
            None => raw_score,
            Some(estimator) => {
                let probability =
                    estimator.anomaly_probability(record.value, raw_score, record.timestamp)?;
                estimator.compute_log_likelihood(probability)
            }
        };

        Ok(ScoreResult {
            anomaly_score,
            raw_score,
        })
    }
}
