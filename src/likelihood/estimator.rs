//! Online anomaly likelihood over a rolling history of raw scores.

use super::stats::{filter_likelihoods, MovingAverage, NormalDistribution};
use super::{LikelihoodEstimator, LikelihoodSettings};
use crate::error::{DetectorError, Result};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// Metric values flatter than this are never reported as anomalous.
const FLAT_METRIC_VARIANCE: f64 = 1.5e-5;

#[derive(Debug, Clone, Copy)]
struct DataPoint {
    value: f64,
    raw_score: f64,
}

/// Distribution plus the running state needed to score new points against it
#[derive(Debug, Clone)]
struct LikelihoodModel {
    distribution: NormalDistribution,
    moving_average: MovingAverage,
    historical_likelihoods: Vec<f64>,
}

impl LikelihoodModel {
    /// Advance with one raw score; returns the filtered tail probability.
    fn update(&mut self, raw_score: f64) -> f64 {
        let average = self.moving_average.next(raw_score);
        let likelihood = self.distribution.tail_probability(average);

        let mut combined = std::mem::take(&mut self.historical_likelihoods);
        combined.push(likelihood);
        let filtered = filter_likelihoods(&combined);
        let keep = self.moving_average.size().min(combined.len());
        self.historical_likelihoods = combined[combined.len() - keep..].to_vec();

        filtered.last().copied().unwrap_or(likelihood)
    }
}

pub struct AnomalyLikelihood {
    settings: LikelihoodSettings,
    iteration: usize,
    history: VecDeque<DataPoint>,
    model: Option<LikelihoodModel>,
}

impl AnomalyLikelihood {
    pub fn new(settings: LikelihoodSettings) -> Result<Self> {
        if settings.learning_period + settings.estimation_samples == 0 {
            return Err(DetectorError::configuration(
                "likelihood probationary period must be positive",
            ));
        }
        if settings.reestimation_period == 0 {
            return Err(DetectorError::configuration(
                "reestimation period must be positive",
            ));
        }
        if settings.historic_window_size == 0 || settings.averaging_window == 0 {
            return Err(DetectorError::configuration(
                "historic and averaging windows must be positive",
            ));
        }
        Ok(Self {
            settings,
            iteration: 0,
            history: VecDeque::with_capacity(settings.historic_window_size.min(16_384)),
            model: None,
        })
    }

    /// Points scored with the fixed 0.5 probability before estimation starts
    pub fn probationary_period(&self) -> usize {
        self.settings.learning_period + self.settings.estimation_samples
    }

    pub fn distribution(&self) -> Option<NormalDistribution> {
        self.model.as_ref().map(|m| m.distribution)
    }

    /// Leading history records excluded from estimation (the learning period,
    /// less whatever has already shifted out of the window).
    fn skip_records(&self) -> usize {
        let shifted_out = self
            .iteration
            .saturating_sub(self.settings.historic_window_size);
        self.iteration
            .min(self.settings.learning_period.saturating_sub(shifted_out))
    }

    fn estimate(&self, skip: usize) -> LikelihoodModel {
        let mut moving_average = MovingAverage::new(self.settings.averaging_window);
        let averaged: Vec<f64> = self
            .history
            .iter()
            .map(|p| moving_average.next(p.raw_score))
            .collect();

        let mut distribution = if skip >= averaged.len() {
            NormalDistribution::null()
        } else {
            NormalDistribution::estimate(&averaged[skip..], true)
        };
        if skip < self.history.len() {
            let values: Vec<f64> = self.history.iter().skip(skip).map(|p| p.value).collect();
            if NormalDistribution::estimate(&values, false).variance < FLAT_METRIC_VARIANCE {
                distribution = NormalDistribution::null();
            }
        }

        let keep = self.settings.averaging_window.min(averaged.len());
        let historical_likelihoods = averaged[averaged.len() - keep..]
            .iter()
            .map(|a| distribution.tail_probability(*a))
            .collect();

        LikelihoodModel {
            distribution,
            moving_average,
            historical_likelihoods,
        }
    }
}

impl LikelihoodEstimator for AnomalyLikelihood {
    fn anomaly_probability(
        &mut self,
        value: f64,
        raw_score: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<f64> {
        if !raw_score.is_finite() {
            return Err(DetectorError::upstream(format!(
                "raw score must be finite, got {}",
                raw_score
            )));
        }
        if !value.is_finite() {
            return Err(DetectorError::precondition(format!(
                "value must be finite, got {}",
                value
            )));
        }

        let probability = if self.iteration < self.probationary_period() {
            0.5
        } else {
            let reestimate = self.iteration % self.settings.reestimation_period == 0;
            let mut model = match self.model.take() {
                Some(model) if !reestimate => model,
                _ => self.estimate(self.skip_records()),
            };
            let likelihood = model.update(raw_score);
            self.model = Some(model);
            1.0 - likelihood
        };

        tracing::trace!(%timestamp, iteration = self.iteration, probability, "anomaly likelihood");
        self.history.push_back(DataPoint { value, raw_score });
        while self.history.len() > self.settings.historic_window_size {
            self.history.pop_front();
        }
        self.iteration += 1;

        Ok(probability)
    }

    fn compute_log_likelihood(&self, probability: f64) -> f64 {
        log_likelihood(probability)
    }
}

/// Map a probability onto [0, 1] so that 0.99999 and 0.999999 stay
/// distinguishable.
pub fn log_likelihood(probability: f64) -> f64 {
    (1.000_000_000_1 - probability).ln() / -23.025_850_847_200_09
}
