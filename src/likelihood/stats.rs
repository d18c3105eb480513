//! Statistics behind the likelihood estimate.

use serde::Serialize;
use statrs::function::erf::erfc;
use std::collections::VecDeque;

/// Likelihood at or below `1 - RED` is a red alert.
const RED_THRESHOLD: f64 = 0.99999;
const YELLOW_THRESHOLD: f64 = 0.999;

/// Fixed-size sliding mean.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    window: VecDeque<f64>,
    total: f64,
    size: usize,
}

impl MovingAverage {
    pub fn new(size: usize) -> Self {
        Self {
            window: VecDeque::with_capacity(size),
            total: 0.0,
            size: size.max(1),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Push a value and return the mean of the window.
    pub fn next(&mut self, value: f64) -> f64 {
        if self.window.len() == self.size {
            if let Some(old) = self.window.pop_front() {
                self.total -= old;
            }
        }
        self.window.push_back(value);
        self.total += value;
        self.total / self.window.len() as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalDistribution {
    pub mean: f64,
    pub variance: f64,
    pub stdev: f64,
}

impl NormalDistribution {
    /// Wide distribution that reports nothing as anomalous.
    pub fn null() -> Self {
        Self {
            mean: 0.5,
            variance: 1e6,
            stdev: 1e3,
        }
    }

    /// Population mean/variance of `samples`. With `lower_bound` the mean is
    /// floored at 0.03 and the variance at 0.0003.
    pub fn estimate(samples: &[f64], lower_bound: bool) -> Self {
        if samples.is_empty() {
            return Self::null();
        }
        let n = samples.len() as f64;
        let mut mean = samples.iter().sum::<f64>() / n;
        let mut variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        if lower_bound {
            mean = mean.max(0.03);
            variance = variance.max(0.0003);
        }
        Self {
            mean,
            variance,
            stdev: variance.sqrt(),
        }
    }

    /// Probability of a value at least this far above the mean. Values below
    /// the mean are reflected onto the upper tail.
    pub fn tail_probability(&self, x: f64) -> f64 {
        let x = if x < self.mean { 2.0 * self.mean - x } else { x };
        let z = (x - self.mean) / self.stdev;
        0.5 * erfc(z / std::f64::consts::SQRT_2)
    }
}

/// Damp repeated red alerts: a red likelihood directly after another red one
/// is raised to the yellow level.
pub fn filter_likelihoods(likelihoods: &[f64]) -> Vec<f64> {
    let red = 1.0 - RED_THRESHOLD;
    let yellow = 1.0 - YELLOW_THRESHOLD;
    let mut out = Vec::with_capacity(likelihoods.len());
    let Some(first) = likelihoods.first() else {
        return out;
    };
    out.push(*first);
    for pair in likelihoods.windows(2) {
        let (prev, v) = (pair[0], pair[1]);
        if v <= red && prev <= red {
            out.push(yellow);
        } else {
            out.push(v);
        }
    }
    out
}
