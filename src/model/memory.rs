//! First-order transition memory over encoder bits.
//!
//! Each bit keeps Hebbian permanences towards the bits that followed it. A bit
//! is predicted for the next step when at least `activation_threshold` of the
//! currently active bits have a connected transition to it.

use crate::error::{DetectorError, Result};
use crate::params::TmParams;
use std::collections::{HashMap, HashSet};

pub struct TransitionMemory {
    params: TmParams,
    // presynaptic bit -> (postsynaptic bit -> permanence)
    synapses: HashMap<usize, HashMap<usize, f64>>,
    prev_active: Vec<usize>,
    predicted: HashSet<usize>,
}

impl TransitionMemory {
    pub fn new(params: TmParams) -> Result<Self> {
        let unit = |p: f64| p.is_finite() && (0.0..=1.0).contains(&p);
        if params.activation_threshold == 0 {
            return Err(DetectorError::configuration(
                "activation threshold must be positive",
            ));
        }
        if !(unit(params.initial_perm)
            && unit(params.connected_perm)
            && unit(params.permanence_inc)
            && unit(params.permanence_dec))
        {
            return Err(DetectorError::configuration(
                "permanence parameters must lie in [0, 1]",
            ));
        }
        Ok(Self {
            params,
            synapses: HashMap::new(),
            prev_active: Vec::new(),
            predicted: HashSet::new(),
        })
    }

    /// Score `active` against the previous prediction, learn the transition
    /// from the previous step and predict the next one.
    pub fn compute(&mut self, active: &[usize], learn: bool) -> f64 {
        let score = raw_anomaly_score(active, &self.predicted);
        if learn {
            self.learn(active);
        }
        self.predicted = self.predict(active);
        self.prev_active = active.to_vec();
        score
    }

    fn learn(&mut self, active: &[usize]) {
        let TmParams {
            initial_perm,
            permanence_inc,
            permanence_dec,
            ..
        } = self.params;
        let current: HashSet<usize> = active.iter().copied().collect();
        for &pre in &self.prev_active {
            let targets = self.synapses.entry(pre).or_default();
            targets.retain(|post, perm| {
                if current.contains(post) {
                    return true;
                }
                *perm -= permanence_dec;
                *perm > 0.0
            });
            for &post in active {
                targets
                    .entry(post)
                    .and_modify(|perm| *perm = (*perm + permanence_inc).min(1.0))
                    .or_insert(initial_perm);
            }
        }
    }

    fn predict(&self, active: &[usize]) -> HashSet<usize> {
        let mut support: HashMap<usize, usize> = HashMap::new();
        for pre in active {
            let Some(targets) = self.synapses.get(pre) else {
                continue;
            };
            for (post, perm) in targets {
                if *perm >= self.params.connected_perm {
                    *support.entry(*post).or_insert(0) += 1;
                }
            }
        }
        support
            .into_iter()
            .filter(|(_, count)| *count >= self.params.activation_threshold)
            .map(|(post, _)| post)
            .collect()
    }
}

/// Fraction of active bits that were not predicted; 0 for an empty input.
pub fn raw_anomaly_score(active: &[usize], predicted: &HashSet<usize>) -> f64 {
    if active.is_empty() {
        return 0.0;
    }
    let hits = active.iter().filter(|b| predicted.contains(b)).count();
    1.0 - hits as f64 / active.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::TmImplementation;

    fn params(threshold: usize) -> TmParams {
        TmParams {
            activation_threshold: threshold,
            initial_perm: 0.21,
            connected_perm: 0.5,
            permanence_inc: 0.1,
            permanence_dec: 0.1,
            seed: 1960,
            temporal_imp: TmImplementation::Cpp,
        }
    }

    #[test]
    fn raw_score_bounds() {
        let predicted: HashSet<usize> = [1, 2, 3].into_iter().collect();
        assert_eq!(raw_anomaly_score(&[], &predicted), 0.0);
        assert_eq!(raw_anomaly_score(&[1, 2], &predicted), 0.0);
        assert_eq!(raw_anomaly_score(&[4, 5], &predicted), 1.0);
        assert_eq!(raw_anomaly_score(&[1, 4], &predicted), 0.5);
    }

    #[test]
    fn repeated_sequence_becomes_predicted() {
        let mut tm = TransitionMemory::new(params(2)).unwrap();
        let a = [0, 1, 2];
        let b = [10, 11, 12];
        let mut last = 1.0;
        for _ in 0..6 {
            tm.compute(&a, true);
            last = tm.compute(&b, true);
        }
        assert_eq!(last, 0.0);
        // a novel pattern after a is unpredicted
        tm.compute(&a, true);
        assert_eq!(tm.compute(&[20, 21, 22], true), 1.0);
    }

    #[test]
    fn first_input_is_fully_anomalous() {
        let mut tm = TransitionMemory::new(params(1)).unwrap();
        assert_eq!(tm.compute(&[3, 4], true), 1.0);
    }

    #[test]
    fn stale_transitions_decay() {
        let mut tm = TransitionMemory::new(params(1)).unwrap();
        for _ in 0..5 {
            tm.compute(&[0], true);
            tm.compute(&[1], true);
        }
        // 0 -> 1 connected
        tm.compute(&[0], true);
        assert_eq!(tm.compute(&[1], false), 0.0);
        for _ in 0..10 {
            tm.compute(&[0], true);
        }
        assert_eq!(tm.compute(&[1], true), 1.0);
    }

    #[test]
    fn invalid_params_rejected() {
        assert!(TransitionMemory::new(params(0)).is_err());
        let mut p = params(1);
        p.connected_perm = 1.5;
        assert!(TransitionMemory::new(p).is_err());
    }
}
