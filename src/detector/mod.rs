//! Per-stream detector: derives the model configuration from three scalars,
//! owns the model and likelihood estimator, and scores records.
//!
//! Lifecycle is `Created → Initialized`; every `handle_record` on an
//! initialized detector advances the learned state.

mod pipeline;

pub use pipeline::ScoringPipeline;

use crate::config::{DetectorConfig, LikelihoodConfig};
use crate::error::{DetectorError, Result};
use crate::likelihood::{AnomalyLikelihoodFactory, EstimatorFactory, LikelihoodSettings};
use crate::model::{ModelFactory, SequenceModelFactory};
use crate::params::{
    ConfigProvider, FieldEncoders, ModelConfig, ScalarEncoderParams, ScalarMetricTemplate,
    TemplateRequest, TmImplementation, VALUE_FIELD,
};
use crate::record::{Record, ScoreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Expected range is widened by this fraction of its span on both sides.
pub const RANGE_PADDING_RATIO: f64 = 0.2;
pub const MIN_RESOLUTION: f64 = 0.001;
/// Placeholder seed series for the template provider
const SEED_SERIES: [f64; 1] = [0.0];

/// The three caller-supplied scalars
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectorParams {
    pub input_min: f64,
    pub input_max: f64,
    pub probationary_period: usize,
}

/// Factories for the detector's collaborators.
#[derive(Clone)]
pub struct Backends {
    pub provider: Arc<dyn ConfigProvider>,
    pub models: Arc<dyn ModelFactory>,
    pub estimators: Arc<dyn EstimatorFactory>,
}

impl Default for Backends {
    fn default() -> Self {
        Self {
            provider: Arc::new(ScalarMetricTemplate),
            models: Arc::new(SequenceModelFactory),
            estimators: Arc::new(AnomalyLikelihoodFactory),
        }
    }
}

/// `[min - pad, max + pad]` with `pad = |max - min| * 0.2`. Scaled before
/// subtracting so ranges spanning most of `f64` stay finite.
pub fn padded_range(input_min: f64, input_max: f64) -> (f64, f64) {
    let padding = (input_max * RANGE_PADDING_RATIO - input_min * RANGE_PADDING_RATIO).abs();
    (input_min - padding, input_max + padding)
}

/// Split the probationary period into the estimator's learning and
/// estimation windows, re-estimating on every record.
pub fn likelihood_settings(
    probationary_period: usize,
    tuning: &LikelihoodConfig,
) -> Result<LikelihoodSettings> {
    let learning_period = probationary_period / 2;
    let estimation_samples = probationary_period - learning_period;
    if learning_period == 0 || estimation_samples == 0 {
        return Err(DetectorError::configuration(format!(
            "probationary period {} too short for likelihood estimation (need at least 2)",
            probationary_period
        )));
    }
    Ok(LikelihoodSettings {
        learning_period,
        estimation_samples,
        reestimation_period: 1,
        historic_window_size: tuning.historic_window_size,
        averaging_window: tuning.averaging_window,
    })
}

struct Initialized {
    model_params: ModelConfig<FieldEncoders>,
    sensor_params: ScalarEncoderParams,
    likelihood: Option<LikelihoodSettings>,
    pipeline: ScoringPipeline,
}

enum State {
    Created,
    Initialized(Box<Initialized>),
}

pub struct Detector {
    id: Uuid,
    params: DetectorParams,
    use_likelihood: bool,
    tm_implementation: TmImplementation,
    tuning: LikelihoodConfig,
    state: State,
    records: u64,
    last_timestamp: Option<DateTime<Utc>>,
}

impl Detector {
    /// Store the parameters only; call [`Detector::initialize`] before scoring.
    pub fn new(params: DetectorParams) -> Self {
        let defaults = DetectorConfig::default();
        Self {
            id: Uuid::new_v4(),
            params,
            use_likelihood: defaults.use_likelihood,
            tm_implementation: defaults.tm_implementation,
            tuning: LikelihoodConfig::default(),
            state: State::Created,
            records: 0,
            last_timestamp: None,
        }
    }

    /// Apply service-wide detector defaults.
    pub fn with_config(mut self, detector: &DetectorConfig, likelihood: &LikelihoodConfig) -> Self {
        self.use_likelihood = detector.use_likelihood;
        self.tm_implementation = detector.tm_implementation;
        self.tuning = *likelihood;
        self
    }

    pub fn with_likelihood(mut self, use_likelihood: bool) -> Self {
        self.use_likelihood = use_likelihood;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn params(&self) -> &DetectorParams {
        &self.params
    }

    pub fn use_likelihood(&self) -> bool {
        self.use_likelihood
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.state, State::Initialized(_))
    }

    pub fn records_handled(&self) -> u64 {
        self.records
    }

    /// Derived model configuration, available once initialized.
    pub fn model_params(&self) -> Option<&ModelConfig<FieldEncoders>> {
        match &self.state {
            State::Initialized(s) => Some(&s.model_params),
            State::Created => None,
        }
    }

    /// Value-channel encoder configuration, available once initialized.
    pub fn sensor_params(&self) -> Option<&ScalarEncoderParams> {
        match &self.state {
            State::Initialized(s) => Some(&s.sensor_params),
            State::Created => None,
        }
    }

    pub fn likelihood_settings(&self) -> Option<&LikelihoodSettings> {
        match &self.state {
            State::Initialized(s) => s.likelihood.as_ref(),
            State::Created => None,
        }
    }

    /// Derive the model configuration and build the model and estimator.
    /// On failure the detector stays uninitialized.
    pub fn initialize(&mut self, backends: &Backends) -> Result<()> {
        if self.is_initialized() {
            return Err(DetectorError::precondition(format!(
                "detector {} already initialized",
                self.id
            )));
        }
        let DetectorParams {
            input_min,
            input_max,
            probationary_period,
        } = self.params;
        if !input_min.is_finite() || !input_max.is_finite() {
            return Err(DetectorError::configuration(format!(
                "input range must be finite, got [{}, {}]",
                input_min, input_max
            )));
        }
        if probationary_period == 0 {
            return Err(DetectorError::configuration(
                "probationary period must be positive",
            ));
        }
        let likelihood = if self.use_likelihood {
            Some(likelihood_settings(probationary_period, &self.tuning)?)
        } else {
            None
        };

        let (min_val, max_val) = padded_range(input_min, input_max);
        let model_params = backends
            .provider
            .template(&TemplateRequest {
                metric_data: &SEED_SERIES,
                min_val: Some(min_val),
                max_val: Some(max_val),
                min_resolution: MIN_RESOLUTION,
                tm_implementation: self.tm_implementation,
            })?
            .into_field_config();
        let sensor_params = model_params.encoders().value.clone();

        let mut model = backends.models.create(&model_params)?;
        model.enable_inference(VALUE_FIELD)?;
        let estimator = likelihood
            .as_ref()
            .map(|s| backends.estimators.create(s))
            .transpose()?;

        info!(
            detector_id = %self.id,
            input_min,
            input_max,
            probationary_period,
            min_val,
            max_val,
            resolution = sensor_params.resolution,
            use_likelihood = self.use_likelihood,
            "detector initialized"
        );

        self.state = State::Initialized(Box::new(Initialized {
            model_params,
            sensor_params,
            likelihood,
            pipeline: ScoringPipeline::new(model, estimator),
        }));
        Ok(())
    }

    /// Score one record, advancing the model and estimator.
    pub fn handle_record(&mut self, record: &Record) -> Result<ScoreResult> {
        let State::Initialized(active) = &mut self.state else {
            return Err(DetectorError::precondition(format!(
                "detector {} not initialized",
                self.id
            )));
        };
        if !record.value.is_finite() {
            return Err(DetectorError::precondition(format!(
                "record value must be finite, got {}",
                record.value
            )));
        }
        if let Some(prev) = self.last_timestamp {
            if record.timestamp < prev {
                warn!(
                    detector_id = %self.id,
                    timestamp = %record.timestamp,
                    previous = %prev,
                    "record timestamp went backwards"
                );
            }
        }

        let result = active.pipeline.score(record)?;
        self.records += 1;
        self.last_timestamp = Some(record.timestamp);
        debug!(
            detector_id = %self.id,
            record = self.records,
            value = record.value,
            raw_score = result.raw_score,
            anomaly_score = result.anomaly_score,
            "record scored"
        );
        Ok(result)
    }
}
