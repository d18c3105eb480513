//! Scalar-metric-with-time-of-day anomaly template.

use super::{
    DateEncoderParams, EncoderKind, InferenceType, ModelConfig, ModelParams, PeriodicWidth,
    ProviderEncoders, ScalarEncoderParams, SensorParams, TmParams,
};
use crate::error::{DetectorError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The value encoder spreads `[minVal, maxVal]` over this many buckets.
const NUM_BUCKETS: f64 = 130.0;
const RDSE_N: usize = 400;
const RDSE_W: usize = 21;
const RDSE_SEED: u64 = 42;
const TIME_OF_DAY: PeriodicWidth = PeriodicWidth(21, 9.49);

/// Sequential-memory backend selected by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TmImplementation {
    #[serde(rename = "cpp")]
    Cpp,
    #[serde(rename = "tm_cpp")]
    TmCpp,
}

impl FromStr for TmImplementation {
    type Err = DetectorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cpp" => Ok(Self::Cpp),
            "tm_cpp" => Ok(Self::TmCpp),
            other => Err(DetectorError::configuration(format!(
                "invalid tm implementation '{}'; expected cpp or tm_cpp",
                other
            ))),
        }
    }
}

impl fmt::Display for TmImplementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpp => f.write_str("cpp"),
            Self::TmCpp => f.write_str("tm_cpp"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TemplateRequest<'a> {
    /// Sample of the metric; only consulted when a bound is missing
    pub metric_data: &'a [f64],
    pub min_val: Option<f64>,
    pub max_val: Option<f64>,
    pub min_resolution: f64,
    pub tm_implementation: TmImplementation,
}

/// Produces model configuration templates. Must be deterministic.
pub trait ConfigProvider: Send + Sync {
    fn template(&self, request: &TemplateRequest<'_>) -> Result<ModelConfig<ProviderEncoders>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScalarMetricTemplate;

impl ConfigProvider for ScalarMetricTemplate {
    fn template(&self, request: &TemplateRequest<'_>) -> Result<ModelConfig<ProviderEncoders>> {
        if !(request.min_resolution.is_finite() && request.min_resolution > 0.0) {
            return Err(DetectorError::configuration(format!(
                "min resolution must be positive, got {}",
                request.min_resolution
            )));
        }

        let (min_val, max_val) = match (request.min_val, request.max_val) {
            (Some(lo), Some(hi)) => (lo, hi),
            (lo, hi) => {
                let (derived_lo, derived_hi) = range_from_data(request.metric_data)?;
                (lo.unwrap_or(derived_lo), hi.unwrap_or(derived_hi))
            }
        };
        if !min_val.is_finite() || !max_val.is_finite() {
            return Err(DetectorError::configuration(format!(
                "encoder bounds must be finite, got [{}, {}]",
                min_val, max_val
            )));
        }
        if max_val <= min_val {
            return Err(DetectorError::configuration(format!(
                "degenerate encoder range [{}, {}]",
                min_val, max_val
            )));
        }

        let resolution = request
            .min_resolution
            .max(max_val / NUM_BUCKETS - min_val / NUM_BUCKETS);

        let encoders = ProviderEncoders {
            day_of_week: None,
            time_of_day: DateEncoderParams {
                fieldname: "c0".to_string(),
                name: "c0".to_string(),
                kind: EncoderKind::DateEncoder,
                time_of_day: Some(TIME_OF_DAY),
                day_of_week: None,
                weekend: None,
            },
            weekend: None,
            metric: ScalarEncoderParams {
                fieldname: "c1".to_string(),
                name: "c1".to_string(),
                kind: EncoderKind::RandomDistributedScalarEncoder,
                resolution,
                seed: RDSE_SEED,
                n: RDSE_N,
                w: RDSE_W,
            },
        };

        Ok(ModelConfig {
            model: "HTMPrediction".to_string(),
            version: 1,
            model_params: ModelParams {
                inference_type: InferenceType::TemporalAnomaly,
                sensor_params: SensorParams {
                    encoders,
                    verbosity: 0,
                },
                tm_enable: true,
                tm_params: TmParams {
                    activation_threshold: 13,
                    initial_perm: 0.21,
                    connected_perm: 0.5,
                    permanence_inc: 0.1,
                    permanence_dec: 0.1,
                    seed: 1960,
                    temporal_imp: request.tm_implementation,
                },
            },
        })
    }
}

/// `[min - std, max + std]` of the sample; a flat sample gets std = 1.
fn range_from_data(data: &[f64]) -> Result<(f64, f64)> {
    if data.is_empty() {
        return Err(DetectorError::configuration(
            "metric data required when encoder bounds are not given",
        ));
    }
    let n = data.len() as f64;
    let mean = data.iter().sum::<f64>() / n;
    let variance = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    let mut std = variance.sqrt();
    if std == 0.0 {
        std = 1.0;
    }
    let lo = data.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = data.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Ok((lo - std, hi + std))
}
