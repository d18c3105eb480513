//! Model configuration: the template produced by a [`ConfigProvider`] and the
//! encoder remapping that binds it to the service's record schema.

mod encoders;
mod template;

pub use encoders::{
    DateEncoderParams, EncoderEntry, EncoderKind, FieldEncoders, PeriodicWidth,
    ProviderEncoders, ScalarEncoderParams, TIMESTAMP_FIELD, VALUE_FIELD,
};
pub use template::{ConfigProvider, ScalarMetricTemplate, TemplateRequest, TmImplementation};

use serde::{Deserialize, Serialize};

/// Full model configuration, generic over the encoder set so the provider's
/// shape and the remapped shape are distinct types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig<E> {
    pub model: String,
    pub version: u32,
    pub model_params: ModelParams<E>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelParams<E> {
    pub inference_type: InferenceType,
    pub sensor_params: SensorParams<E>,
    pub tm_enable: bool,
    pub tm_params: TmParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorParams<E> {
    pub encoders: E,
    pub verbosity: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InferenceType {
    TemporalAnomaly,
}

/// Transition-memory parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TmParams {
    /// Connected active inputs needed to predict a bit
    pub activation_threshold: usize,
    pub initial_perm: f64,
    pub connected_perm: f64,
    pub permanence_inc: f64,
    pub permanence_dec: f64,
    pub seed: u64,
    pub temporal_imp: TmImplementation,
}

impl<E> ModelConfig<E> {
    pub fn encoders(&self) -> &E {
        &self.model_params.sensor_params.encoders
    }

    /// Rebuild the configuration with a transformed encoder set.
    pub fn map_encoders<F>(self, f: impl FnOnce(E) -> F) -> ModelConfig<F> {
        let ModelConfig {
            model,
            version,
            model_params,
        } = self;
        let ModelParams {
            inference_type,
            sensor_params,
            tm_enable,
            tm_params,
        } = model_params;
        ModelConfig {
            model,
            version,
            model_params: ModelParams {
                inference_type,
                sensor_params: SensorParams {
                    encoders: f(sensor_params.encoders),
                    verbosity: sensor_params.verbosity,
                },
                tm_enable,
                tm_params,
            },
        }
    }
}

impl ModelConfig<ProviderEncoders> {
    /// Bind the provider's generic channel names to `timestamp` / `value`.
    pub fn into_field_config(self) -> ModelConfig<FieldEncoders> {
        self.map_encoders(FieldEncoders::from)
    }
}
