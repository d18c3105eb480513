//! Sequence model: multi-encoder front end feeding a transition memory.

use super::encoders::MultiEncoder;
use super::memory::TransitionMemory;
use super::{AnomalyModel, Inference};
use crate::error::{DetectorError, Result};
use crate::params::{FieldEncoders, InferenceType, ModelConfig};
use crate::record::{Record, RecordField};

pub struct SequenceModel {
    encoder: MultiEncoder,
    memory: TransitionMemory,
    predicted_field: Option<RecordField>,
    learning: bool,
    records_seen: u64,
}

impl SequenceModel {
    pub fn create(config: &ModelConfig<FieldEncoders>) -> Result<Self> {
        let params = &config.model_params;
        if params.inference_type != InferenceType::TemporalAnomaly {
            return Err(DetectorError::configuration(format!(
                "unsupported inference type {:?}",
                params.inference_type
            )));
        }
        if !params.tm_enable {
            return Err(DetectorError::configuration(
                "temporal anomaly inference requires the transition memory",
            ));
        }
        let encoder = MultiEncoder::new(config.encoders())?;
        let memory = TransitionMemory::new(params.tm_params.clone())?;
        tracing::debug!(
            input_width = encoder.width(),
            temporal_imp = %params.tm_params.temporal_imp,
            "sequence model created"
        );
        Ok(Self {
            encoder,
            memory,
            predicted_field: None,
            learning: true,
            records_seen: 0,
        })
    }

    pub fn set_learning(&mut self, learning: bool) {
        self.learning = learning;
    }
}

impl AnomalyModel for SequenceModel {
    fn enable_inference(&mut self, predicted_field: &str) -> Result<()> {
        let field = RecordField::from_name(predicted_field)
            .filter(|f| self.encoder.has_field(*f))
            .ok_or_else(|| {
                DetectorError::configuration(format!(
                    "predicted field '{}' is not encoded by the model",
                    predicted_field
                ))
            })?;
        tracing::debug!(predicted_field = field.name(), "inference enabled");
        self.predicted_field = Some(field);
        Ok(())
    }

    fn run(&mut self, record: &Record) -> Result<Inference> {
        if self.predicted_field.is_none() {
            return Err(DetectorError::upstream("inference not enabled on model"));
        }
        let active = self.encoder.encode(record);
        let anomaly_score = self.memory.compute(&active, self.learning);
        self.records_seen += 1;
        Ok(Inference {
            anomaly_score,
            record_number: self.records_seen - 1,
        })
    }
}
