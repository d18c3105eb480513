//! Sequential-pattern model producing a raw anomaly score per record.

mod encoders;
mod memory;
mod sequence;

pub use encoders::{DateEncoder, MultiEncoder, PeriodicEncoder, RandomDistributedScalarEncoder};
pub use memory::{raw_anomaly_score, TransitionMemory};
pub use sequence::SequenceModel;

use crate::error::Result;
use crate::params::{FieldEncoders, ModelConfig};
use crate::record::Record;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inference {
    /// Raw anomaly score in [0, 1]
    pub anomaly_score: f64,
    pub record_number: u64,
}

/// Online, append-only predictor.
pub trait AnomalyModel: Send {
    fn enable_inference(&mut self, predicted_field: &str) -> Result<()>;
    fn run(&mut self, record: &Record) -> Result<Inference>;
}

pub trait ModelFactory: Send + Sync {
    fn create(&self, config: &ModelConfig<FieldEncoders>) -> Result<Box<dyn AnomalyModel>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceModelFactory;

impl ModelFactory for SequenceModelFactory {
    fn create(&self, config: &ModelConfig<FieldEncoders>) -> Result<Box<dyn AnomalyModel>> {
        Ok(Box::new(SequenceModel::create(config)?))
    }
}
