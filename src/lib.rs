//! Stream Anomaly: streaming anomaly scoring for a single scalar metric.
//!
//! Modular structure:
//! - [`params`]: Model parameter templates and encoder remapping
//! - [`model`]: Sequence model producing raw anomaly scores
//! - [`likelihood`]: Anomaly likelihood post-processing
//! - [`detector`]: Per-stream detector lifecycle and scoring
//! - [`service`]: HTTP API (init, handleRecord, modelParams)
//! - [`logging`]: Structured JSON logging

pub mod config;
pub mod detector;
pub mod error;
pub mod likelihood;
pub mod logging;
pub mod model;
pub mod params;
pub mod record;
pub mod service;

pub use config::ServiceConfig;
pub use detector::{Backends, Detector, DetectorParams};
pub use error::{DetectorError, Result};
pub use logging::StructuredLogger;
pub use record::{Record, ScoreResult};
pub use service::{build_router, ServiceState};
