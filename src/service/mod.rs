//! HTTP service: one active detector per process, replaced by each init call.

mod error;
mod routes;

pub use error::ApiError;
pub use routes::{
    HandleRecordRequest, HealthResponse, InitRequest, InitResponse, ModelParamsResponse,
};

use crate::config::{DetectorConfig, LikelihoodConfig, ServiceConfig};
use crate::detector::{Backends, Detector, DetectorParams};
use crate::error::{DetectorError, Result};
use crate::record::{Record, ScoreResult};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

/// Router state: the single detector slot plus what is needed to build a
/// replacement.
#[derive(Clone)]
pub struct ServiceState {
    slot: Arc<Mutex<Option<Detector>>>,
    backends: Backends,
    detector: DetectorConfig,
    likelihood: LikelihoodConfig,
}

impl ServiceState {
    pub fn new(config: &ServiceConfig) -> Self {
        Self::with_backends(config, Backends::default())
    }

    pub fn with_backends(config: &ServiceConfig, backends: Backends) -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
            backends,
            detector: config.detector.clone(),
            likelihood: config.likelihood,
        }
    }

    /// Build and initialize a new detector, then swap it into the slot.
    /// In-flight record calls hold the slot lock, so they finish against the
    /// old detector before the swap.
    pub async fn init_detector(&self, params: DetectorParams) -> Result<Uuid> {
        let mut detector = Detector::new(params).with_config(&self.detector, &self.likelihood);
        detector.initialize(&self.backends)?;
        let id = detector.id();

        let previous = self.slot.lock().await.replace(detector);
        match previous {
            Some(old) => info!(
                detector_id = %id,
                replaced = %old.id(),
                replaced_records = old.records_handled(),
                "active detector replaced"
            ),
            None => info!(detector_id = %id, "active detector installed"),
        }
        Ok(id)
    }

    pub async fn handle_record(&self, record: Record) -> Result<ScoreResult> {
        let mut slot = self.slot.lock().await;
        let detector = slot.as_mut().ok_or_else(no_detector)?;
        detector.handle_record(&record)
    }

    pub async fn model_params(&self) -> Result<ModelParamsResponse> {
        let slot = self.slot.lock().await;
        let detector = slot.as_ref().ok_or_else(no_detector)?;
        match (detector.model_params(), detector.sensor_params()) {
            (Some(model_params), Some(sensor_params)) => Ok(ModelParamsResponse {
                detector_id: detector.id(),
                model_params: model_params.clone(),
                sensor_params: sensor_params.clone(),
                likelihood: detector.likelihood_settings().copied(),
            }),
            _ => Err(DetectorError::precondition("active detector not initialized")),
        }
    }

    pub async fn active_detector(&self) -> Option<Uuid> {
        self.slot.lock().await.as_ref().map(Detector::id)
    }
}

fn no_detector() -> DetectorError {
    DetectorError::precondition("no active detector; POST /api/init first")
}

pub fn build_router(state: ServiceState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/api/init", post(routes::init))
        .route("/api/handleRecord", post(routes::handle_record))
        .route("/api/modelParams", get(routes::model_params))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Resolves on Ctrl+C.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
