//! API route handlers

use super::error::ApiError;
use super::ServiceState;
use crate::detector::DetectorParams;
use crate::likelihood::LikelihoodSettings;
use crate::params::{FieldEncoders, ModelConfig, ScalarEncoderParams};
use crate::record::{Record, ScoreResult};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitRequest {
    pub input_min: f64,
    pub input_max: f64,
    pub probationary_period: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitResponse {
    pub status: String,
    pub detector_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct HandleRecordRequest {
    /// Seconds since the Unix epoch (UTC)
    pub timestamp: f64,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelParamsResponse {
    pub detector_id: Uuid,
    pub model_params: ModelConfig<FieldEncoders>,
    pub sensor_params: ScalarEncoderParams,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub likelihood: Option<LikelihoodSettings>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub detector_active: bool,
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(v)| v)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

pub async fn init(
    State(state): State<ServiceState>,
    payload: Result<Json<InitRequest>, JsonRejection>,
) -> Result<Json<InitResponse>, ApiError> {
    let req = body(payload)?;
    let detector_id = state
        .init_detector(DetectorParams {
            input_min: req.input_min,
            input_max: req.input_max,
            probationary_period: req.probationary_period,
        })
        .await?;
    Ok(Json(InitResponse {
        status: "OK".to_string(),
        detector_id,
    }))
}

pub async fn handle_record(
    State(state): State<ServiceState>,
    payload: Result<Json<HandleRecordRequest>, JsonRejection>,
) -> Result<Json<ScoreResult>, ApiError> {
    let req = body(payload)?;
    let record = Record::from_epoch_seconds(req.timestamp, req.value)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    Ok(Json(state.handle_record(record).await?))
}

pub async fn model_params(
    State(state): State<ServiceState>,
) -> Result<Json<ModelParamsResponse>, ApiError> {
    Ok(Json(state.model_params().await?))
}

pub async fn health(State(state): State<ServiceState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "stream-anomaly",
        version: env!("CARGO_PKG_VERSION"),
        detector_active: state.active_detector().await.is_some(),
    })
}
