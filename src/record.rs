//! Input record and per-record score.

use crate::error::{DetectorError, Result};
use crate::params::{TIMESTAMP_FIELD, VALUE_FIELD};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observation of the metric. Records are expected in non-decreasing
/// timestamp order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl Record {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }

    /// Build a record from fractional seconds since the Unix epoch (UTC).
    pub fn from_epoch_seconds(secs: f64, value: f64) -> Result<Self> {
        if !secs.is_finite() {
            return Err(DetectorError::precondition(format!(
                "timestamp must be a finite number, got {}",
                secs
            )));
        }
        let whole = secs.floor();
        let nanos = (((secs - whole) * 1e9).round() as u32).min(999_999_999);
        let timestamp = DateTime::from_timestamp(whole as i64, nanos).ok_or_else(|| {
            DetectorError::precondition(format!("timestamp {} out of range", secs))
        })?;
        Ok(Self { timestamp, value })
    }
}

/// Record attribute an encoder reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordField {
    Timestamp,
    Value,
}

impl RecordField {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            TIMESTAMP_FIELD => Some(Self::Timestamp),
            VALUE_FIELD => Some(Self::Value),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Timestamp => TIMESTAMP_FIELD,
            Self::Value => VALUE_FIELD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    pub anomaly_score: f64,
    pub raw_score: f64,
}
