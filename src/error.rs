//! Error taxonomy shared by the detector, its backends and the HTTP layer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectorError {
    /// Malformed or out-of-range parameters, or a template the provider cannot produce.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Lifecycle violation or malformed record.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// The model or likelihood estimator reported a failure.
    #[error("upstream failure: {0}")]
    Upstream(String),
}

impl DetectorError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream(message.into())
    }
}

pub type Result<T> = std::result::Result<T, DetectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_category() {
        let err = DetectorError::configuration("probationary period must be positive");
        assert_eq!(
            err.to_string(),
            "configuration error: probationary period must be positive"
        );
        let err = DetectorError::precondition("detector not initialized");
        assert_eq!(err.to_string(), "precondition failed: detector not initialized");
        let err = DetectorError::upstream("inference not enabled");
        assert_eq!(err.to_string(), "upstream failure: inference not enabled");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + std::error::Error>() {}
        assert_send_sync::<DetectorError>();
    }
}
