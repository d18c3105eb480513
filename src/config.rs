//! Service configuration. Per-stream parameters (range, probationary period)
//! arrive with each init request; this file only tunes the service itself.

use crate::params::TmImplementation;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP listen address
    pub listen: SocketAddr,
    /// Defaults applied to every detector created by the service
    pub detector: DetectorConfig,
    /// Likelihood estimator windows
    pub likelihood: LikelihoodConfig,
    /// Logging
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Report log-likelihood scores; `false` passes raw scores through.
    pub use_likelihood: bool,
    /// Sequential-memory backend hint passed to the template provider
    pub tm_implementation: TmImplementation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LikelihoodConfig {
    /// Raw scores kept for re-estimation
    pub historic_window_size: usize,
    /// Moving-average window over raw scores
    pub averaging_window: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 5000)),
            detector: DetectorConfig::default(),
            likelihood: LikelihoodConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            use_likelihood: true,
            tm_implementation: TmImplementation::Cpp,
        }
    }
}

impl Default for LikelihoodConfig {
    fn default() -> Self {
        Self {
            historic_window_size: 8640,
            averaging_window: 10,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_owned(),
            json: true,
        }
    }
}

impl ServiceConfig {
    /// Read the JSON file at `path`. A missing file is `Ok(None)`.
    pub fn try_load(path: &Path) -> Result<Option<Self>, ConfigError> {
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        serde_json::from_str(&data)
            .map(Some)
            .map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Like [`ServiceConfig::try_load`], falling back to defaults with a
    /// warning when the file is unreadable or invalid.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(config) => config.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "using default config");
                Self::default()
            }
        }
    }
}
