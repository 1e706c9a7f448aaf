use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failures talking to the activity store.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("query timed out after {0:?}")]
    Timeout(Duration),
}

/// Failures loading the scaler or classifier. Fatal at startup.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse artifact {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed artifact: {0}")]
    Shape(String),
}

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("data source unavailable: {0}")]
    DataSourceUnavailable(#[from] SourceError),

    #[error("classifier produced class {0} with no learner type mapping")]
    UnmappedClass(usize),
}
