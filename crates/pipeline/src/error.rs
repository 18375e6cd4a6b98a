use encryption::{Algorithm, EncryptionError};
use std::time::Duration;
use storage::StorageError;
use thiserror::Error;

/// Orchestration errors
///
/// Cryptographic and storage failures stay in separate variants so the
/// boundary can tell "wrong key or corrupt blob" from "disk trouble".
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("{algorithm} cipher failure: {source}")]
    Encryption {
        algorithm: Algorithm,
        #[source]
        source: EncryptionError,
    },

    #[error("{algorithm} storage failure: {source}")]
    Storage {
        algorithm: Algorithm,
        #[source]
        source: StorageError,
    },

    #[error("{algorithm} blob not found at {path}")]
    BlobNotFound { algorithm: Algorithm, path: String },

    /// A blocking branch panicked or was cancelled.
    #[error("Task failure: {0}")]
    Task(String),

    #[error("Operation timed out after {elapsed:?}")]
    Timeout { elapsed: Duration },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::InvalidIdentifier(_) => "invalid_identifier",
            PipelineError::Encryption { source, .. } => source.code(),
            PipelineError::Storage { .. } => "storage_error",
            PipelineError::BlobNotFound { .. } => "blob_not_found",
            PipelineError::Task(_) => "task_failed",
            PipelineError::Timeout { .. } => "timeout",
            PipelineError::Config(_) => "invalid_configuration",
        }
    }

    pub fn is_client_error(&self) -> bool {
        match self {
            PipelineError::InvalidIdentifier(_) | PipelineError::BlobNotFound { .. } => true,
            PipelineError::Encryption { source, .. } => source.is_client_error(),
            PipelineError::Storage { .. }
            | PipelineError::Task(_)
            | PipelineError::Timeout { .. }
            | PipelineError::Config(_) => false,
        }
    }

    /// The branch that failed, when the failure belongs to one.
    pub fn algorithm(&self) -> Option<Algorithm> {
        match self {
            PipelineError::Encryption { algorithm, .. }
            | PipelineError::Storage { algorithm, .. }
            | PipelineError::BlobNotFound { algorithm, .. } => Some(*algorithm),
            _ => None,
        }
    }

    pub(crate) fn encryption(algorithm: Algorithm) -> impl FnOnce(EncryptionError) -> Self {
        move |source| PipelineError::Encryption { algorithm, source }
    }

    pub(crate) fn storage(algorithm: Algorithm, path: &str) -> impl FnOnce(StorageError) -> Self + '_ {
        move |source| {
            if source.is_not_found() {
                PipelineError::BlobNotFound {
                    algorithm,
                    path: path.to_string(),
                }
            } else {
                PipelineError::Storage { algorithm, source }
            }
        }
    }
}
