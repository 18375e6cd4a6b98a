//! # Encryption Pipeline
//!
//! Runs one plaintext through all three encryptors concurrently, stores the
//! outputs side by side, and reports how the algorithms compare.
//!
//! ```rust,ignore
//! use pipeline::{FileEncryptionOrchestrator, OrchestratorConfig};
//!
//! let orch = FileEncryptionOrchestrator::from_config(OrchestratorConfig::from_env()?);
//! let stored = orch.encrypt_file_with_derived_keys(&bytes, "file-42", &secret).await?;
//! println!("{}", stored.aes.storage_path); // aes/file-42.enc
//! ```

pub mod config;
pub mod error;
pub mod field;
pub mod layout;
pub mod orchestrator;
pub mod report;

pub use config::OrchestratorConfig;
pub use error::{PipelineError, Result};
pub use field::{field_identifier, EncryptedField};
pub use layout::{blob_path, validate_identifier};
pub use orchestrator::{FileEncryptionOrchestrator, StoredEncryption};
pub use report::{ComparisonReport, MetricRow};
