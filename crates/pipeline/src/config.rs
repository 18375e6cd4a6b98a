//! Orchestrator configuration
//!
//! Loadable from TOML, from `VAULT_*` environment variables, or built in code.
//!
//! ```toml
//! storage_root = "/var/lib/vault/encrypted"
//! operation_timeout_ms = 30000
//! cleanup_on_failure = true
//! ```

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const STORAGE_ROOT_ENV: &str = "VAULT_STORAGE_ROOT";
pub const OPERATION_TIMEOUT_ENV: &str = "VAULT_OPERATION_TIMEOUT_MS";
pub const CLEANUP_ON_FAILURE_ENV: &str = "VAULT_CLEANUP_ON_FAILURE";

/// Default directory under which the `aes/`, `des/` and `rc4/` trees live.
pub const DEFAULT_STORAGE_ROOT: &str = "encrypted";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrchestratorConfig {
    pub storage_root: PathBuf,
    /// Deadline for the whole encrypt fan-out. `None` waits indefinitely.
    pub operation_timeout_ms: Option<u64>,
    /// Remove blobs written by a call that failed on another branch.
    pub cleanup_on_failure: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from(DEFAULT_STORAGE_ROOT),
            operation_timeout_ms: None,
            cleanup_on_failure: true,
        }
    }
}

impl OrchestratorConfig {
    pub fn new(storage_root: impl Into<PathBuf>) -> Self {
        Self {
            storage_root: storage_root.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout_ms = Some(timeout.as_millis().min(u64::MAX as u128) as u64);
        self
    }

    pub fn with_cleanup_on_failure(mut self, cleanup: bool) -> Self {
        self.cleanup_on_failure = cleanup;
        self
    }

    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout_ms.map(Duration::from_millis)
    }

    /// Defaults overridden by whichever `VAULT_*` variables are set.
    ///
    /// # Errors
    /// Returns error if a variable is set but does not parse.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(root) = std::env::var(STORAGE_ROOT_ENV) {
            config.storage_root = PathBuf::from(root);
        }
        if let Ok(raw) = std::env::var(OPERATION_TIMEOUT_ENV) {
            let ms = raw.trim().parse::<u64>().map_err(|_| {
                PipelineError::Config(format!("{OPERATION_TIMEOUT_ENV} must be milliseconds, got '{raw}'"))
            })?;
            config.operation_timeout_ms = (ms > 0).then_some(ms);
        }
        if let Ok(raw) = std::env::var(CLEANUP_ON_FAILURE_ENV) {
            config.cleanup_on_failure = parse_bool(&raw).ok_or_else(|| {
                PipelineError::Config(format!("{CLEANUP_ON_FAILURE_ENV} must be a boolean, got '{raw}'"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(input).map_err(|e| PipelineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.storage_root.as_os_str().is_empty() {
            return Err(PipelineError::Config("storage_root must not be empty".into()));
        }
        if self.operation_timeout_ms == Some(0) {
            return Err(PipelineError::Config(
                "operation_timeout_ms must be positive; omit it to disable".into(),
            ));
        }
        Ok(())
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        std::env::remove_var(STORAGE_ROOT_ENV);
        std::env::remove_var(OPERATION_TIMEOUT_ENV);
        std::env::remove_var(CLEANUP_ON_FAILURE_ENV);
    }

    #[test]
    fn test_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.storage_root, PathBuf::from(DEFAULT_STORAGE_ROOT));
        assert!(config.operation_timeout().is_none());
        assert!(config.cleanup_on_failure);
    }

    #[test]
    fn test_from_toml() {
        let config = OrchestratorConfig::from_toml_str(
            "storage_root = \"/srv/vault\"\noperation_timeout_ms = 1500\n",
        )
        .unwrap();
        assert_eq!(config.storage_root, PathBuf::from("/srv/vault"));
        assert_eq!(config.operation_timeout(), Some(Duration::from_millis(1500)));
        assert!(config.cleanup_on_failure);
    }

    #[test]
    fn test_toml_rejects_unknown_and_zero_timeout() {
        assert!(OrchestratorConfig::from_toml_str("storage_rot = \"x\"").is_err());
        let err = OrchestratorConfig::from_toml_str("operation_timeout_ms = 0").unwrap_err();
        assert_eq!(err.code(), "invalid_configuration");
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        std::env::set_var(STORAGE_ROOT_ENV, "/tmp/vault-env");
        std::env::set_var(OPERATION_TIMEOUT_ENV, "250");
        std::env::set_var(CLEANUP_ON_FAILURE_ENV, "off");

        let config = OrchestratorConfig::from_env().unwrap();
        clear_env();

        assert_eq!(config.storage_root, PathBuf::from("/tmp/vault-env"));
        assert_eq!(config.operation_timeout(), Some(Duration::from_millis(250)));
        assert!(!config.cleanup_on_failure);
    }

    #[test]
    #[serial]
    fn test_from_env_bad_value() {
        clear_env();
        std::env::set_var(OPERATION_TIMEOUT_ENV, "soon");
        let result = OrchestratorConfig::from_env();
        clear_env();

        assert!(matches!(result, Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_builder_helpers() {
        let config = OrchestratorConfig::new("root")
            .with_timeout(Duration::from_secs(2))
            .with_cleanup_on_failure(false);
        assert_eq!(config.operation_timeout_ms, Some(2000));
        assert!(!config.cleanup_on_failure);
        assert!(config.validate().is_ok());
    }
}
