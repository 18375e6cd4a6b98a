//! Three-way encryption fan-out and blob lifecycle.
//!
//! One plaintext goes through AES-256-CBC, 3DES-CBC and RC4 concurrently,
//! each under its own key derived from the caller's session secret. The
//! three outputs land at `<root>/<alg>/<identifier>.enc`.

use crate::config::OrchestratorConfig;
use crate::error::{PipelineError, Result};
use crate::layout::{algorithm_dir, blob_path, validate_identifier};
use encryption::{
    split_blob, Algorithm, DecryptionResult, EncryptionResult, KeyManager, PerAlgorithm,
    SessionSecret,
};
use std::sync::Arc;
use storage::{BlobStore, FsBlobStore, Result as StorageResult};
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, instrument, warn};

fn timed_out(started: Instant) -> PipelineError {
    PipelineError::Timeout {
        elapsed: started.elapsed(),
    }
}

/// One algorithm's encryption output plus where it was stored.
#[derive(Debug, Clone)]
pub struct StoredEncryption {
    pub result: EncryptionResult,
    /// Relative to the storage root, `/`-separated.
    pub storage_path: String,
    /// Bytes on disk (IV included).
    pub stored_size: usize,
}

pub struct FileEncryptionOrchestrator<S: BlobStore = FsBlobStore> {
    store: Arc<S>,
    key_manager: KeyManager,
    config: OrchestratorConfig,
}

impl FileEncryptionOrchestrator<FsBlobStore> {
    /// Filesystem-backed orchestrator rooted at `config.storage_root`.
    pub fn from_config(config: OrchestratorConfig) -> Self {
        let store = FsBlobStore::new(config.storage_root.clone());
        Self::new(store, config)
    }
}

impl<S: BlobStore> FileEncryptionOrchestrator<S> {
    pub fn new(store: S, config: OrchestratorConfig) -> Self {
        Self::with_shared_store(Arc::new(store), config)
    }

    pub fn with_shared_store(store: Arc<S>, config: OrchestratorConfig) -> Self {
        Self {
            store,
            key_manager: KeyManager::new(),
            config,
        }
    }

    pub fn with_key_manager(mut self, key_manager: KeyManager) -> Self {
        self.key_manager = key_manager;
        self
    }

    pub fn key_manager(&self) -> &KeyManager {
        &self.key_manager
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create `aes/`, `des/` and `rc4/` under the root. Safe to call
    /// repeatedly and from concurrent callers.
    pub async fn ensure_directories(&self) -> Result<()> {
        let (aes, des, rc4) = tokio::join!(
            self.store.ensure_dir(algorithm_dir(Algorithm::Aes)),
            self.store.ensure_dir(algorithm_dir(Algorithm::Des)),
            self.store.ensure_dir(algorithm_dir(Algorithm::Rc4)),
        );
        let outcomes = PerAlgorithm::new(aes, des, rc4);
        for (algorithm, outcome) in outcomes {
            outcome.map_err(|source| PipelineError::Storage { algorithm, source })?;
        }
        Ok(())
    }

    /// Encrypt `plaintext` under all three algorithms and persist the blobs.
    ///
    /// Any branch failure fails the whole call. When
    /// [`OrchestratorConfig::cleanup_on_failure`] is set, blobs this call
    /// already wrote are removed before the error is returned.
    #[instrument(
        skip(self, plaintext, secret),
        fields(bytes = plaintext.len(), secret_fp = %secret.fingerprint())
    )]
    pub async fn encrypt_file_with_derived_keys(
        &self,
        plaintext: &[u8],
        identifier: &str,
        secret: &SessionSecret,
    ) -> Result<PerAlgorithm<StoredEncryption>> {
        validate_identifier(identifier)?;
        let started = Instant::now();
        let deadline = self.config.operation_timeout().map(|limit| started + limit);
        info!("starting three-way encryption");

        let outcome = self
            .encrypt_and_store(plaintext, identifier, secret, started, deadline)
            .await;

        match &outcome {
            Ok(stored) => info!(
                duration_us = started.elapsed().as_micros() as u64,
                aes_bytes = stored.aes.stored_size,
                des_bytes = stored.des.stored_size,
                rc4_bytes = stored.rc4.stored_size,
                "encryption complete"
            ),
            Err(e) => error!(error = %e, code = e.code(), "encryption failed"),
        }
        outcome
    }

    async fn encrypt_and_store(
        &self,
        plaintext: &[u8],
        identifier: &str,
        secret: &SessionSecret,
        started: Instant,
        deadline: Option<Instant>,
    ) -> Result<PerAlgorithm<StoredEncryption>> {
        let prepare = async {
            let results = self
                .encrypt_all(Arc::from(plaintext), identifier, secret)
                .await?;
            self.ensure_directories().await?;
            Ok::<_, PipelineError>(results)
        };
        // Nothing is written yet, so expiry here leaves storage untouched.
        let results = match deadline {
            Some(deadline) => timeout_at(deadline, prepare)
                .await
                .map_err(|_| timed_out(started))??,
            None => prepare.await?,
        };

        let paths = PerAlgorithm::from_fn(|algorithm| blob_path(algorithm, identifier));
        let blobs = results.as_ref().map(|_, result| result.to_blob());
        let sizes = blobs.as_ref().map(|_, blob| blob.len());

        let mut writes = self.spawn_writes(paths.clone(), blobs);
        let (joined, expired) = match deadline {
            Some(deadline) => match timeout_at(deadline, &mut writes).await {
                Ok(joined) => (joined, false),
                Err(_) => {
                    // Store writes may sit on the blocking pool and cannot be
                    // cancelled; cleanup has to see where they ended up.
                    warn!("deadline expired during writes, waiting for in-flight writes");
                    (writes.await, true)
                }
            },
            None => (writes.await, false),
        };
        let writes = joined.map_err(|e| PipelineError::Task(format!("write phase: {e}")))?;

        let written = writes.as_ref().map(|_, write| write.is_ok());
        if expired || !written.all() {
            if self.config.cleanup_on_failure && written.any() {
                self.remove_blobs(identifier, written).await;
            }
            if expired {
                return Err(timed_out(started));
            }
            let failure = writes
                .into_iter()
                .find_map(|(algorithm, write)| write.err().map(|source| (algorithm, source)));
            if let Some((algorithm, source)) = failure {
                return Err(PipelineError::Storage { algorithm, source });
            }
        }

        Ok(results.map(|algorithm, result| StoredEncryption {
            stored_size: *sizes.get(algorithm),
            storage_path: paths.get(algorithm).clone(),
            result,
        }))
    }

    /// Run the three writes as one detached task so they finish even if the
    /// caller stops waiting.
    fn spawn_writes(
        &self,
        paths: PerAlgorithm<String>,
        blobs: PerAlgorithm<Vec<u8>>,
    ) -> JoinHandle<PerAlgorithm<StorageResult<()>>> {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            let (aes, des, rc4) = tokio::join!(
                store.write(&paths.aes, &blobs.aes),
                store.write(&paths.des, &blobs.des),
                store.write(&paths.rc4, &blobs.rc4),
            );
            PerAlgorithm::new(aes, des, rc4)
        })
    }

    /// Derive each algorithm's key and encrypt on the blocking pool, all three
    /// at once. The first failing branch wins; each key is dropped (and
    /// zeroized) as soon as its branch finishes.
    pub(crate) async fn encrypt_all(
        &self,
        plaintext: Arc<[u8]>,
        identifier: &str,
        secret: &SessionSecret,
    ) -> Result<PerAlgorithm<EncryptionResult>> {
        let branch = |algorithm: Algorithm| {
            let plaintext = Arc::clone(&plaintext);
            let secret = secret.clone();
            let identifier = identifier.to_string();
            let key_manager = self.key_manager.clone();
            async move {
                let result = tokio::task::spawn_blocking(move || {
                    let key = key_manager
                        .derive_file_key(&secret, &identifier, algorithm)
                        .map_err(PipelineError::encryption(algorithm))?;
                    algorithm
                        .encryptor()
                        .encrypt(&plaintext, key.as_bytes())
                        .map_err(PipelineError::encryption(algorithm))
                })
                .await
                .map_err(|e| PipelineError::Task(format!("{algorithm} branch: {e}")))??;
                debug!(
                    %algorithm,
                    ciphertext_bytes = result.ciphertext_size(),
                    duration_us = result.duration().as_micros() as u64,
                    "branch encrypted"
                );
                Ok::<_, PipelineError>(result)
            }
        };

        let (aes, des, rc4) = tokio::try_join!(
            branch(Algorithm::Aes),
            branch(Algorithm::Des),
            branch(Algorithm::Rc4),
        )?;
        Ok(PerAlgorithm::new(aes, des, rc4))
    }

    /// Read one blob and decrypt it with a caller-supplied key.
    #[instrument(skip(self, key))]
    pub async fn decrypt_file(
        &self,
        algorithm: Algorithm,
        identifier: &str,
        key: &[u8],
    ) -> Result<DecryptionResult> {
        validate_identifier(identifier)?;
        let path = blob_path(algorithm, identifier);

        let blob = self
            .store
            .read(&path)
            .await
            .map_err(PipelineError::storage(algorithm, &path))?;

        let (iv, ciphertext) =
            split_blob(algorithm, &blob).map_err(PipelineError::encryption(algorithm))?;
        let plaintext = algorithm
            .encryptor()
            .decrypt(ciphertext, key, iv)
            .map_err(PipelineError::encryption(algorithm))?;

        debug!(
            bytes = plaintext.plaintext().len(),
            duration_us = plaintext.duration().as_micros() as u64,
            "blob decrypted"
        );
        Ok(plaintext)
    }

    /// Best-effort removal of all three blobs.
    ///
    /// Never fails: missing blobs and store errors are logged and reported as
    /// `false` for that algorithm.
    #[instrument(skip(self))]
    pub async fn delete_files(&self, identifier: &str) -> PerAlgorithm<bool> {
        if let Err(e) = validate_identifier(identifier) {
            warn!(error = %e, "refusing to delete");
            return PerAlgorithm::default();
        }
        let removed = self
            .remove_blobs(identifier, PerAlgorithm::new(true, true, true))
            .await;
        info!(
            aes = removed.aes,
            des = removed.des,
            rc4 = removed.rc4,
            "delete finished"
        );
        removed
    }

    /// Independent existence probes. A probe error counts as absent.
    #[instrument(skip(self))]
    pub async fn check_files_exist(&self, identifier: &str) -> PerAlgorithm<bool> {
        if let Err(e) = validate_identifier(identifier) {
            warn!(error = %e, "refusing to probe");
            return PerAlgorithm::default();
        }
        let paths = PerAlgorithm::from_fn(|algorithm| blob_path(algorithm, identifier));
        let (aes, des, rc4) = tokio::join!(
            self.store.exists(&paths.aes),
            self.store.exists(&paths.des),
            self.store.exists(&paths.rc4),
        );
        PerAlgorithm::new(aes, des, rc4).map(|algorithm, probe| {
            probe.unwrap_or_else(|e| {
                warn!(%algorithm, error = %e, "existence probe failed");
                false
            })
        })
    }

    /// Delete the selected blobs concurrently. Returns which ones were removed.
    async fn remove_blobs(&self, identifier: &str, which: PerAlgorithm<bool>) -> PerAlgorithm<bool> {
        let paths = PerAlgorithm::from_fn(|algorithm| blob_path(algorithm, identifier));
        let delete = |algorithm: Algorithm| {
            let path = paths.get(algorithm);
            let selected = *which.get(algorithm);
            async move {
                if !selected {
                    return false;
                }
                match self.store.delete(path).await {
                    Ok(removed) => {
                        debug!(%algorithm, path = %path, removed, "blob delete");
                        removed
                    }
                    Err(e) => {
                        warn!(%algorithm, path = %path, error = %e, "blob delete failed");
                        false
                    }
                }
            }
        };

        let (aes, des, rc4) = tokio::join!(
            delete(Algorithm::Aes),
            delete(Algorithm::Des),
            delete(Algorithm::Rc4),
        );
        PerAlgorithm::new(aes, des, rc4)
    }
}
