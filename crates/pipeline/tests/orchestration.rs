use encryption::{Algorithm, EncryptionError, KeyManager, SessionSecret};
use futures::future::BoxFuture;
use pipeline::{FileEncryptionOrchestrator, OrchestratorConfig, PipelineError};
use std::time::Duration;
use storage::{BlobStore, InMemoryBlobStore, StorageError};
use tempfile::TempDir;

fn fs_orchestrator() -> (TempDir, FileEncryptionOrchestrator) {
    let dir = tempfile::tempdir().unwrap();
    let orch = FileEncryptionOrchestrator::from_config(OrchestratorConfig::new(dir.path()));
    (dir, orch)
}

#[tokio::test]
async fn five_byte_fan_out_on_disk() {
    let (dir, orch) = fs_orchestrator();
    let secret = SessionSecret::generate();

    let stored = orch
        .encrypt_file_with_derived_keys(&[1, 2, 3, 4, 5], "five", &secret)
        .await
        .unwrap();

    for (algorithm, entry) in stored.iter() {
        assert_eq!(entry.result.algorithm(), algorithm);
        assert_eq!(entry.storage_path, format!("{}/five.enc", algorithm.tag()));
        let on_disk = std::fs::read(dir.path().join(&entry.storage_path)).unwrap();
        assert_eq!(on_disk.len(), entry.stored_size);
    }

    assert_ne!(stored.aes.result.ciphertext(), stored.des.result.ciphertext());
    assert_ne!(stored.aes.result.ciphertext(), stored.rc4.result.ciphertext());
    assert_ne!(stored.des.result.ciphertext(), stored.rc4.result.ciphertext());
    assert_eq!(stored.rc4.result.ciphertext_size(), 5);

    let km = KeyManager::new();
    for algorithm in Algorithm::ALL {
        let key = km.derive_file_key(&secret, "five", algorithm).unwrap();
        let plain = orch
            .decrypt_file(algorithm, "five", key.as_bytes())
            .await
            .unwrap();
        assert_eq!(plain.plaintext(), &[1u8, 2, 3, 4, 5][..]);
    }
}

#[tokio::test]
async fn file_42_hello_world() {
    let (_dir, orch) = fs_orchestrator();
    let secret = SessionSecret::generate();

    orch.encrypt_file_with_derived_keys(b"hello world", "file-42", &secret)
        .await
        .unwrap();

    let key = orch
        .key_manager()
        .derive_file_key(&secret, "file-42", Algorithm::Aes)
        .unwrap();
    let plain = orch
        .decrypt_file(Algorithm::Aes, "file-42", key.as_bytes())
        .await
        .unwrap();
    assert_eq!(plain.plaintext(), b"hello world");
}

#[tokio::test]
async fn delete_never_encrypted_identifier() {
    let (_dir, orch) = fs_orchestrator();
    let removed = orch.delete_files("ghost").await;
    assert!(!removed.any());
    assert!(!orch.check_files_exist("ghost").await.any());
}

#[tokio::test]
async fn delete_then_decrypt_is_not_found() {
    let (dir, orch) = fs_orchestrator();
    let secret = SessionSecret::generate();
    orch.encrypt_file_with_derived_keys(b"to be removed", "gone", &secret)
        .await
        .unwrap();

    assert!(orch.delete_files("gone").await.all());
    assert!(!dir.path().join("aes/gone.enc").exists());

    let key = orch
        .key_manager()
        .derive_file_key(&secret, "gone", Algorithm::Des)
        .unwrap();
    let err = orch
        .decrypt_file(Algorithm::Des, "gone", key.as_bytes())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "blob_not_found");
}

#[tokio::test]
async fn truncated_blob_is_constant_error() {
    let (dir, orch) = fs_orchestrator();
    let secret = SessionSecret::generate();
    orch.encrypt_file_with_derived_keys(b"sixteen byte msg", "pad", &secret)
        .await
        .unwrap();

    // Shorter than the 8-byte IV.
    let path = dir.path().join("des/pad.enc");
    let blob = std::fs::read(&path).unwrap();
    std::fs::write(&path, &blob[..3]).unwrap();

    let key = orch
        .key_manager()
        .derive_file_key(&secret, "pad", Algorithm::Des)
        .unwrap();
    let err = orch
        .decrypt_file(Algorithm::Des, "pad", key.as_bytes())
        .await
        .unwrap_err();
    match err {
        PipelineError::Encryption { algorithm, source } => {
            assert_eq!(algorithm, Algorithm::Des);
            assert!(matches!(source, EncryptionError::DecryptionFailed));
            assert_eq!(source.to_string(), "Decryption failed");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn wrong_key_length_on_decrypt() {
    let (_dir, orch) = fs_orchestrator();
    let secret = SessionSecret::generate();
    orch.encrypt_file_with_derived_keys(b"abc", "keylen", &secret)
        .await
        .unwrap();

    let err = orch
        .decrypt_file(Algorithm::Aes, "keylen", &[0u8; 16])
        .await
        .unwrap_err();
    assert_eq!(err.code(), "invalid_key_length");
    assert!(err.is_client_error());
}

#[tokio::test]
async fn traversal_identifiers_rejected() {
    let (dir, orch) = fs_orchestrator();
    let secret = SessionSecret::generate();

    for bad in ["../outside", "nested/id", "..", ""] {
        let err = orch
            .encrypt_file_with_derived_keys(b"x", bad, &secret)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidIdentifier(_)), "{bad:?}");
    }
    assert!(!dir.path().join("aes").exists());
    assert!(!dir.path().parent().unwrap().join("outside.enc").exists());
}

#[tokio::test]
async fn concurrent_uploads_share_directories() {
    let (_dir, orch) = fs_orchestrator();
    let secret = SessionSecret::generate();

    let (a, b, c) = tokio::join!(
        orch.encrypt_file_with_derived_keys(b"first", "one", &secret),
        orch.encrypt_file_with_derived_keys(b"second", "two", &secret),
        orch.encrypt_file_with_derived_keys(b"third", "three", &secret),
    );
    assert!(a.is_ok() && b.is_ok() && c.is_ok());
    for id in ["one", "two", "three"] {
        assert!(orch.check_files_exist(id).await.all());
    }
}

#[tokio::test]
async fn reencrypting_replaces_blobs() {
    let (_dir, orch) = fs_orchestrator();
    let secret = SessionSecret::generate();
    orch.encrypt_file_with_derived_keys(b"version one", "doc", &secret)
        .await
        .unwrap();
    orch.encrypt_file_with_derived_keys(b"version two", "doc", &secret)
        .await
        .unwrap();

    let key = orch
        .key_manager()
        .derive_file_key(&secret, "doc", Algorithm::Rc4)
        .unwrap();
    let plain = orch
        .decrypt_file(Algorithm::Rc4, "doc", key.as_bytes())
        .await
        .unwrap();
    assert_eq!(plain.plaintext(), b"version two");
}

/// Store whose writes under one prefix block a pool thread, the way
/// `tokio::fs` does, so dropping the write future does not stop them.
struct BlockingSlowStore {
    inner: InMemoryBlobStore,
    slow_prefix: &'static str,
    delay: Duration,
}

impl BlobStore for BlockingSlowStore {
    fn ensure_dir<'a>(&'a self, relative: &'a str) -> BoxFuture<'a, Result<(), StorageError>> {
        self.inner.ensure_dir(relative)
    }

    fn write<'a>(
        &'a self,
        relative: &'a str,
        data: &'a [u8],
    ) -> BoxFuture<'a, Result<(), StorageError>> {
        let inner = self.inner.clone();
        let path = relative.to_string();
        let data = data.to_vec();
        let delay = if relative.starts_with(self.slow_prefix) {
            self.delay
        } else {
            Duration::ZERO
        };
        Box::pin(async move {
            tokio::task::spawn_blocking(move || {
                std::thread::sleep(delay);
                inner.put_raw(&path, data);
            })
            .await
            .map_err(|e| StorageError::Io {
                op: "write",
                path: relative.to_string(),
                source: std::io::Error::other(e),
            })
        })
    }

    fn read<'a>(&'a self, relative: &'a str) -> BoxFuture<'a, Result<Vec<u8>, StorageError>> {
        self.inner.read(relative)
    }

    fn delete<'a>(&'a self, relative: &'a str) -> BoxFuture<'a, Result<bool, StorageError>> {
        self.inner.delete(relative)
    }

    fn exists<'a>(&'a self, relative: &'a str) -> BoxFuture<'a, Result<bool, StorageError>> {
        self.inner.exists(relative)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn deadline_during_blocking_write_leaves_no_orphans() {
    let inner = InMemoryBlobStore::new();
    let store = BlockingSlowStore {
        inner: inner.clone(),
        slow_prefix: "rc4/",
        delay: Duration::from_millis(500),
    };
    let orch = FileEncryptionOrchestrator::new(
        store,
        OrchestratorConfig::default().with_timeout(Duration::from_millis(100)),
    );

    let err = orch
        .encrypt_file_with_derived_keys(b"slow", "late", &SessionSecret::generate())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Timeout { .. }));
    assert_eq!(err.code(), "timeout");
    assert!(inner.paths().is_empty());

    // Nothing still in flight can land after the call returned.
    tokio::time::sleep(Duration::from_millis(700)).await;
    assert!(inner.paths().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn deadline_before_writes_keeps_previous_blobs() {
    let store = InMemoryBlobStore::new();
    let secret = SessionSecret::generate();

    let relaxed = FileEncryptionOrchestrator::new(store.clone(), OrchestratorConfig::default());
    relaxed
        .encrypt_file_with_derived_keys(b"version one", "doc", &secret)
        .await
        .unwrap();
    assert_eq!(store.paths(), vec!["aes/doc.enc", "des/doc.enc", "rc4/doc.enc"]);

    let hurried = FileEncryptionOrchestrator::new(
        store.clone(),
        OrchestratorConfig::default().with_timeout(Duration::from_millis(1)),
    );
    let large = vec![0x42u8; 8 * 1024 * 1024];
    let err = hurried
        .encrypt_file_with_derived_keys(&large, "doc", &secret)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Timeout { .. }));

    assert_eq!(store.paths(), vec!["aes/doc.enc", "des/doc.enc", "rc4/doc.enc"]);
    for algorithm in Algorithm::ALL {
        let key = relaxed
            .key_manager()
            .derive_file_key(&secret, "doc", algorithm)
            .unwrap();
        let plain = relaxed
            .decrypt_file(algorithm, "doc", key.as_bytes())
            .await
            .unwrap();
        assert_eq!(plain.plaintext(), b"version one");
    }
}

#[tokio::test]
async fn partial_failure_leaves_no_blobs() {
    let store = InMemoryBlobStore::new();
    store.fail_writes_under("aes/");
    let orch = FileEncryptionOrchestrator::new(store.clone(), OrchestratorConfig::default());

    let err = orch
        .encrypt_file_with_derived_keys(b"abcde", "partial", &SessionSecret::generate())
        .await
        .unwrap_err();

    assert_eq!(err.algorithm(), Some(Algorithm::Aes));
    assert_eq!(err.code(), "storage_error");
    assert!(store.paths().is_empty());
    assert!(!orch.check_files_exist("partial").await.any());
}
