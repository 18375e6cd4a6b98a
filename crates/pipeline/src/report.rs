//! Side-by-side metrics for one three-way encryption.

use crate::orchestrator::StoredEncryption;
use encryption::{Algorithm, CipherMode, PerAlgorithm};
use serde::Serialize;

const MIB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRow {
    pub algorithm: Algorithm,
    pub mode: CipherMode,
    pub key_size_bits: u32,
    pub ciphertext_size: usize,
    pub stored_size: usize,
    /// Ciphertext bytes minus plaintext bytes (padding; 0 for RC4).
    pub size_overhead: i64,
    pub duration_us: u64,
    /// `None` when the encryption finished below timer resolution.
    pub throughput_mib_s: Option<f64>,
    pub storage_path: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    pub identifier: String,
    pub plaintext_size: usize,
    pub rows: Vec<MetricRow>,
}

impl ComparisonReport {
    pub fn new(
        identifier: impl Into<String>,
        plaintext_size: usize,
        stored: &PerAlgorithm<StoredEncryption>,
    ) -> Self {
        let rows = stored
            .iter()
            .map(|(algorithm, entry)| {
                let result = &entry.result;
                let duration = result.duration();
                let secs = duration.as_secs_f64();
                MetricRow {
                    algorithm,
                    mode: result.metadata().mode,
                    key_size_bits: result.metadata().key_size_bits,
                    ciphertext_size: result.ciphertext_size(),
                    stored_size: entry.stored_size,
                    size_overhead: result.ciphertext_size() as i64 - plaintext_size as i64,
                    duration_us: duration.as_micros() as u64,
                    throughput_mib_s: (secs > 0.0).then(|| plaintext_size as f64 / MIB / secs),
                    storage_path: entry.storage_path.clone(),
                    timestamp: result.metadata().timestamp_rfc3339(),
                }
            })
            .collect();

        Self {
            identifier: identifier.into(),
            plaintext_size,
            rows,
        }
    }

    pub fn row(&self, algorithm: Algorithm) -> Option<&MetricRow> {
        self.rows.iter().find(|row| row.algorithm == algorithm)
    }

    pub fn fastest(&self) -> Option<&MetricRow> {
        self.rows.iter().min_by_key(|row| row.duration_us)
    }

    /// Smallest on-disk footprint.
    pub fn smallest(&self) -> Option<&MetricRow> {
        self.rows.iter().min_by_key(|row| row.stored_size)
    }
}
