//! # Compression Outcome Module
//!
//! Questo modulo definisce il risultato del processing di un singolo oggetto.
//!
//! ## Responsabilità:
//! - Rappresenta l'esito di un oggetto: committed, skipped o failed
//! - Calcola la percentuale di riduzione
//! - Porta la `supersede_key` quando l'artefatto è stato scritto sotto una
//!   key diversa dall'originale
//!
//! ## Regole:
//! - **committed**: l'output compresso è stato (o sarebbe stato, in dry run)
//!   scritto perché sotto la soglia di `size_threshold × original`
//! - **skipped**: guadagno insufficiente, `compressed_size == original_size`
//!   e `reduction_ratio == 0`
//! - **failed**: errore per oggetto, nessun byte conteggiato nel riepilogo
//!
//! Un outcome è immutabile dopo la creazione: viene prodotto una sola volta
//! dal `TaskOptimizer` e consumato dal `BucketOptimizer`.

use crate::error::OptimizeError;
use crate::format::Codec;
use serde::{Serialize, Serializer};
use std::time::Duration;

/// Final state of one object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Committed,
    Skipped,
    Failed,
}

/// Result of processing one `ImageObject`
#[derive(Debug, Clone, Serialize)]
pub struct CompressionOutcome {
    pub key: String,
    pub status: OutcomeStatus,
    pub original_size: u64,
    pub compressed_size: u64,
    /// Percentage, `(original - compressed) / original * 100`
    pub reduction_ratio: f64,
    #[serde(rename = "elapsed_seconds", serialize_with = "as_seconds")]
    pub elapsed: Duration,
    /// Codec written for committed objects
    pub codec: Option<Codec>,
    /// Key the artifact was stored under
    pub stored_key: Option<String>,
    /// Original key made redundant by a rewrite under a different key
    pub supersede_key: Option<String>,
    /// Error category (`fetch`, `decode`, ...) for failed objects
    pub error_kind: Option<&'static str>,
    pub error: Option<String>,
}

impl CompressionOutcome {
    pub fn committed(
        key: impl Into<String>,
        original_size: u64,
        compressed_size: u64,
        codec: Codec,
        stored_key: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        let key = key.into();
        let stored_key = stored_key.into();
        let supersede_key = (stored_key != key).then(|| key.clone());
        Self {
            reduction_ratio: calculate_reduction(original_size, compressed_size),
            key,
            status: OutcomeStatus::Committed,
            original_size,
            compressed_size,
            elapsed,
            codec: Some(codec),
            stored_key: Some(stored_key),
            supersede_key,
            error_kind: None,
            error: None,
        }
    }

    pub fn skipped(key: impl Into<String>, original_size: u64, elapsed: Duration) -> Self {
        Self {
            key: key.into(),
            status: OutcomeStatus::Skipped,
            original_size,
            compressed_size: original_size,
            reduction_ratio: 0.0,
            elapsed,
            codec: None,
            stored_key: None,
            supersede_key: None,
            error_kind: None,
            error: None,
        }
    }

    pub fn failed(key: impl Into<String>, original_size: u64, error: &OptimizeError, elapsed: Duration) -> Self {
        Self {
            key: key.into(),
            status: OutcomeStatus::Failed,
            original_size,
            compressed_size: original_size,
            reduction_ratio: 0.0,
            elapsed,
            codec: None,
            stored_key: None,
            supersede_key: None,
            error_kind: Some(error.category()),
            error: Some(error.to_string()),
        }
    }

    /// Committed or skipped
    pub fn is_success(&self) -> bool {
        self.status != OutcomeStatus::Failed
    }

    pub fn is_committed(&self) -> bool {
        self.status == OutcomeStatus::Committed
    }

    pub fn is_skipped(&self) -> bool {
        self.status == OutcomeStatus::Skipped
    }

    pub fn bytes_saved(&self) -> u64 {
        self.original_size.saturating_sub(self.compressed_size)
    }
}

/// Reduction percentage, 0 when `original` is 0
pub fn calculate_reduction(original: u64, compressed: u64) -> f64 {
    if original == 0 {
        return 0.0;
    }
    (1.0 - (compressed as f64 / original as f64)) * 100.0
}

fn as_seconds<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;

    #[test]
    fn test_calculate_reduction() {
        assert_eq!(calculate_reduction(1000, 500), 50.0);
        assert_eq!(calculate_reduction(1000, 1000), 0.0);
        assert_eq!(calculate_reduction(0, 0), 0.0);
        assert!(calculate_reduction(100, 150) < 0.0);
    }

    #[test]
    fn test_committed_same_key() {
        let outcome = CompressionOutcome::committed("a/b.png", 1000, 400, Codec::Png, "a/b.png", Duration::ZERO);
        assert!(outcome.is_committed());
        assert!(outcome.is_success());
        assert_eq!(outcome.supersede_key, None);
        assert_eq!(outcome.bytes_saved(), 600);
        assert_eq!(outcome.reduction_ratio, 60.0);
    }

    #[test]
    fn test_committed_new_key_supersedes() {
        let outcome = CompressionOutcome::committed("a/b.png", 1000, 400, Codec::Avif, "a/b.avif", Duration::ZERO);
        assert_eq!(outcome.supersede_key.as_deref(), Some("a/b.png"));
        assert_eq!(outcome.stored_key.as_deref(), Some("a/b.avif"));
    }

    #[test]
    fn test_skipped_keeps_original_size() {
        let outcome = CompressionOutcome::skipped("k.jpg", 2048, Duration::from_millis(5));
        assert!(outcome.is_skipped());
        assert_eq!(outcome.compressed_size, 2048);
        assert_eq!(outcome.reduction_ratio, 0.0);
        assert_eq!(outcome.bytes_saved(), 0);
    }

    #[test]
    fn test_failed_records_category() {
        let err = OptimizeError::Fetch {
            key: "k.jpg".into(),
            source: StoreError::NotFound("k.jpg".into()),
        };
        let outcome = CompressionOutcome::failed("k.jpg", 10, &err, Duration::ZERO);
        assert!(!outcome.is_success());
        assert_eq!(outcome.error_kind, Some("fetch"));
        assert!(outcome.error.unwrap().contains("k.jpg"));
    }

    #[test]
    fn test_serializes_status_and_seconds() {
        let outcome = CompressionOutcome::skipped("k.gif", 1, Duration::from_millis(1500));
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["elapsed_seconds"], 1.5);
    }
}
