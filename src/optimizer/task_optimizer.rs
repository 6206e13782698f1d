//! # Task Optimizer Module
//!
//! Worker per l'elaborazione di un singolo oggetto del bucket.
//!
//! ## Pipeline per oggetto:
//! 1. Fetch dei byte originali dallo store
//! 2. Compressione adattiva su un thread bloccante (CPU-bound)
//! 3. Gate di riduzione: commit solo se `nuovo < originale × size_threshold`
//! 4. Claim della key di output se diversa dalla key sorgente
//! 5. Put dell'artefatto (saltato in dry run)
//!
//! Ogni errore viene convertito in un outcome `failed` per quell'oggetto:
//! nulla esce dal worker, e nessun passo di rete viene ritentato.

use crate::{
    config::Config,
    error::OptimizeError,
    image_processor::ImageProcessor,
    locator::ImageObject,
    optimizer::path_resolver::{OutputKeys, PathResolver},
    outcome::CompressionOutcome,
    report::format_size,
    store::StoreHandle,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Worker for a single object
pub struct TaskOptimizer {
    store: StoreHandle,
    processor: Arc<ImageProcessor>,
    output_keys: Arc<OutputKeys>,
    size_threshold: f64,
    dry_run: bool,
}

impl TaskOptimizer {
    pub fn new(config: &Config, store: StoreHandle) -> Self {
        Self {
            store,
            processor: Arc::new(ImageProcessor::from_config(config)),
            output_keys: Arc::new(OutputKeys::default()),
            size_threshold: config.size_threshold,
            dry_run: config.dry_run,
        }
    }

    /// Share the output key reservations of a run
    pub fn with_output_keys(mut self, output_keys: Arc<OutputKeys>) -> Self {
        self.output_keys = output_keys;
        self
    }

    /// Process one object. Always yields exactly one outcome.
    pub async fn process(&self, object: &ImageObject) -> CompressionOutcome {
        let start = Instant::now();
        match self.try_process(object, start).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Error processing {}: {}", object.key, e);
                CompressionOutcome::failed(&object.key, object.original_size_bytes, &e, start.elapsed())
            }
        }
    }

    async fn try_process(&self, object: &ImageObject, start: Instant) -> Result<CompressionOutcome, OptimizeError> {
        let key = object.key.as_str();

        let data = self.store.get(key).await.map_err(|source| OptimizeError::Fetch {
            key: key.to_string(),
            source,
        })?;
        let original_size = data.len() as u64;
        debug!("Fetched {} ({})", key, format_size(original_size));

        let processor = Arc::clone(&self.processor);
        let owned_key = key.to_string();
        let encoded = tokio::task::spawn_blocking(move || processor.compress(&data, &owned_key))
            .await
            .map_err(|e| OptimizeError::encode(key, format!("encoder task failed: {}", e)))??;
        if encoded.is_empty() {
            return Err(OptimizeError::encode(key, "encoder produced no bytes"));
        }
        let compressed_size = encoded.len();

        if !self.passes_gate(original_size, compressed_size) {
            let ratio = crate::outcome::calculate_reduction(original_size, compressed_size);
            info!("Skipped {}: Compression only achieved {:.1}% reduction", key, ratio);
            return Ok(CompressionOutcome::skipped(key, original_size, start.elapsed()));
        }

        let output_key = PathResolver::output_key(key, encoded.codec);
        if output_key != key && !self.output_keys.claim(key, &output_key).await {
            return Err(OptimizeError::Conflict {
                key: key.to_string(),
                output_key,
            });
        }
        let codec = encoded.codec;
        if self.dry_run {
            debug!("Dry run: would store {} as {}", output_key, encoded.content_type());
        } else {
            let content_type = encoded.content_type();
            self.store
                .put(&output_key, encoded.bytes, content_type)
                .await
                .map_err(|source| OptimizeError::Store {
                    key: output_key.clone(),
                    source,
                })?;
        }

        let outcome = CompressionOutcome::committed(
            key,
            original_size,
            compressed_size,
            codec,
            output_key,
            start.elapsed(),
        );
        info!(
            "Processed {}: {:.1}KB → {:.1}KB ({:.1}% reduction)",
            key,
            original_size as f64 / 1024.0,
            compressed_size as f64 / 1024.0,
            outcome.reduction_ratio
        );
        Ok(outcome)
    }

    /// Commit only when the new artifact is strictly below the threshold
    pub fn passes_gate(&self, original_size: u64, compressed_size: u64) -> bool {
        (compressed_size as f64) < (original_size as f64 * self.size_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EncodingBudget, TargetPolicy};
    use crate::format::Codec;
    use crate::image_processor::tests::{noise_rgb, png_bytes};
    use crate::outcome::OutcomeStatus;
    use crate::store::MemoryStore;
    use image::{DynamicImage, GenericImageView, Rgb, RgbImage};

    fn worker(config: &Config, store: &Arc<MemoryStore>) -> TaskOptimizer {
        TaskOptimizer::new(config, store.clone())
    }

    fn object(store_key: &str, size: usize) -> ImageObject {
        ImageObject::new(store_key, size as u64)
    }

    #[test]
    fn test_gate_boundary() {
        let store = Arc::new(MemoryStore::new());
        let task = worker(&Config::default(), &store);
        assert!(task.passes_gate(1000, 949));
        assert!(!task.passes_gate(1000, 950));
        assert!(!task.passes_gate(1000, 1200));
        assert!(!task.passes_gate(0, 0));
    }

    #[tokio::test]
    async fn test_large_png_is_resized_and_committed() {
        let source = DynamicImage::ImageRgb8(noise_rgb(2000, 1000, 42));
        let data = png_bytes(&source);
        assert!(data.len() > 1024 * 1024);

        let key = "uiprompt/themes/dark/hero.png";
        let store = Arc::new(MemoryStore::with_objects([(key, data.clone())]));
        let task = worker(&Config::default(), &store);

        let outcome = task.process(&object(key, data.len())).await;
        assert_eq!(outcome.status, OutcomeStatus::Committed);
        assert!(outcome.reduction_ratio > 5.0);
        assert_eq!(outcome.supersede_key, None);

        let stored = store.object(key).await.unwrap();
        assert!(stored.len() <= 1024 * 1024);
        assert_eq!(stored.len() as u64, outcome.compressed_size);
        let decoded = image::load_from_memory(&stored).unwrap();
        assert_eq!(decoded.dimensions(), (1200, 600));
        assert_eq!(store.content_type(key).await.as_deref(), Some("image/png"));
    }

    #[tokio::test]
    async fn test_already_optimized_png_is_skipped() {
        // Output del nostro encoder: ricomprimerlo non porta guadagni
        let gradient = RgbImage::from_fn(160, 90, |x, y| Rgb([(x % 256) as u8, (y * 2) as u8, 90]));
        let processor = ImageProcessor::new(EncodingBudget::default(), TargetPolicy::Preserve);
        let optimized = processor
            .compress(&png_bytes(&DynamicImage::ImageRgb8(gradient)), "t/a/g.png")
            .unwrap()
            .bytes;

        let key = "t/a/g.png";
        let store = Arc::new(MemoryStore::with_objects([(key, optimized.clone())]));
        let task = worker(&Config::default(), &store);

        let outcome = task.process(&object(key, optimized.len())).await;
        assert_eq!(outcome.status, OutcomeStatus::Skipped);
        assert_eq!(outcome.compressed_size, outcome.original_size);
        assert_eq!(outcome.reduction_ratio, 0.0);
        assert_eq!(store.object(key).await.unwrap(), optimized);
    }

    #[tokio::test]
    async fn test_corrupt_bytes_yield_decode_error() {
        let key = "t/a/broken.png";
        let store = Arc::new(MemoryStore::with_objects([(key, b"not an image".to_vec())]));
        let task = worker(&Config::default(), &store);

        let outcome = task.process(&object(key, 12)).await;
        assert_eq!(outcome.status, OutcomeStatus::Failed);
        assert_eq!(outcome.error_kind, Some("decode"));
        assert_eq!(store.object(key).await.unwrap(), b"not an image".to_vec());
    }

    #[tokio::test]
    async fn test_missing_object_is_fetch_error() {
        let store = Arc::new(MemoryStore::new());
        let task = worker(&Config::default(), &store);
        let outcome = task.process(&object("t/a/gone.jpg", 10)).await;
        assert_eq!(outcome.error_kind, Some("fetch"));
    }

    #[tokio::test]
    async fn test_store_failure_leaves_original() {
        let source = DynamicImage::ImageRgb8(noise_rgb(400, 300, 8));
        let data = png_bytes(&source);
        let key = "t/a/noise.jpg";
        let store = Arc::new(MemoryStore::with_objects([(key, data.clone())]));
        store.fail_writes_for(key).await;
        let task = worker(&Config::default(), &store);

        let outcome = task.process(&object(key, data.len())).await;
        assert_eq!(outcome.status, OutcomeStatus::Failed);
        assert_eq!(outcome.error_kind, Some("store"));
        assert_eq!(store.object(key).await.unwrap(), data);
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let source = DynamicImage::ImageRgb8(noise_rgb(400, 300, 9));
        let data = png_bytes(&source);
        let key = "t/a/photo.jpg";
        let store = Arc::new(MemoryStore::with_objects([(key, data.clone())]));
        let config = Config {
            dry_run: true,
            target: TargetPolicy::Normalize(Codec::Webp),
            ..Default::default()
        };
        let task = worker(&config, &store);

        let outcome = task.process(&object(key, data.len())).await;
        assert!(outcome.is_committed());
        assert_eq!(outcome.stored_key.as_deref(), Some("t/a/photo.webp"));
        assert_eq!(store.keys().await, vec![key.to_string()]);
        assert_eq!(store.object(key).await.unwrap(), data);
    }

    #[tokio::test]
    async fn test_normalize_writes_new_key() {
        let source = DynamicImage::ImageRgb8(noise_rgb(300, 200, 10));
        let data = png_bytes(&source);
        let key = "t/a/photo.png";
        let store = Arc::new(MemoryStore::with_objects([(key, data.clone())]));
        let config = Config {
            target: TargetPolicy::Normalize(Codec::Jpeg),
            ..Default::default()
        };
        let task = worker(&config, &store);

        let outcome = task.process(&object(key, data.len())).await;
        assert!(outcome.is_committed());
        assert_eq!(outcome.supersede_key.as_deref(), Some(key));
        assert_eq!(store.content_type("t/a/photo.jpg").await.as_deref(), Some("image/jpeg"));
        // L'originale resta finché il gate di cancellazione non approva
        assert!(store.object(key).await.is_some());
    }

    #[tokio::test]
    async fn test_normalized_avif_reruns_as_skip() {
        let config = Config {
            target: TargetPolicy::Normalize(Codec::Avif),
            ..Default::default()
        };
        let flat = DynamicImage::ImageRgb8(RgbImage::from_pixel(48, 48, Rgb([30, 120, 200])));
        let avif = ImageProcessor::from_config(&config)
            .compress(&png_bytes(&flat), "t/a/x.png")
            .unwrap()
            .bytes;

        let key = "t/a/x.avif";
        let store = Arc::new(MemoryStore::with_objects([(key, avif.clone())]));
        let task = worker(&config, &store);

        let outcome = task.process(&object(key, avif.len())).await;
        assert_eq!(outcome.status, OutcomeStatus::Skipped, "{:?}", outcome.error);
        assert_eq!(outcome.reduction_ratio, 0.0);
        assert_eq!(outcome.supersede_key, None);
        assert_eq!(store.object(key).await.unwrap(), avif);
    }

    #[tokio::test]
    async fn test_gif_fallback_never_overwrites_listed_png() {
        // Byte PNG sotto una key .gif: la GIF ricodificata supera il budget e
        // il fallback vorrebbe scrivere su t/a/x.png, che è un altro oggetto
        let data = png_bytes(&DynamicImage::ImageRgb8(noise_rgb(200, 120, 12)));
        let sibling = b"someone else's png".to_vec();
        let store = Arc::new(MemoryStore::with_objects([
            ("t/a/x.gif", data.clone()),
            ("t/a/x.png", sibling.clone()),
        ]));
        let config = Config {
            budget: EncodingBudget {
                max_size_mb: 0.01,
                ..Default::default()
            },
            ..Default::default()
        };
        let output_keys = Arc::new(OutputKeys::new(["t/a/x.gif", "t/a/x.png"]));
        let task = worker(&config, &store).with_output_keys(output_keys);

        let outcome = task.process(&object("t/a/x.gif", data.len())).await;
        assert_eq!(outcome.status, OutcomeStatus::Failed);
        assert_eq!(outcome.error_kind, Some("conflict"));
        assert_eq!(outcome.supersede_key, None);
        assert_eq!(store.object("t/a/x.png").await.unwrap(), sibling);
        assert_eq!(store.object("t/a/x.gif").await.unwrap(), data);
    }
}
