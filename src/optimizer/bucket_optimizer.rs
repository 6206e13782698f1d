//! # Bucket Optimizer Main Orchestrator
//!
//! Orchestratore principale: discovery, gate di conferma, pool di worker a
//! concorrenza limitata, riepilogo e cancellazione degli originali superati.
//!
//! ## Flusso di un run:
//! 1. Discovery (errore fatale se il listing fallisce)
//! 2. Gate dei candidati: se rifiutato, nessun effetto collaterale
//! 3. Pool di `workers` task: un permesso del semaforo per oggetto, dopo aver
//!    riservato la key di output (niente due oggetti sulla stessa key)
//! 4. `RunSummary` ricalcolato dagli outcome (fold commutativo)
//! 5. Gate di cancellazione, solo se almeno un oggetto ha una `supersede_key`
//! 6. Cancellazioni con lo stesso limite di concorrenza

use crate::{
    config::Config,
    confirm::Confirm,
    error::OptimizeError,
    json_output::JsonMessage,
    locator::{self, ImageObject, KeyMatcher},
    optimizer::{
        path_resolver::{OutputKeys, PathResolver},
        progress_tracker::ProgressTracker,
        task_optimizer::TaskOptimizer,
    },
    outcome::CompressionOutcome,
    report::{format_size, result_table, summary_lines, CleanupReport, RunSummary},
    store::StoreHandle,
};
use anyhow::Result;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// An object in flight, or already settled before dispatch
enum Pending {
    Running(String, u64, JoinHandle<CompressionOutcome>),
    Done(CompressionOutcome),
}

/// Everything a run produced
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Objects matched by discovery
    pub discovered: usize,
    /// Whether the candidate gate approved processing
    pub approved: bool,
    pub outcomes: Vec<CompressionOutcome>,
    pub summary: RunSummary,
    /// Present only when the deletion phase ran
    pub cleanup: Option<CleanupReport>,
    pub duration: Duration,
}

impl RunReport {
    /// Keys of originals superseded by a rewrite under a new key
    pub fn superseded_keys(&self) -> Vec<String> {
        superseded_keys(&self.outcomes)
    }
}

/// Orchestratore principale
pub struct BucketOptimizer {
    config: Config,
    store: StoreHandle,
    matcher: KeyMatcher,
}

impl BucketOptimizer {
    /// Validates the configuration and compiles the discovery pattern
    pub fn new(config: Config, store: StoreHandle) -> Result<Self> {
        config.validate()?;
        let matcher = KeyMatcher::new(&config.prefix, config.pattern.as_deref())?;
        Ok(Self {
            config,
            store,
            matcher,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// List the candidates under the configured prefix
    pub async fn discover(&self) -> Result<Vec<ImageObject>, OptimizeError> {
        locator::discover(self.store.as_ref(), &self.config.prefix, &self.matcher).await
    }

    /// Full run: discover, confirm, process, report, clean up
    pub async fn run(&self, confirm: &dyn Confirm) -> Result<RunReport> {
        let start_time = Instant::now();

        let objects = self.discover().await?;
        let mut report = RunReport {
            discovered: objects.len(),
            ..Default::default()
        };

        if objects.is_empty() {
            info!("No images found matching the criteria in '{}'", self.config.prefix);
            report.duration = start_time.elapsed();
            self.print_final_stats(&report);
            return Ok(report);
        }

        if !confirm.approve_candidates(&objects) {
            info!("Processing declined, nothing was changed");
            report.duration = start_time.elapsed();
            return Ok(report);
        }
        report.approved = true;

        self.emit_start_message(objects.len());
        self.log_configuration(&objects);

        report.outcomes = self.process(objects).await?;
        report.summary = RunSummary::from_outcomes(&report.outcomes);
        info!(
            "Processing complete: {} images processed successfully, {} errors",
            report.summary.processed, report.summary.errored
        );

        let superseded = report.superseded_keys();
        if !superseded.is_empty() && !self.config.dry_run {
            if confirm.approve_deletion(&superseded) {
                let cleanup = self.purge_superseded(superseded).await;
                if self.config.json_output {
                    JsonMessage::cleanup(&cleanup).emit();
                }
                report.cleanup = Some(cleanup);
            } else {
                info!("Kept {} superseded originals", superseded.len());
            }
        }

        report.duration = start_time.elapsed();
        self.print_final_stats(&report);
        Ok(report)
    }

    /// Run every object through a `TaskOptimizer`, at most `workers` at a time.
    ///
    /// One outcome per object, in input order. A panicking worker becomes an
    /// error outcome for its object only. Output keys are reserved in input
    /// order before dispatch: an object whose output key belongs to another
    /// object fails with a conflict and is never fetched.
    pub async fn process(&self, objects: Vec<ImageObject>) -> Result<Vec<CompressionOutcome>> {
        let semaphore = Arc::new(Semaphore::new(self.config.workers));
        let output_keys = Arc::new(OutputKeys::new(objects.iter().map(|o| o.key.as_str())));
        let task_optimizer = Arc::new(
            TaskOptimizer::new(&self.config, Arc::clone(&self.store)).with_output_keys(Arc::clone(&output_keys)),
        );
        let progress_tracker = ProgressTracker::new(objects.len(), self.config.json_output, self.config.show_progress);

        let mut tasks = Vec::with_capacity(objects.len());
        for object in objects {
            let planned = PathResolver::output_key(&object.key, self.config.target.target_for(object.format));
            if !output_keys.claim(&object.key, &planned).await {
                let err = OptimizeError::Conflict {
                    key: object.key.clone(),
                    output_key: planned,
                };
                error!("{}", err);
                let outcome = CompressionOutcome::failed(&object.key, object.original_size_bytes, &err, Duration::ZERO);
                progress_tracker.handle_completion(&outcome).await;
                tasks.push(Pending::Done(outcome));
                continue;
            }

            // Il permesso viene rilasciato quando il task termina
            let permit = semaphore.clone().acquire_owned().await?;
            let task_optimizer = Arc::clone(&task_optimizer);
            let progress = progress_tracker.clone();
            let key = object.key.clone();
            let original_size = object.original_size_bytes;

            let task = tokio::spawn(async move {
                let _permit = permit;
                let outcome = task_optimizer.process(&object).await;
                progress.handle_completion(&outcome).await;
                outcome
            });
            tasks.push(Pending::Running(key, original_size, task));
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        for pending in tasks {
            let (key, original_size, task) = match pending {
                Pending::Done(outcome) => {
                    outcomes.push(outcome);
                    continue;
                }
                Pending::Running(key, original_size, task) => (key, original_size, task),
            };
            match task.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    error!("Worker for {} failed: {}", key, e);
                    let err = OptimizeError::encode(&key, format!("worker aborted: {}", e));
                    let outcome = CompressionOutcome::failed(key, original_size, &err, Duration::ZERO);
                    progress_tracker.handle_completion(&outcome).await;
                    outcomes.push(outcome);
                }
            }
        }

        progress_tracker.finish().await;
        Ok(outcomes)
    }

    /// Delete superseded originals with the same concurrency bound as the pool.
    ///
    /// Failures are counted, never retried, and never touch the stored
    /// artifacts.
    pub async fn purge_superseded(&self, keys: Vec<String>) -> CleanupReport {
        let results: Vec<(String, Result<(), OptimizeError>)> = stream::iter(keys)
            .map(|key| {
                let store = Arc::clone(&self.store);
                async move {
                    let result = store.delete(&key).await.map_err(|source| OptimizeError::Delete {
                        key: key.clone(),
                        source,
                    });
                    (key, result)
                }
            })
            .buffer_unordered(self.config.workers)
            .collect()
            .await;

        let mut report = CleanupReport::default();
        for (key, result) in results {
            match result {
                Ok(()) => {
                    info!("Deleted superseded original {}", key);
                    report.deleted += 1;
                }
                Err(e) => {
                    warn!("{}", e);
                    report.failed += 1;
                    report.failed_keys.push(key);
                }
            }
        }
        report.failed_keys.sort();
        report
    }

    /// Invia messaggio di inizio
    fn emit_start_message(&self, total: usize) {
        if self.config.json_output {
            JsonMessage::start(&self.config.prefix, self.store.name(), total, &self.config).emit();
        } else {
            info!("Starting optimization of '{}' in {}", self.config.prefix, self.store.name());
        }
    }

    fn log_configuration(&self, objects: &[ImageObject]) {
        if self.config.json_output {
            return;
        }
        let budget = &self.config.budget;
        let total: u64 = objects.iter().map(|o| o.original_size_bytes).sum();
        info!(
            "Budget: max width {}px, max size {:.2} MB, {} workers",
            budget.max_width_px, budget.max_size_mb, self.config.workers
        );
        info!("Matching pattern: {}", self.matcher.as_str());
        info!("Processing {} objects ({})", objects.len(), format_size(total));
        if self.config.dry_run {
            info!("Dry run mode: nothing will be written or deleted");
        }
    }

    /// Stampa statistiche finali (sempre, anche con errori)
    fn print_final_stats(&self, report: &RunReport) {
        if self.config.json_output {
            JsonMessage::complete(&report.summary, report.duration.as_secs_f64()).emit();
            return;
        }

        println!("\nCompression report:");
        println!("{}", result_table(&report.outcomes).render());
        for line in summary_lines(&report.summary) {
            println!("{}", line);
        }
        if let Some(cleanup) = &report.cleanup {
            println!(
                "Superseded originals deleted: {} ({} failed)",
                cleanup.deleted, cleanup.failed
            );
        }
        println!("Duration: {:.1}s", report.duration.as_secs_f64());
    }
}

fn superseded_keys(outcomes: &[CompressionOutcome]) -> Vec<String> {
    let mut keys: Vec<String> = outcomes
        .iter()
        .filter(|o| o.is_committed())
        .filter_map(|o| o.supersede_key.clone())
        .collect();
    keys.sort();
    keys
}
