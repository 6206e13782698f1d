//! # Progress Tracking Module
//!
//! Tracker thread-safe condiviso dai worker. Gestisce sia gli eventi JSON che
//! la progress bar tradizionale, e mantiene un riepilogo parziale per il
//! messaggio finale della barra.

use crate::{
    json_output::JsonMessage,
    outcome::{CompressionOutcome, OutcomeStatus},
    progress::ProgressManager,
    report::RunSummary,
};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Progress tracker shared by every worker of a run
#[derive(Clone)]
pub struct ProgressTracker {
    pub total_objects: usize,
    json_output: bool,
    running: Arc<Mutex<RunSummary>>,
    progress_manager: ProgressManager,
}

impl ProgressTracker {
    pub fn new(total_objects: usize, json_output: bool, show_progress: bool) -> Self {
        let progress_manager = if show_progress && !json_output {
            ProgressManager::new(total_objects as u64)
        } else {
            ProgressManager::hidden(total_objects as u64)
        };
        Self {
            total_objects,
            json_output,
            running: Arc::new(Mutex::new(RunSummary::new())),
            progress_manager,
        }
    }

    /// Record a finished object: JSON event, bar message, running totals
    pub async fn handle_completion(&self, outcome: &CompressionOutcome) {
        self.running.lock().await.add(outcome);

        if self.json_output {
            JsonMessage::file_complete(outcome).emit();
        }

        self.progress_manager.update(&Self::status_message(outcome));
    }

    /// Bar message for one outcome
    pub fn status_message(outcome: &CompressionOutcome) -> String {
        let name = outcome.key.rsplit('/').next().unwrap_or(&outcome.key);
        match outcome.status {
            OutcomeStatus::Committed => format!("[OK] {}: {:.1}% saved", name, outcome.reduction_ratio),
            OutcomeStatus::Skipped => format!("[SKIP] {}: no significant reduction", name),
            OutcomeStatus::Failed => format!(
                "[ERROR] {}: {} error",
                name,
                outcome.error_kind.unwrap_or("unknown")
            ),
        }
    }

    /// Totals of the objects completed so far
    pub async fn running_summary(&self) -> RunSummary {
        *self.running.lock().await
    }

    pub fn completed(&self) -> u64 {
        self.progress_manager.position()
    }

    pub async fn finish(&self) {
        let summary = self.running_summary().await;
        self.progress_manager.finish(&summary.format_summary());
    }
}
