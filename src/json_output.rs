//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON per l'integrazione con
//! altri processi (CI, dashboard, wrapper).
//!
//! ## Responsabilità:
//! - Emette un oggetto JSON per riga su stdout
//! - Riusa `CompressionOutcome`, `RunSummary` e `CleanupReport` senza copie
//!   ad hoc dei campi
//!
//! ## Tipi di messaggi:
//! - `start`: Inizio del run (prefisso, numero di oggetti, budget)
//! - `file_complete`: Fine elaborazione di un oggetto
//! - `cleanup`: Esito della cancellazione degli originali superati
//! - `complete`: Fine del run con il riepilogo aggregato
//!
//! I log di `tracing` vanno su stderr, quindi stdout contiene solo eventi.

use crate::config::{Config, TargetPolicy};
use crate::outcome::CompressionOutcome;
use crate::report::{CleanupReport, RunSummary};
use serde::Serialize;

/// Tipo di messaggio JSON
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JsonMessage<'a> {
    /// Inizio del run
    Start {
        prefix: &'a str,
        store: &'a str,
        total_objects: usize,
        config: JsonConfig,
    },

    /// Fine elaborazione di un oggetto
    FileComplete {
        #[serde(flatten)]
        outcome: &'a CompressionOutcome,
    },

    /// Cancellazione degli originali superati
    Cleanup {
        #[serde(flatten)]
        report: &'a CleanupReport,
    },

    /// Run completato
    Complete {
        #[serde(flatten)]
        summary: &'a RunSummary,
        saved_bytes: u64,
        saved_percent: f64,
        duration_seconds: f64,
    },
}

/// Configurazione riassunta nel messaggio `start`
#[derive(Debug, Serialize)]
pub struct JsonConfig {
    pub workers: usize,
    pub max_width_px: u32,
    pub max_size_mb: f64,
    pub target: Option<String>,
    pub size_threshold: f64,
    pub dry_run: bool,
}

impl<'a> JsonMessage<'a> {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn start(prefix: &'a str, store: &'a str, total_objects: usize, config: &Config) -> Self {
        Self::Start {
            prefix,
            store,
            total_objects,
            config: JsonConfig::from(config),
        }
    }

    pub fn file_complete(outcome: &'a CompressionOutcome) -> Self {
        Self::FileComplete { outcome }
    }

    pub fn cleanup(report: &'a CleanupReport) -> Self {
        Self::Cleanup { report }
    }

    pub fn complete(summary: &'a RunSummary, duration_seconds: f64) -> Self {
        Self::Complete {
            summary,
            saved_bytes: summary.saved_bytes(),
            saved_percent: summary.saved_percent(),
            duration_seconds,
        }
    }
}

impl From<&Config> for JsonConfig {
    fn from(config: &Config) -> Self {
        Self {
            workers: config.workers,
            max_width_px: config.budget.max_width_px,
            max_size_mb: config.budget.max_size_mb,
            target: match config.target {
                TargetPolicy::Preserve => None,
                TargetPolicy::Normalize(codec) => Some(codec.name().to_ascii_lowercase()),
            },
            size_threshold: config.size_threshold,
            dry_run: config.dry_run,
        }
    }
}
