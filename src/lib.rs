//! # Bucket Image Optimizer Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Configurazione del run, `EncodingBudget`, `TargetPolicy`
//! - `error`: Tassonomia degli errori (discovery, fetch, decode, encode, store, delete)
//! - `format`: Classificazione key → codec + content-type
//! - `locator`: Discovery degli oggetti nel bucket
//! - `store`: Confine con lo storage (S3/R2, directory locale, memoria)
//! - `resize` / `quantize`: Primitive di ridimensionamento e palette
//! - `image_processor`: Encoder adattivo con back-off della qualità
//! - `optimizer`: Orchestratore a concorrenza limitata
//! - `outcome` / `report`: Esiti per oggetto e aggregazione
//! - `confirm`: Gate di conferma (candidati, cancellazione)
//! - `json_output` / `progress`: Output per macchine e per umani
//!
//! ## Utilizzo:
//! ```rust,ignore
//! use bucket_image_optimizer::{BucketOptimizer, Config, confirm::AutoApprove, store::MemoryStore};
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryStore::new());
//! let optimizer = BucketOptimizer::new(Config::default(), store)?;
//! let report = optimizer.run(&AutoApprove).await?;
//! ```

pub mod config;
pub mod confirm;
pub mod error;
pub mod format;
pub mod image_processor;
pub mod json_output;
pub mod locator;
pub mod optimizer;
pub mod outcome;
pub mod progress;
pub mod quantize;
pub mod report;
pub mod resize;
pub mod store;

pub use config::{Config, EncodingBudget, QualityLadder, TargetPolicy};
pub use error::OptimizeError;
pub use format::Codec;
pub use locator::ImageObject;
pub use optimizer::{BucketOptimizer, RunReport};
pub use outcome::CompressionOutcome;
pub use report::{CleanupReport, RunSummary};
