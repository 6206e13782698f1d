//! # Optimizer Module
//!
//! Separa le responsabilità dell'orchestrazione in sottomoduli:
//! - `bucket_optimizer`: Orchestratore principale del run
//! - `task_optimizer`: Worker per singoli oggetti
//! - `progress_tracker`: Gestione progress ed eventi JSON unificata
//! - `path_resolver`: Calcolo centralizzato delle key di output

pub mod bucket_optimizer;
pub mod path_resolver;
pub mod progress_tracker;
pub mod task_optimizer;

pub use bucket_optimizer::{BucketOptimizer, RunReport};
pub use path_resolver::{OutputKeys, PathResolver};
pub use progress_tracker::ProgressTracker;
pub use task_optimizer::TaskOptimizer;
