//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce `OptimizeError` enum per categorizzare gli errori della pipeline
//! - Separa gli errori fatali per il run da quelli isolati al singolo oggetto
//! - Integra con `thiserror` per automatic error conversion
//!
//! ## Categorie di errori:
//! - `Discovery`: Listing del bucket fallito (fatale, nessun oggetto da processare)
//! - `Fetch`: Download fallito (per oggetto, terminale)
//! - `Decode`: Byte non decodificabili come immagine (per oggetto, terminale)
//! - `Encode`: Encoder fallito a qualsiasi livello di qualità (per oggetto, terminale)
//! - `Store`: Upload fallito, l'originale resta intatto (per oggetto, terminale)
//! - `Delete`: Cancellazione dell'originale superato fallita (solo cleanup)
//! - `Conflict`: La key di output appartiene già a un altro oggetto (per oggetto,
//!   niente viene scritto)
//! - `Pattern`: Regex di matching non valida (fatale, prima di iniziare)
//!
//! Gli errori per oggetto vengono convertiti in `CompressionOutcome` dal
//! `TaskOptimizer` e non escono mai dal run.
//!
//! ## Esempio:
//! ```rust,ignore
//! let data = store.get(key).await.map_err(|source| OptimizeError::Fetch {
//!     key: key.to_string(),
//!     source,
//! })?;
//! ```

use crate::store::StoreError;

/// Custom error types for bucket image optimization
#[derive(thiserror::Error, Debug)]
pub enum OptimizeError {
    #[error("Discovery failed under '{prefix}': {source}")]
    Discovery {
        prefix: String,
        #[source]
        source: StoreError,
    },

    #[error("Failed to fetch {key}: {source}")]
    Fetch {
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("Failed to decode {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to encode {key}: {message}")]
    Encode { key: String, message: String },

    #[error("Failed to store {key}: {source}")]
    Store {
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("Failed to delete {key}: {source}")]
    Delete {
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("Cannot store {key} as {output_key}: key already taken by another object")]
    Conflict { key: String, output_key: String },

    #[error("Invalid match pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl OptimizeError {
    /// Short category name used in reports and JSON events
    pub fn category(&self) -> &'static str {
        match self {
            Self::Discovery { .. } => "discovery",
            Self::Fetch { .. } => "fetch",
            Self::Decode { .. } => "decode",
            Self::Encode { .. } => "encode",
            Self::Store { .. } => "store",
            Self::Delete { .. } => "delete",
            Self::Conflict { .. } => "conflict",
            Self::Pattern(_) => "pattern",
        }
    }

    /// Build an encode error from anything printable (image, webp and png errors)
    pub fn encode(key: &str, err: impl std::fmt::Display) -> Self {
        Self::Encode {
            key: key.to_string(),
            message: err.to_string(),
        }
    }
}
