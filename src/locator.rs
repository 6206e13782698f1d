//! # Object Locator Module
//!
//! Questo modulo gestisce la discovery delle immagini nel bucket.
//!
//! ## Responsabilità:
//! - Lista tutte le key sotto un prefisso tramite l'`ObjectStore`
//! - Filtra le key con il pattern di default o con un pattern custom
//! - Produce gli `ImageObject` (key, dimensione, formato) da processare
//!
//! ## Pattern di default:
//! ```text
//! <prefix>[^/]+/[^/]+\.(png|jpg|jpeg|webp|gif|avif)$   (case-insensitive)
//! ```
//! Cioè: un livello di sottodirectory sotto il prefisso, poi un file con
//! estensione supportata. Un pattern custom **sostituisce** quello di default
//! ed è ancorato all'inizio della key.
//!
//! ## Esempio:
//! ```rust,ignore
//! let matcher = KeyMatcher::new("uiprompt/themes/", None)?;
//! assert!(matcher.matches("uiprompt/themes/dark/cover.PNG"));
//! ```

use crate::error::OptimizeError;
use crate::format::{Codec, SUPPORTED_EXTENSIONS};
use crate::store::ObjectStore;
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use tracing::info;

/// An image discovered in the bucket. Read-only once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageObject {
    pub key: String,
    pub original_size_bytes: u64,
    pub format: Codec,
}

impl ImageObject {
    pub fn new(key: impl Into<String>, original_size_bytes: u64) -> Self {
        let key = key.into();
        let format = Codec::from_key(&key);
        Self {
            key,
            original_size_bytes,
            format,
        }
    }
}

/// Compiled discovery rule
#[derive(Debug, Clone)]
pub struct KeyMatcher {
    regex: Regex,
}

impl KeyMatcher {
    pub fn new(prefix: &str, pattern: Option<&str>) -> Result<Self, OptimizeError> {
        let source = match pattern {
            Some(custom) => format!("^(?:{})", custom),
            None => Self::default_pattern(prefix),
        };
        let regex = RegexBuilder::new(&source).case_insensitive(true).build()?;
        Ok(Self { regex })
    }

    /// Default rule derived from the prefix and the supported extensions
    pub fn default_pattern(prefix: &str) -> String {
        let extensions = SUPPORTED_EXTENSIONS.join("|");
        format!(r"^{}[^/]+/[^/]+\.({})$", regex::escape(prefix), extensions)
    }

    pub fn matches(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

/// Lists the prefix and keeps the keys accepted by `matcher`.
///
/// A listing failure is fatal for the run.
pub async fn discover(
    store: &dyn ObjectStore,
    prefix: &str,
    matcher: &KeyMatcher,
) -> Result<Vec<ImageObject>, OptimizeError> {
    let listed = store
        .list(prefix)
        .await
        .map_err(|source| OptimizeError::Discovery {
            prefix: prefix.to_string(),
            source,
        })?;

    let objects: Vec<ImageObject> = listed
        .into_iter()
        .filter(|info| matcher.matches(&info.key))
        .map(|info| ImageObject::new(info.key, info.size))
        .collect();

    info!(
        "Found {} images matching the pattern in '{}' ({})",
        objects.len(),
        prefix,
        store.name()
    );
    Ok(objects)
}
