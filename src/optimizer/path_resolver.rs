//! # Path Resolution Module
//!
//! Centralizza il calcolo della key di output di un oggetto compresso.
//!
//! ## Regola:
//! - Se il codec finale appartiene alla stessa famiglia dell'estensione della
//!   key, la key resta identica (`.jpeg` e `.jpg` sono la stessa famiglia)
//! - Altrimenti l'estensione viene sostituita con quella canonica del codec e
//!   l'originale diventa la `supersede_key` dell'outcome
//!
//! ## Collisioni:
//! Due oggetti con lo stesso stem (`x.png`, `x.jpg`) normalizzati nello stesso
//! codec finirebbero sulla stessa key. `OutputKeys` assegna ogni key di output
//! a un solo oggetto: ogni key listata appartiene all'oggetto stesso, le key
//! nuove al primo che le reclama.

use crate::format::{extension_of, Codec};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Computes output keys
pub struct PathResolver;

impl PathResolver {
    /// Key under which an artifact encoded as `codec` is stored
    pub fn output_key(key: &str, codec: Codec) -> String {
        let current = extension_of(key).and_then(|ext| Codec::from_extension(&ext));
        if current == Some(codec) {
            return key.to_string();
        }

        let output = format!("{}.{}", Self::strip_extension(key), codec.extension());
        debug!("Output key for {} as {}: {}", key, codec, output);
        output
    }

    fn strip_extension(key: &str) -> &str {
        if extension_of(key).is_none() {
            return key;
        }
        match key.rsplit_once('.') {
            Some((stem, _)) => stem,
            None => key,
        }
    }
}

/// Output keys claimed during one run, each mapped to the object that owns it
#[derive(Debug, Default)]
pub struct OutputKeys {
    owners: Mutex<HashMap<String, String>>,
}

impl OutputKeys {
    /// Every listed key starts out owned by its own object
    pub fn new<'a>(keys: impl IntoIterator<Item = &'a str>) -> Self {
        let owners = keys
            .into_iter()
            .map(|key| (key.to_string(), key.to_string()))
            .collect();
        Self {
            owners: Mutex::new(owners),
        }
    }

    /// Claim `output_key` for the object stored at `key`.
    ///
    /// Returns false when another object already owns `output_key`.
    pub async fn claim(&self, key: &str, output_key: &str) -> bool {
        let mut owners = self.owners.lock().await;
        match owners.get(output_key) {
            Some(owner) if owner == key => true,
            Some(owner) => {
                warn!("{} would overwrite {} (owned by {})", key, output_key, owner);
                false
            }
            None => {
                owners.insert(output_key.to_string(), key.to_string());
                true
            }
        }
    }
}
