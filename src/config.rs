//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con tutti i parametri del run
//! - Definisce `EncodingBudget` e le `QualityLadder` per codec
//! - Definisce la `TargetPolicy` (formato originale vs normalizzazione)
//! - Fornisce validazione robusta dei parametri di input
//! - Fornisce valori di default sensati per tutti i parametri
//!
//! ## Parametri di configurazione:
//! - `prefix`: Prefisso del bucket da scansionare (default: "uiprompt/themes/")
//! - `pattern`: Regex custom che sostituisce il pattern di default (default: None)
//! - `workers`: Numero di worker paralleli (default: 5)
//! - `budget.max_width_px`: Larghezza massima (default: 1200)
//! - `budget.max_size_mb`: Dimensione massima dopo compressione (default: 1.0)
//! - `budget.jpeg` / `budget.webp`: Qualità 85, floor 40, step 10
//! - `budget.avif`: Qualità 75, floor 30, step 10
//! - `target`: `Preserve` o `Normalize(codec)` (default: Preserve)
//! - `size_threshold`: Soglia per il commit (default: 0.95 = almeno 5% di riduzione)
//! - `dry_run`: Processa senza scrivere nel bucket (default: false)
//!
//! Tutti i valori sono fissi per la durata di un run.
//!
//! ## Esempio:
//! ```rust,ignore
//! let config = Config {
//!     prefix: "assets/".to_string(),
//!     workers: 8,
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use crate::format::Codec;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Quality back-off schedule for one codec family.
///
/// Encoding starts at `start` and drops by `step` while the output is over
/// budget. `floor` is never crossed: the last attempt is the lowest value
/// `>= floor` reachable from `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityLadder {
    pub start: u8,
    pub floor: u8,
    pub step: u8,
}

impl QualityLadder {
    pub const fn new(start: u8, floor: u8, step: u8) -> Self {
        Self { start, floor, step }
    }

    /// Qualities to try, in order
    pub fn steps(&self) -> impl Iterator<Item = u8> {
        let floor = self.floor;
        let step = self.step.max(1);
        std::iter::successors(Some(self.start), move |&q| {
            q.checked_sub(step).filter(|&next| next >= floor)
        })
    }

    /// Upper bound on the number of encode attempts
    pub fn max_attempts(&self) -> usize {
        (self.start.saturating_sub(self.floor) / self.step.max(1)) as usize + 1
    }

    fn validate(&self, codec: &str) -> Result<()> {
        if self.start == 0 || self.start > 100 {
            return Err(anyhow::anyhow!("{} quality must be between 1 and 100", codec));
        }
        if self.floor == 0 || self.floor >= self.start {
            return Err(anyhow::anyhow!(
                "{} quality floor must be at least 1 and below the starting quality ({})",
                codec,
                self.start
            ));
        }
        if self.step == 0 {
            return Err(anyhow::anyhow!("{} quality step must be greater than 0", codec));
        }
        Ok(())
    }
}

/// Size and quality constraints shared by every worker during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingBudget {
    /// Images wider than this are scaled down, keeping aspect ratio
    pub max_width_px: u32,
    /// Target ceiling for one encoded object, in MB
    pub max_size_mb: f64,
    pub jpeg: QualityLadder,
    pub webp: QualityLadder,
    pub avif: QualityLadder,
    /// ravif speed (1 = slowest/best, 10 = fastest)
    pub avif_speed: u8,
    /// Palette size for the indexed-colour fallback
    pub png_palette_colors: usize,
}

impl Default for EncodingBudget {
    fn default() -> Self {
        Self {
            max_width_px: 1200,
            max_size_mb: 1.0,
            jpeg: QualityLadder::new(85, 40, 10),
            webp: QualityLadder::new(85, 40, 10),
            avif: QualityLadder::new(75, 30, 10),
            avif_speed: 6,
            png_palette_colors: 256,
        }
    }
}

impl EncodingBudget {
    /// Size ceiling in bytes
    pub fn max_size_bytes(&self) -> u64 {
        (self.max_size_mb * 1024.0 * 1024.0) as u64
    }

    /// Ladder for the lossy families; PNG and GIF have none
    pub fn ladder_for(&self, codec: Codec) -> Option<QualityLadder> {
        match codec {
            Codec::Jpeg => Some(self.jpeg),
            Codec::Webp => Some(self.webp),
            Codec::Avif => Some(self.avif),
            Codec::Png | Codec::Gif => None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_width_px == 0 {
            return Err(anyhow::anyhow!("Maximum width must be greater than 0"));
        }
        if !(self.max_size_mb > 0.0) {
            return Err(anyhow::anyhow!("Maximum size must be greater than 0 MB"));
        }
        self.jpeg.validate("JPEG")?;
        self.webp.validate("WebP")?;
        self.avif.validate("AVIF")?;
        if self.avif_speed == 0 || self.avif_speed > 10 {
            return Err(anyhow::anyhow!("AVIF speed must be between 1 and 10"));
        }
        if !(2..=256).contains(&self.png_palette_colors) {
            return Err(anyhow::anyhow!("Palette colours must be between 2 and 256"));
        }
        Ok(())
    }
}

/// Which codec the encoder writes for a given source codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetPolicy {
    /// Every object keeps its own codec family
    #[default]
    Preserve,
    /// Every object is rewritten into one codec (new key, original superseded)
    Normalize(Codec),
}

impl TargetPolicy {
    pub fn target_for(&self, source: Codec) -> Codec {
        match self {
            TargetPolicy::Preserve => source,
            TargetPolicy::Normalize(codec) => *codec,
        }
    }
}

/// Configuration for one optimization run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Key prefix to scan
    pub prefix: String,
    /// Custom match pattern (replaces the default one)
    pub pattern: Option<String>,
    /// Number of parallel workers
    pub workers: usize,
    pub budget: EncodingBudget,
    pub target: TargetPolicy,
    /// Commit only if new size < original * threshold
    pub size_threshold: f64,
    /// Process without writing or deleting anything
    pub dry_run: bool,
    /// Emit JSON events on stdout
    pub json_output: bool,
    /// Draw a progress bar on stderr
    pub show_progress: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prefix: "uiprompt/themes/".to_string(),
            pattern: None,
            workers: 5,
            budget: EncodingBudget::default(),
            target: TargetPolicy::Preserve,
            size_threshold: 0.95,
            dry_run: false,
            json_output: false,
            show_progress: true,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(anyhow::anyhow!("Number of workers must be greater than 0"));
        }

        if self.size_threshold <= 0.0 || self.size_threshold > 1.0 {
            return Err(anyhow::anyhow!("Size threshold must be between 0.0 and 1.0"));
        }

        self.budget.validate()?;

        if let Some(ref pattern) = self.pattern {
            regex::Regex::new(pattern)
                .map_err(|e| anyhow::anyhow!("Invalid match pattern '{}': {}", pattern, e))?;
        }

        Ok(())
    }
}
