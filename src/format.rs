//! # Format Classifier Module
//!
//! Mappa l'estensione di una key al codec di destinazione e al content-type.
//!
//! ## Mappatura (case-insensitive):
//! | Estensione      | Codec | Content-Type |
//! |-----------------|-------|--------------|
//! | `.png`          | PNG   | image/png    |
//! | `.jpg`, `.jpeg` | JPEG  | image/jpeg   |
//! | `.webp`         | WEBP  | image/webp   |
//! | `.gif`          | GIF   | image/gif    |
//! | `.avif`         | AVIF  | image/avif   |
//! | altro           | PNG   | image/png    |
//!
//! Funzione totale: nessun errore possibile, qualsiasi stringa produce un codec.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Extensions accepted by the default discovery pattern
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif", "avif"];

/// Codec families handled by the adaptive encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    Png,
    Jpeg,
    Webp,
    Gif,
    Avif,
}

impl Codec {
    /// Classify a key by its extension. Unknown extensions fall back to PNG.
    pub fn from_key(key: &str) -> Self {
        extension_of(key)
            .and_then(|ext| Self::from_extension(&ext))
            .unwrap_or(Codec::Png)
    }

    /// Map a bare extension (without the dot) to a codec
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Codec::Png),
            "jpg" | "jpeg" => Some(Codec::Jpeg),
            "webp" => Some(Codec::Webp),
            "gif" => Some(Codec::Gif),
            "avif" => Some(Codec::Avif),
            _ => None,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Codec::Png => "image/png",
            Codec::Jpeg => "image/jpeg",
            Codec::Webp => "image/webp",
            Codec::Gif => "image/gif",
            Codec::Avif => "image/avif",
        }
    }

    /// Canonical extension used when a key has to be rewritten
    pub fn extension(&self) -> &'static str {
        match self {
            Codec::Png => "png",
            Codec::Jpeg => "jpg",
            Codec::Webp => "webp",
            Codec::Gif => "gif",
            Codec::Avif => "avif",
        }
    }

    /// Display name, as shown in the candidate table
    pub fn name(&self) -> &'static str {
        match self {
            Codec::Png => "PNG",
            Codec::Jpeg => "JPEG",
            Codec::Webp => "WEBP",
            Codec::Gif => "GIF",
            Codec::Avif => "AVIF",
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Codec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s.trim_start_matches('.'))
            .ok_or_else(|| format!("unsupported codec '{}' (expected one of: png, jpeg, webp, gif, avif)", s))
    }
}

/// Returns `(codec, content_type)` for a key.
pub fn classify(key: &str) -> (Codec, &'static str) {
    let codec = Codec::from_key(key);
    (codec, codec.content_type())
}

/// Lowercased extension of the last path segment, if any
pub fn extension_of(key: &str) -> Option<String> {
    let file_name = key.rsplit('/').next().unwrap_or(key);
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_extensions() {
        assert_eq!(classify("test/image.png"), (Codec::Png, "image/png"));
        assert_eq!(classify("test/image.jpg"), (Codec::Jpeg, "image/jpeg"));
        assert_eq!(classify("test/image.jpeg"), (Codec::Jpeg, "image/jpeg"));
        assert_eq!(classify("test/image.webp"), (Codec::Webp, "image/webp"));
        assert_eq!(classify("test/image.gif"), (Codec::Gif, "image/gif"));
        assert_eq!(classify("test/image.avif"), (Codec::Avif, "image/avif"));
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(classify("A/B/PHOTO.JPEG").0, Codec::Jpeg);
        assert_eq!(classify("shot.WebP").0, Codec::Webp);
    }

    #[test]
    fn test_unknown_defaults_to_png() {
        for key in ["test/image.unknown", "noext", "", "dir.jpg/file", ".png", "trailing.", "a/b.tiff"] {
            assert_eq!(classify(key), (Codec::Png, "image/png"), "key: {:?}", key);
        }
    }

    #[test]
    fn test_classifier_is_deterministic() {
        for key in ["x.gif", "y.bmp", "z.AVIF"] {
            assert_eq!(classify(key), classify(key));
        }
    }

    #[test]
    fn test_from_str() {
        assert_eq!("avif".parse::<Codec>().unwrap(), Codec::Avif);
        assert_eq!(".JPG".parse::<Codec>().unwrap(), Codec::Jpeg);
        assert!("bmp".parse::<Codec>().is_err());
    }
}
