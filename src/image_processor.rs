//! # Image Processing Module
//!
//! Questo modulo è il cuore della compressione adattiva: decodifica,
//! ridimensiona e ricodifica ogni immagine finché non rientra nel budget di
//! dimensione o finché la qualità non raggiunge il floor del codec.
//!
//! ## Formati Supportati
//!
//! | Formato | Alpha | Strategia nel budget loop |
//! |---------|-------|---------------------------|
//! | JPEG    | ❌ (flatten su bianco) | Back-off qualità (85 → 40, step 10) |
//! | WebP    | ✅    | Back-off qualità (85 → 40, step 10) |
//! | AVIF    | ✅    | Back-off qualità (75 → 30, step 10) |
//! | PNG     | ✅    | Lossless max compression, poi palette 256 colori |
//! | GIF     | ✅    | Ricodifica GIF (animazioni preservate), poi PNG indicizzato se statica |
//!
//! ## Pipeline di Compressione
//!
//! 1. **Classificazione**: codec sorgente dall'estensione, codec target dalla `TargetPolicy`
//! 2. **Decode**: byte non validi → `OptimizeError::Decode`, nessun output parziale
//! 3. **Resize**: se `width > max_width_px` scala a `max_width_px` (Lanczos3)
//! 4. **Encode con back-off**: ogni tentativo riparte dal buffer ridimensionato,
//!    mai dall'output lossy precedente
//! 5. **Content-type**: quello del codec effettivamente usato
//!
//! ## Garanzie
//!
//! - La qualità è monotona non crescente e non scende mai sotto il floor
//! - Il loop termina in al più `(start - floor) / step + 1` tentativi
//! - Il budget è best-effort: se anche al floor l'output è troppo grande,
//!   viene restituito l'ultimo tentativo
//! - Un errore di encoding a qualsiasi livello è un fallimento totale per
//!   l'oggetto (nessun fallback silenzioso ai byte originali)
//!
//! ## Esempio
//!
//! ```rust,ignore
//! let processor = ImageProcessor::new(EncodingBudget::default(), TargetPolicy::Preserve);
//! let encoded = processor.compress(&bytes, "themes/dark/cover.jpg")?;
//! store.put(key, encoded.bytes, encoded.content_type()).await?;
//! ```

use crate::config::{Config, EncodingBudget, QualityLadder, TargetPolicy};
use crate::error::OptimizeError;
use crate::format::Codec;
use crate::quantize;
use crate::resize;
use image::codecs::avif::AvifEncoder;
use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::{
    AnimationDecoder, ColorType, DynamicImage, Frame, GenericImageView, ImageEncoder, RgbImage,
    RgbaImage,
};
use std::io::Cursor;
use tracing::debug;

/// Result of the adaptive encoder for one object
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    /// Codec actually written (may differ from the source codec)
    pub codec: Codec,
    /// Final quality for the lossy families
    pub quality: Option<u8>,
    /// Number of encode passes performed
    pub attempts: usize,
    /// Whether the indexed-colour fallback produced the output
    pub palette: bool,
    pub width: u32,
    pub height: u32,
}

impl EncodedImage {
    pub fn content_type(&self) -> &'static str {
        self.codec.content_type()
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Output of a quality back-off loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackOff {
    pub bytes: Vec<u8>,
    pub quality: u8,
    pub attempts: usize,
}

/// Encode at each quality of `ladder` until the output fits in `limit` bytes
/// or the floor is reached.
///
/// `encode` always receives a quality and must encode from the same source
/// buffer; the function never feeds an encoded output back in.
pub fn back_off<E>(
    ladder: QualityLadder,
    limit: u64,
    mut encode: impl FnMut(u8) -> Result<Vec<u8>, E>,
) -> Result<BackOff, E> {
    let mut quality = ladder.start;
    let mut attempts = 1;
    let mut bytes = encode(quality)?;

    for next in ladder.steps().skip(1) {
        if bytes.len() as u64 <= limit {
            break;
        }
        debug!(
            "{} bytes over budget of {} at quality {}, retrying at {}",
            bytes.len(),
            limit,
            quality,
            next
        );
        quality = next;
        attempts += 1;
        bytes = encode(quality)?;
    }

    Ok(BackOff {
        bytes,
        quality,
        attempts,
    })
}

/// Adaptive encoder, shared read-only by every worker
#[derive(Debug, Clone)]
pub struct ImageProcessor {
    budget: EncodingBudget,
    target: TargetPolicy,
}

impl ImageProcessor {
    pub fn new(budget: EncodingBudget, target: TargetPolicy) -> Self {
        Self { budget, target }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.budget.clone(), config.target)
    }

    pub fn budget(&self) -> &EncodingBudget {
        &self.budget
    }

    /// Compress one object.
    ///
    /// `key` selects the source codec (and thus the target codec under the
    /// configured policy) and is used for logging and error context. The
    /// actual decode sniffs the bytes, so a mislabelled key still decodes.
    ///
    /// # Errors
    /// - [`OptimizeError::Decode`] if `data` is not a decodable image
    /// - [`OptimizeError::Encode`] if the target encoder fails at any quality
    pub fn compress(&self, data: &[u8], key: &str) -> Result<EncodedImage, OptimizeError> {
        let source = Codec::from_key(key);
        let target = self.target.target_for(source);

        if target == Codec::Gif {
            if let Some(frames) = decode_animation(data) {
                return self.encode_animated_gif(frames, key);
            }
        }

        let decoded = image::load_from_memory(data).map_err(|source| OptimizeError::Decode {
            key: key.to_string(),
            source,
        })?;
        let resized = resize::constrain_width(decoded, self.budget.max_width_px);
        let (width, height) = resized.dimensions();
        let limit = self.budget.max_size_bytes();

        let mut encoded = match target {
            Codec::Jpeg => {
                let rgb = flatten_alpha(&resized);
                self.lossy(target, key, limit, |quality| encode_jpeg(&rgb, quality))?
            }
            Codec::Webp => {
                let pixels = Pixels::from(&resized);
                self.lossy(target, key, limit, |quality| encode_webp(&pixels, quality))?
            }
            Codec::Avif => {
                let pixels = Pixels::from(&resized);
                let speed = self.budget.avif_speed;
                self.lossy(target, key, limit, |quality| encode_avif(&pixels, speed, quality))?
            }
            Codec::Png => self.encode_png(&resized, key, limit)?,
            Codec::Gif => self.encode_static_gif(&resized, key, limit)?,
        };
        encoded.width = width;
        encoded.height = height;

        debug!(
            "Encoded {} as {} ({}x{}, {} bytes, quality {:?}, {} attempts)",
            key,
            encoded.codec,
            width,
            height,
            encoded.bytes.len(),
            encoded.quality,
            encoded.attempts
        );
        Ok(encoded)
    }

    fn lossy(
        &self,
        codec: Codec,
        key: &str,
        limit: u64,
        encode: impl FnMut(u8) -> Result<Vec<u8>, String>,
    ) -> Result<EncodedImage, OptimizeError> {
        let ladder = self
            .budget
            .ladder_for(codec)
            .ok_or_else(|| OptimizeError::encode(key, format!("{} has no quality ladder", codec)))?;
        let result = back_off(ladder, limit, encode).map_err(|e| OptimizeError::encode(key, e))?;
        Ok(EncodedImage {
            bytes: result.bytes,
            codec,
            quality: Some(result.quality),
            attempts: result.attempts,
            palette: false,
            width: 0,
            height: 0,
        })
    }

    /// Lossless first, indexed palette only if still over budget
    fn encode_png(&self, image: &DynamicImage, key: &str, limit: u64) -> Result<EncodedImage, OptimizeError> {
        let lossless = encode_png_lossless(image).map_err(|e| OptimizeError::encode(key, e))?;
        if lossless.len() as u64 <= limit {
            return Ok(EncodedImage {
                bytes: lossless,
                codec: Codec::Png,
                quality: None,
                attempts: 1,
                palette: false,
                width: 0,
                height: 0,
            });
        }

        debug!("{}: lossless PNG over budget ({} bytes), reducing palette", key, lossless.len());
        let indexed = quantize::encode_indexed_png(&image.to_rgba8(), self.budget.png_palette_colors)
            .map_err(|e| OptimizeError::encode(key, e))?;
        let palette = indexed.len() < lossless.len();
        Ok(EncodedImage {
            bytes: if palette { indexed } else { lossless },
            codec: Codec::Png,
            quality: None,
            attempts: 2,
            palette,
            width: 0,
            height: 0,
        })
    }

    /// Static GIF; falls back to an indexed PNG when over budget
    fn encode_static_gif(&self, image: &DynamicImage, key: &str, limit: u64) -> Result<EncodedImage, OptimizeError> {
        let rgba = image.to_rgba8();
        let gif = encode_gif_frame(&rgba).map_err(|e| OptimizeError::encode(key, e))?;
        if gif.len() as u64 <= limit {
            return Ok(EncodedImage {
                bytes: gif,
                codec: Codec::Gif,
                quality: None,
                attempts: 1,
                palette: false,
                width: 0,
                height: 0,
            });
        }

        debug!("{}: GIF over budget ({} bytes), converting to indexed PNG", key, gif.len());
        let indexed = quantize::encode_indexed_png(&rgba, self.budget.png_palette_colors)
            .map_err(|e| OptimizeError::encode(key, e))?;
        Ok(EncodedImage {
            bytes: indexed,
            codec: Codec::Png,
            quality: None,
            attempts: 2,
            palette: true,
            width: 0,
            height: 0,
        })
    }

    /// Animated GIFs keep every frame; there is no budget fallback because
    /// every alternative would drop the animation.
    fn encode_animated_gif(&self, frames: Vec<Frame>, key: &str) -> Result<EncodedImage, OptimizeError> {
        let frames = resize::constrain_frames(frames, self.budget.max_width_px);
        let (width, height) = frames
            .first()
            .map(|f| f.buffer().dimensions())
            .unwrap_or((0, 0));
        let frame_count = frames.len();

        let mut bytes = Vec::new();
        {
            let mut encoder = GifEncoder::new(&mut bytes);
            encoder
                .set_repeat(Repeat::Infinite)
                .map_err(|e| OptimizeError::encode(key, e))?;
            encoder
                .encode_frames(frames)
                .map_err(|e| OptimizeError::encode(key, e))?;
        }

        debug!("Encoded animated GIF {} ({} frames, {} bytes)", key, frame_count, bytes.len());
        Ok(EncodedImage {
            bytes,
            codec: Codec::Gif,
            quality: None,
            attempts: 1,
            palette: false,
            width,
            height,
        })
    }
}

/// Raw pixels handed to encoders that accept either layout
enum Pixels {
    Rgb(RgbImage),
    Rgba(RgbaImage),
}

impl From<&DynamicImage> for Pixels {
    fn from(image: &DynamicImage) -> Self {
        if image.color().has_alpha() {
            Pixels::Rgba(image.to_rgba8())
        } else {
            Pixels::Rgb(image.to_rgb8())
        }
    }
}

/// Multi-frame GIF frames, or `None` for static/undecodable data
fn decode_animation(data: &[u8]) -> Option<Vec<Frame>> {
    let decoder = GifDecoder::new(Cursor::new(data)).ok()?;
    let frames = decoder.into_frames().collect_frames().ok()?;
    (frames.len() > 1).then_some(frames)
}

/// Composite over white so transparent regions don't turn black
fn flatten_alpha(image: &DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }
    let rgba = image.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let blend = |c: u8| ((c as u32 * a as u32 + 255 * (255 - a as u32)) / 255) as u8;
        image::Rgb([blend(r), blend(g), blend(b)])
    })
}

fn encode_jpeg(rgb: &RgbImage, quality: u8) -> Result<Vec<u8>, String> {
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality)
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
        .map_err(|e| e.to_string())?;
    Ok(bytes)
}

fn encode_webp(pixels: &Pixels, quality: u8) -> Result<Vec<u8>, String> {
    let encoder = match pixels {
        Pixels::Rgb(rgb) => webp::Encoder::from_rgb(rgb.as_raw(), rgb.width(), rgb.height()),
        Pixels::Rgba(rgba) => webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height()),
    };
    let memory = encoder
        .encode_simple(false, quality as f32)
        .map_err(|e| format!("WebP encoding failed: {:?}", e))?;
    Ok(memory.to_vec())
}

fn encode_avif(pixels: &Pixels, speed: u8, quality: u8) -> Result<Vec<u8>, String> {
    let mut bytes = Vec::new();
    let encoder = AvifEncoder::new_with_speed_quality(&mut bytes, speed, quality);
    match pixels {
        Pixels::Rgb(rgb) => encoder.write_image(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8),
        Pixels::Rgba(rgba) => encoder.write_image(rgba.as_raw(), rgba.width(), rgba.height(), ColorType::Rgba8),
    }
    .map_err(|e| e.to_string())?;
    Ok(bytes)
}

fn encode_png_lossless(image: &DynamicImage) -> Result<Vec<u8>, String> {
    let mut bytes = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut bytes, CompressionType::Best, PngFilter::Adaptive);
    match Pixels::from(image) {
        Pixels::Rgb(rgb) => encoder.write_image(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8),
        Pixels::Rgba(rgba) => encoder.write_image(rgba.as_raw(), rgba.width(), rgba.height(), ColorType::Rgba8),
    }
    .map_err(|e| e.to_string())?;
    Ok(bytes)
}

fn encode_gif_frame(rgba: &RgbaImage) -> Result<Vec<u8>, String> {
    let mut bytes = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut bytes);
        encoder
            .encode(rgba.as_raw(), rgba.width(), rgba.height(), ColorType::Rgba8)
            .map_err(|e| e.to_string())?;
    }
    Ok(bytes)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{Delay, ImageFormat, Rgb, Rgba};

    /// Deterministic noise, incompressible enough to exercise the budget loop
    pub(crate) fn noise_rgb(width: u32, height: u32, seed: u32) -> RgbImage {
        let mut state = seed.max(1);
        RgbImage::from_fn(width, height, |_, _| {
            let mut next = || {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state & 0xff) as u8
            };
            Rgb([next(), next(), next()])
        })
    }

    pub(crate) fn png_bytes(image: &DynamicImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn budget(max_width_px: u32, max_size_mb: f64) -> EncodingBudget {
        EncodingBudget {
            max_width_px,
            max_size_mb,
            ..Default::default()
        }
    }

    #[test]
    fn test_back_off_stops_when_under_budget() {
        let ladder = QualityLadder::new(85, 40, 10);
        let mut seen = Vec::new();
        let result = back_off(ladder, 700, |q| -> Result<Vec<u8>, ()> {
            seen.push(q);
            Ok(vec![0; q as usize * 10])
        })
        .unwrap();
        assert_eq!(seen, vec![85, 75, 65]);
        assert_eq!(result.quality, 65);
        assert_eq!(result.attempts, 3);
        assert_eq!(result.bytes.len(), 650);
    }

    #[test]
    fn test_back_off_never_crosses_floor() {
        let ladder = QualityLadder::new(85, 40, 10);
        let mut seen = Vec::new();
        let result = back_off(ladder, 0, |q| -> Result<Vec<u8>, ()> {
            seen.push(q);
            Ok(vec![0; 100])
        })
        .unwrap();
        assert_eq!(seen, vec![85, 75, 65, 55, 45]);
        assert!(seen.windows(2).all(|w| w[1] <= w[0]));
        assert_eq!(result.quality, 45);
        assert!(result.attempts <= ladder.max_attempts());
    }

    #[test]
    fn test_back_off_propagates_encoder_failure() {
        let ladder = QualityLadder::new(85, 40, 10);
        let result = back_off(ladder, 0, |q| if q < 70 { Err("boom") } else { Ok(vec![0; 10]) });
        assert_eq!(result, Err("boom"));
    }

    #[test]
    fn test_decode_error_on_garbage() {
        let processor = ImageProcessor::new(EncodingBudget::default(), TargetPolicy::Preserve);
        let err = processor.compress(b"definitely not an image", "a/b/c.png").unwrap_err();
        assert!(matches!(err, OptimizeError::Decode { .. }));
    }

    #[test]
    fn test_png_resized_to_max_width() {
        let source = DynamicImage::ImageRgb8(RgbImage::from_pixel(200, 100, Rgb([73, 109, 137])));
        let data = png_bytes(&source);
        let processor = ImageProcessor::new(budget(100, 1.0), TargetPolicy::Preserve);

        let encoded = processor.compress(&data, "test.png").unwrap();
        assert_eq!(encoded.codec, Codec::Png);
        assert_eq!(encoded.content_type(), "image/png");
        assert_eq!((encoded.width, encoded.height), (100, 50));

        let decoded = image::load_from_memory(&encoded.bytes).unwrap();
        assert_eq!(decoded.dimensions(), (100, 50));
    }

    #[test]
    fn test_small_image_keeps_dimensions() {
        let source = DynamicImage::ImageRgb8(noise_rgb(64, 48, 7));
        let processor = ImageProcessor::new(budget(1200, 1.0), TargetPolicy::Preserve);
        let encoded = processor.compress(&png_bytes(&source), "small.png").unwrap();
        assert_eq!((encoded.width, encoded.height), (64, 48));
        assert!(!encoded.palette);
    }

    #[test]
    fn test_jpeg_backs_off_to_floor() {
        let source = DynamicImage::ImageRgb8(noise_rgb(256, 256, 3));
        let processor = ImageProcessor::new(budget(1200, 0.001), TargetPolicy::Preserve);
        let encoded = processor.compress(&png_bytes(&source), "noise.jpg").unwrap();
        assert_eq!(encoded.codec, Codec::Jpeg);
        assert_eq!(encoded.quality, Some(45));
        assert_eq!(encoded.attempts, 5);
        assert!(image::load_from_memory(&encoded.bytes).is_ok());
    }

    #[test]
    fn test_jpeg_first_attempt_when_under_budget() {
        let source = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 64, Rgb([10, 20, 30])));
        let processor = ImageProcessor::new(budget(1200, 1.0), TargetPolicy::Preserve);
        let encoded = processor.compress(&png_bytes(&source), "flat.jpeg").unwrap();
        assert_eq!(encoded.quality, Some(85));
        assert_eq!(encoded.attempts, 1);
    }

    #[test]
    fn test_jpeg_flattens_transparency_onto_white() {
        let source = DynamicImage::ImageRgba8(RgbaImage::from_pixel(16, 16, Rgba([0, 0, 0, 0])));
        let rgb = flatten_alpha(&source);
        assert_eq!(rgb.get_pixel(3, 3), &Rgb([255, 255, 255]));

        let processor = ImageProcessor::new(budget(1200, 1.0), TargetPolicy::Preserve);
        let encoded = processor.compress(&png_bytes(&source), "clear.jpg").unwrap();
        let decoded = image::load_from_memory(&encoded.bytes).unwrap().to_rgb8();
        assert!(decoded.get_pixel(8, 8).0.iter().all(|&c| c > 240));
    }

    #[test]
    fn test_png_palette_fallback() {
        let source = DynamicImage::ImageRgb8(noise_rgb(300, 300, 11));
        let data = png_bytes(&source);
        // Lossless noise is ~270KB, well over a 100KB ceiling
        let processor = ImageProcessor::new(budget(1200, 0.1), TargetPolicy::Preserve);
        let encoded = processor.compress(&data, "noise.png").unwrap();
        assert!(encoded.palette);
        assert_eq!(encoded.codec, Codec::Png);
        assert!(encoded.len() < data.len() as u64);
    }

    #[test]
    fn test_png_keeps_alpha() {
        let source = DynamicImage::ImageRgba8(RgbaImage::from_fn(40, 40, |x, _| {
            Rgba([200, 10, 10, if x < 20 { 0 } else { 255 }])
        }));
        let processor = ImageProcessor::new(budget(1200, 1.0), TargetPolicy::Preserve);
        let encoded = processor.compress(&png_bytes(&source), "alpha.png").unwrap();
        let decoded = image::load_from_memory(&encoded.bytes).unwrap();
        assert!(decoded.color().has_alpha());
        assert_eq!(decoded.to_rgba8().get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn test_normalize_policy_changes_codec() {
        let source = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 32, Rgb([1, 2, 3])));
        let processor = ImageProcessor::new(budget(1200, 1.0), TargetPolicy::Normalize(Codec::Jpeg));
        let encoded = processor.compress(&png_bytes(&source), "x/y.png").unwrap();
        assert_eq!(encoded.codec, Codec::Jpeg);
        assert_eq!(encoded.content_type(), "image/jpeg");
    }

    #[test]
    fn test_static_gif_roundtrip() {
        let source = DynamicImage::ImageRgba8(RgbaImage::from_pixel(120, 60, Rgba([0, 128, 255, 255])));
        let gif = encode_gif_frame(&source.to_rgba8()).unwrap();
        let processor = ImageProcessor::new(budget(60, 1.0), TargetPolicy::Preserve);
        let encoded = processor.compress(&gif, "anim/still.gif").unwrap();
        assert_eq!(encoded.codec, Codec::Gif);
        assert_eq!((encoded.width, encoded.height), (60, 30));
    }

    #[test]
    fn test_animated_gif_keeps_frames() {
        let frames: Vec<Frame> = [Rgba([255, 0, 0, 255]), Rgba([0, 0, 255, 255])]
            .into_iter()
            .map(|color| {
                Frame::from_parts(
                    RgbaImage::from_pixel(80, 40, color),
                    0,
                    0,
                    Delay::from_numer_denom_ms(100, 1),
                )
            })
            .collect();
        let mut gif = Vec::new();
        {
            let mut encoder = GifEncoder::new(&mut gif);
            encoder.encode_frames(frames).unwrap();
        }

        let processor = ImageProcessor::new(budget(40, 1.0), TargetPolicy::Preserve);
        let encoded = processor.compress(&gif, "anim/blink.gif").unwrap();
        assert_eq!(encoded.codec, Codec::Gif);
        assert_eq!((encoded.width, encoded.height), (40, 20));

        let decoded = decode_animation(&encoded.bytes).expect("still animated");
        assert_eq!(decoded.len(), 2);
    }

    #[test]
    fn test_webp_encoding() {
        let source = DynamicImage::ImageRgb8(noise_rgb(64, 64, 5));
        let processor = ImageProcessor::new(budget(1200, 1.0), TargetPolicy::Preserve);
        let encoded = processor.compress(&png_bytes(&source), "p/q.webp").unwrap();
        assert_eq!(encoded.codec, Codec::Webp);
        assert_eq!(&encoded.bytes[..4], b"RIFF");
        assert_eq!(&encoded.bytes[8..12], b"WEBP");
    }

    #[test]
    fn test_avif_encoding() {
        let source = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 32, Rgb([90, 90, 200])));
        let processor = ImageProcessor::new(budget(1200, 1.0), TargetPolicy::Normalize(Codec::Avif));
        let encoded = processor.compress(&png_bytes(&source), "p/q.png").unwrap();
        assert_eq!(encoded.codec, Codec::Avif);
        assert_eq!(encoded.quality, Some(75));
        assert_eq!(&encoded.bytes[4..8], b"ftyp");

        let decoded = image::load_from_memory(&encoded.bytes).unwrap();
        assert_eq!(decoded.dimensions(), (32, 32));
    }

    #[test]
    fn test_every_attempt_encodes_the_resized_source() {
        // L'output al termine del back-off coincide byte per byte con una
        // codifica diretta del buffer ridimensionato alla stessa qualità
        let source = DynamicImage::ImageRgb8(noise_rgb(160, 64, 9));
        let processor = ImageProcessor::new(budget(100, 0.001), TargetPolicy::Preserve);
        let encoded = processor.compress(&png_bytes(&source), "noise.jpg").unwrap();
        assert!(encoded.attempts > 1);

        let resized = resize::constrain_width(source, 100);
        let direct = encode_jpeg(&flatten_alpha(&resized), encoded.quality.unwrap()).unwrap();
        assert_eq!((encoded.width, encoded.height), (100, 40));
        assert_eq!(encoded.bytes, direct);
    }
}
