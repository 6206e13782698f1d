//! # Palette Quantization Module
//!
//! Fallback a colori indicizzati per le famiglie che lo supportano (PNG, GIF
//! statiche). Usato solo quando la compressione lossless non basta a
//! rientrare nel budget.
//!
//! ## Pipeline:
//! 1. NeuQuant (`color_quant`) costruisce una palette RGBA di N colori
//! 2. Ogni pixel viene mappato all'indice più vicino
//! 3. Il crate `png` scrive un PNG indicizzato a 8 bit, con chunk tRNS se
//!    l'immagine ha trasparenza

use color_quant::NeuQuant;
use image::RgbaImage;

/// NeuQuant sampling factor: 1 = best quality, 30 = fastest
const SAMPLE_FACTOR: i32 = 10;

/// Encode `image` as an indexed PNG with at most `colors` palette entries.
pub fn encode_indexed_png(image: &RgbaImage, colors: usize) -> Result<Vec<u8>, png::EncodingError> {
    let (width, height) = image.dimensions();
    let pixels = image.as_raw();

    let quantizer = NeuQuant::new(SAMPLE_FACTOR, colors, pixels);
    let indices: Vec<u8> = pixels
        .chunks_exact(4)
        .map(|pixel| quantizer.index_of(pixel) as u8)
        .collect();

    let color_map = quantizer.color_map_rgba();
    let mut palette = Vec::with_capacity(color_map.len() / 4 * 3);
    let mut alpha = Vec::with_capacity(color_map.len() / 4);
    for entry in color_map.chunks_exact(4) {
        palette.extend_from_slice(&entry[..3]);
        alpha.push(entry[3]);
    }
    let has_transparency = alpha.iter().any(|&a| a != u8::MAX);

    let mut output = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut output, width, height);
        encoder.set_color(png::ColorType::Indexed);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_compression(png::Compression::Best);
        encoder.set_palette(palette);
        if has_transparency {
            encoder.set_trns(alpha);
        }
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&indices)?;
        writer.finish()?;
    }
    Ok(output)
}
