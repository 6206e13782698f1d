//! # Image Resize Module
//!
//! Questo modulo gestisce il ridimensionamento delle immagini prima della
//! compressione, interamente in memoria con il crate `image`.
//!
//! ## Caratteristiche
//! - **SOLO RIDUZIONE**: le immagini entro il limite non vengono toccate
//! - **Aspect ratio preservato**: altezza = altezza * (max_width / width), troncata
//! - **Lanczos3**: filtro di alta qualità per il downscaling
//! - **Sempre prima dell'encoding**: ogni tentativo di qualità riparte da qui

use image::imageops::FilterType;
use image::{DynamicImage, Frame, GenericImageView};
use tracing::debug;

/// Resampling filter used for every downscale
pub const RESIZE_FILTER: FilterType = FilterType::Lanczos3;

/// Target dimensions for an image of `width` x `height`, or `None` when no
/// resize is needed.
pub fn target_dimensions(width: u32, height: u32, max_width: u32) -> Option<(u32, u32)> {
    if width <= max_width {
        return None;
    }
    let ratio = max_width as f64 / width as f64;
    let new_height = ((height as f64 * ratio) as u32).max(1);
    Some((max_width, new_height))
}

/// Scale `image` down so its width is at most `max_width`
pub fn constrain_width(image: DynamicImage, max_width: u32) -> DynamicImage {
    let (width, height) = image.dimensions();
    match target_dimensions(width, height, max_width) {
        Some((new_width, new_height)) => {
            debug!("Resizing {}x{} -> {}x{}", width, height, new_width, new_height);
            image.resize_exact(new_width, new_height, RESIZE_FILTER)
        }
        None => image,
    }
}

/// Same as [`constrain_width`] for every frame of an animation.
///
/// Frames coming from the GIF decoder are full-canvas, so they can all be
/// scaled by the same factor; offsets are reset to the origin.
pub fn constrain_frames(frames: Vec<Frame>, max_width: u32) -> Vec<Frame> {
    frames
        .into_iter()
        .map(|frame| {
            let delay = frame.delay();
            let left = frame.left();
            let top = frame.top();
            let buffer = frame.into_buffer();
            let (width, height) = buffer.dimensions();
            match target_dimensions(width, height, max_width) {
                Some((new_width, new_height)) => {
                    let resized = image::imageops::resize(&buffer, new_width, new_height, RESIZE_FILTER);
                    Frame::from_parts(resized, 0, 0, delay)
                }
                None => Frame::from_parts(buffer, left, top, delay),
            }
        })
        .collect()
}
