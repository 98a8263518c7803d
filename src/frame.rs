//! Frame and mask types shared by every pipeline stage.
//!
//! - `Frame`: 3-channel 8-bit RGB raster, fixed dimensions for one run.
//! - `Mask`: single-channel raster of the same dimensions; 0 is background,
//!   anything else is foreground.
//!
//! Frames are owned by the control loop for one iteration and mutated in place
//! by the annotator. Masks are transient and never retained across frames.

use anyhow::{anyhow, Result};
use image::{GrayImage, Luma, Rgb, RgbImage};

pub type Frame = RgbImage;
pub type Mask = GrayImage;

/// Mask value written for foreground pixels.
pub const FOREGROUND: u8 = 255;
/// Mask value written for background pixels.
pub const BACKGROUND: u8 = 0;

pub(crate) const FOREGROUND_PIXEL: Luma<u8> = Luma([FOREGROUND]);

/// RGB color triple as used in configuration files.
pub type Color = [u8; 3];

pub fn rgb(color: Color) -> Rgb<u8> {
    Rgb(color)
}

/// Total pixel count of a frame, the denominator of every area fraction.
pub fn frame_area(frame: &Frame) -> u64 {
    frame.width() as u64 * frame.height() as u64
}

/// Build a frame from a packed RGB24 buffer.
pub fn frame_from_rgb(pixels: Vec<u8>, width: u32, height: u32) -> Result<Frame> {
    let expected = packed_len(width, height)?;
    if pixels.len() != expected {
        return Err(anyhow!(
            "RGB frame length mismatch: expected {}, got {}",
            expected,
            pixels.len()
        ));
    }
    RgbImage::from_raw(width, height, pixels)
        .ok_or_else(|| anyhow!("RGB buffer does not fit {}x{}", width, height))
}

/// Build a frame from a packed BGR24 buffer, as produced by most capture APIs.
pub fn frame_from_bgr(mut pixels: Vec<u8>, width: u32, height: u32) -> Result<Frame> {
    bgr_to_rgb(&mut pixels);
    frame_from_rgb(pixels, width, height)
}

/// Swap the first and third channel of every packed 3-byte pixel in place.
pub fn bgr_to_rgb(pixels: &mut [u8]) {
    for px in pixels.chunks_exact_mut(3) {
        px.swap(0, 2);
    }
}

/// Count of non-zero mask pixels.
pub fn foreground_count(mask: &Mask) -> usize {
    mask.as_raw().iter().filter(|&&v| v != BACKGROUND).count()
}

fn packed_len(width: u32, height: u32) -> Result<usize> {
    width
        .checked_mul(height)
        .and_then(|v| v.checked_mul(3))
        .map(|v| v as usize)
        .ok_or_else(|| anyhow!("RGB frame dimensions overflow"))
}
