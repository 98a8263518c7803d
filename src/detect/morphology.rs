use anyhow::{anyhow, Result};
use imageproc::distance_transform::Norm;
use imageproc::morphology;

use crate::frame::{Mask, BACKGROUND, FOREGROUND};

/// Largest kernel radius the distance transform can represent.
const MAX_RADIUS: u32 = 254;

/// Erode a binary mask with a `kernel_size × kernel_size` square kernel.
///
/// A pixel stays foreground only if every pixel of the kernel window centred on
/// it is foreground. Window cells that fall outside the image are ignored, so
/// objects touching the frame edge are not eaten from that side. The output is
/// normalised to `FOREGROUND`/`BACKGROUND`.
pub fn erode(mask: &Mask, kernel_size: u32) -> Result<Mask> {
    if kernel_size == 0 || kernel_size % 2 == 0 {
        return Err(anyhow!(
            "erosion kernel size must be odd and positive, got {}",
            kernel_size
        ));
    }
    let radius = kernel_size / 2;
    if radius > MAX_RADIUS {
        return Err(anyhow!(
            "erosion kernel size {} exceeds the supported maximum of {}",
            kernel_size,
            2 * MAX_RADIUS + 1
        ));
    }

    // Any non-zero value counts as foreground.
    let mut binary = mask.clone();
    for px in binary.pixels_mut() {
        if px.0[0] != BACKGROUND {
            px.0[0] = FOREGROUND;
        }
    }
    // Without background there is nothing to erode from.
    if radius == 0 || binary.pixels().all(|px| px.0[0] == FOREGROUND) {
        return Ok(binary);
    }
    // The L-infinity ball of radius r is the (2r + 1) square.
    Ok(morphology::erode(&binary, Norm::LInf, radius as u8))
}
