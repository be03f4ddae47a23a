use std::path::Path;

use anyhow::{Context, Result};
use image::{imageops, RgbImage};

pub mod init_settings;
pub mod mask;
pub mod track;

/// Load an image file as an RGB frame, optionally mirrored.
fn load_frame(path: &Path, mirror: bool) -> Result<RgbImage> {
    let frame = image::open(path)
        .with_context(|| format!("Failed to decode {}", path.display()))?
        .to_rgb8();
    if mirror {
        Ok(imageops::flip_horizontal(&frame))
    } else {
        Ok(frame)
    }
}
