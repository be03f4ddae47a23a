use std::path::Path;

use anyhow::{Context, Result};
use paddle_core::TrackerSettings;
use paddle_vision::{ColorSegmenter, ShapeDetector};

use super::load_frame;

/// Write the segmentation mask of a single frame, for tuning the color range.
pub fn write_mask(
    settings: &TrackerSettings,
    input: &Path,
    output: &Path,
    mirror: bool,
) -> Result<()> {
    let frame = load_frame(input, mirror)?;
    let mask = ColorSegmenter::new(settings).segment(&frame);
    mask.save(output)
        .with_context(|| format!("Failed to write mask to {}", output.display()))?;

    match ShapeDetector::new(settings).detect(&mask) {
        Some(d) => println!("Ball at ({}, {}) r={}", d.x, d.y, d.radius),
        None => println!("No ball found"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage};
    use imageproc::drawing::draw_filled_circle_mut;

    use super::*;

    #[test]
    fn test_writes_mask() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("frame.png");
        let output = dir.path().join("mask.png");

        let mut frame = RgbImage::from_pixel(200, 150, Rgb([20, 20, 20]));
        draw_filled_circle_mut(&mut frame, (60, 70), 12, Rgb([255, 210, 0]));
        frame.save(&input).unwrap();

        write_mask(&TrackerSettings::default(), &input, &output, false).unwrap();

        let mask = image::open(&output).unwrap().to_luma8();
        assert_eq!(mask.dimensions(), (200, 150));
        assert!(mask.get_pixel(60, 70).0[0] > 0);
        assert_eq!(mask.get_pixel(150, 20).0[0], 0);
    }

    #[test]
    fn test_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_mask(
            &TrackerSettings::default(),
            &dir.path().join("missing.png"),
            &dir.path().join("mask.png"),
            false,
        )
        .unwrap_err();
        assert!(err.to_string().contains("missing.png"));
    }
}
