use image::{imageops, GrayImage};
use paddle_core::{Detection, TrackerSettings};

use crate::blob::{external_blobs, Blob};

/// Picks the ball out of a segmented mask.
#[derive(Clone, Debug)]
pub struct ShapeDetector {
    max_candidates: usize,
    min_radius: f64,
    max_radius: f64,
    small_radius: f64,
    small_circularity: f64,
    circularity: f64,
    roi_half_width: i32,
    roi_min_radius: f64,
}

impl ShapeDetector {
    pub fn new(settings: &TrackerSettings) -> Self {
        let mut detector = Self {
            max_candidates: 0,
            min_radius: 0.0,
            max_radius: 0.0,
            small_radius: 0.0,
            small_circularity: 0.0,
            circularity: 0.0,
            roi_half_width: 0,
            roi_min_radius: 0.0,
        };
        detector.update_settings(settings);
        detector
    }

    pub fn update_settings(&mut self, settings: &TrackerSettings) {
        self.max_candidates = settings.max_candidates;
        self.min_radius = settings.min_radius as f64;
        self.max_radius = settings.max_radius as f64;
        self.small_radius = settings.small_radius as f64;
        self.small_circularity = settings.small_circularity;
        self.circularity = settings.circularity;
        self.roi_half_width = settings.roi_half_width;
        self.roi_min_radius = settings.roi_min_radius as f64;
    }

    /// Find the ball in `mask`.
    ///
    /// Only the largest few regions are considered, largest first, and the first one that
    /// passes the size and roundness checks wins. A bigger region is preferred over a
    /// rounder one.
    pub fn detect(&self, mask: &GrayImage) -> Option<Detection> {
        let blobs = external_blobs(mask);
        let found = blobs
            .iter()
            .take(self.max_candidates)
            .find(|blob| self.is_ball(blob))
            .map(to_detection);
        if found.is_none() && !blobs.is_empty() {
            log::trace!("No ball among {} regions", blobs.len());
        }
        found
    }

    fn is_ball(&self, blob: &Blob) -> bool {
        let radius = blob.circle.radius;
        // Far-away balls are only a few pixels wide and look less round
        let min_circularity = if radius < self.small_radius {
            self.small_circularity
        } else {
            self.circularity
        };
        radius > self.min_radius && radius < self.max_radius && blob.circularity > min_circularity
    }

    /// Look for the ball in a square window around `center`.
    ///
    /// The largest region inside the window is taken without any roundness check, as long
    /// as its radius clears the (lower) window threshold. The window is clipped to the mask;
    /// if nothing of it is left, there is no detection.
    pub fn search_roi(&self, mask: &GrayImage, center: (f64, f64)) -> Option<Detection> {
        let hw = self.roi_half_width as f64;
        let x_min = ((center.0 - hw) as i64).max(0);
        let y_min = ((center.1 - hw) as i64).max(0);
        let x_max = ((center.0 + hw) as i64).min(mask.width() as i64);
        let y_max = ((center.1 + hw) as i64).min(mask.height() as i64);
        if x_min >= x_max || y_min >= y_max {
            return None;
        }

        let roi = imageops::crop_imm(
            mask,
            x_min as u32,
            y_min as u32,
            (x_max - x_min) as u32,
            (y_max - y_min) as u32,
        )
        .to_image();

        let blob = external_blobs(&roi)
            .into_iter()
            .next()?
            .translate(x_min as f64, y_min as f64);
        if blob.circle.radius > self.roi_min_radius {
            Some(to_detection(&blob))
        } else {
            None
        }
    }
}

fn to_detection(blob: &Blob) -> Detection {
    Detection::new(
        blob.circle.cx as i32,
        blob.circle.cy as i32,
        blob.circle.radius as i32,
    )
}
