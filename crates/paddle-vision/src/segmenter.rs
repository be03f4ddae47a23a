use image::{GrayImage, Luma, RgbImage};
use imageproc::{
    distance_transform::Norm,
    filter::separable_filter_equal,
    morphology::{dilate, erode},
};
use paddle_core::{HsvColor, TrackerSettings};

/// Width of the mask blur kernel, in px.
const BLUR_TAPS: usize = 5;

/// Turns color frames into a binary mask of ball-colored pixels.
#[derive(Clone, Debug)]
pub struct ColorSegmenter {
    lower: HsvColor,
    upper: HsvColor,
    blur_sigma: f32,
}

impl ColorSegmenter {
    pub fn new(settings: &TrackerSettings) -> Self {
        Self {
            lower: settings.color_lower,
            upper: settings.color_upper,
            blur_sigma: settings.blur_sigma,
        }
    }

    pub fn update_settings(&mut self, settings: &TrackerSettings) {
        self.lower = settings.color_lower;
        self.upper = settings.color_upper;
        self.blur_sigma = settings.blur_sigma;
    }

    pub fn segment(&self, frame: &RgbImage) -> GrayImage {
        self.smooth(&self.clean(frame))
    }

    /// Thresholded and morphologically cleaned mask, before blurring.
    pub fn clean(&self, frame: &RgbImage) -> GrayImage {
        clean_mask(frame, &self.lower, &self.upper)
    }

    pub fn smooth(&self, mask: &GrayImage) -> GrayImage {
        smooth_mask(mask, self.blur_sigma)
    }
}

/// Threshold `frame` in HSV and clean up the result.
///
/// The mask is eroded once (removes speckle) and dilated twice (regrows the ball and keeps
/// small distant blobs alive), then blurred so contour extraction sees smooth edges. Pixels
/// outside the bounds are 0, everything else non-zero.
pub fn segment(
    frame: &RgbImage,
    lower: &HsvColor,
    upper: &HsvColor,
    blur_sigma: f32,
) -> GrayImage {
    smooth_mask(&clean_mask(frame, lower, upper), blur_sigma)
}

/// Binary HSV threshold followed by erode ×1 and dilate ×2 with a 3×3 square.
pub fn clean_mask(frame: &RgbImage, lower: &HsvColor, upper: &HsvColor) -> GrayImage {
    let mask = threshold_hsv(frame, lower, upper);
    let mask = erode(&mask, Norm::LInf, 1);
    dilate(&dilate(&mask, Norm::LInf, 1), Norm::LInf, 1)
}

/// 5×5 Gaussian blur. A non-positive sigma leaves the mask untouched.
pub fn smooth_mask(mask: &GrayImage, sigma: f32) -> GrayImage {
    if sigma > 0.0 {
        separable_filter_equal(mask, &gaussian_taps(sigma))
    } else {
        mask.clone()
    }
}

/// Normalized 1-D Gaussian kernel of `BLUR_TAPS` taps.
fn gaussian_taps(sigma: f32) -> [f32; BLUR_TAPS] {
    let half = (BLUR_TAPS / 2) as f32;
    let mut taps = [0.0f32; BLUR_TAPS];
    for (i, tap) in taps.iter_mut().enumerate() {
        let d = i as f32 - half;
        *tap = (-d * d / (2.0 * sigma * sigma)).exp();
    }
    let sum: f32 = taps.iter().sum();
    taps.map(|t| t / sum)
}

fn threshold_hsv(frame: &RgbImage, lower: &HsvColor, upper: &HsvColor) -> GrayImage {
    GrayImage::from_fn(frame.width(), frame.height(), |x, y| {
        let [r, g, b] = frame.get_pixel(x, y).0;
        if HsvColor::from_rgb(r, g, b).within(lower, upper) {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}
