//! Color segmentation and ball candidate extraction.

mod blob;
mod detector;
mod segmenter;

pub use blob::{enclosing_circle, external_blobs, Blob, Circle};
pub use detector::ShapeDetector;
pub use segmenter::{clean_mask, segment, smooth_mask, ColorSegmenter};

pub use image::{GrayImage, RgbImage};
