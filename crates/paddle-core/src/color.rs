use serde::{Deserialize, Serialize};

/// A color in 8-bit HSV.
///
/// Hue is half the angle in degrees (`0..180`), saturation and value span `0..=255`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct HsvColor {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

impl HsvColor {
    pub const fn new(h: u8, s: u8, v: u8) -> Self {
        Self { h, s, v }
    }

    /// Convert an RGB pixel.
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        let (rf, gf, bf) = (r as f32, g as f32, b as f32);
        let max = rf.max(gf).max(bf);
        let min = rf.min(gf).min(bf);
        let diff = max - min;

        let s = if max > 0.0 { diff * 255.0 / max } else { 0.0 };
        let mut h = if diff == 0.0 {
            0.0
        } else if max == rf {
            60.0 * (gf - bf) / diff
        } else if max == gf {
            120.0 + 60.0 * (bf - rf) / diff
        } else {
            240.0 + 60.0 * (rf - gf) / diff
        };
        if h < 0.0 {
            h += 360.0;
        }

        let h = (h / 2.0).round() as u32 % 180;
        Self {
            h: h as u8,
            s: s.round() as u8,
            v: max as u8,
        }
    }

    /// Whether each channel lies within the inclusive bounds.
    pub fn within(&self, lower: &HsvColor, upper: &HsvColor) -> bool {
        (lower.h..=upper.h).contains(&self.h)
            && (lower.s..=upper.s).contains(&self.s)
            && (lower.v..=upper.v).contains(&self.v)
    }
}
