use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::HsvColor;

/// Settings for the `BallTracker`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrackerSettings {
    /// Lower HSV bound of the ball color (inclusive).
    pub color_lower: HsvColor,
    /// Upper HSV bound of the ball color (inclusive).
    pub color_upper: HsvColor,
    /// Standard deviation of the Gaussian applied to the cleaned mask.
    pub blur_sigma: f32,

    /// How many of the largest contours are checked for a ball, largest first.
    pub max_candidates: usize,
    /// Enclosing radius must be strictly greater than this, in px.
    pub min_radius: f32,
    /// Enclosing radius must be strictly smaller than this, in px.
    pub max_radius: f32,
    /// Below this radius the relaxed circularity bar applies, in px.
    pub small_radius: f32,
    /// Circularity bar for small (distant) balls.
    pub small_circularity: f64,
    /// Circularity bar for everything else.
    pub circularity: f64,

    /// Half-width of the re-acquisition window around the predicted position, in px.
    pub roi_half_width: i32,
    /// Re-acquired contours must have a radius strictly greater than this, in px.
    pub roi_min_radius: f32,
    /// Radius reported for a pure prediction when no radius was ever measured, in px.
    pub default_radius: i32,

    /// Process noise added uniformly to every state component per frame.
    pub unit_transition_var: f64,
    /// Measurement variance for the ball Kalman filter, in px².
    pub measurement_var: f64,
    /// Initial state variance for the ball Kalman filter.
    pub init_var: f64,

    /// Maximum number of positions kept for the trajectory fit.
    pub history_capacity: usize,
    /// Minimum number of positions needed for a trajectory fit.
    pub min_fit_points: usize,
    /// Width used to clamp predictions before any frame has been seen, in px.
    pub clamp_width: i32,
    /// Predictions further out than this many frames are not used to aim the paddle.
    pub max_lead_frames: f64,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            color_lower: HsvColor::new(20, 100, 100),
            color_upper: HsvColor::new(35, 255, 255),
            blur_sigma: 1.1,
            max_candidates: 5,
            min_radius: 3.0,
            max_radius: 50.0,
            small_radius: 10.0,
            small_circularity: 0.5,
            circularity: 0.65,
            roi_half_width: 30,
            roi_min_radius: 2.0,
            default_radius: 10,
            unit_transition_var: 0.03,
            measurement_var: 1.0,
            init_var: 100.0,
            history_capacity: 10,
            min_fit_points: 5,
            clamp_width: 640,
            max_lead_frames: 15.0,
        }
    }
}

impl TrackerSettings {
    /// Load the tracker settings from a file, or store the default settings if the file does
    /// not exist.
    ///
    /// A file that exists but does not parse is an error; it is never overwritten.
    pub fn load_or_insert(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse tracker settings {}", path.display())),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::info!("Writing default tracker settings to {}", path.display());
                let settings = Self::default();
                settings.store(path)?;
                Ok(settings)
            }
            Err(err) => Err(err)
                .with_context(|| format!("Failed to read tracker settings {}", path.display())),
        }
    }

    /// Store the tracker settings in the given file.
    pub fn store(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write tracker settings {}", path.display()))
    }
}
