use serde::{Deserialize, Serialize};

/// A ball candidate in pixel coordinates.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Detection {
    /// Center x, in pixels from the left edge
    pub x: i32,
    /// Center y, in pixels from the top edge
    pub y: i32,
    /// Radius of the enclosing circle, in pixels
    pub radius: i32,
}

impl Detection {
    pub fn new(x: i32, y: i32, radius: i32) -> Self {
        Self { x, y, radius }
    }

    pub fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }
}

/// The ball as reported by the tracker for a single frame.
///
/// The variant records where the position came from, so consumers can decide how much to
/// trust it.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(tag = "type", content = "data")]
pub enum BallSighting {
    /// Found by the full-frame shape detector.
    Measured(Detection),
    /// Re-acquired by the search window around the predicted position.
    Recovered(Detection),
    /// No contour was found; this is the filter's extrapolation.
    Predicted(Detection),
}

impl BallSighting {
    pub fn detection(&self) -> &Detection {
        match self {
            BallSighting::Measured(d)
            | BallSighting::Recovered(d)
            | BallSighting::Predicted(d) => d,
        }
    }

    /// Whether the sighting is backed by pixels in the current frame.
    pub fn is_observed(&self) -> bool {
        !matches!(self, BallSighting::Predicted(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            BallSighting::Measured(_) => "measured",
            BallSighting::Recovered(_) => "recovered",
            BallSighting::Predicted(_) => "predicted",
        }
    }
}

/// Where the ball is expected to cross the paddle line.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Intersection {
    /// Crossing x, clamped to `[0, frame_width]`
    pub x: i32,
    /// Frames from the last fitted sample until the crossing
    pub time_to_intersect: f64,
}
