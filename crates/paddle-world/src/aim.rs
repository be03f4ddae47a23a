use paddle_core::Intersection;
use serde::Serialize;

/// Where to move the paddle this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "x", rename_all = "snake_case")]
pub enum PaddleTarget {
    /// Meet the ball at its predicted crossing.
    Intercept(i32),
    /// Stay under the ball.
    Follow(i32),
}

impl PaddleTarget {
    pub fn x(&self) -> i32 {
        match self {
            PaddleTarget::Intercept(x) | PaddleTarget::Follow(x) => *x,
        }
    }
}

/// Decide between intercepting at the predicted crossing and following the ball.
///
/// A prediction is trusted only when the crossing is less than `max_lead_frames` away and
/// lands within half a frame width of the ball's current x.
pub fn aim_paddle(
    current_x: i32,
    intersection: Option<&Intersection>,
    frame_width: i32,
    max_lead_frames: f64,
) -> PaddleTarget {
    match intersection {
        Some(hit)
            if hit.time_to_intersect < max_lead_frames
                && (hit.x.abs_diff(current_x) as f64) < frame_width as f64 / 2.0 =>
        {
            PaddleTarget::Intercept(hit.x)
        }
        _ => PaddleTarget::Follow(current_x),
    }
}
