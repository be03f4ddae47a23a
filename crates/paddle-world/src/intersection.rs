use paddle_core::Intersection;

use crate::trajectory::TrajectoryModel;

/// Curvature below this means the y-model is effectively linear and is not solved.
const MIN_CURVATURE: f64 = 1e-10;

/// Find when and where the fitted trajectory next crosses the horizontal line `y_level`.
///
/// Only crossings strictly after the most recent fitted sample count; of those the earliest
/// is returned. The crossing x is clamped to `[0, frame_width]`.
///
/// Returns `None` if the y-model is (nearly) linear, never reaches the line, or reached it
/// only in the past.
pub fn predict_intersection(
    model: &TrajectoryModel,
    y_level: f64,
    frame_width: i32,
) -> Option<Intersection> {
    let (a, b, c) = (model.y.a, model.y.b, model.y.c - y_level);
    if a.abs() < MIN_CURVATURE {
        return None;
    }

    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 || !discriminant.is_finite() {
        return None;
    }

    let sqrt_d = discriminant.sqrt();
    let now = model.now();
    let t = [(-b + sqrt_d) / (2.0 * a), (-b - sqrt_d) / (2.0 * a)]
        .into_iter()
        .filter(|t| *t > now)
        .min_by(|l, r| l.total_cmp(r))?;

    let x = model.x.eval(t);
    if !x.is_finite() {
        return None;
    }

    Some(Intersection {
        x: x.clamp(0.0, frame_width.max(0) as f64) as i32,
        time_to_intersect: t - now,
    })
}
