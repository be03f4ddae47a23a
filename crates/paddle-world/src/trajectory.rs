use nalgebra::{DMatrix, DVector};
use paddle_core::Intersection;
use thiserror::Error;

use crate::intersection::predict_intersection;

/// Singular values below this count as zero when checking the fit's rank.
const RANK_EPS: f64 = 1e-9;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FitError {
    #[error("Need at least {required} positions to fit a trajectory, got {got}")]
    InsufficientPoints { required: usize, got: usize },
    #[error("Trajectory fit is numerically degenerate")]
    Degenerate,
}

/// `f(t) = a·t² + b·t + c`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quadratic {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl Quadratic {
    pub fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    pub fn eval(&self, t: f64) -> f64 {
        self.a * t * t + self.b * t + self.c
    }

    fn is_finite(&self) -> bool {
        self.a.is_finite() && self.b.is_finite() && self.c.is_finite()
    }
}

/// Independent quadratic models of x and y over frame indices `0..samples`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectoryModel {
    pub x: Quadratic,
    pub y: Quadratic,
    /// Number of positions the model was fitted on
    pub samples: usize,
}

impl TrajectoryModel {
    /// Time index of the most recent fitted position.
    pub fn now(&self) -> f64 {
        self.samples.saturating_sub(1) as f64
    }

    /// Position `steps_ahead` frames after the most recent fitted position.
    pub fn position_at(&self, steps_ahead: f64) -> (f64, f64) {
        let t = self.now() + steps_ahead;
        (self.x.eval(t), self.y.eval(t))
    }
}

/// Least-squares fit of a quadratic to `values`, sampled at `t = 0, 1, 2, ...`.
pub fn fit_quadratic(values: &[f64]) -> Result<Quadratic, FitError> {
    if values.len() < 3 {
        return Err(FitError::Degenerate);
    }
    let design = DMatrix::<f64>::from_fn(values.len(), 3, |i, j| (i as f64).powi(2 - j as i32));
    let rhs = DVector::<f64>::from_column_slice(values);

    let svd = design.svd(true, true);
    if svd.rank(RANK_EPS) < 3 {
        return Err(FitError::Degenerate);
    }
    let coeffs = svd
        .solve(&rhs, RANK_EPS)
        .map_err(|_| FitError::Degenerate)?;

    let quadratic = Quadratic::new(coeffs[0], coeffs[1], coeffs[2]);
    if quadratic.is_finite() {
        Ok(quadratic)
    } else {
        Err(FitError::Degenerate)
    }
}

/// Fit x(t) and y(t) to a position history, oldest first.
pub fn fit_trajectory(
    positions: &[(i32, i32)],
    min_points: usize,
) -> Result<TrajectoryModel, FitError> {
    if positions.len() < min_points {
        return Err(FitError::InsufficientPoints {
            required: min_points,
            got: positions.len(),
        });
    }

    let xs: Vec<f64> = positions.iter().map(|p| p.0 as f64).collect();
    let ys: Vec<f64> = positions.iter().map(|p| p.1 as f64).collect();
    Ok(TrajectoryModel {
        x: fit_quadratic(&xs)?,
        y: fit_quadratic(&ys)?,
        samples: positions.len(),
    })
}

/// Keeps the trajectory fitted on the latest history.
#[derive(Debug, Clone)]
pub struct TrajectoryPredictor {
    min_points: usize,
    model: Option<TrajectoryModel>,
}

impl TrajectoryPredictor {
    pub fn new(min_points: usize) -> Self {
        Self {
            min_points,
            model: None,
        }
    }

    pub fn set_min_points(&mut self, min_points: usize) {
        self.min_points = min_points;
    }

    /// Refit on `positions`. On failure the previous model is discarded, so callers fall
    /// back to following the ball.
    pub fn fit_trajectory(
        &mut self,
        positions: &[(i32, i32)],
    ) -> Result<&TrajectoryModel, FitError> {
        self.model = None;
        match fit_trajectory(positions, self.min_points) {
            Ok(model) => Ok(&*self.model.insert(model)),
            Err(err) => {
                if matches!(err, FitError::Degenerate) {
                    log::debug!("Trajectory fit failed: {}", err);
                }
                Err(err)
            }
        }
    }

    pub fn model(&self) -> Option<&TrajectoryModel> {
        self.model.as_ref()
    }

    /// Extrapolated position, rounded to pixels.
    pub fn predict_position(&self, steps_ahead: f64) -> Option<(i32, i32)> {
        let (x, y) = self.model.as_ref()?.position_at(steps_ahead);
        if x.is_finite() && y.is_finite() {
            Some((x.round() as i32, y.round() as i32))
        } else {
            None
        }
    }

    pub fn predict_intersection(&self, y_level: f64, frame_width: i32) -> Option<Intersection> {
        predict_intersection(self.model.as_ref()?, y_level, frame_width)
    }
}
