//! Ball tracking and trajectory prediction for the paddle.
//!
//! [`BallTracker`] turns camera frames into [`BallSighting`]s, keeps a short history of
//! positions and fits a parabola to it to predict where the ball will cross the paddle.

mod aim;
mod ball;
pub mod filter;
mod history;
mod intersection;
mod trajectory;

pub use aim::{aim_paddle, PaddleTarget};
pub use ball::{BallTracker, FrameReport};
pub use history::PositionHistory;
pub use intersection::predict_intersection;
pub use paddle_core::{BallSighting, Detection, Intersection, TrackerSettings};
pub use trajectory::{
    fit_quadratic, fit_trajectory, FitError, Quadratic, TrajectoryModel, TrajectoryPredictor,
};
