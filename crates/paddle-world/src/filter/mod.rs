mod filter_builder;
mod kalman;
mod matrix_gen;

pub use filter_builder::KalmanBuilder;
pub use kalman::{EstimatorState, Kalman};
pub use matrix_gen::{IsotropicNoise, MatrixCreator, ULMotionModel};
