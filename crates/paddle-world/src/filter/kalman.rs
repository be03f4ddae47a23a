use nalgebra::{SMatrix, SVector};

use crate::filter::matrix_gen::MatrixCreator;

/// Mean and covariance of a Kalman filter at one point in time.
///
/// This is plain data: the filter never holds on to it, it takes a state and hands back the
/// next one.
#[derive(Clone, Debug, PartialEq)]
pub struct EstimatorState<const SS: usize> {
    /// State vector
    pub x: SVector<f64, SS>,
    /// Error covariance matrix
    pub covariance: SMatrix<f64, SS, SS>,
}

impl<const SS: usize> EstimatorState<SS> {
    pub fn is_finite(&self) -> bool {
        self.x.iter().all(|v| v.is_finite()) && self.covariance.iter().all(|v| v.is_finite())
    }
}

// OS: Observation Space, SS: State Space
#[allow(non_snake_case)]
pub struct Kalman<const OS: usize, const SS: usize> {
    // unit variance of transition noise
    var: f64,
    // Transition matrix
    A: Box<dyn MatrixCreator<SS>>,
    // Transformation (observation) matrix
    H: SMatrix<f64, OS, SS>,
    // Process noise covariance matrix
    Q: Box<dyn MatrixCreator<SS>>,
    // Measurement noise covariance matrix
    R: SMatrix<f64, OS, OS>,
    // Initial error covariance matrix
    P0: SMatrix<f64, SS, SS>,
}

#[allow(non_snake_case)]
impl<const OS: usize, const SS: usize> Kalman<OS, SS> {
    pub fn new(
        var: f64,
        A: Box<dyn MatrixCreator<SS>>,
        H: SMatrix<f64, OS, SS>,
        Q: Box<dyn MatrixCreator<SS>>,
        R: SMatrix<f64, OS, OS>,
        P0: SMatrix<f64, SS, SS>,
    ) -> Self {
        Kalman {
            var,
            A,
            H,
            Q,
            R,
            P0,
        }
    }

    /// Start a new track at `x` with the initial covariance.
    pub fn init(&self, x: SVector<f64, SS>) -> EstimatorState<SS> {
        EstimatorState {
            x,
            covariance: self.P0,
        }
    }

    /// Propagate `state` forward by `dt`.
    pub fn predict(&self, state: EstimatorState<SS>, dt: f64) -> EstimatorState<SS> {
        let A = self.A.create_matrix(dt);
        let Q = self.Q.create_matrix(dt) * self.var;
        EstimatorState {
            x: A * state.x,
            covariance: A * state.covariance * A.transpose() + Q,
        }
    }

    /// Fuse the observation `z` into `state`.
    ///
    /// Returns `None` if the innovation covariance cannot be inverted.
    pub fn correct(
        &self,
        state: &EstimatorState<SS>,
        z: SVector<f64, OS>,
    ) -> Option<EstimatorState<SS>> {
        let P = &state.covariance;
        let r = z - self.H * state.x;
        let S = self.H * P * self.H.transpose() + self.R;
        let K = P * self.H.transpose() * S.try_inverse()?;
        Some(EstimatorState {
            x: state.x + K * r,
            covariance: P - K * self.H * P,
        })
    }

    /// Project a state into observation space.
    pub fn observe(&self, state: &EstimatorState<SS>) -> SVector<f64, OS> {
        self.H * state.x
    }

    pub fn update_settings(&mut self, var: f64, R: SMatrix<f64, OS, OS>, P0: SMatrix<f64, SS, SS>) {
        self.var = var;
        self.R = R;
        self.P0 = P0;
    }
}
