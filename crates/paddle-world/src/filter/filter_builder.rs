use crate::filter::kalman::Kalman;
use crate::filter::matrix_gen::{IsotropicNoise, ULMotionModel};
use nalgebra::SMatrix;

#[derive(Debug, Clone)]
pub struct KalmanBuilder {
    init_var: f64,
    measurement_var: f64,
    unit_transition_var: f64,
}

impl KalmanBuilder {
    pub fn new(init_var: f64, measurement_var: f64, unit_transition_var: f64) -> Self {
        KalmanBuilder {
            init_var,
            measurement_var,
            unit_transition_var,
        }
    }

    /// Constant-velocity filter in the image plane, observing position only.
    #[allow(non_snake_case)]
    pub fn build_2d(&self) -> Kalman<2, 4> {
        let A = ULMotionModel;
        let Q = IsotropicNoise;
        Kalman::new(
            self.unit_transition_var,
            Box::new(A),
            Self::observation(),
            Box::new(Q),
            self.measurement_noise(),
            self.initial_covariance(),
        )
    }

    /// Apply new variances to an existing filter.
    pub fn update(&self, filter: &mut Kalman<2, 4>) {
        filter.update_settings(
            self.unit_transition_var,
            self.measurement_noise(),
            self.initial_covariance(),
        );
    }

    fn observation() -> SMatrix<f64, 2, 4> {
        SMatrix::<f64, 2, 4>::new(1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0)
    }

    fn measurement_noise(&self) -> SMatrix<f64, 2, 2> {
        SMatrix::<f64, 2, 2>::identity() * self.measurement_var
    }

    fn initial_covariance(&self) -> SMatrix<f64, 4, 4> {
        SMatrix::<f64, 4, 4>::identity() * self.init_var
    }
}
