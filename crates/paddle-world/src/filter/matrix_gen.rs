use nalgebra::{Matrix2, SMatrix};

fn block_diag(a: &Matrix2<f64>) -> SMatrix<f64, 4, 4> {
    let mut result = SMatrix::<f64, 4, 4>::zeros();

    result.fixed_view_mut::<2, 2>(0, 0).copy_from(a);
    result.fixed_view_mut::<2, 2>(2, 2).copy_from(a);
    result
}

pub trait MatrixCreator<const D: usize>: Send + Sync {
    fn create_matrix(&self, delta_t: f64) -> SMatrix<f64, D, D>;
}

pub struct ULMotionModel;

// Constant speed on each axis, state laid out as (x, vx, y, vy)
impl MatrixCreator<4> for ULMotionModel {
    fn create_matrix(&self, delta_t: f64) -> SMatrix<f64, 4, 4> {
        let m = Matrix2::new(
            1.0, delta_t,
            0.0, 1.0,
        );
        block_diag(&m)
    }
}

/// The same unit noise on every state component, independent of the step length.
pub struct IsotropicNoise;

impl<const D: usize> MatrixCreator<D> for IsotropicNoise {
    fn create_matrix(&self, _delta_t: f64) -> SMatrix<f64, D, D> {
        SMatrix::<f64, D, D>::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ul_motion_model_u4() {
        let model = ULMotionModel;
        let result_matrix: SMatrix<f64, 4, 4> = model.create_matrix(2.0);
        let expected_matrix = SMatrix::<f64, 4, 4>::new(
            1.0, 2.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 2.0,
            0.0, 0.0, 0.0, 1.0,
        );

        assert_eq!(result_matrix, expected_matrix);
    }

    #[test]
    fn test_ul_motion_model_advances_position() {
        let model = ULMotionModel;
        let a: SMatrix<f64, 4, 4> = model.create_matrix(1.0);
        let x = nalgebra::Vector4::new(10.0, 3.0, 20.0, -2.0);
        assert_eq!(a * x, nalgebra::Vector4::new(13.0, 3.0, 18.0, -2.0));
    }

    #[test]
    fn test_isotropic_noise() {
        let q: SMatrix<f64, 4, 4> = IsotropicNoise.create_matrix(5.0);
        assert_eq!(q, SMatrix::<f64, 4, 4>::identity());
    }
}
