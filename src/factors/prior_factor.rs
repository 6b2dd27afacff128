use nalgebra::{DMatrix, DVector};

use super::Factor;
use crate::manifold::{LieGroup, Manifold};

/// Unary prior on a Lie group variable.
///
/// # Mathematical Formulation
///
/// ```text
/// r = log(prior⁻¹ ∘ x),   ∂r/∂x = Jr⁻¹(r)
/// ```
///
/// For vector spaces this is simply `x - prior` with Jacobian `I`.
#[derive(Debug, Clone, PartialEq)]
pub struct PriorFactor<T: LieGroup> {
    /// Prior mean
    pub prior: T,
}

impl<T: LieGroup> PriorFactor<T> {
    pub fn new(prior: T) -> Self {
        Self { prior }
    }
}

impl<T: LieGroup> Factor for PriorFactor<T> {
    type Variables = (T,);

    fn evaluate_error(
        &self,
        (x,): &Self::Variables,
        jacobians: Option<&mut [DMatrix<f64>]>,
    ) -> DVector<f64> {
        let diff = self.prior.inverse().compose(x);
        match jacobians {
            Some(jacobians) => {
                let mut j_log = DMatrix::zeros(0, 0);
                let residual = diff.logmap(Some(&mut j_log));
                jacobians[0] = j_log;
                residual
            }
            None => diff.logmap(None),
        }
    }

    fn get_dimension(&self) -> usize {
        self.prior.dim()
    }

    fn variable_dims(&self) -> Option<Vec<usize>> {
        Some(vec![self.prior.dim()])
    }

    fn equals(&self, other: &Self, tol: f64) -> bool {
        self.prior.equals(&other.prior, tol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifold::test_utils::numerical_jacobian;
    use crate::manifold::vector::Point2;
    use crate::manifold::SE2;

    #[test]
    fn test_prior_point2_error() {
        let factor = PriorFactor::new(Point2::new(1.0, -1.0));
        let mut jacobians = vec![DMatrix::zeros(0, 0)];
        let e = factor.evaluate_error(&(Point2::new(1.0, 2.0),), Some(jacobians.as_mut_slice()));

        assert_eq!(e, DVector::from_vec(vec![0.0, 3.0]));
        assert_eq!(jacobians[0], DMatrix::<f64>::identity(2, 2));
        assert_eq!(factor.get_dimension(), 2);
    }

    #[test]
    fn test_prior_se2_jacobian_numerical() {
        let factor = PriorFactor::new(SE2::from_xy_angle(0.2, -0.1, 0.4));
        let x = SE2::from_xy_angle(1.0, 0.5, 1.3);

        let mut jacobians = vec![DMatrix::zeros(0, 0)];
        factor.evaluate_error(&(x.clone(),), Some(jacobians.as_mut_slice()));

        let fd = numerical_jacobian(&x, |x| factor.evaluate_error(&(x.clone(),), None));
        assert!((&jacobians[0] - fd).norm() < 1e-6);
    }

    #[test]
    fn test_prior_equals() {
        let a = PriorFactor::new(SE2::from_xy_angle(0.0, 0.0, 0.1));
        let b = PriorFactor::new(SE2::from_xy_angle(0.0, 0.0, 0.1 + 1e-6));
        assert!(a.equals(&b, 1e-5));
        assert!(!a.equals(&b, 1e-8));
    }
}
