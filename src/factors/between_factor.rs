use nalgebra::{DMatrix, DVector};

use super::Factor;
use crate::manifold::{LieGroup, Manifold};

/// Generic between factor for relative measurements on any Lie group.
///
/// Covers odometry between poses (`SE2`), relative rotations (`SO2`) and point offsets
/// such as landmark measurements (`Point2`, `DVector<f64>`).
///
/// # Mathematical Formulation
///
/// Given variables `x₁`, `x₂` and a measurement `z`, the residual is:
///
/// ```text
/// r = log(z⁻¹ ∘ x₁⁻¹ ∘ x₂)
/// ```
///
/// For vector spaces this reduces to `r = (x₂ - x₁) - z` with Jacobians `-I` and `I`.
///
/// # Jacobian Computation
///
/// ```text
/// ∂r/∂x₁ = Jr⁻¹(r) · (-Ad((x₁⁻¹ ∘ x₂)⁻¹))
/// ∂r/∂x₂ = Jr⁻¹(r)
/// ```
///
/// # Example
///
/// ```
/// use nonlinear_factor::factors::{BetweenFactor, Factor};
/// use nonlinear_factor::manifold::SE2;
///
/// // Robot moved 1m forward and rotated 0.1 rad
/// let factor = BetweenFactor::new(SE2::from_xy_angle(1.0, 0.0, 0.1));
///
/// let pose_i = SE2::from_xy_angle(0.0, 0.0, 0.0);
/// let pose_j = SE2::from_xy_angle(1.0, 0.0, 0.1);
///
/// let residual = factor.evaluate_error(&(pose_i, pose_j), None);
/// assert_eq!(residual.len(), 3);
/// assert!(residual.norm() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BetweenFactor<T: LieGroup> {
    /// The measured relative transformation x₁⁻¹ ∘ x₂
    pub measured: T,
}

impl<T: LieGroup> BetweenFactor<T> {
    pub fn new(measured: T) -> Self {
        Self { measured }
    }
}

impl<T: LieGroup> Factor for BetweenFactor<T> {
    type Variables = (T, T);

    fn evaluate_error(
        &self,
        (x1, x2): &Self::Variables,
        jacobians: Option<&mut [DMatrix<f64>]>,
    ) -> DVector<f64> {
        let Some(jacobians) = jacobians else {
            let predicted = x1.between(x2, None, None);
            return self.measured.between(&predicted, None, None).logmap(None);
        };

        // Step 1: predicted = x1⁻¹ ∘ x2
        let mut j_pred_wrt_x1 = DMatrix::zeros(0, 0);
        let mut j_pred_wrt_x2 = DMatrix::zeros(0, 0);
        let predicted = x1.between(x2, Some(&mut j_pred_wrt_x1), Some(&mut j_pred_wrt_x2));

        // Step 2: diff = z⁻¹ ∘ predicted; right perturbations of `predicted` carry over
        // unchanged, so ∂diff/∂predicted = I.
        let diff = self.measured.between(&predicted, None, None);

        // Step 3: r = log(diff)
        let mut j_log = DMatrix::zeros(0, 0);
        let residual = diff.logmap(Some(&mut j_log));

        jacobians[0] = &j_log * j_pred_wrt_x1;
        jacobians[1] = j_log * j_pred_wrt_x2;
        residual
    }

    fn get_dimension(&self) -> usize {
        self.measured.dim()
    }

    fn variable_dims(&self) -> Option<Vec<usize>> {
        Some(vec![self.measured.dim(); 2])
    }

    fn equals(&self, other: &Self, tol: f64) -> bool {
        self.measured.equals(&other.measured, tol)
    }
}
