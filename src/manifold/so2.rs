//! SO(2) - Special Orthogonal Group in 2D
//!
//! SO(2) elements are represented using nalgebra's UnitComplex internally.
//! SO(2) tangent elements are a single angle in radians.

use crate::manifold::{LieGroup, Manifold};
use nalgebra::{DMatrix, DVector, Matrix2, UnitComplex, Vector2};
use std::fmt;

/// SO(2) group element representing rotations in 2D.
#[derive(Clone, Debug, PartialEq)]
pub struct SO2 {
    /// Internal representation as a unit complex number
    complex: UnitComplex<f64>,
}

impl fmt::Display for SO2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SO2(angle: {:.4})", self.complex.angle())
    }
}

impl SO2 {
    /// Create a new SO(2) element from a unit complex number.
    pub fn new(complex: UnitComplex<f64>) -> Self {
        SO2 { complex }
    }

    /// Create SO(2) from an angle in radians.
    pub fn from_angle(angle: f64) -> Self {
        SO2::new(UnitComplex::from_angle(angle))
    }

    /// Identity rotation.
    pub fn identity() -> Self {
        SO2::new(UnitComplex::identity())
    }

    /// Get the underlying unit complex number.
    pub fn complex(&self) -> UnitComplex<f64> {
        self.complex
    }

    /// Get the rotation angle in radians, in (-π, π].
    pub fn angle(&self) -> f64 {
        self.complex.angle()
    }

    /// Get the rotation matrix (2x2).
    pub fn rotation_matrix(&self) -> Matrix2<f64> {
        self.complex.to_rotation_matrix().into_inner()
    }

    /// Rotate a 2D vector.
    pub fn rotate(&self, v: &Vector2<f64>) -> Vector2<f64> {
        self.complex * v
    }

    /// Rotate a 2D vector by the inverse rotation.
    pub fn unrotate(&self, v: &Vector2<f64>) -> Vector2<f64> {
        self.complex.inverse() * v
    }
}

impl Manifold for SO2 {
    fn dim(&self) -> usize {
        1
    }

    fn retract(&self, delta: &DVector<f64>) -> Self {
        SO2::new(self.complex * UnitComplex::from_angle(delta[0]))
    }

    fn local_coordinates(&self, other: &Self) -> DVector<f64> {
        DVector::from_element(1, (self.complex.inverse() * other.complex).angle())
    }
}

impl LieGroup for SO2 {
    fn inverse(&self) -> Self {
        SO2::new(self.complex.inverse())
    }

    fn compose(&self, other: &Self) -> Self {
        SO2::new(self.complex * other.complex)
    }

    /// Rotations in 2D commute, so Ad(R) = 1.
    fn adjoint(&self) -> DMatrix<f64> {
        DMatrix::identity(1, 1)
    }

    fn logmap(&self, jacobian: Option<&mut DMatrix<f64>>) -> DVector<f64> {
        if let Some(jac) = jacobian {
            *jac = DMatrix::identity(1, 1);
        }
        DVector::from_element(1, self.angle())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifold::test_utils::numerical_jacobian;
    use std::f64::consts::PI;

    const TOLERANCE: f64 = 1e-9;

    #[test]
    fn test_so2_retract_local_roundtrip() {
        let r = SO2::from_angle(0.3);
        let delta = DVector::from_element(1, 0.25);
        let s = r.retract(&delta);

        assert!((s.angle() - 0.55).abs() < TOLERANCE);
        assert!((r.local_coordinates(&s) - delta).norm() < TOLERANCE);
    }

    #[test]
    fn test_so2_angle_wraps() {
        let r = SO2::from_angle(PI - 0.1);
        let s = r.retract(&DVector::from_element(1, 0.2));
        assert!((s.angle() - (-PI + 0.1)).abs() < TOLERANCE);
        assert!((r.local_coordinates(&s)[0] - 0.2).abs() < TOLERANCE);
    }

    #[test]
    fn test_so2_rotate_unrotate() {
        let r = SO2::from_angle(PI / 2.0);
        let v = Vector2::new(1.0, 0.0);
        let rotated = r.rotate(&v);
        assert!((rotated - Vector2::new(0.0, 1.0)).norm() < TOLERANCE);
        assert!((r.unrotate(&rotated) - v).norm() < TOLERANCE);
    }

    #[test]
    fn test_so2_between_jacobians_numerical() {
        let a = SO2::from_angle(0.4);
        let b = SO2::from_angle(-1.2);
        let mut j_a = DMatrix::zeros(0, 0);
        let mut j_b = DMatrix::zeros(0, 0);
        a.between(&b, Some(&mut j_a), Some(&mut j_b));

        let fd_a = numerical_jacobian(&a, |x| x.between(&b, None, None).logmap(None));
        let fd_b = numerical_jacobian(&b, |x| a.between(x, None, None).logmap(None));

        assert!((j_a - fd_a).norm() < 1e-6);
        assert!((j_b - fd_b).norm() < 1e-6);
    }
}
