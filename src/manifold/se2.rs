//! SE(2) - Special Euclidean Group in 2D
//!
//! SE(2) elements are rigid transformations in the plane, stored as a translation and an
//! [`SO2`] rotation. Tangent vectors are ordered `[vx, vy, ω]`.
//!
//! With `a = sin(θ)/θ` and `b = (1 - cos(θ))/θ`:
//!
//! ```text
//! Exp([v; θ]) = ( V(θ)·v , R(θ) ),   V(θ) = [a  -b]
//!                                          [b   a]
//! ```
//!
//! and the right Jacobian `Jr` (manif / Solà, eq. 163) is block upper triangular, so its
//! inverse is computed in closed form.

use crate::manifold::{LieGroup, Manifold, SO2};
use nalgebra::{DMatrix, DVector, Matrix2, Matrix3, Vector2};
use std::fmt;

/// Angles below this use series expansions of `a` and `b`.
const SMALL_ANGLE: f64 = 1e-8;

/// SE(2) group element representing rigid body transformations in 2D.
#[derive(Clone, Debug, PartialEq)]
pub struct SE2 {
    /// Translation part
    translation: Vector2<f64>,
    /// Rotation part
    rotation: SO2,
}

impl fmt::Display for SE2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SE2(x: {:.4}, y: {:.4}, theta: {:.4})",
            self.translation.x,
            self.translation.y,
            self.rotation.angle()
        )
    }
}

/// `(sin(θ)/θ, (1 - cos(θ))/θ)`.
fn v_coefficients(theta: f64) -> (f64, f64) {
    if theta.abs() < SMALL_ANGLE {
        (1.0 - theta * theta / 6.0, 0.5 * theta)
    } else {
        (theta.sin() / theta, (1.0 - theta.cos()) / theta)
    }
}

impl SE2 {
    /// Create a new SE(2) element from translation and rotation.
    pub fn new(translation: Vector2<f64>, rotation: SO2) -> Self {
        SE2 {
            translation,
            rotation,
        }
    }

    /// Create SE(2) from x, y and heading angle (radians).
    pub fn from_xy_angle(x: f64, y: f64, theta: f64) -> Self {
        SE2::new(Vector2::new(x, y), SO2::from_angle(theta))
    }

    pub fn identity() -> Self {
        SE2::new(Vector2::zeros(), SO2::identity())
    }

    pub fn translation(&self) -> Vector2<f64> {
        self.translation
    }

    pub fn rotation(&self) -> &SO2 {
        &self.rotation
    }

    pub fn x(&self) -> f64 {
        self.translation.x
    }

    pub fn y(&self) -> f64 {
        self.translation.y
    }

    pub fn angle(&self) -> f64 {
        self.rotation.angle()
    }

    /// Transform a point from the local frame into the world frame: R·p + t.
    pub fn transform_from(&self, point: &Vector2<f64>) -> Vector2<f64> {
        self.rotation.rotate(point) + self.translation
    }

    /// Transform a world point into the local frame: Rᵀ·(p - t).
    pub fn transform_to(&self, point: &Vector2<f64>) -> Vector2<f64> {
        self.rotation.unrotate(&(point - self.translation))
    }

    /// Exponential map from the tangent space at identity.
    ///
    /// # Arguments
    /// * `tangent` - `[vx, vy, ω]`
    pub fn expmap(tangent: &DVector<f64>) -> Self {
        let theta = tangent[2];
        let (a, b) = v_coefficients(theta);
        let (vx, vy) = (tangent[0], tangent[1]);
        SE2::new(
            Vector2::new(a * vx - b * vy, b * vx + a * vy),
            SO2::from_angle(theta),
        )
    }

    /// Right Jacobian Jr of the exponential map at `tangent`.
    pub fn right_jacobian(tangent: &DVector<f64>) -> Matrix3<f64> {
        let (rho1, rho2, theta) = (tangent[0], tangent[1], tangent[2]);
        let (a, b) = v_coefficients(theta);
        let (j02, j12) = if theta.abs() < SMALL_ANGLE {
            (-0.5 * rho2 + theta * rho1 / 6.0, 0.5 * rho1 + theta * rho2 / 6.0)
        } else {
            let (s, c) = theta.sin_cos();
            let theta2 = theta * theta;
            (
                (theta * rho1 - rho2 + rho2 * c - rho1 * s) / theta2,
                (rho1 + theta * rho2 - rho1 * c - rho2 * s) / theta2,
            )
        };
        Matrix3::new(a, b, j02, -b, a, j12, 0.0, 0.0, 1.0)
    }

    /// Inverse of the right Jacobian, Jr⁻¹, in closed form.
    pub fn right_jacobian_inv(tangent: &DVector<f64>) -> Matrix3<f64> {
        let jr = Self::right_jacobian(tangent);
        let (a, b) = (jr[(0, 0)], jr[(0, 1)]);
        let det = a * a + b * b;
        let m_inv = Matrix2::new(a, -b, b, a) / det;
        let u = Vector2::new(jr[(0, 2)], jr[(1, 2)]);
        let corner = -(m_inv * u);

        let mut inv = Matrix3::identity();
        inv.fixed_view_mut::<2, 2>(0, 0).copy_from(&m_inv);
        inv[(0, 2)] = corner.x;
        inv[(1, 2)] = corner.y;
        inv
    }
}

impl Manifold for SE2 {
    fn dim(&self) -> usize {
        3
    }

    fn retract(&self, delta: &DVector<f64>) -> Self {
        self.compose(&SE2::expmap(delta))
    }

    fn local_coordinates(&self, other: &Self) -> DVector<f64> {
        self.inverse().compose(other).logmap(None)
    }
}

impl LieGroup for SE2 {
    fn inverse(&self) -> Self {
        let inv_rotation = self.rotation.inverse();
        let inv_translation = -inv_rotation.rotate(&self.translation);
        SE2::new(inv_translation, inv_rotation)
    }

    fn compose(&self, other: &Self) -> Self {
        SE2::new(
            self.translation + self.rotation.rotate(&other.translation),
            self.rotation.compose(&other.rotation),
        )
    }

    /// Ad(g) = [R  [y; -x]]
    ///         [0      1  ]
    fn adjoint(&self) -> DMatrix<f64> {
        let (s, c) = self.rotation.angle().sin_cos();
        DMatrix::from_row_slice(
            3,
            3,
            &[
                c,
                -s,
                self.translation.y,
                s,
                c,
                -self.translation.x,
                0.0,
                0.0,
                1.0,
            ],
        )
    }

    fn logmap(&self, jacobian: Option<&mut DMatrix<f64>>) -> DVector<f64> {
        let theta = self.rotation.angle();
        let (a, b) = v_coefficients(theta);
        let det = a * a + b * b;
        let (x, y) = (self.translation.x, self.translation.y);
        let tangent = DVector::from_vec(vec![(a * x + b * y) / det, (-b * x + a * y) / det, theta]);

        if let Some(jac) = jacobian {
            let jr_inv = SE2::right_jacobian_inv(&tangent);
            *jac = DMatrix::from_column_slice(3, 3, jr_inv.as_slice());
        }
        tangent
    }
}
