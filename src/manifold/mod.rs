//! Manifold-valued variable types.
//!
//! Factors are differentiated with respect to local perturbations in the tangent space
//! of each variable. This module defines the two traits that make that possible:
//!
//! - [`Manifold`]: tangent dimension, `retract` and `local_coordinates`.
//! - [`LieGroup`]: group operations with analytic Jacobians, used by the generic
//!   prior and between factors.
//!
//! Lie group M,° | size | dim | X ∈ M          | Exp(T)        | Comp. | Action
//! ------------- | ---- | --- | -------------- | ------------- | ----- | ------
//! n-D vector    | Rⁿ,+ | n   | v ∈ Rⁿ         | v = exp(v)    | v₁+v₂ | v + x
//! Rotation      | SO(2)| 1   | R              | R = exp([θ]x) | R₁R₂  | Rx
//! Rigid motion  | SE(2)| 3   | M = [R t; 0 1] | Exp([v̂])      | M₁M₂  | Rx+t
//!
//! All groups use the right-perturbation convention: `retract(x, δ) = x ∘ Exp(δ)` and
//! `local_coordinates(x, y) = Log(x⁻¹ ∘ y)`. Jacobians are `DMatrix<f64>` so that
//! factors of mixed variable types can store them uniformly.

use nalgebra::{DMatrix, DVector};
use std::fmt::Debug;

pub mod se2;
pub mod so2;
pub mod vector;

pub use se2::SE2;
pub use so2::SO2;

/// A differentiable manifold usable as a factor-graph variable.
pub trait Manifold: Clone + Debug + Send + Sync + 'static {
    /// Dimension of the tangent space (degrees of freedom).
    fn dim(&self) -> usize;

    /// Apply a tangent-space perturbation: x ⊞ δ.
    ///
    /// Callers guarantee `delta.len() == self.dim()`.
    fn retract(&self, delta: &DVector<f64>) -> Self;

    /// Tangent vector taking `self` to `other`: other ⊟ self.
    fn local_coordinates(&self, other: &Self) -> DVector<f64>;

    /// Approximate equality within `tol`.
    fn equals(&self, other: &Self, tol: f64) -> bool {
        self.dim() == other.dim() && self.local_coordinates(other).amax() <= tol
    }
}

/// Lie group operations with analytic Jacobians (right-perturbation convention).
pub trait LieGroup: Manifold {
    /// Inverse element g⁻¹.
    fn inverse(&self) -> Self;

    /// Group composition g₁ ∘ g₂.
    fn compose(&self, other: &Self) -> Self;

    /// Adjoint matrix Ad(g), mapping tangent vectors at g to tangent vectors at identity.
    fn adjoint(&self) -> DMatrix<f64>;

    /// Logarithmic map to the tangent space at identity.
    ///
    /// # Arguments
    /// * `jacobian` - Optional Jacobian ∂Log(g)/∂g, i.e. Jr⁻¹(Log(g))
    fn logmap(&self, jacobian: Option<&mut DMatrix<f64>>) -> DVector<f64>;

    /// Relative element g₁⁻¹ ∘ g₂.
    ///
    /// # Arguments
    /// * `other` - The target element g₂
    /// * `jacobian_self` - Optional Jacobian with respect to g₁: -Ad((g₁⁻¹ ∘ g₂)⁻¹)
    /// * `jacobian_other` - Optional Jacobian with respect to g₂: I
    fn between(
        &self,
        other: &Self,
        jacobian_self: Option<&mut DMatrix<f64>>,
        jacobian_other: Option<&mut DMatrix<f64>>,
    ) -> Self {
        let result = self.inverse().compose(other);
        if let Some(jac_self) = jacobian_self {
            *jac_self = -result.inverse().adjoint();
        }
        if let Some(jac_other) = jacobian_other {
            let dof = result.dim();
            *jac_other = DMatrix::identity(dof, dof);
        }
        result
    }
}
