//! Measurement factors for the factor graph
//!
//! A measurement type only has to describe its error function and the analytic
//! Jacobians of that error with respect to each connected variable. Binding it to keys
//! and a noise model, whitening and linearization are handled once by
//! [`NoiseModelFactor`](crate::core::noise_model_factor::NoiseModelFactor).
//!
//! # Module Structure
//!
//! - `prior_factor`: unary prior on any Lie group variable
//! - `between_factor`: relative measurement between two Lie group variables
//!
//! # Writing a Factor
//!
//! ```
//! use nalgebra::{DMatrix, DVector};
//! use nonlinear_factor::factors::Factor;
//! use nonlinear_factor::manifold::vector::Point2;
//!
//! /// Range-free 2D landmark offset: e = (l - x) - z
//! #[derive(Debug, Clone)]
//! struct Offset {
//!     z: Point2,
//! }
//!
//! impl Factor for Offset {
//!     type Variables = (Point2, Point2);
//!
//!     fn evaluate_error(
//!         &self,
//!         (x, l): &Self::Variables,
//!         jacobians: Option<&mut [DMatrix<f64>]>,
//!     ) -> DVector<f64> {
//!         if let Some(jacobians) = jacobians {
//!             jacobians[0] = -DMatrix::identity(2, 2);
//!             jacobians[1] = DMatrix::identity(2, 2);
//!         }
//!         DVector::from_column_slice((l - x - self.z).as_slice())
//!     }
//!
//!     fn get_dimension(&self) -> usize {
//!         2
//!     }
//!
//!     fn equals(&self, other: &Self, tol: f64) -> bool {
//!         (self.z - other.z).amax() <= tol
//!     }
//! }
//! ```

use std::fmt;

use nalgebra::{DMatrix, DVector};

use crate::core::noise_model_factor::VariableSet;

pub mod between_factor;
pub mod prior_factor;

pub use between_factor::BetweenFactor;
pub use prior_factor::PriorFactor;

/// Error function of a measurement over a fixed set of typed variables.
///
/// Implementors are plain values (the measurement and any calibration); they never hold
/// keys or noise models.
pub trait Factor: Clone + fmt::Debug + Send + Sync + 'static {
    /// Variable types in scope order, e.g. `(SE2, Point2)` or `[DVector<f64>; 4]`.
    type Variables: VariableSet;

    /// Evaluate the unwhitened error `h(x) - z` at `variables`.
    ///
    /// When `jacobians` is `Some`, it holds one slot per variable and each slot must be
    /// filled with `∂e/∂x_i` of shape `get_dimension() × dim(x_i)`, taken with respect to
    /// a right perturbation `x_i ⊞ δ`.
    fn evaluate_error(
        &self,
        variables: &Self::Variables,
        jacobians: Option<&mut [DMatrix<f64>]>,
    ) -> DVector<f64>;

    /// Error dimension.
    fn get_dimension(&self) -> usize;

    /// Expected tangent dimension of each variable, in scope order.
    ///
    /// Needed when a variable type has no fixed size (`DVector<f64>`): values of the
    /// wrong length are then rejected before `evaluate_error` runs. `None` skips the check.
    fn variable_dims(&self) -> Option<Vec<usize>> {
        None
    }

    /// Measurement parameters equal within `tol`.
    fn equals(&self, other: &Self, tol: f64) -> bool;
}
