//! The abstract nonlinear factor contract.
//!
//! A nonlinear factor constrains an ordered, fixed list of variables (its scope). Given a
//! [`Values`] assignment it reports a scalar cost and can be linearized into a
//! [`JacobianFactor`] around that assignment.
//!
//! Factors are immutable and shared as [`SharedFactor`] (`Arc<dyn NonlinearFactor>`), so a
//! graph can be evaluated from several threads at once. `rekey` and `clone_factor` never
//! modify the receiver.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use nalgebra::DVector;

use crate::core::key::Key;
use crate::core::values::Values;
use crate::error::FactorResult;
use crate::linear::jacobian_factor::JacobianFactor;

/// Shared, immutable factor handle.
pub type SharedFactor = Arc<dyn NonlinearFactor>;

pub trait NonlinearFactor: fmt::Debug + Send + Sync {
    /// Scope of the factor, in order.
    fn keys(&self) -> &[Key];

    /// Number of variables in scope.
    fn size(&self) -> usize {
        self.keys().len()
    }

    /// Dimension of the error vector.
    fn dim(&self) -> usize;

    /// Raw measurement error `h(x) - z` before noise weighting.
    fn unwhitened_error(&self, values: &Values) -> FactorResult<DVector<f64>>;

    /// Cost `0.5 * ||whiten(unwhitened_error)||²`.
    fn error(&self, values: &Values) -> FactorResult<f64>;

    /// Whitened Gauss-Newton linearization around `values`.
    fn linearize(&self, values: &Values) -> FactorResult<JacobianFactor>;

    /// Same concrete type, same scope in the same order, parameters and noise model
    /// within `tol`.
    fn equals(&self, other: &dyn NonlinearFactor, tol: f64) -> bool;

    /// Independent copy with its own key storage.
    fn clone_factor(&self) -> SharedFactor;

    /// Copy with keys replaced positionally by `new_keys`.
    ///
    /// # Errors
    /// `ArityMismatch` when `new_keys.len() != self.size()`.
    fn rekey(&self, new_keys: &[Key]) -> FactorResult<SharedFactor>;

    fn as_any(&self) -> &dyn Any;
}
