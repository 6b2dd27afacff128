//! Noise-weighted factors of any arity.
//!
//! [`NoiseModelFactor`] turns an author-written [`Factor`] (error function plus analytic
//! Jacobians) into a [`NonlinearFactor`]: it owns the scope keys and the noise model,
//! fetches typed values from a [`Values`] assignment, whitens the error and performs the
//! Gauss-Newton linearization.
//!
//! # Arity
//!
//! The variables a factor touches are described by its [`VariableSet`], implemented for
//! tuples of one to six [`Manifold`] types and for homogeneous arrays `[T; N]`:
//!
//! ```text
//! PriorFactor<SE2>        Variables = (SE2,)
//! BetweenFactor<Point2>   Variables = (Point2, Point2)
//! SumFactor               Variables = [DVector<f64>; 6]
//! ```
//!
//! # Linearization
//!
//! With `e = h(x) - z` and per-variable Jacobians `H_i`, the linear factor is the result of
//! whitening the system `Σ H_i dx_i = -e`:
//!
//! ```text
//! A_i = W·H_i,   b = -W·e
//! ```
//!
//! so that `||A·0 - b||² = 2·error(x)`. Hard rows of a constrained model keep weight 1 and
//! the resulting linear factor carries their zero sigmas.

use std::any::Any;
use std::sync::Arc;

use nalgebra::{DMatrix, DVector};
use tracing::trace;

use crate::core::key::Key;
use crate::core::noise_model::SharedNoiseModel;
use crate::core::nonlinear_factor::{NonlinearFactor, SharedFactor};
use crate::core::values::Values;
use crate::error::{FactorError, FactorResult};
use crate::factors::Factor;
use crate::linear::jacobian_factor::JacobianFactor;
use crate::manifold::Manifold;

/// Ordered set of typed variables fetched from [`Values`] for one factor evaluation.
pub trait VariableSet: Sized + Send + Sync + 'static {
    /// Number of variables, i.e. the number of keys a factor of this set takes.
    const ARITY: usize;

    /// Fetch (and clone) the values at `keys`, in order.
    ///
    /// # Errors
    /// `ArityMismatch`, `KeyNotFound` or `TypeMismatch`.
    fn fetch(values: &Values, keys: &[Key]) -> FactorResult<Self>;

    /// Tangent dimension of each variable, in order.
    fn dims(&self) -> Vec<usize>;
}

fn check_arity(expected: usize, actual: usize) -> FactorResult<()> {
    if expected != actual {
        return Err(FactorError::ArityMismatch { expected, actual });
    }
    Ok(())
}

macro_rules! impl_variable_set {
    ($arity:expr; $($name:ident : $idx:tt),+) => {
        impl<$($name: Manifold),+> VariableSet for ($($name,)+) {
            const ARITY: usize = $arity;

            fn fetch(values: &Values, keys: &[Key]) -> FactorResult<Self> {
                check_arity(Self::ARITY, keys.len())?;
                Ok(($(values.at::<$name>(keys[$idx])?.clone(),)+))
            }

            fn dims(&self) -> Vec<usize> {
                vec![$(Manifold::dim(&self.$idx)),+]
            }
        }
    };
}

impl_variable_set!(1; A: 0);
impl_variable_set!(2; A: 0, B: 1);
impl_variable_set!(3; A: 0, B: 1, C: 2);
impl_variable_set!(4; A: 0, B: 1, C: 2, D: 3);
impl_variable_set!(5; A: 0, B: 1, C: 2, D: 3, E: 4);
impl_variable_set!(6; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);

impl<T: Manifold, const N: usize> VariableSet for [T; N] {
    const ARITY: usize = N;

    fn fetch(values: &Values, keys: &[Key]) -> FactorResult<Self> {
        check_arity(N, keys.len())?;
        let fetched = keys
            .iter()
            .map(|key| values.at::<T>(*key).cloned())
            .collect::<FactorResult<Vec<T>>>()?;
        fetched
            .try_into()
            .map_err(|rest: Vec<T>| FactorError::ArityMismatch {
                expected: N,
                actual: rest.len(),
            })
    }

    fn dims(&self) -> Vec<usize> {
        self.iter().map(Manifold::dim).collect()
    }
}

fn validate_scope(arity: usize, keys: &[Key]) -> FactorResult<()> {
    check_arity(arity, keys.len())?;
    for (i, key) in keys.iter().enumerate() {
        if keys[..i].contains(key) {
            return Err(FactorError::DuplicateKey(*key));
        }
    }
    Ok(())
}

/// A [`Factor`] bound to a scope of keys and a Gaussian noise model.
///
/// # Example
///
/// ```
/// use nonlinear_factor::core::key::Key;
/// use nonlinear_factor::core::noise_model::NoiseModel;
/// use nonlinear_factor::core::noise_model_factor::NoiseModelFactor;
/// use nonlinear_factor::core::nonlinear_factor::NonlinearFactor;
/// use nonlinear_factor::core::values::Values;
/// use nonlinear_factor::factors::PriorFactor;
/// use nonlinear_factor::manifold::vector::Point2;
///
/// let x1 = Key::new(1);
/// let model = NoiseModel::isotropic(2, 0.1).unwrap();
/// let prior = NoiseModelFactor::new(vec![x1], model, PriorFactor::new(Point2::zeros())).unwrap();
///
/// let mut values = Values::new();
/// values.insert(x1, Point2::new(0.1, 0.1)).unwrap();
/// assert!((prior.error(&values).unwrap() - 1.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone)]
pub struct NoiseModelFactor<F: Factor> {
    keys: Vec<Key>,
    noise_model: SharedNoiseModel,
    factor: F,
}

impl<F: Factor> NoiseModelFactor<F> {
    /// Bind `factor` to `keys` under `noise_model`.
    ///
    /// # Errors
    /// - `ArityMismatch` if `keys.len()` differs from the factor's arity
    /// - `DuplicateKey` if a key repeats
    /// - `DimensionMismatch` if the noise model dimension differs from the error dimension
    pub fn new(keys: Vec<Key>, noise_model: SharedNoiseModel, factor: F) -> FactorResult<Self> {
        validate_scope(F::Variables::ARITY, &keys)?;
        if noise_model.dim() != factor.get_dimension() {
            return Err(FactorError::dimension(
                "noise model",
                factor.get_dimension(),
                noise_model.dim(),
            ));
        }
        Ok(NoiseModelFactor {
            keys,
            noise_model,
            factor,
        })
    }

    pub fn noise_model(&self) -> &SharedNoiseModel {
        &self.noise_model
    }

    /// The wrapped measurement function.
    pub fn factor(&self) -> &F {
        &self.factor
    }

    fn check_error_dim(&self, error: &DVector<f64>) -> FactorResult<()> {
        if error.len() != self.factor.get_dimension() {
            return Err(FactorError::dimension(
                "error vector",
                self.factor.get_dimension(),
                error.len(),
            ));
        }
        Ok(())
    }

    /// Fetch the scoped variables and check their tangent dimensions.
    fn fetch_variables(&self, values: &Values) -> FactorResult<F::Variables> {
        let variables = F::Variables::fetch(values, &self.keys)?;
        if let Some(expected) = self.factor.variable_dims() {
            for (expected, actual) in expected.into_iter().zip(variables.dims()) {
                if expected != actual {
                    return Err(FactorError::dimension("variable dimension", expected, actual));
                }
            }
        }
        Ok(variables)
    }

    /// Error whitened by the noise model.
    pub fn whitened_error(&self, values: &Values) -> FactorResult<DVector<f64>> {
        self.noise_model.whiten(&self.unwhitened_error(values)?)
    }
}

impl<F: Factor> NonlinearFactor for NoiseModelFactor<F> {
    fn keys(&self) -> &[Key] {
        &self.keys
    }

    fn dim(&self) -> usize {
        self.factor.get_dimension()
    }

    fn unwhitened_error(&self, values: &Values) -> FactorResult<DVector<f64>> {
        let variables = self.fetch_variables(values)?;
        let error = self.factor.evaluate_error(&variables, None);
        self.check_error_dim(&error)?;
        Ok(error)
    }

    fn error(&self, values: &Values) -> FactorResult<f64> {
        Ok(0.5 * self.noise_model.distance(&self.unwhitened_error(values)?)?)
    }

    fn linearize(&self, values: &Values) -> FactorResult<JacobianFactor> {
        let variables = self.fetch_variables(values)?;
        let dims = variables.dims();

        let mut jacobians = vec![DMatrix::zeros(0, 0); self.keys.len()];
        let error = self.factor.evaluate_error(&variables, Some(jacobians.as_mut_slice()));
        self.check_error_dim(&error)?;

        for (jacobian, dim) in jacobians.iter().zip(&dims) {
            if jacobian.nrows() != error.len() {
                return Err(FactorError::dimension(
                    "jacobian rows",
                    error.len(),
                    jacobian.nrows(),
                ));
            }
            if jacobian.ncols() != *dim {
                return Err(FactorError::dimension("jacobian cols", *dim, jacobian.ncols()));
            }
        }

        let mut b = -error;
        let model = self.noise_model.whiten_system(&mut jacobians, &mut b)?;
        trace!(
            keys = ?self.keys,
            rows = b.len(),
            constrained = model.is_constrained(),
            "linearized factor"
        );

        let terms = self.keys.iter().copied().zip(jacobians).collect();
        JacobianFactor::new(terms, b, model)
    }

    fn equals(&self, other: &dyn NonlinearFactor, tol: f64) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|other| {
                self.keys == other.keys
                    && self.noise_model.equals(&other.noise_model, tol)
                    && self.factor.equals(&other.factor, tol)
            })
    }

    fn clone_factor(&self) -> SharedFactor {
        Arc::new(self.clone())
    }

    fn rekey(&self, new_keys: &[Key]) -> FactorResult<SharedFactor> {
        validate_scope(self.keys.len(), new_keys)?;
        let mut rekeyed = self.clone();
        rekeyed.keys = new_keys.to_vec();
        Ok(Arc::new(rekeyed))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
