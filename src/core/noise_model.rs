//! Gaussian noise models for whitening residuals and Jacobians.
//!
//! A noise model describes the uncertainty of a measurement. Whitening maps a residual
//! `e` into a space where the noise is unit-variance, so the cost of a factor is simply
//! `0.5 * ||whiten(e)||²`.
//!
//! # Available Models
//!
//! - [`NoiseModel::unit`]: every sigma is 1, whitening is the identity
//! - [`NoiseModel::isotropic`]: one sigma shared by all dimensions
//! - [`NoiseModel::diagonal`]: one strictly positive sigma per dimension
//! - [`NoiseModel::constrained`]: per-dimension sigmas where zero marks a hard equality
//! - [`NoiseModel::from_covariance`] and friends: full covariance, stored as the
//!   square-root information `R`
//!
//! # Hard Constraints
//!
//! Rows of a constrained model whose sigma is exactly zero are passed
//! through whitening unscaled. [`NoiseModel::whiten_system`] then returns a constrained
//! model with sigma 0 on those rows and 1 elsewhere, so the downstream solver still sees
//! them as exact equalities.
//!
//! # Example
//!
//! ```
//! use nalgebra::DVector;
//! use nonlinear_factor::core::noise_model::NoiseModel;
//!
//! let model = NoiseModel::diagonal(&[0.5, 2.0]).unwrap();
//! let whitened = model.whiten(&DVector::from_vec(vec![1.0, 1.0])).unwrap();
//! assert_eq!(whitened, DVector::from_vec(vec![2.0, 0.5]));
//!
//! // A zero sigma switches to a constrained model
//! let constrained = NoiseModel::diagonal(&[0.5, 0.0]).unwrap();
//! assert!(constrained.is_constrained());
//! ```

use std::fmt;
use std::sync::Arc;

use nalgebra::{Cholesky, DMatrix, DVector};

use crate::error::{FactorError, FactorResult};

/// Noise model shared between factors and the linear factors they produce.
pub type SharedNoiseModel = Arc<NoiseModel>;

/// Gaussian noise model.
///
/// Only the validating constructors create models, so every sigma is finite and
/// non-negative and a zero sigma always lives in a constrained model.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseModel {
    kind: Kind,
}

#[derive(Debug, Clone, PartialEq)]
enum Kind {
    Unit {
        dim: usize,
    },
    Isotropic {
        dim: usize,
        sigma: f64,
    },
    Diagonal {
        sigmas: DVector<f64>,
    },
    Constrained {
        sigmas: DVector<f64>,
    },
    /// Full covariance Σ represented by `R` with `RᵀR = Σ⁻¹`.
    Gaussian {
        sqrt_information: DMatrix<f64>,
    },
}

fn validate_sigmas(sigmas: &[f64]) -> FactorResult<()> {
    if sigmas.is_empty() {
        return Err(FactorError::InvalidNoiseModel(
            "sigmas must not be empty".to_string(),
        ));
    }
    if let Some(bad) = sigmas.iter().find(|s| !s.is_finite() || **s < 0.0) {
        return Err(FactorError::InvalidNoiseModel(format!(
            "sigma must be finite and non-negative, got {bad}"
        )));
    }
    Ok(())
}

fn validate_square(matrix: &DMatrix<f64>, what: &str) -> FactorResult<()> {
    if matrix.nrows() == 0 || !matrix.is_square() {
        return Err(FactorError::InvalidNoiseModel(format!(
            "{what} must be a non-empty square matrix, got {}x{}",
            matrix.nrows(),
            matrix.ncols()
        )));
    }
    if matrix.iter().any(|v| !v.is_finite()) {
        return Err(FactorError::InvalidNoiseModel(format!(
            "{what} contains non-finite entries"
        )));
    }
    Ok(())
}

fn is_diagonal(matrix: &DMatrix<f64>) -> bool {
    matrix
        .iter()
        .enumerate()
        .all(|(idx, v)| idx % matrix.nrows() == idx / matrix.nrows() || *v == 0.0)
}

impl NoiseModel {
    fn shared(kind: Kind) -> SharedNoiseModel {
        Arc::new(NoiseModel { kind })
    }

    /// Unit noise model of dimension `dim`.
    pub fn unit(dim: usize) -> SharedNoiseModel {
        NoiseModel::shared(Kind::Unit { dim })
    }

    /// Isotropic model with the same strictly positive `sigma` on every dimension.
    pub fn isotropic(dim: usize, sigma: f64) -> FactorResult<SharedNoiseModel> {
        if dim == 0 {
            return Err(FactorError::InvalidNoiseModel(
                "dimension must be positive".to_string(),
            ));
        }
        if !sigma.is_finite() || sigma <= 0.0 {
            return Err(FactorError::InvalidNoiseModel(format!(
                "isotropic sigma must be finite and positive, got {sigma}"
            )));
        }
        Ok(NoiseModel::shared(Kind::Isotropic { dim, sigma }))
    }

    /// Diagonal model from per-dimension sigmas.
    ///
    /// Any sigma equal to zero yields a constrained model instead.
    pub fn diagonal(sigmas: &[f64]) -> FactorResult<SharedNoiseModel> {
        validate_sigmas(sigmas)?;
        let sigmas = DVector::from_column_slice(sigmas);
        if sigmas.iter().any(|s| *s == 0.0) {
            Ok(NoiseModel::shared(Kind::Constrained { sigmas }))
        } else {
            Ok(NoiseModel::shared(Kind::Diagonal { sigmas }))
        }
    }

    /// Constrained model with mixed sigmas; zero entries are hard constraints.
    pub fn constrained(sigmas: &[f64]) -> FactorResult<SharedNoiseModel> {
        validate_sigmas(sigmas)?;
        Ok(NoiseModel::shared(Kind::Constrained {
            sigmas: DVector::from_column_slice(sigmas),
        }))
    }

    /// Model from a full covariance matrix Σ.
    ///
    /// A diagonal Σ produces a diagonal model.
    pub fn from_covariance(covariance: &DMatrix<f64>) -> FactorResult<SharedNoiseModel> {
        validate_square(covariance, "covariance")?;
        if is_diagonal(covariance) {
            let sigmas: Vec<f64> = covariance.diagonal().iter().map(|v| v.sqrt()).collect();
            if sigmas.iter().any(|s| !s.is_finite() || *s <= 0.0) {
                return Err(FactorError::InvalidNoiseModel(
                    "covariance is not positive definite".to_string(),
                ));
            }
            return NoiseModel::diagonal(&sigmas);
        }
        let information = Cholesky::new(covariance.clone())
            .ok_or_else(|| {
                FactorError::InvalidNoiseModel("covariance is not positive definite".to_string())
            })?
            .inverse();
        NoiseModel::from_information(&information)
    }

    /// Model from an information matrix Λ = Σ⁻¹; `R` is the transposed Cholesky factor.
    pub fn from_information(information: &DMatrix<f64>) -> FactorResult<SharedNoiseModel> {
        validate_square(information, "information")?;
        let cholesky = Cholesky::new(information.clone()).ok_or_else(|| {
            FactorError::InvalidNoiseModel("information is not positive definite".to_string())
        })?;
        Ok(NoiseModel::shared(Kind::Gaussian {
            sqrt_information: cholesky.l().transpose(),
        }))
    }

    /// Model from a square-root information matrix `R`.
    pub fn from_sqrt_information(r: &DMatrix<f64>) -> FactorResult<SharedNoiseModel> {
        validate_square(r, "square-root information")?;
        if r.determinant() == 0.0 {
            return Err(FactorError::InvalidNoiseModel(
                "square-root information is singular".to_string(),
            ));
        }
        Ok(NoiseModel::shared(Kind::Gaussian {
            sqrt_information: r.clone(),
        }))
    }

    /// Dimension of the residual this model applies to.
    pub fn dim(&self) -> usize {
        match &self.kind {
            Kind::Unit { dim } | Kind::Isotropic { dim, .. } => *dim,
            Kind::Diagonal { sigmas } | Kind::Constrained { sigmas } => sigmas.len(),
            Kind::Gaussian { sqrt_information } => sqrt_information.nrows(),
        }
    }

    /// Per-dimension standard deviations; for `Gaussian` this is `sqrt(diag(Σ))`.
    pub fn sigmas(&self) -> DVector<f64> {
        match &self.kind {
            Kind::Unit { dim } => DVector::from_element(*dim, 1.0),
            Kind::Isotropic { dim, sigma } => DVector::from_element(*dim, *sigma),
            Kind::Diagonal { sigmas } | Kind::Constrained { sigmas } => sigmas.clone(),
            Kind::Gaussian { sqrt_information } => {
                let n = sqrt_information.nrows();
                match sqrt_information.clone().try_inverse() {
                    // Σ = R⁻¹R⁻ᵀ, so Σ_ii is the squared norm of row i of R⁻¹
                    Some(r_inv) => DVector::from_iterator(
                        n,
                        r_inv.row_iter().map(|row| row.norm()),
                    ),
                    None => DVector::from_element(n, f64::INFINITY),
                }
            }
        }
    }

    /// Whether whitening is the identity.
    pub fn is_unit(&self) -> bool {
        matches!(self.kind, Kind::Unit { .. })
    }

    /// Whether any dimension is a hard constraint.
    pub fn is_constrained(&self) -> bool {
        match &self.kind {
            Kind::Constrained { sigmas } => sigmas.iter().any(|s| *s == 0.0),
            _ => false,
        }
    }

    fn check_dim(&self, context: &'static str, actual: usize) -> FactorResult<()> {
        if actual != self.dim() {
            return Err(FactorError::dimension(context, self.dim(), actual));
        }
        Ok(())
    }

    /// Row weight applied by whitening; hard rows keep weight 1.
    fn row_weight(&self, row: usize) -> f64 {
        match &self.kind {
            Kind::Unit { .. } | Kind::Gaussian { .. } => 1.0,
            Kind::Isotropic { sigma, .. } => 1.0 / sigma,
            Kind::Diagonal { sigmas } => 1.0 / sigmas[row],
            Kind::Constrained { sigmas } => {
                if sigmas[row] == 0.0 {
                    1.0
                } else {
                    1.0 / sigmas[row]
                }
            }
        }
    }

    /// Whiten a residual: `Σ^{-1/2} e`.
    pub fn whiten(&self, residual: &DVector<f64>) -> FactorResult<DVector<f64>> {
        self.check_dim("whiten", residual.len())?;
        match &self.kind {
            Kind::Unit { .. } => Ok(residual.clone()),
            Kind::Gaussian { sqrt_information } => Ok(sqrt_information * residual),
            _ => Ok(DVector::from_iterator(
                residual.len(),
                residual
                    .iter()
                    .enumerate()
                    .map(|(i, v)| v * self.row_weight(i)),
            )),
        }
    }

    /// Inverse of [`NoiseModel::whiten`].
    pub fn unwhiten(&self, whitened: &DVector<f64>) -> FactorResult<DVector<f64>> {
        self.check_dim("unwhiten", whitened.len())?;
        match &self.kind {
            Kind::Unit { .. } => Ok(whitened.clone()),
            Kind::Gaussian { sqrt_information } => sqrt_information
                .clone()
                .lu()
                .solve(whitened)
                .ok_or_else(|| {
                    FactorError::LinearAlgebra(
                        "square-root information is not invertible".to_string(),
                    )
                }),
            _ => Ok(DVector::from_iterator(
                whitened.len(),
                whitened
                    .iter()
                    .enumerate()
                    .map(|(i, v)| v / self.row_weight(i)),
            )),
        }
    }

    /// Squared Mahalanobis distance `||whiten(e)||²`.
    pub fn distance(&self, residual: &DVector<f64>) -> FactorResult<f64> {
        Ok(self.whiten(residual)?.norm_squared())
    }

    /// Whiten a linear system `Σ A_i dx_i = b` in place.
    ///
    /// Every block and `rhs` receive the same row scaling. Returns the model to attach to
    /// the resulting linear factor: unit for soft models, and for constrained models a
    /// constrained model with sigma 0 on hard rows and 1 on the others.
    pub fn whiten_system(
        &self,
        blocks: &mut [DMatrix<f64>],
        rhs: &mut DVector<f64>,
    ) -> FactorResult<SharedNoiseModel> {
        self.check_dim("whiten_system rhs", rhs.len())?;
        for block in blocks.iter() {
            self.check_dim("whiten_system block", block.nrows())?;
        }

        match &self.kind {
            Kind::Unit { .. } => {}
            Kind::Gaussian { sqrt_information } => {
                for block in blocks.iter_mut() {
                    *block = sqrt_information * &*block;
                }
                *rhs = sqrt_information * &*rhs;
            }
            _ => {
                for row in 0..self.dim() {
                    let weight = self.row_weight(row);
                    for block in blocks.iter_mut() {
                        block.row_mut(row).scale_mut(weight);
                    }
                    rhs[row] *= weight;
                }
            }
        }

        match &self.kind {
            Kind::Constrained { sigmas } => Ok(NoiseModel::shared(Kind::Constrained {
                sigmas: sigmas.map(|s| if s == 0.0 { 0.0 } else { 1.0 }),
            })),
            _ => Ok(NoiseModel::unit(self.dim())),
        }
    }

    /// Same variant and dimension with parameters within `tol`.
    pub fn equals(&self, other: &NoiseModel, tol: f64) -> bool {
        let close = |a: &DVector<f64>, b: &DVector<f64>| a.len() == b.len() && (a - b).amax() <= tol;
        match (&self.kind, &other.kind) {
            (Kind::Unit { dim: a }, Kind::Unit { dim: b }) => a == b,
            (
                Kind::Isotropic { dim: d1, sigma: s1 },
                Kind::Isotropic { dim: d2, sigma: s2 },
            ) => d1 == d2 && (s1 - s2).abs() <= tol,
            (Kind::Diagonal { sigmas: a }, Kind::Diagonal { sigmas: b })
            | (Kind::Constrained { sigmas: a }, Kind::Constrained { sigmas: b }) => {
                close(a, b)
            }
            (
                Kind::Gaussian { sqrt_information: a },
                Kind::Gaussian { sqrt_information: b },
            ) => a.shape() == b.shape() && (a - b).amax() <= tol,
            _ => false,
        }
    }
}

impl fmt::Display for NoiseModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            Kind::Unit { dim } => write!(f, "Unit(dim: {dim})"),
            Kind::Isotropic { dim, sigma } => {
                write!(f, "Isotropic(dim: {dim}, sigma: {sigma})")
            }
            Kind::Diagonal { sigmas } => write!(f, "Diagonal(sigmas: {:?})", sigmas.as_slice()),
            Kind::Constrained { sigmas } => {
                write!(f, "Constrained(sigmas: {:?})", sigmas.as_slice())
            }
            Kind::Gaussian { sqrt_information } => {
                write!(f, "Gaussian(dim: {})", sqrt_information.nrows())
            }
        }
    }
}
