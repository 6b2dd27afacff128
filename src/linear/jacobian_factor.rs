//! Linear factor in Jacobian form: `Σ_i A_i dx_i = b` under a noise model.
//!
//! This is the output of linearizing a nonlinear factor. Blocks are already whitened by
//! the factor's noise model, and the attached model is either unit or a constrained model
//! whose zero sigmas mark rows that must hold exactly.

use nalgebra::{DMatrix, DVector};

use crate::core::key::Key;
use crate::core::noise_model::SharedNoiseModel;
use crate::error::{FactorError, FactorResult};
use crate::linear::vector_values::VectorValues;

#[derive(Debug, Clone)]
pub struct JacobianFactor {
    keys: Vec<Key>,
    blocks: Vec<DMatrix<f64>>,
    b: DVector<f64>,
    model: SharedNoiseModel,
}

impl JacobianFactor {
    /// Create a Jacobian factor from `(key, A_i)` terms, right-hand side `b` and `model`.
    ///
    /// # Errors
    /// `DimensionMismatch` if any block or the model disagrees with `b.len()`,
    /// `DuplicateKey` if a key appears twice, `ArityMismatch` if `terms` is empty.
    pub fn new(
        terms: Vec<(Key, DMatrix<f64>)>,
        b: DVector<f64>,
        model: SharedNoiseModel,
    ) -> FactorResult<Self> {
        if terms.is_empty() {
            return Err(FactorError::ArityMismatch {
                expected: 1,
                actual: 0,
            });
        }
        if model.dim() != b.len() {
            return Err(FactorError::dimension(
                "jacobian factor noise model",
                b.len(),
                model.dim(),
            ));
        }

        let mut keys = Vec::with_capacity(terms.len());
        let mut blocks = Vec::with_capacity(terms.len());
        for (key, block) in terms {
            if block.nrows() != b.len() {
                return Err(FactorError::dimension(
                    "jacobian factor block rows",
                    b.len(),
                    block.nrows(),
                ));
            }
            if keys.contains(&key) {
                return Err(FactorError::DuplicateKey(key));
            }
            keys.push(key);
            blocks.push(block);
        }

        Ok(JacobianFactor {
            keys,
            blocks,
            b,
            model,
        })
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// Block for `key`, if the key is in this factor's scope.
    pub fn get_a(&self, key: Key) -> Option<&DMatrix<f64>> {
        self.keys
            .iter()
            .position(|k| *k == key)
            .map(|idx| &self.blocks[idx])
    }

    /// Block at scope position `index`.
    pub fn get_a_at(&self, index: usize) -> Option<&DMatrix<f64>> {
        self.blocks.get(index)
    }

    /// `(key, block)` pairs in scope order.
    pub fn terms(&self) -> impl Iterator<Item = (Key, &DMatrix<f64>)> + '_ {
        self.keys.iter().copied().zip(self.blocks.iter())
    }

    pub fn get_b(&self) -> &DVector<f64> {
        &self.b
    }

    pub fn noise_model(&self) -> &SharedNoiseModel {
        &self.model
    }

    /// Number of rows (residual dimension).
    pub fn rows(&self) -> usize {
        self.b.len()
    }

    /// Number of variables in scope.
    pub fn size(&self) -> usize {
        self.keys.len()
    }

    /// `Σ A_i dx_i - b`.
    ///
    /// # Errors
    /// `KeyNotFound` if `dx` lacks a scoped key, `DimensionMismatch` on a wrong length.
    pub fn unweighted_error(&self, dx: &VectorValues) -> FactorResult<DVector<f64>> {
        let mut residual = -&self.b;
        for (key, block) in self.terms() {
            let step = dx.get(key).ok_or(FactorError::KeyNotFound(key))?;
            if step.len() != block.ncols() {
                return Err(FactorError::dimension(
                    "jacobian factor error",
                    block.ncols(),
                    step.len(),
                ));
            }
            residual += block * step;
        }
        Ok(residual)
    }

    /// Residual whitened by the attached noise model.
    pub fn error_vector(&self, dx: &VectorValues) -> FactorResult<DVector<f64>> {
        self.model.whiten(&self.unweighted_error(dx)?)
    }

    /// `0.5 * ||whiten(Σ A_i dx_i - b)||²`.
    pub fn error(&self, dx: &VectorValues) -> FactorResult<f64> {
        Ok(0.5 * self.model.distance(&self.unweighted_error(dx)?)?)
    }

    /// Dense `[A | b]` with column blocks arranged in `ordering`.
    ///
    /// Every key of `ordering` must be in scope and appear once; scoped keys missing from
    /// `ordering` are rejected with `KeyNotFound`, repeated keys with `DuplicateKey`.
    pub fn augmented_matrix(&self, ordering: &[Key]) -> FactorResult<DMatrix<f64>> {
        for (i, key) in ordering.iter().enumerate() {
            if ordering[..i].contains(key) {
                return Err(FactorError::DuplicateKey(*key));
            }
        }
        for key in &self.keys {
            if !ordering.contains(key) {
                return Err(FactorError::KeyNotFound(*key));
            }
        }
        let blocks = ordering
            .iter()
            .map(|key| self.get_a(*key).ok_or(FactorError::KeyNotFound(*key)))
            .collect::<FactorResult<Vec<_>>>()?;

        let cols: usize = blocks.iter().map(|block| block.ncols()).sum();
        let mut augmented = DMatrix::zeros(self.rows(), cols + 1);
        let mut offset = 0;
        for block in blocks {
            augmented
                .view_mut((0, offset), (self.rows(), block.ncols()))
                .copy_from(block);
            offset += block.ncols();
        }
        augmented.column_mut(cols).copy_from(&self.b);
        Ok(augmented)
    }

    /// Same scope (order-sensitive), blocks and `b` within `tol`, equal noise models.
    pub fn equals(&self, other: &JacobianFactor, tol: f64) -> bool {
        let close = |a: &DMatrix<f64>, b: &DMatrix<f64>| {
            a.shape() == b.shape() && (a.is_empty() || (a - b).amax() <= tol)
        };
        self.keys == other.keys
            && self.b.len() == other.b.len()
            && (self.b.is_empty() || (&self.b - &other.b).amax() <= tol)
            && self
                .blocks
                .iter()
                .zip(other.blocks.iter())
                .all(|(a, b)| close(a, b))
            && self.model.equals(&other.model, tol)
    }
}
