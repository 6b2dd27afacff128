//! Collection of Jacobian factors produced by one linearization.
//!
//! Stacking all factors gives the whitened system `A·dx = b` that an external sparse
//! solver consumes. Column blocks follow a caller-supplied variable ordering; row blocks
//! follow factor order.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Index;

use faer::sparse::{SparseColMat, Triplet};
use faer::Mat;
use tracing::debug;

use crate::core::key::Key;
use crate::error::{FactorError, FactorResult};
use crate::linear::jacobian_factor::JacobianFactor;
use crate::linear::vector_values::VectorValues;

#[derive(Debug, Clone, Default)]
pub struct LinearFactorGraph {
    factors: Vec<JacobianFactor>,
}

impl LinearFactorGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, factor: JacobianFactor) {
        self.factors.push(factor);
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&JacobianFactor> {
        self.factors.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &JacobianFactor> + '_ {
        self.factors.iter()
    }

    /// Total number of rows.
    pub fn dim(&self) -> usize {
        self.factors.iter().map(JacobianFactor::rows).sum()
    }

    /// Every key referenced by any factor, ascending.
    pub fn keys(&self) -> BTreeSet<Key> {
        self.factors
            .iter()
            .flat_map(|factor| factor.keys().iter().copied())
            .collect()
    }

    /// Sum of `0.5 * ||whiten(A_i dx - b_i)||²` over all factors.
    pub fn error(&self, dx: &VectorValues) -> FactorResult<f64> {
        self.factors
            .iter()
            .map(|factor| factor.error(dx))
            .sum()
    }

    /// Column count of every key.
    ///
    /// # Errors
    /// `DimensionMismatch` if two factors disagree on the width of a key's block.
    pub fn key_dims(&self) -> FactorResult<BTreeMap<Key, usize>> {
        let mut dims = BTreeMap::new();
        for factor in &self.factors {
            for (key, block) in factor.terms() {
                let width = *dims.entry(key).or_insert(block.ncols());
                if width != block.ncols() {
                    return Err(FactorError::dimension("key block columns", width, block.ncols()));
                }
            }
        }
        Ok(dims)
    }

    /// First column of each key under `ordering`, and the total column count.
    ///
    /// `ordering` must list every key of the graph exactly once; keys the graph does not
    /// reference are rejected with `KeyNotFound`.
    pub fn column_offsets(&self, ordering: &[Key]) -> FactorResult<(BTreeMap<Key, usize>, usize)> {
        let dims = self.key_dims()?;
        let mut offsets = BTreeMap::new();
        let mut next = 0;
        for key in ordering {
            let dim = dims.get(key).ok_or(FactorError::KeyNotFound(*key))?;
            if offsets.insert(*key, next).is_some() {
                return Err(FactorError::DuplicateKey(*key));
            }
            next += dim;
        }
        if let Some(missing) = dims.keys().find(|key| !offsets.contains_key(*key)) {
            return Err(FactorError::KeyNotFound(*missing));
        }
        Ok((offsets, next))
    }

    /// Stacked whitened Jacobian `A` (sparse, column blocks in `ordering`) and `b`.
    ///
    /// Rows of hard constraints are included at weight 1; check each factor's noise model
    /// to tell them apart.
    pub fn sparse_jacobian(
        &self,
        ordering: &[Key],
    ) -> FactorResult<(SparseColMat<usize, f64>, Mat<f64>)> {
        let (offsets, cols) = self.column_offsets(ordering)?;
        let rows = self.dim();

        let mut triplets = Vec::new();
        let mut b = Mat::<f64>::zeros(rows, 1);
        let mut row_start = 0;
        for factor in &self.factors {
            for (key, block) in factor.terms() {
                let col_start = offsets[&key];
                for c in 0..block.ncols() {
                    for r in 0..block.nrows() {
                        let value = block[(r, c)];
                        if value != 0.0 {
                            triplets.push(Triplet::new(row_start + r, col_start + c, value));
                        }
                    }
                }
            }
            for (r, value) in factor.get_b().iter().enumerate() {
                b[(row_start + r, 0)] = *value;
            }
            row_start += factor.rows();
        }

        debug!(rows, cols, nnz = triplets.len(), "assembled sparse jacobian");

        let jacobian = SparseColMat::try_new_from_triplets(rows, cols, &triplets).map_err(|e| {
            FactorError::LinearAlgebra(format!("Failed to build sparse jacobian: {e:?}"))
        })?;
        Ok((jacobian, b))
    }
}

impl Index<usize> for LinearFactorGraph {
    type Output = JacobianFactor;

    fn index(&self, index: usize) -> &JacobianFactor {
        &self.factors[index]
    }
}

impl FromIterator<JacobianFactor> for LinearFactorGraph {
    fn from_iter<I: IntoIterator<Item = JacobianFactor>>(iter: I) -> Self {
        LinearFactorGraph {
            factors: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a LinearFactorGraph {
    type Item = &'a JacobianFactor;
    type IntoIter = std::slice::Iter<'a, JacobianFactor>;

    fn into_iter(self) -> Self::IntoIter {
        self.factors.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::noise_model::NoiseModel;
    use nalgebra::{DMatrix, DVector};

    fn graph() -> LinearFactorGraph {
        let prior = JacobianFactor::new(
            vec![(Key::new(1), DMatrix::identity(2, 2) * 10.0)],
            DVector::from_vec(vec![-1.0, -1.0]),
            NoiseModel::unit(2),
        )
        .unwrap();
        let odometry = JacobianFactor::new(
            vec![
                (Key::new(1), DMatrix::identity(2, 2) * -10.0),
                (Key::new(2), DMatrix::identity(2, 2) * 10.0),
            ],
            DVector::from_vec(vec![2.0, -1.0]),
            NoiseModel::unit(2),
        )
        .unwrap();
        [prior, odometry].into_iter().collect()
    }

    fn densify(sparse: &SparseColMat<usize, f64>) -> DMatrix<f64> {
        let mut dense = DMatrix::zeros(sparse.nrows(), sparse.ncols());
        let symbolic = sparse.symbolic();
        for col in 0..sparse.ncols() {
            let rows = symbolic.row_idx_of_col_raw(col);
            let values = sparse.val_of_col(col);
            for (idx, &row) in rows.iter().enumerate() {
                dense[(row, col)] += values[idx];
            }
        }
        dense
    }

    #[test]
    fn test_linear_graph_error_and_dims() {
        let graph = graph();
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.dim(), 4);
        assert_eq!(graph.keys().into_iter().collect::<Vec<_>>(), vec![Key::new(1), Key::new(2)]);

        let zero: VectorValues = [
            (Key::new(1), DVector::zeros(2)),
            (Key::new(2), DVector::zeros(2)),
        ]
        .into_iter()
        .collect();
        // 0.5 * (2 + 5)
        assert!((graph.error(&zero).unwrap() - 3.5).abs() < 1e-12);
    }

    #[test]
    fn test_column_offsets() {
        let graph = graph();
        let (offsets, cols) = graph.column_offsets(&[Key::new(2), Key::new(1)]).unwrap();
        assert_eq!(cols, 4);
        assert_eq!(offsets[&Key::new(2)], 0);
        assert_eq!(offsets[&Key::new(1)], 2);

        assert_eq!(
            graph.column_offsets(&[Key::new(1)]).unwrap_err(),
            FactorError::KeyNotFound(Key::new(2))
        );
        assert_eq!(
            graph
                .column_offsets(&[Key::new(1), Key::new(2), Key::new(3)])
                .unwrap_err(),
            FactorError::KeyNotFound(Key::new(3))
        );
    }

    #[test]
    fn test_sparse_jacobian_matches_dense_blocks() {
        let graph = graph();
        let (jacobian, b) = graph.sparse_jacobian(&[Key::new(1), Key::new(2)]).unwrap();

        assert_eq!(jacobian.nrows(), 4);
        assert_eq!(jacobian.ncols(), 4);
        let expected = DMatrix::from_row_slice(
            4,
            4,
            &[
                10.0, 0.0, 0.0, 0.0, //
                0.0, 10.0, 0.0, 0.0, //
                -10.0, 0.0, 10.0, 0.0, //
                0.0, -10.0, 0.0, 10.0,
            ],
        );
        assert_eq!(densify(&jacobian), expected);

        let expected_b = [-1.0, -1.0, 2.0, -1.0];
        for (i, value) in expected_b.iter().enumerate() {
            assert_eq!(b[(i, 0)], *value);
        }
    }

    #[test]
    fn test_inconsistent_block_width() {
        let mut graph = graph();
        graph.push(
            JacobianFactor::new(
                vec![(Key::new(2), DMatrix::zeros(1, 3))],
                DVector::zeros(1),
                NoiseModel::unit(1),
            )
            .unwrap(),
        );
        assert!(matches!(
            graph.sparse_jacobian(&[Key::new(1), Key::new(2)]),
            Err(FactorError::DimensionMismatch { expected: 2, actual: 3, .. })
        ));
    }
}
