//! Tangent-space vectors indexed by key (the `dx` of a linear system).

use std::collections::BTreeMap;
use std::ops::{Add, Neg, Sub};

use nalgebra::DVector;

use crate::core::key::Key;
use crate::core::values::Values;

/// Ordered map from [`Key`] to a tangent-space vector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorValues {
    vectors: BTreeMap<Key, DVector<f64>>,
}

impl VectorValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero vectors with the tangent dimension of every variable in `values`.
    pub fn zero(values: &Values) -> Self {
        VectorValues {
            vectors: values
                .dims()
                .into_iter()
                .map(|(key, dim)| (key, DVector::zeros(dim)))
                .collect(),
        }
    }

    /// Insert or replace the vector at `key`.
    pub fn insert(&mut self, key: Key, vector: DVector<f64>) -> Option<DVector<f64>> {
        self.vectors.insert(key, vector)
    }

    pub fn get(&self, key: Key) -> Option<&DVector<f64>> {
        self.vectors.get(&key)
    }

    pub fn contains(&self, key: Key) -> bool {
        self.vectors.contains_key(&key)
    }

    pub fn keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.vectors.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Key, &DVector<f64>)> + '_ {
        self.vectors.iter().map(|(key, vector)| (*key, vector))
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Total number of scalar entries.
    pub fn dim(&self) -> usize {
        self.vectors.values().map(|v| v.len()).sum()
    }

    /// Concatenate all vectors in key order.
    pub fn to_vector(&self) -> DVector<f64> {
        let mut out = DVector::zeros(self.dim());
        let mut offset = 0;
        for vector in self.vectors.values() {
            out.rows_mut(offset, vector.len()).copy_from(vector);
            offset += vector.len();
        }
        out
    }

    pub fn dot(&self, other: &VectorValues) -> f64 {
        self.vectors
            .iter()
            .filter_map(|(key, v)| other.vectors.get(key).map(|w| v.dot(w)))
            .sum()
    }

    pub fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn scale(&self, alpha: f64) -> VectorValues {
        VectorValues {
            vectors: self
                .vectors
                .iter()
                .map(|(key, v)| (*key, v * alpha))
                .collect(),
        }
    }

    /// Same keys and entries within `tol`.
    pub fn equals(&self, other: &VectorValues, tol: f64) -> bool {
        self.vectors.len() == other.vectors.len()
            && self.vectors.iter().zip(other.vectors.iter()).all(|((k1, v1), (k2, v2))| {
                k1 == k2 && v1.len() == v2.len() && (v1 - v2).amax() <= tol
            })
    }

    fn combine(&self, other: &VectorValues, sign: f64) -> VectorValues {
        let mut vectors = self.vectors.clone();
        for (key, w) in &other.vectors {
            vectors
                .entry(*key)
                .and_modify(|v| *v += w * sign)
                .or_insert_with(|| w * sign);
        }
        VectorValues { vectors }
    }
}

impl FromIterator<(Key, DVector<f64>)> for VectorValues {
    fn from_iter<I: IntoIterator<Item = (Key, DVector<f64>)>>(iter: I) -> Self {
        VectorValues {
            vectors: iter.into_iter().collect(),
        }
    }
}

/// Key-wise sum; keys present in only one operand are copied.
impl Add for &VectorValues {
    type Output = VectorValues;

    fn add(self, rhs: &VectorValues) -> VectorValues {
        self.combine(rhs, 1.0)
    }
}

impl Sub for &VectorValues {
    type Output = VectorValues;

    fn sub(self, rhs: &VectorValues) -> VectorValues {
        self.combine(rhs, -1.0)
    }
}

impl Neg for &VectorValues {
    type Output = VectorValues;

    fn neg(self) -> VectorValues {
        self.scale(-1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifold::vector::Point2;
    use crate::manifold::SE2;

    #[test]
    fn test_vector_values_zero_from_values() {
        let mut values = Values::new();
        values.insert(Key::new(2), SE2::identity()).unwrap();
        values.insert(Key::new(1), Point2::zeros()).unwrap();

        let zero = VectorValues::zero(&values);
        assert_eq!(zero.len(), 2);
        assert_eq!(zero.dim(), 5);
        assert_eq!(zero.keys().collect::<Vec<_>>(), vec![Key::new(1), Key::new(2)]);
        assert_eq!(zero.norm(), 0.0);
    }

    #[test]
    fn test_vector_values_arithmetic() {
        let a: VectorValues = [
            (Key::new(1), DVector::from_vec(vec![1.0, 2.0])),
            (Key::new(2), DVector::from_vec(vec![3.0])),
        ]
        .into_iter()
        .collect();
        let b: VectorValues = [(Key::new(2), DVector::from_vec(vec![1.0]))]
            .into_iter()
            .collect();

        let sum = &a + &b;
        assert_eq!(sum.get(Key::new(2)), Some(&DVector::from_vec(vec![4.0])));

        let diff = &b - &a;
        assert_eq!(diff.get(Key::new(1)), Some(&DVector::from_vec(vec![-1.0, -2.0])));
        assert_eq!(diff.get(Key::new(2)), Some(&DVector::from_vec(vec![-2.0])));

        assert!((a.dot(&b) - 3.0).abs() < 1e-12);
        assert!((-&a).equals(&a.scale(-1.0), 1e-12));
        assert_eq!(a.to_vector(), DVector::from_vec(vec![1.0, 2.0, 3.0]));
    }
}
