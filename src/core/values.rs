//! Variable assignment: a typed map from [`Key`] to manifold values.
//!
//! Values are stored type-erased behind the [`Value`] trait, which is implemented for
//! every [`Manifold`] type. Factors fetch their variables with [`Values::at`], which
//! checks both presence and the concrete type.

use std::any::{type_name, Any};
use std::collections::BTreeMap;
use std::fmt;

use nalgebra::DVector;

use crate::core::key::Key;
use crate::error::{FactorError, FactorResult};
use crate::linear::vector_values::VectorValues;
use crate::manifold::Manifold;

/// Type-erased manifold value stored in [`Values`].
pub trait Value: Any + fmt::Debug + Send + Sync {
    /// Tangent-space dimension.
    fn dim(&self) -> usize;

    /// Name of the concrete type, used in `TypeMismatch` errors.
    fn type_name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;

    fn clone_value(&self) -> Box<dyn Value>;

    /// Retract by `delta`; callers check `delta.len() == self.dim()`.
    fn retract_value(&self, delta: &DVector<f64>) -> Box<dyn Value>;

    /// Equality within `tol`; values of different types are never equal.
    fn equals_value(&self, other: &dyn Value, tol: f64) -> bool;
}

impl<T: Manifold> Value for T {
    fn dim(&self) -> usize {
        Manifold::dim(self)
    }

    fn type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_value(&self) -> Box<dyn Value> {
        Box::new(self.clone())
    }

    fn retract_value(&self, delta: &DVector<f64>) -> Box<dyn Value> {
        Box::new(self.retract(delta))
    }

    fn equals_value(&self, other: &dyn Value, tol: f64) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self.equals(other, tol))
    }
}

/// Ordered assignment of values to keys.
#[derive(Debug, Default)]
pub struct Values {
    values: BTreeMap<Key, Box<dyn Value>>,
}

impl Clone for Values {
    fn clone(&self) -> Self {
        Values {
            values: self
                .values
                .iter()
                .map(|(key, value)| (*key, value.clone_value()))
                .collect(),
        }
    }
}

impl Values {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new variable; fails if `key` is already present.
    pub fn insert<T: Manifold>(&mut self, key: Key, value: T) -> FactorResult<()> {
        if self.values.contains_key(&key) {
            return Err(FactorError::KeyAlreadyExists(key));
        }
        self.values.insert(key, Box::new(value));
        Ok(())
    }

    /// Replace an existing variable with a value of the same type.
    pub fn update<T: Manifold>(&mut self, key: Key, value: T) -> FactorResult<()> {
        let slot = self
            .values
            .get_mut(&key)
            .ok_or(FactorError::KeyNotFound(key))?;
        if slot.as_any().downcast_ref::<T>().is_none() {
            return Err(FactorError::TypeMismatch {
                key,
                expected: slot.type_name(),
                actual: type_name::<T>(),
            });
        }
        *slot = Box::new(value);
        Ok(())
    }

    /// Remove a variable, returning whether it was present.
    pub fn erase(&mut self, key: Key) -> bool {
        self.values.remove(&key).is_some()
    }

    /// Typed access to the value at `key`.
    ///
    /// # Errors
    /// `KeyNotFound` if `key` is absent, `TypeMismatch` if the stored value is not a `T`.
    pub fn at<T: Manifold>(&self, key: Key) -> FactorResult<&T> {
        let value = self.values.get(&key).ok_or(FactorError::KeyNotFound(key))?;
        value
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| FactorError::TypeMismatch {
                key,
                expected: type_name::<T>(),
                actual: value.type_name(),
            })
    }

    /// Type-erased access to the value at `key`.
    pub fn get(&self, key: Key) -> Option<&dyn Value> {
        self.values.get(&key).map(|value| value.as_ref())
    }

    pub fn contains(&self, key: Key) -> bool {
        self.values.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.values.keys().copied()
    }

    /// Tangent dimension of the variable at `key`.
    pub fn dim(&self, key: Key) -> FactorResult<usize> {
        self.values
            .get(&key)
            .map(|value| value.dim())
            .ok_or(FactorError::KeyNotFound(key))
    }

    /// Tangent dimension of every variable, in key order.
    pub fn dims(&self) -> BTreeMap<Key, usize> {
        self.values
            .iter()
            .map(|(key, value)| (*key, value.dim()))
            .collect()
    }

    /// Sum of all tangent dimensions.
    pub fn total_dim(&self) -> usize {
        self.values.values().map(|value| value.dim()).sum()
    }

    /// Apply a tangent-space update to every variable present in `delta`.
    ///
    /// Variables without an entry in `delta` are copied unchanged.
    pub fn retract(&self, delta: &VectorValues) -> FactorResult<Values> {
        for key in delta.keys() {
            if !self.values.contains_key(&key) {
                return Err(FactorError::KeyNotFound(key));
            }
        }

        let mut result = BTreeMap::new();
        for (key, value) in &self.values {
            let updated = match delta.get(*key) {
                Some(step) => {
                    if step.len() != value.dim() {
                        return Err(FactorError::dimension("retract", value.dim(), step.len()));
                    }
                    value.retract_value(step)
                }
                None => value.clone_value(),
            };
            result.insert(*key, updated);
        }
        Ok(Values { values: result })
    }

    /// Same keys and values within `tol`.
    pub fn equals(&self, other: &Values, tol: f64) -> bool {
        self.values.len() == other.values.len()
            && self
                .values
                .iter()
                .zip(other.values.iter())
                .all(|((k1, v1), (k2, v2))| k1 == k2 && v1.equals_value(v2.as_ref(), tol))
    }
}
