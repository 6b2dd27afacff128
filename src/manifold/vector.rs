//! Vector spaces as (trivial) Lie groups under addition.
//!
//! `DVector<f64>` plays the role of a dynamically sized vector variable, and the fixed
//! size `SVector<f64, D>` types cover points (`Point2`, `Point3`). Composition is addition,
//! the inverse is negation and every Jacobian is ±I.

use super::{LieGroup, Manifold};
use nalgebra::{DMatrix, DVector, SVector, Vector2, Vector3};

/// 2D point variable.
pub type Point2 = Vector2<f64>;

/// 3D point variable.
pub type Point3 = Vector3<f64>;

impl Manifold for DVector<f64> {
    fn dim(&self) -> usize {
        self.len()
    }

    fn retract(&self, delta: &DVector<f64>) -> Self {
        self + delta
    }

    fn local_coordinates(&self, other: &Self) -> DVector<f64> {
        other - self
    }
}

impl LieGroup for DVector<f64> {
    fn inverse(&self) -> Self {
        -self
    }

    fn compose(&self, other: &Self) -> Self {
        self + other
    }

    fn adjoint(&self) -> DMatrix<f64> {
        DMatrix::identity(self.len(), self.len())
    }

    fn logmap(&self, jacobian: Option<&mut DMatrix<f64>>) -> DVector<f64> {
        if let Some(jac) = jacobian {
            *jac = DMatrix::identity(self.len(), self.len());
        }
        self.clone()
    }
}

impl<const D: usize> Manifold for SVector<f64, D> {
    fn dim(&self) -> usize {
        D
    }

    fn retract(&self, delta: &DVector<f64>) -> Self {
        self + SVector::<f64, D>::from_column_slice(delta.as_slice())
    }

    fn local_coordinates(&self, other: &Self) -> DVector<f64> {
        DVector::from_column_slice((other - self).as_slice())
    }
}

impl<const D: usize> LieGroup for SVector<f64, D> {
    fn inverse(&self) -> Self {
        -self
    }

    fn compose(&self, other: &Self) -> Self {
        self + other
    }

    fn adjoint(&self) -> DMatrix<f64> {
        DMatrix::identity(D, D)
    }

    fn logmap(&self, jacobian: Option<&mut DMatrix<f64>>) -> DVector<f64> {
        if let Some(jac) = jacobian {
            *jac = DMatrix::identity(D, D);
        }
        DVector::from_column_slice(self.as_slice())
    }
}
