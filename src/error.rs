//! Error types for the nonlinear-factor library
//!
//! This module provides the main error and result types used throughout the library.
//! All errors use the `thiserror` crate for automatic trait implementations.

use crate::core::key::Key;
use thiserror::Error;

/// Main result type used throughout the library
pub type FactorResult<T> = Result<T, FactorError>;

/// Main error type for factor evaluation and linearization
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FactorError {
    /// A scoped variable is missing from the assignment
    #[error("Key not found: {0}")]
    KeyNotFound(Key),

    /// The stored value has a different type than the one requested
    #[error("Type mismatch for {key}: expected {expected}, found {actual}")]
    TypeMismatch {
        key: Key,
        expected: &'static str,
        actual: &'static str,
    },

    /// Row/column counts disagree (noise model, residual, Jacobian blocks)
    #[error("Dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Wrong number of keys for a factor of fixed arity
    #[error("Arity mismatch: expected {expected} keys, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },

    /// Inserting a key that is already present in the assignment
    #[error("Key already exists: {0}")]
    KeyAlreadyExists(Key),

    /// The same key appears twice in one factor scope
    #[error("Duplicate key in factor scope: {0}")]
    DuplicateKey(Key),

    /// Invalid noise model parameters
    #[error("Invalid noise model: {0}")]
    InvalidNoiseModel(String),

    /// Linear algebra failures (sparse assembly, decompositions)
    #[error("Linear algebra error: {0}")]
    LinearAlgebra(String),
}

impl FactorError {
    pub(crate) fn dimension(context: &'static str, expected: usize, actual: usize) -> Self {
        FactorError::DimensionMismatch {
            context,
            expected,
            actual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factor_error_display() {
        let error = FactorError::KeyNotFound(Key::new(7));
        assert_eq!(error.to_string(), "Key not found: k7");

        let error = FactorError::dimension("whiten", 2, 3);
        assert_eq!(
            error.to_string(),
            "Dimension mismatch in whiten: expected 2, got 3"
        );
    }

    #[test]
    fn test_arity_mismatch_display() {
        let error = FactorError::ArityMismatch {
            expected: 4,
            actual: 3,
        };
        assert_eq!(error.to_string(), "Arity mismatch: expected 4 keys, got 3");
    }

    #[test]
    fn test_factor_result_err() {
        let result: FactorResult<i32> = Err(FactorError::InvalidNoiseModel("sigma".into()));
        assert!(result.is_err());
    }
}
