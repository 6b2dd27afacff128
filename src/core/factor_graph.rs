//! Ordered collection of nonlinear factors.
//!
//! The graph stores shared, immutable factors in insertion order. Order is significant for
//! [`NonlinearFactorGraph::equals`] and index access, and irrelevant for the total cost.
//!
//! Linearization maps [`NonlinearFactor::linearize`] over all factors. With the default
//! [`LinearizationConfig`] large graphs are linearized in parallel with rayon; the output
//! keeps factor order either way.

use std::collections::{BTreeSet, HashMap};
use std::ops::Index;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::debug;

use crate::core::key::Key;
use crate::core::nonlinear_factor::{NonlinearFactor, SharedFactor};
use crate::core::values::Values;
use crate::error::FactorResult;
use crate::linear::jacobian_factor::JacobianFactor;
use crate::linear::linear_graph::LinearFactorGraph;

/// Configuration for batch error evaluation and linearization.
#[derive(Debug, Clone)]
pub struct LinearizationConfig {
    /// Use rayon for graphs with at least `parallel_threshold` factors
    pub parallel: bool,
    /// Minimum number of factors before work is split across threads
    pub parallel_threshold: usize,
}

impl Default for LinearizationConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            parallel_threshold: 64,
        }
    }
}

impl LinearizationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_parallel_threshold(mut self, parallel_threshold: usize) -> Self {
        self.parallel_threshold = parallel_threshold;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct NonlinearFactorGraph {
    factors: Vec<SharedFactor>,
    config: LinearizationConfig,
}

impl NonlinearFactorGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: LinearizationConfig) -> Self {
        Self {
            factors: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &LinearizationConfig {
        &self.config
    }

    /// Append a concrete factor.
    pub fn add<F: NonlinearFactor + 'static>(&mut self, factor: F) {
        self.factors.push(Arc::new(factor));
    }

    /// Append an already shared factor.
    pub fn push(&mut self, factor: SharedFactor) {
        self.factors.push(factor);
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SharedFactor> {
        self.factors.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SharedFactor> {
        self.factors.iter()
    }

    /// Pairwise, order-sensitive equality.
    pub fn equals(&self, other: &NonlinearFactorGraph, tol: f64) -> bool {
        self.factors.len() == other.factors.len()
            && self
                .factors
                .iter()
                .zip(other.factors.iter())
                .all(|(a, b)| a.equals(b.as_ref(), tol))
    }

    /// Union of all factor scopes, ascending.
    pub fn keys(&self) -> BTreeSet<Key> {
        self.factors
            .iter()
            .flat_map(|factor| factor.keys().iter().copied())
            .collect()
    }

    /// Total error dimension.
    pub fn dim(&self) -> usize {
        self.factors.iter().map(|factor| factor.dim()).sum()
    }

    /// Copy of the graph with keys substituted through `mapping`; unmapped keys are kept.
    pub fn rekey(&self, mapping: &HashMap<Key, Key>) -> FactorResult<NonlinearFactorGraph> {
        let factors = self
            .factors
            .iter()
            .map(|factor| {
                let new_keys: Vec<Key> = factor
                    .keys()
                    .iter()
                    .map(|key| mapping.get(key).copied().unwrap_or(*key))
                    .collect();
                factor.rekey(&new_keys)
            })
            .collect::<FactorResult<Vec<_>>>()?;
        Ok(NonlinearFactorGraph {
            factors,
            config: self.config.clone(),
        })
    }

    fn use_parallel(&self) -> bool {
        self.config.parallel && self.factors.len() >= self.config.parallel_threshold
    }

    /// Sum of the errors of all factors.
    pub fn total_error(&self, values: &Values) -> FactorResult<f64> {
        if self.use_parallel() {
            self.factors
                .par_iter()
                .map(|factor| factor.error(values))
                .sum()
        } else {
            self.factors.iter().map(|factor| factor.error(values)).sum()
        }
    }

    /// Linearize every factor around `values`, in factor order.
    pub fn linearize_all(&self, values: &Values) -> FactorResult<LinearFactorGraph> {
        let parallel = self.use_parallel();
        debug!(
            factors = self.factors.len(),
            parallel, "linearizing factor graph"
        );

        let linear = if parallel {
            self.factors
                .par_iter()
                .map(|factor| factor.linearize(values))
                .collect::<FactorResult<Vec<JacobianFactor>>>()?
        } else {
            self.factors
                .iter()
                .map(|factor| factor.linearize(values))
                .collect::<FactorResult<Vec<JacobianFactor>>>()?
        };
        Ok(linear.into_iter().collect())
    }
}

impl Index<usize> for NonlinearFactorGraph {
    type Output = SharedFactor;

    fn index(&self, index: usize) -> &SharedFactor {
        &self.factors[index]
    }
}

impl<'a> IntoIterator for &'a NonlinearFactorGraph {
    type Item = &'a SharedFactor;
    type IntoIter = std::slice::Iter<'a, SharedFactor>;

    fn into_iter(self) -> Self::IntoIter {
        self.factors.iter()
    }
}
