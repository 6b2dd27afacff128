//! Linear (Gauss-Newton) side of the factor graph.
//!
//! - [`JacobianFactor`]: one whitened linear factor `Σ A_i dx_i = b`
//! - [`LinearFactorGraph`]: all linear factors of one linearization, with sparse assembly
//! - [`VectorValues`]: tangent-space vectors indexed by key

pub mod jacobian_factor;
pub mod linear_graph;
pub mod vector_values;

pub use jacobian_factor::JacobianFactor;
pub use linear_graph::LinearFactorGraph;
pub use vector_values::VectorValues;
