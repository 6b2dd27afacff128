//! Nonlinear factor evaluation and Gauss-Newton linearization for factor-graph least
//! squares.
//!
//! Factors connect a small, fixed set of variables. Given an assignment of values the
//! crate evaluates each factor's noise-weighted cost and produces whitened linear
//! (Jacobian) factors for an external sparse solver.
//!
//! ```
//! use nonlinear_factor::{
//!     BetweenFactor, Key, NoiseModel, NoiseModelFactor, NonlinearFactorGraph, PriorFactor,
//!     Values,
//! };
//! use nonlinear_factor::manifold::SE2;
//!
//! let (x1, x2) = (Key::new(1), Key::new(2));
//! let prior_noise = NoiseModel::diagonal(&[0.1, 0.1, 0.05]).unwrap();
//! let odometry_noise = NoiseModel::isotropic(3, 0.2).unwrap();
//!
//! let mut graph = NonlinearFactorGraph::new();
//! graph.add(NoiseModelFactor::new(vec![x1], prior_noise, PriorFactor::new(SE2::identity())).unwrap());
//! graph.add(
//!     NoiseModelFactor::new(
//!         vec![x1, x2],
//!         odometry_noise,
//!         BetweenFactor::new(SE2::from_xy_angle(1.0, 0.0, 0.0)),
//!     )
//!     .unwrap(),
//! );
//!
//! let mut values = Values::new();
//! values.insert(x1, SE2::identity()).unwrap();
//! values.insert(x2, SE2::from_xy_angle(1.0, 0.0, 0.0)).unwrap();
//!
//! assert!(graph.total_error(&values).unwrap() < 1e-12);
//! let linear = graph.linearize_all(&values).unwrap();
//! assert_eq!(linear.len(), 2);
//! ```

pub mod core;
pub mod error;
pub mod factors;
pub mod linear;
pub mod logger;
pub mod manifold;

pub use crate::core::{
    Key, LinearizationConfig, NoiseModel, NoiseModelFactor, NonlinearFactor,
    NonlinearFactorGraph, SharedFactor, SharedNoiseModel, Values,
};
pub use error::{FactorError, FactorResult};
pub use factors::{BetweenFactor, Factor, PriorFactor};
pub use linear::{JacobianFactor, LinearFactorGraph, VectorValues};
pub use logger::{init_logger, init_logger_with_level};
