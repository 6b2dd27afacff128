//! Core nonlinear factor graph components
//!
//! This module contains the building blocks for evaluating and linearizing a factor graph:
//! - Keys and the variable assignment ([`Values`])
//! - Noise models for whitening residuals and Jacobians
//! - The abstract [`NonlinearFactor`] contract and its noise-weighted implementation
//! - The ordered factor collection ([`NonlinearFactorGraph`])

pub mod factor_graph;
pub mod key;
pub mod noise_model;
pub mod noise_model_factor;
pub mod nonlinear_factor;
pub mod values;

pub use factor_graph::{LinearizationConfig, NonlinearFactorGraph};
pub use key::Key;
pub use noise_model::{NoiseModel, SharedNoiseModel};
pub use noise_model_factor::{NoiseModelFactor, VariableSet};
pub use nonlinear_factor::{NonlinearFactor, SharedFactor};
pub use values::{Value, Values};
