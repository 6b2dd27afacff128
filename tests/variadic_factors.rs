//! Integration tests for noise-weighted factors of different arities
//!
//! Covers four to six variable factors, hard constraints from zero-sigma noise models,
//! cloning and rekeying, error propagation from the assignment, and numerical checks of
//! linearized SE(2) factors.

use std::sync::Arc;

use nalgebra::{DMatrix, DVector};
use nonlinear_factor::factors::{BetweenFactor, Factor, PriorFactor};
use nonlinear_factor::manifold::vector::Point2;
use nonlinear_factor::manifold::{Manifold, SE2};
use nonlinear_factor::{
    init_logger, FactorError, Key, NoiseModel, NoiseModelFactor, NonlinearFactor, SharedFactor,
    Values,
};

use graph_test_utils::{TestResult, L1, TOLERANCE, X1};

fn x(i: u64) -> Key {
    Key::new(i)
}

/// `e = Σ x_i` over `N` one-dimensional vectors, with `∂e/∂x_i = i`.
#[derive(Debug, Clone)]
struct SumFactor<const N: usize>;

impl<const N: usize> Factor for SumFactor<N> {
    type Variables = [DVector<f64>; N];

    fn evaluate_error(
        &self,
        variables: &Self::Variables,
        jacobians: Option<&mut [DMatrix<f64>]>,
    ) -> DVector<f64> {
        if let Some(jacobians) = jacobians {
            for (i, jacobian) in jacobians.iter_mut().enumerate() {
                *jacobian = DMatrix::from_element(1, 1, (i + 1) as f64);
            }
        }
        DVector::from_element(1, variables.iter().map(|v| v[0]).sum())
    }

    fn get_dimension(&self) -> usize {
        1
    }

    fn equals(&self, _other: &Self, _tol: f64) -> bool {
        true
    }
}

/// Five-variable sum written against a tuple of variables.
#[derive(Debug, Clone)]
struct TupleSumFactor5;

impl Factor for TupleSumFactor5 {
    type Variables = (
        DVector<f64>,
        DVector<f64>,
        DVector<f64>,
        DVector<f64>,
        DVector<f64>,
    );

    fn evaluate_error(
        &self,
        (x1, x2, x3, x4, x5): &Self::Variables,
        jacobians: Option<&mut [DMatrix<f64>]>,
    ) -> DVector<f64> {
        if let Some(jacobians) = jacobians {
            for (i, jacobian) in jacobians.iter_mut().enumerate() {
                *jacobian = DMatrix::from_element(1, 1, (i + 1) as f64);
            }
        }
        x1 + x2 + x3 + x4 + x5
    }

    fn get_dimension(&self) -> usize {
        1
    }

    fn equals(&self, _other: &Self, _tol: f64) -> bool {
        true
    }
}

fn scalar_values(count: u64) -> Result<Values, FactorError> {
    let mut values = Values::new();
    for i in 1..=count {
        values.insert(x(i), DVector::from_element(1, i as f64))?;
    }
    Ok(values)
}

fn check_sum_factor(
    factor: &dyn NonlinearFactor,
    values: &Values,
    expected_error: f64,
    expected_b: f64,
) -> TestResult {
    let arity = factor.size();
    let unwhitened = factor.unwhitened_error(values)?;
    let sum: f64 = (1..=arity).map(|i| i as f64).sum();
    assert!((unwhitened[0] - sum).abs() < TOLERANCE);
    assert!((factor.error(values)? - expected_error).abs() < TOLERANCE);

    let linear = factor.linearize(values)?;
    let expected_keys: Vec<Key> = (1..=arity as u64).map(x).collect();
    assert_eq!(linear.keys(), expected_keys.as_slice());
    for i in 0..arity {
        let block = linear.get_a_at(i).ok_or("missing block")?;
        assert!((block[(0, 0)] - 0.5 * (i + 1) as f64).abs() < TOLERANCE);
    }
    assert!((linear.get_b()[0] - expected_b).abs() < TOLERANCE);
    Ok(())
}

fn sum_factor4() -> Result<NoiseModelFactor<SumFactor<4>>, FactorError> {
    NoiseModelFactor::new(
        (1..=4).map(x).collect(),
        NoiseModel::diagonal(&[2.0])?,
        SumFactor::<4>,
    )
}

#[test]
fn test_noise_model_factor4() -> TestResult {
    init_logger();
    check_sum_factor(&sum_factor4()?, &scalar_values(4)?, 12.5, -5.0)
}

#[test]
fn test_noise_model_factor5() -> TestResult {
    let factor = NoiseModelFactor::new(
        (1..=5).map(x).collect(),
        NoiseModel::diagonal(&[2.0])?,
        TupleSumFactor5,
    )?;
    check_sum_factor(&factor, &scalar_values(5)?, 28.125, -7.5)
}

#[test]
fn test_noise_model_factor6() -> TestResult {
    let factor = NoiseModelFactor::new(
        (1..=6).map(x).collect(),
        NoiseModel::diagonal(&[2.0])?,
        SumFactor::<6>,
    )?;
    check_sum_factor(&factor, &scalar_values(6)?, 55.125, -10.5)
}

#[test]
fn test_clone_rekey() -> TestResult {
    let init: SharedFactor = Arc::new(sum_factor4()?);
    assert_eq!(init.keys(), &[x(1), x(2), x(3), x(4)]);

    // Standard clone
    let cloned = init.clone_factor();
    assert!(!Arc::ptr_eq(&init, &cloned));
    assert!(init.equals(cloned.as_ref(), TOLERANCE));

    // Rekey: clone with different keys
    let rekeyed = init.rekey(&[x(5), x(6), x(7), x(8)])?;
    assert!(!Arc::ptr_eq(&init, &rekeyed));
    assert_eq!(init.keys(), &[x(1), x(2), x(3), x(4)]);
    assert_eq!(rekeyed.keys(), &[x(5), x(6), x(7), x(8)]);
    assert!(!init.equals(rekeyed.as_ref(), TOLERANCE));

    // Rekeying back restores equality
    let restored = rekeyed.rekey(&[x(1), x(2), x(3), x(4)])?;
    assert!(init.equals(restored.as_ref(), TOLERANCE));
    Ok(())
}

#[test]
fn test_rekey_with_wrong_length_fails() -> TestResult {
    let factor = sum_factor4()?;
    assert_eq!(
        factor.rekey(&[x(5), x(6), x(7)]).unwrap_err(),
        FactorError::ArityMismatch {
            expected: 4,
            actual: 3
        }
    );
    assert_eq!(factor.keys(), &[x(1), x(2), x(3), x(4)]);
    Ok(())
}

#[test]
fn test_construction_with_wrong_arity_fails() -> TestResult {
    let result = NoiseModelFactor::new(vec![x(1), x(2)], NoiseModel::diagonal(&[2.0])?, SumFactor::<4>);
    assert!(matches!(
        result,
        Err(FactorError::ArityMismatch {
            expected: 4,
            actual: 2
        })
    ));
    Ok(())
}

#[test]
fn test_missing_and_mistyped_variables() -> TestResult {
    let factor = sum_factor4()?;

    let mut values = scalar_values(3)?;
    assert_eq!(factor.error(&values).unwrap_err(), FactorError::KeyNotFound(x(4)));
    assert_eq!(factor.linearize(&values).unwrap_err(), FactorError::KeyNotFound(x(4)));

    values.insert(x(4), Point2::new(4.0, 0.0))?;
    assert!(matches!(
        factor.unwhitened_error(&values),
        Err(FactorError::TypeMismatch { key, .. }) if key == x(4)
    ));
    Ok(())
}

#[test]
fn test_linearize_constrained_prior() -> TestResult {
    let constraint = NoiseModel::constrained(&[0.2, 0.0])?;
    let factor = NoiseModelFactor::new(
        vec![X1],
        constraint,
        PriorFactor::new(Point2::new(1.0, -1.0)),
    )?;

    let mut values = Values::new();
    values.insert(X1, Point2::new(1.0, 2.0))?;
    let actual = factor.linearize(&values)?;

    let a = DMatrix::from_row_slice(2, 2, &[5.0, 0.0, 0.0, 1.0]);
    let expected = nonlinear_factor::JacobianFactor::new(
        vec![(X1, a)],
        DVector::from_vec(vec![0.0, -3.0]),
        NoiseModel::constrained(&[1.0, 0.0])?,
    )?;
    assert!(actual.equals(&expected, TOLERANCE));
    assert!(actual.noise_model().is_constrained());
    Ok(())
}

#[test]
fn test_linearize_constrained_measurement() -> TestResult {
    let constraint = NoiseModel::diagonal(&[0.2, 0.0])?;
    let factor = NoiseModelFactor::new(
        vec![X1, L1],
        constraint,
        BetweenFactor::new(Point2::new(1.0, -1.0)),
    )?;

    let mut values = Values::new();
    values.insert(X1, Point2::new(1.0, 2.0))?;
    values.insert(L1, Point2::new(5.0, 4.0))?;
    let actual = factor.linearize(&values)?;

    let a = DMatrix::from_row_slice(2, 2, &[5.0, 0.0, 0.0, 1.0]);
    let expected = nonlinear_factor::JacobianFactor::new(
        vec![(X1, -&a), (L1, a)],
        DVector::from_vec(vec![-15.0, -3.0]),
        NoiseModel::constrained(&[1.0, 0.0])?,
    )?;
    assert!(actual.equals(&expected, TOLERANCE));
    Ok(())
}

#[test]
fn test_linearization_reproduces_cost() -> TestResult {
    let models = [
        NoiseModel::unit(3),
        NoiseModel::isotropic(3, 0.3)?,
        NoiseModel::diagonal(&[0.1, 0.2, 0.05])?,
        NoiseModel::from_covariance(&DMatrix::from_row_slice(
            3,
            3,
            &[0.04, 0.01, 0.0, 0.01, 0.09, 0.0, 0.0, 0.0, 0.01],
        ))?,
    ];

    let mut values = Values::new();
    values.insert(x(1), SE2::from_xy_angle(0.1, -0.3, 0.2))?;
    values.insert(x(2), SE2::from_xy_angle(1.2, 0.4, 0.9))?;

    for model in models {
        let factor = NoiseModelFactor::new(
            vec![x(1), x(2)],
            model,
            BetweenFactor::new(SE2::from_xy_angle(1.0, 0.5, 0.6)),
        )?;
        let linear = factor.linearize(&values)?;
        let cost = factor.error(&values)?;
        assert!((linear.get_b().norm_squared() - 2.0 * cost).abs() < 1e-9);
        assert!((factor.whitened_error(&values)?.norm_squared() - 2.0 * cost).abs() < 1e-9);
    }
    Ok(())
}

#[test]
fn test_se2_linearization_matches_finite_differences() -> TestResult {
    const FD_EPSILON: f64 = 1e-6;

    let factor = NoiseModelFactor::new(
        vec![x(1), x(2)],
        NoiseModel::diagonal(&[0.1, 0.2, 0.05])?,
        BetweenFactor::new(SE2::from_xy_angle(1.0, 0.2, -0.4)),
    )?;

    let poses = [
        SE2::from_xy_angle(0.3, 0.1, 0.25),
        SE2::from_xy_angle(1.1, 0.6, -0.3),
    ];
    let mut values = Values::new();
    values.insert(x(1), poses[0].clone())?;
    values.insert(x(2), poses[1].clone())?;

    let linear = factor.linearize(&values)?;

    // A_i ≈ ∂ whiten(e(x_i ⊞ δ)) / ∂δ
    for (i, pose) in poses.iter().enumerate() {
        let mut numerical = DMatrix::<f64>::zeros(3, 3);
        for j in 0..3 {
            let mut delta = DVector::zeros(3);
            delta[j] = FD_EPSILON;
            let mut plus = values.clone();
            plus.update(x(i as u64 + 1), pose.retract(&delta))?;
            delta[j] = -FD_EPSILON;
            let mut minus = values.clone();
            minus.update(x(i as u64 + 1), pose.retract(&delta))?;

            let column = (factor.whitened_error(&plus)? - factor.whitened_error(&minus)?)
                / (2.0 * FD_EPSILON);
            numerical.set_column(j, &column);
        }
        let analytic = linear.get_a(x(i as u64 + 1)).ok_or("missing block")?;
        assert!(
            (analytic - &numerical).amax() < 1e-5,
            "block {i}: analytic {analytic}, numerical {numerical}"
        );
    }
    Ok(())
}
