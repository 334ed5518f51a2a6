//! Jacobians against central finite differences

use std::sync::Arc;

use crate::{
    Evaluator, Matrix, ParametricExpression, Point3, Vector2, Vector3, acos, asin, exp, log, pow,
    sin, sqrt, tan,
};

const EPSILON: f64 = 1e-6;
const TOLERANCE: f64 = 1e-3;

type Surface = ParametricExpression<Point3, Vector2>;
type Scalar2 = ParametricExpression<f64, Vector2>;

fn finite_difference_jacobian(e: &Surface, at: Vector2) -> Matrix<f64> {
    Matrix::from_fn(3, 2, |row, col| {
        let mut step = [0.0; 2];
        step[col] = EPSILON / 2.0;
        let step = Vector2::new(step);
        let high = e.evaluate(&(at + step)).expect("Should evaluate");
        let low = e.evaluate(&(at - step)).expect("Should evaluate");
        (high[row] - low[row]) / EPSILON
    })
}

fn assert_close(actual: &Matrix<f64>, expected: &Matrix<f64>) {
    assert_eq!((actual.rows(), actual.cols()), (expected.rows(), expected.cols()));
    for col in 0..actual.cols() {
        for row in 0..actual.rows() {
            let (a, e) = (actual.get(row, col), expected.get(row, col));
            assert!(
                (a - e).abs() < TOLERANCE,
                "entry ({row}, {col}): {a} vs {e}"
            );
        }
    }
}

/// Torus-like surface exercising every elementary function
fn surface() -> Surface {
    let u = Scalar2::parameter(0).expect("Valid parameter index");
    let v = Scalar2::parameter(1).expect("Valid parameter index");
    let radius = (&sqrt(&(&u * &u).expect("Should build").translated(&4.0).expect("Should build")).expect("Should build")
        + &exp(&v.scaled(0.3)).expect("Should build"))
        .expect("Should build");
    let x = (&radius * &sin(&u).expect("Should build")).expect("Should build");
    let y = (&log(&v.translated(&3.0).expect("Should build")).expect("Should build") * &tan(&u.scaled(0.5)).expect("Should build")).expect("Should build");
    let z = (&asin(&u.scaled(0.4)).expect("Should build") - &acos(&v.scaled(0.3)).expect("Should build")).expect("Should build");
    Surface::from_components(&[x, y, z]).expect("Should build")
}

#[test]
fn test_symbolic_jacobian_matches_finite_differences() {
    let e = surface();
    for at in [Vector2::xy(0.2, 0.5), Vector2::xy(-0.7, 1.1), Vector2::xy(1.3, -0.4)] {
        let jacobian = e.jacobian(&at).expect("Should evaluate jacobian");
        assert_close(&jacobian, &finite_difference_jacobian(&e, at));
    }
}

#[test]
fn test_forward_mode_matches_symbolic() {
    let e = surface();
    let at = Vector2::xy(0.4, 0.9);
    let input = Arc::new(Matrix::from_column(&[at[0], at[1]]));
    let forward = Evaluator::new()
        .evaluate_jacobian(e.node(), &input)
        .expect("Should evaluate jacobian");
    let symbolic = e.jacobian(&at).expect("Should evaluate jacobian");
    for col in 0..2 {
        for row in 0..3 {
            assert!((forward.get(row, col) - symbolic.get(row, col)).abs() < 1e-9);
        }
    }
}

#[test]
fn test_vector_operations_jacobian() {
    // normalized cross product of two surface tangents plus a norm-scaled term
    let u = Scalar2::parameter(0).expect("Valid parameter index");
    let v = Scalar2::parameter(1).expect("Valid parameter index");
    let a = ParametricExpression::<Vector3, Vector2>::from_components(&[
        u.clone(),
        v.clone(),
        (&u * &v).expect("Should build"),
    ])
    .expect("Should build");
    let b = ParametricExpression::<Vector3, Vector2>::from_components(&[
        v.squared().expect("Should build"),
        u.translated(&1.0).expect("Should build"),
        pow(&u.translated(&2.0).expect("Should build"), &v).expect("Should build"),
    ])
    .expect("Should build");
    let normal = a.cross(&b).expect("Should build").normalized().expect("Should build");
    let weight = (&a.norm() + &a.dot(&b).expect("Should build")).expect("Should build");
    let field = (&normal * &weight).expect("Should build");
    let e = Surface::from_node(field.node().clone()).expect("Should build");

    let at = Vector2::xy(0.6, 0.8);
    assert_close(&e.jacobian(&at).expect("Should evaluate jacobian"), &finite_difference_jacobian(&e, at));
}

#[test]
fn test_jacobian_bounds_enclose_point_jacobian() {
    let e = surface();
    let at = Vector2::xy(0.3, 0.6);
    let point = e.jacobian(&at).expect("Should evaluate jacobian");
    let bounds = e
        .jacobian_bounds(&[
            crate::Interval::new(0.25, 0.35),
            crate::Interval::new(0.55, 0.65),
        ])
        .expect("Should build");
    for col in 0..2 {
        for row in 0..3 {
            assert!(bounds.get(row, col).contains(point.get(row, col)));
        }
    }
}
