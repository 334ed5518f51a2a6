//! End-to-end scenarios through the typed façade

use std::f64::consts::{FRAC_PI_2, PI};
use std::sync::Arc;

use crate::{
    Evaluator, ExprError, Interval, Matrix, ParametricExpression, Point3, Vector2, Vector3, acos,
    cos, sin,
};

type Curve<V> = ParametricExpression<V, f64>;
type Field = ParametricExpression<f64, Vector2>;

fn t() -> Curve<f64> {
    Curve::<f64>::parameter(0).expect("Valid parameter index")
}

#[test]
fn test_sine_over_quarter_turns() {
    let e = sin(&t()).expect("Should build");
    let values = e
        .evaluate_batch(&[0.0, FRAC_PI_2, PI, 3.0 * FRAC_PI_2])
        .expect("Should build");
    let expected = [0.0, 1.0, 0.0, -1.0];
    for (value, expected) in values.iter().zip(expected) {
        assert!((value - expected).abs() < 1e-12, "{value} vs {expected}");
    }
}

#[test]
fn test_sum_of_squares_and_partials() {
    let u = Field::parameter(0).expect("Valid parameter index");
    let v = Field::parameter(1).expect("Valid parameter index");
    let e = (&u.squared().expect("Should build") + &v.squared().expect("Should build")).expect("Should build");

    assert_eq!(e.evaluate(&Vector2::xy(1.0, 2.0)).expect("Should evaluate"), 5.0);
    let de_du = e.derivative_by(&u).expect("Should differentiate");
    assert_eq!(de_du.evaluate(&Vector2::xy(3.0, 4.0)).expect("Should evaluate"), 6.0);
    let d2e_dv2 = e.derivative_by(&v).expect("Should differentiate").derivative_by(&v).expect("Should differentiate");
    assert_eq!(d2e_dv2.evaluate(&Vector2::xy(5.0, 6.0)).expect("Should evaluate"), 2.0);
    assert!(d2e_dv2.is_constant());
}

#[test]
fn test_arccosine_bounds_are_clamped() {
    let e = acos(&t()).expect("Should build");
    let bounds = e.evaluate_bounds(&Interval::new(-1.0, 0.0)).expect("Should evaluate");
    assert!(bounds.approx_eq(&Interval::new(FRAC_PI_2, PI), 1e-12));
    assert!(bounds.contains(FRAC_PI_2) && bounds.contains(PI));

    let bounds = e
        .evaluate_bounds(&Interval::new(1.0 + 1e-14, 1.0 + 1e-10))
        .expect("Should evaluate");
    assert!(bounds.approx_eq(&Interval::singleton(0.0), 1e-12));
}

#[test]
fn test_line_dot_and_cross() {
    let direction = Curve::<Vector3>::constant(&Vector3::xyz(1.0, 1.0, 1.0));
    let origin = Curve::<Point3>::constant(&Point3::xyz(1.0, 1.0, 1.0));
    let line = origin.displaced(&(&direction * &t()).expect("Should build")).expect("Should build");
    assert_eq!(line.evaluate(&2.0).expect("Should evaluate"), Point3::xyz(3.0, 3.0, 3.0));

    let y_axis = Vector3::xyz(0.0, 1.0, 0.0);
    let height = line.dot_vector(&y_axis).expect("Should build");
    assert_eq!(height.evaluate(&0.0).expect("Should evaluate"), 1.0);
    assert_eq!(height.evaluate(&1.0).expect("Should evaluate"), 2.0);

    let swept = line.cross_vector(&y_axis).expect("Should build");
    assert_eq!(swept.evaluate(&0.0).expect("Should evaluate"), Vector3::xyz(-1.0, 0.0, 1.0));
}

#[test]
fn test_concatenation_of_mixed_parts() {
    let three = Curve::<f64>::constant(&3.0);
    let e = ParametricExpression::<Vec<f64>>::from_components(&[
        t(),
        three,
        t().squared().expect("Should build"),
    ])
    .expect("Should build");
    assert_eq!(e.num_dimensions(), 3);
    assert_eq!(e.evaluate(&2.0).expect("Should evaluate"), vec![2.0, 3.0, 4.0]);
}

#[test]
fn test_mismatched_dot_fails_at_construction() {
    let a = Curve::<Vector3>::constant(&Vector3::xyz(1.0, 2.0, 3.0))
        .scaled(2.0)
        .displaced(&Curve::<Vector3>::from_components(&[t(), t(), t()]).expect("Should build"))
        .expect("Should build");
    let b = Curve::<Vector2>::from_components(&[t(), t()]).expect("Should build");
    assert!(matches!(
        a.dot(&b),
        Err(ExprError::DimensionMismatch {
            expected: 3,
            found: 2,
            ..
        })
    ));
    assert!(matches!(
        b.cross(&b),
        Err(ExprError::InvalidOperandShape { .. })
    ));
}

#[test]
fn test_shared_evaluator_returns_same_storage() {
    let e = cos(&t()).expect("Should build");
    let input = Arc::new(Matrix::from_column(&[0.25]));
    let mut evaluator = Evaluator::new();
    let first = e.evaluate_with(&mut evaluator, &input).expect("Should build");
    let second = e.evaluate_with(&mut evaluator, &input).expect("Should build");
    let third = e.evaluate_with(&mut evaluator, &input).expect("Should build");
    assert!(Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&first, &third));
}

#[test]
fn test_circle_geometry() {
    // circle of radius 2 in the xy plane
    let radius = 2.0;
    let circle = Curve::<Point3>::from_components(&[
        cos(&t()).expect("Should build").scaled(radius),
        sin(&t()).expect("Should build").scaled(radius),
        Curve::<f64>::constant(&0.0),
    ])
    .expect("Should build");

    let curvature = circle.curvature().expect("Should differentiate");
    for angle in [0.0, 0.7, 2.0] {
        assert!((curvature.evaluate(&angle).expect("Should evaluate") - 1.0 / radius).abs() < 1e-12);
    }

    let angle = 0.7;
    let tangent = circle.tangent_vector().expect("Should differentiate").evaluate(&angle).expect("Should evaluate");
    let normal = circle.normal_vector().expect("Should differentiate").evaluate(&angle).expect("Should evaluate");
    let binormal = circle.binormal_vector().expect("Should differentiate").evaluate(&angle).expect("Should evaluate");
    assert!((tangent - Vector3::xyz(-angle.sin(), angle.cos(), 0.0)).norm() < 1e-12);
    assert!((normal - Vector3::xyz(-angle.cos(), -angle.sin(), 0.0)).norm() < 1e-12);
    assert!((binormal - Vector3::xyz(0.0, 0.0, 1.0)).norm() < 1e-12);
}

#[test]
fn test_surface_normal_and_shape_errors() {
    // plane z = 0 parameterized by (u, v)
    let u = ParametricExpression::<f64, Vector2>::parameter(0).expect("Valid parameter index");
    let v = ParametricExpression::<f64, Vector2>::parameter(1).expect("Valid parameter index");
    let zero = ParametricExpression::<f64, Vector2>::constant(&0.0);
    let plane =
        ParametricExpression::<Point3, Vector2>::from_components(&[u.clone(), v, zero]).expect("Should build");
    let normal = plane.normal_vector().expect("Should differentiate");
    assert!(normal.is_constant());
    assert_eq!(
        normal.evaluate(&Vector2::xy(0.3, 0.4)).expect("Should evaluate"),
        Vector3::xyz(0.0, 0.0, 1.0)
    );

    assert!(matches!(
        plane.curvature(),
        Err(ExprError::InvalidOperandShape { .. })
    ));
    let flat = Curve::<Vector2>::from_components(&[t(), t()]).expect("Should build");
    assert!(matches!(
        flat.binormal_vector(),
        Err(ExprError::InvalidOperandShape { .. })
    ));
}

#[test]
fn test_bounds_batch_and_compiled_program() {
    let e = (&t().squared().expect("Should build") - &t()).expect("Should build");
    let bounds = e
        .evaluate_bounds_batch(&[Interval::new(0.0, 1.0), Interval::new(2.0, 3.0)])
        .expect("Should build");
    assert!(bounds[0].contains(0.0) && bounds[0].contains(-0.25));
    assert!(bounds[1].contains(2.0) && bounds[1].contains(6.0));

    let program = e.compile();
    let values = program
        .evaluate(&Matrix::from_fn(1, 3, |_, col| col as f64))
        .expect("Should evaluate");
    assert_eq!(values.row(0), vec![0.0, 0.0, 2.0]);
}

#[test]
fn test_composition_and_jacobian() {
    // field f(u, v) = u v composed with the curve (t, t^2)
    let u = Field::parameter(0).expect("Valid parameter index");
    let v = Field::parameter(1).expect("Valid parameter index");
    let field = (&u * &v).expect("Should build");
    let curve = Curve::<Vector2>::from_components(&[t(), t().squared().expect("Should build")]).expect("Should build");
    let cubic = field.composed(&curve).expect("Should compose");
    assert_eq!(cubic.evaluate(&2.0).expect("Should evaluate"), 8.0);
    assert_eq!(cubic.derivative().expect("Should differentiate").evaluate(&2.0).expect("Should evaluate"), 12.0);

    let jacobian = field.jacobian(&Vector2::xy(3.0, 5.0)).expect("Should evaluate jacobian");
    assert_eq!((jacobian.rows(), jacobian.cols()), (1, 2));
    assert_eq!(jacobian.row(0), vec![5.0, 3.0]);

    let bounds = field
        .jacobian_bounds(&[Interval::new(1.0, 2.0), Interval::new(3.0, 4.0)])
        .expect("Should build");
    assert!(bounds.get(0, 0).contains(3.5));
    assert!(bounds.get(0, 1).contains(1.5));
}

#[test]
fn test_display_dump() {
    let e = (&sin(&t()).expect("Should build") * 3.0).translated(&1.0).expect("Should build");
    let text = e.to_string();
    let first = text.lines().next().expect("dump has lines");
    assert!(first.starts_with("R1 -> R1 | 0x"));
    assert!(first.ends_with("| Translation [1]"));
    assert!(text.contains("  R1 -> R1 | "));
    assert!(text.contains("| Scaling 3"));
    assert!(text.contains("| sin"));
}
