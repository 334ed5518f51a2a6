//! Deduplication through the façade and the node layer

use std::sync::Arc;

use crate::constructors::{composed, constant, function, identity, parameter, powf, sum};
use crate::{DeduplicationCache, ElementaryFunction, ParametricExpression, Vector2, sin};

type Field = ParametricExpression<f64, Vector2>;

#[test]
fn test_commuted_sums_are_duplicates() {
    let t = ParametricExpression::<f64>::parameter(0).expect("Valid parameter index");
    let square = t.squared().expect("Should build");
    let double = t.scaled(2.0);
    let a = (&square + &double).expect("Should build");
    let b = (&double + &square).expect("Should build");
    assert!(a.node().is_duplicate_of(b.node()));
    assert!(b.node().is_duplicate_of(a.node()));
}

#[test]
fn test_distinct_parameters_never_match() {
    let u = Field::parameter(0).expect("Valid parameter index").squared().expect("Should build");
    let v = Field::parameter(1).expect("Valid parameter index").squared().expect("Should build");
    assert!(!u.node().is_duplicate_of(v.node()));

    let mut cache = DeduplicationCache::new();
    let first = cache.deduplicated(u.node()).expect("Should deduplicate");
    let second = cache.deduplicated(v.node()).expect("Should deduplicate");
    assert!(!Arc::ptr_eq(&first, &second));
}

#[test]
fn test_composing_constants_folds() {
    let x = identity(2);
    let outer = function(
        ElementaryFunction::Sqrt,
        &crate::constructors::squared_norm(&x).expect("Should build"),
    )
    .expect("Should build");
    let inner = constant(vec![3.0, 4.0], 1);
    let folded = composed(&outer, &inner).expect("Should compose");
    assert!(folded.is_constant());
    assert_eq!(folded.scalar_value(), Some(5.0));
    assert_eq!(folded.num_parameters(), 1);

    let outer = ParametricExpression::<f64, Vector2>::from_node(outer).expect("Should build");
    let inner = ParametricExpression::<Vector2>::constant(&Vector2::xy(6.0, 8.0));
    assert!(outer.composed(&inner).expect("Should compose").is_constant());
}

#[test]
fn test_derivative_chains_stay_shared() {
    // repeated derivatives of sin(t^2) rebuild the same pieces many times
    let t = ParametricExpression::<f64>::parameter(0).expect("Valid parameter index");
    let mut e = sin(&t.squared().expect("Should build")).expect("Should build");
    for _ in 0..4 {
        e = e.derivative().expect("Should differentiate");
    }
    let mut cache = DeduplicationCache::new();
    let canonical = cache.deduplicated(e.node()).expect("Should deduplicate");
    assert!(Arc::ptr_eq(&canonical, e.node()));
    assert_eq!(canonical.node_count(), e.node().node_count());
}

#[test]
fn test_rebuilding_simplifies_collapsed_children() {
    // (t^2 + t^2) built from separate copies collapses to one shared child
    let t = parameter(1, 0).expect("Valid parameter index");
    let a = powf(&t, 2.0).expect("Should build");
    let b = powf(&parameter(1, 0).expect("Valid parameter index"), 2.0).expect("Should build");
    let total = sum(&a, &b).expect("Should build");
    assert_eq!(total.node_count(), 7);

    let canonical = DeduplicationCache::new().deduplicated(&total).expect("Should deduplicate");
    let children = canonical.children();
    assert!(Arc::ptr_eq(children[0], children[1]));
    assert_eq!(canonical.node_count(), 4);
}
