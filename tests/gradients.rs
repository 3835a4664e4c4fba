use approx::assert_abs_diff_eq;
use scalargrad::{GraphError, NodeId, OpKind, Tape, TapeConfig};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn add_gradients() {
    init();
    let tape = Tape::new();
    for (x, y) in [(3., 2.), (-1.5, 0.25), (0., -7.)] {
        tape.zero_grad();
        let a = tape.leaf(x).unwrap();
        let b = tape.leaf(y).unwrap();
        let c = tape.add(a, b).unwrap();
        c.backprop();
        assert_eq!(c.value(), x + y);
        assert_eq!(c.grad(), 1.);
        assert_eq!(a.grad(), 1.);
        assert_eq!(b.grad(), 1.);
    }
}

#[test]
fn multiply_gradients() {
    init();
    let tape = Tape::new();
    for (x, y) in [(3., 2.), (-1.5, 0.25), (0., -7.)] {
        tape.zero_grad();
        let a = tape.leaf(x).unwrap();
        let b = tape.leaf(y).unwrap();
        let c = tape.multiply(a, b).unwrap();
        c.backprop();
        assert_eq!(c.value(), x * y);
        assert_eq!(a.grad(), y);
        assert_eq!(b.grad(), x);
    }
}

#[test]
fn subtract_does_not_reach_second_operand() {
    init();
    let tape = Tape::new();
    let a = tape.leaf(-3.).unwrap();
    let b = tape.leaf(2.).unwrap();
    let c = tape.subtract(a, b).unwrap();
    c.backprop();
    assert_eq!(c.value(), -5.);
    assert_eq!(a.grad(), 1.);
    assert_eq!(b.grad(), 0.);

    // The negated leaf is the second operand of the addition and holds the
    // gradient instead.
    let operands = tape.operands(c.id()).unwrap();
    assert_eq!(operands[0], a.id());
    assert_eq!(tape.value(operands[1]), Ok(-2.));
    assert_eq!(tape.grad(operands[1]), Ok(1.));
    assert_eq!(tape.kind(operands[1]), Ok(OpKind::Leaf));
}

#[test]
fn divide_flows_through_reciprocal() {
    init();
    let tape = Tape::new();
    let a = tape.leaf(6.).unwrap();
    let b = tape.leaf(3.).unwrap();
    let c = tape.divide(a, b).unwrap();
    c.backprop();
    assert_abs_diff_eq!(c.value(), 2., epsilon = 1e-12);
    assert_abs_diff_eq!(a.grad(), 1. / 3., epsilon = 1e-12);
    assert_abs_diff_eq!(b.grad(), -6. / 9., epsilon = 1e-12);
}

#[test]
fn divide_by_zero_is_not_an_error() {
    let tape = Tape::new();
    let a = tape.leaf(1.).unwrap();
    let b = tape.leaf(0.).unwrap();
    let c = tape.divide(a, b).unwrap();
    assert_eq!(c.value(), f64::INFINITY);
}

#[test]
fn power_gradients() {
    init();
    let tape = Tape::new();
    let a = tape.leaf(2.).unwrap();
    let b = tape.leaf(3.).unwrap();
    let c = tape.power(a, b).unwrap();
    c.backprop();
    assert_eq!(c.value(), 8.);
    // clipped from 12
    assert_eq!(a.grad(), 10.);
    assert_abs_diff_eq!(b.grad(), 8. * 2f64.ln(), epsilon = 1e-12);
}

#[test]
fn power_with_negative_base_keeps_exponent_gradient_finite() {
    init();
    let tape = Tape::new();
    let a = tape.leaf(-2.).unwrap();
    let b = tape.leaf(2.).unwrap();
    let c = a.pow(b);
    c.backprop();
    assert_eq!(c.value(), 4.);
    assert_eq!(a.grad(), -4.);
    assert_eq!(b.grad(), 0.);
}

#[test]
fn self_power() {
    let tape = Tape::new();
    let x = tape.leaf(2.).unwrap();
    let y = x.pow(x);
    y.backprop();
    assert_eq!(y.value(), 4.);
    assert_abs_diff_eq!(x.grad(), 4. * (2f64.ln() + 1.), epsilon = 1e-12);
}

#[test]
fn relu_gates_gradient() {
    init();
    let tape = Tape::new();
    let neg = tape.leaf(-1.).unwrap();
    let pos = tape.leaf(2.).unwrap();
    let c = neg.relu() + pos.relu();
    c.backprop();
    assert_eq!(c.value(), 2.);
    assert_eq!(neg.grad(), 0.);
    assert_eq!(pos.grad(), 1.);
}

#[test]
fn chain_rule_through_mixed_ops() {
    let tape = Tape::new();
    let a = tape.leaf(1.5).unwrap();
    let b = tape.leaf(4.).unwrap();
    let two = tape.leaf(2.).unwrap();
    // ((a * b + a) / b)^2 = (a + a / b)^2
    let d = ((a * b + a) / b).relu().pow(two);
    d.backprop();
    let inner = 1.5 + 1.5 / 4.;
    assert_abs_diff_eq!(d.value(), inner * inner, epsilon = 1e-12);
    // d/da = 2 * inner * (1 + 1 / b)
    assert_abs_diff_eq!(a.grad(), 2. * inner * 1.25, epsilon = 1e-12);
}

#[test]
fn repeated_passes_accumulate() {
    init();
    let tape = Tape::new();
    let a = tape.leaf(2.).unwrap();
    let b = tape.leaf(3.).unwrap();
    let c = a * b;

    c.backprop();
    assert_eq!(a.grad(), 3.);
    c.backprop();
    assert_eq!(a.grad(), 6.);
    assert_eq!(b.grad(), 4.);
    // the root is reseeded, not accumulated
    assert_eq!(c.grad(), 1.);

    tape.zero_grad();
    c.backprop();
    assert_eq!(a.grad(), 3.);
    assert_eq!(b.grad(), 2.);
}

#[test]
fn backprop_by_id() {
    let tape = Tape::new();
    let a = tape.create_leaf(2.).unwrap();
    let b = tape.create_leaf(5.).unwrap();
    let c = tape.create_op(OpKind::Mul, &[a, b]).unwrap();
    tape.backprop(c).unwrap();
    assert_eq!(tape.grad(a), Ok(5.));
    assert_eq!(tape.grad(b), Ok(2.));
    assert_eq!(tape.term(c).unwrap().grad(), 1.);
}

#[test]
fn errors() {
    let tape = Tape::with_config(TapeConfig::new().max_nodes(3)).unwrap();
    let a = tape.leaf(1.).unwrap();
    let b = tape.leaf(2.).unwrap();
    let c = tape.add(a, b).unwrap();
    assert_eq!(
        tape.multiply(c, a).unwrap_err(),
        GraphError::CapacityExceeded { limit: 3 }
    );
    assert_eq!(tape.len(), 3);

    let other = Tape::new();
    for x in 0..5 {
        other.create_leaf(x as f64).unwrap();
    }
    let missing: NodeId = other.create_leaf(0.).unwrap();
    assert_eq!(
        tape.backprop(missing),
        Err(GraphError::InvalidHandle { id: missing, len: 3 })
    );
}

#[test]
#[should_panic]
fn mixing_tapes_with_operators_panics() {
    let tape1 = Tape::new();
    let tape2 = Tape::new();
    let a = tape1.leaf(1.).unwrap();
    let b = tape2.leaf(1.).unwrap();
    let _ = a + b;
}

#[test]
#[should_panic]
fn operators_panic_on_full_tape() {
    let tape = Tape::with_config(TapeConfig::new().max_nodes(1)).unwrap();
    let a = tape.leaf(1.).unwrap();
    let _ = a * a;
}
