use scalargrad::{GraphError, Tape, TapeTerm};

fn print(term: &TapeTerm) {
    println!("Value: {:.6}, Gradient: {:.6}", term.value(), term.grad());
}

fn main() -> Result<(), GraphError> {
    env_logger::init();

    let tape = Tape::new();
    let a = tape.leaf(3.)?;
    let b = tape.leaf(2.)?;
    let c = tape.add(a, b)?;
    c.backprop();
    print(&a);
    print(&b);
    print(&c);

    // Subtraction negates into a detached leaf, so `b` gets no gradient.
    tape.zero_grad();
    let a = tape.leaf(-3.)?;
    let c = tape.subtract(a, b)?;
    c.backprop();
    print(&a);
    print(&b);
    print(&c);

    // relu((a * b + a) / b) ^ 2
    tape.zero_grad();
    let a = tape.leaf(1.5)?;
    let b = tape.leaf(4.)?;
    let two = tape.leaf(2.)?;
    let d = ((a * b + a) / b).relu().pow(two);
    d.backprop();
    print(&a);
    print(&b);
    print(&d);

    Ok(())
}
