//! The reverse pass. Gradients are pushed from each node into its operands in
//! reverse topological order.

use crate::{
    config::{ClipMode, ClipRange, TapeConfig},
    error::GraphError,
    node::{NodeId, TapeNode, TapeValue},
    tape::{Tape, TapeTerm},
    topo::topo_sort,
};

fn accumulate(nodes: &mut [TapeNode], idx: u32, contribution: f64, clip: Option<&ClipRange>) {
    let node = &mut nodes[idx as usize];
    node.grad += contribution;
    if let Some(range) = clip {
        node.grad = range.clip(node.grad);
    }
}

/// Add the contributions of node `idx` into its operands' gradients.
///
/// With `clip`, each operand is clamped right after its own update. An
/// operand listed twice (`x + x`) is updated, and clamped, twice.
pub(crate) fn apply_gradient_rule(nodes: &mut [TapeNode], idx: u32, clip: Option<&ClipRange>) {
    let TapeNode {
        value: op,
        data,
        grad,
    } = nodes[idx as usize];
    let value = |i: u32| nodes[i as usize].data;
    match op {
        TapeValue::Leaf => (),
        TapeValue::Add([lhs, rhs]) => {
            accumulate(nodes, lhs, grad, clip);
            accumulate(nodes, rhs, grad, clip);
        }
        TapeValue::Mul([lhs, rhs]) => {
            let (l, r) = (value(lhs), value(rhs));
            accumulate(nodes, lhs, grad * r, clip);
            accumulate(nodes, rhs, grad * l, clip);
        }
        TapeValue::Pow([base, exp]) => {
            let (b, e) = (value(base), value(exp));
            accumulate(nodes, base, e * b.powf(e - 1.) * grad, clip);
            // d(b^e)/de = ln(b) * b^e, undefined unless the base is positive
            if b > 0. {
                accumulate(nodes, exp, b.ln() * data * grad, clip);
            }
        }
        TapeValue::Relu([term]) => {
            if value(term) > 0. {
                accumulate(nodes, term, grad, clip);
            }
        }
    }
    log::trace!("{:?} #{idx}: propagated grad {grad}", op.kind());
}

/// Seed `root` with 1 and walk its subgraph backwards.
///
/// Gradients are added to whatever they already hold; call
/// [`Tape::zero_grad`] first to start from a clean slate.
pub(crate) fn backprop(nodes: &mut [TapeNode], root: u32, config: &TapeConfig) {
    let sorted = topo_sort(nodes, root);
    log::debug!(
        "Backprop from #{root} over {} nodes, clip {:?} {:?}",
        sorted.len(),
        config.clip_mode,
        config.clip_range
    );

    nodes[root as usize].grad = 1.;

    let per_update = match config.clip_mode {
        ClipMode::PerUpdate => Some(&config.clip_range),
        ClipMode::EndOfPass | ClipMode::Disabled => None,
    };
    for &idx in sorted.iter().rev() {
        apply_gradient_rule(nodes, idx, per_update);
    }

    if config.clip_mode == ClipMode::EndOfPass {
        // The seed is not a contribution, so the root is left as is.
        for &idx in sorted.iter().filter(|&&idx| idx != root) {
            let node = &mut nodes[idx as usize];
            node.grad = config.clip_range.clip(node.grad);
        }
    }
}

impl Tape {
    /// Reverse pass from `root`; see [`TapeTerm::backprop`].
    pub fn backprop(&self, root: NodeId) -> Result<(), GraphError> {
        let root = self.check(root)?;
        backprop(&mut self.nodes.borrow_mut(), root, &self.config);
        Ok(())
    }
}

impl<'a> TapeTerm<'a> {
    /// Compute the gradient of this term with respect to every node it depends
    /// on.
    ///
    /// The term's own gradient is set to 1 and the others are accumulated, not
    /// overwritten, so a second pass without [`Tape::zero_grad`] adds on top
    /// of the first.
    pub fn backprop(&self) {
        backprop(
            &mut self.tape.nodes.borrow_mut(),
            self.idx,
            &self.tape.config,
        );
    }
}
