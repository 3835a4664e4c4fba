use std::collections::HashSet;

use crate::{
    error::GraphError,
    node::{NodeId, TapeNode},
    tape::{Tape, TapeTerm},
};

/// Depth-first post-order over the operands of `root`.
///
/// Every reachable node is emitted once, after all of its operands. Operands
/// are visited left to right. The walk keeps its own stack, so arbitrarily
/// deep chains are fine, but the order is the same as the recursive version.
pub(crate) fn topo_sort(nodes: &[TapeNode], root: u32) -> Vec<u32> {
    let mut sorted = vec![];
    let mut visited = HashSet::new();
    // (node, next operand to visit)
    let mut stack = vec![(root, 0usize)];
    visited.insert(root);

    while let Some(frame) = stack.last_mut() {
        let (idx, next) = *frame;
        match nodes[idx as usize].value.operands().get(next) {
            Some(&operand) => {
                frame.1 += 1;
                if visited.insert(operand) {
                    stack.push((operand, 0));
                }
            }
            None => {
                sorted.push(idx);
                stack.pop();
            }
        }
    }
    sorted
}

impl Tape {
    /// Nodes reachable from `root`, each after all of its operands. `root` is
    /// always last.
    pub fn topo_sort(&self, root: NodeId) -> Result<Vec<NodeId>, GraphError> {
        let root = self.check(root)?;
        let nodes = self.nodes.borrow();
        Ok(topo_sort(&nodes, root).into_iter().map(NodeId).collect())
    }
}

impl<'a> TapeTerm<'a> {
    pub fn topo_sort(&self) -> Vec<NodeId> {
        let nodes = self.tape.nodes.borrow();
        topo_sort(&nodes, self.idx)
            .into_iter()
            .map(NodeId)
            .collect()
    }
}
