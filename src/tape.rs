//! Implementation of shared memory arena for the terms, aka a tape.
//! See https://rufflewind.com/2016-12-30/reverse-mode-automatic-differentiation
//!
//! Every node of a computation lives in one `Vec` owned by the [`Tape`] and is
//! addressed by its index. Nodes are never removed one by one, so a node that
//! is shared by many parents stays valid for as long as the tape does.

use std::cell::RefCell;

use crate::{
    config::TapeConfig,
    error::GraphError,
    node::{NodeId, OpKind, TapeNode, TapeValue},
};

#[derive(Default, Debug)]
pub struct Tape {
    pub(crate) nodes: RefCell<Vec<TapeNode>>,
    pub(crate) config: TapeConfig,
}

/// A handle to a node, bound to the tape that created it.
#[derive(Copy, Clone)]
pub struct TapeTerm<'a> {
    pub(crate) tape: &'a Tape,
    pub(crate) idx: u32,
}

impl Tape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TapeConfig) -> Result<Self, GraphError> {
        config.validate()?;
        Ok(Self {
            nodes: RefCell::new(vec![]),
            config,
        })
    }

    pub fn config(&self) -> &TapeConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.borrow().is_empty()
    }

    /// Append a leaf holding `value` with a zero gradient.
    pub fn create_leaf(&self, value: f64) -> Result<NodeId, GraphError> {
        self.push(TapeNode::new(TapeValue::Leaf, value))
    }

    /// Append an operator node and compute its forward value from the operands.
    ///
    /// Leaves carry a value of their own and go through [`Tape::create_leaf`];
    /// `OpKind::Leaf` is rejected here.
    pub fn create_op(&self, kind: OpKind, operands: &[NodeId]) -> Result<NodeId, GraphError> {
        if operands.len() != kind.arity() {
            return Err(GraphError::InvalidArity {
                kind,
                expected: kind.arity(),
                actual: operands.len(),
            });
        }
        let len = self.len();
        if let Some(&id) = operands.iter().find(|id| id.index() >= len) {
            return Err(GraphError::InvalidHandle { id, len });
        }

        let node = {
            let nodes = self.nodes.borrow();
            let data = |i: usize| nodes[operands[i].index()].data;
            let pair = || [operands[0].0, operands[1].0];
            match kind {
                OpKind::Leaf => return Err(GraphError::LeafOperator),
                OpKind::Add => TapeNode::new(TapeValue::Add(pair()), data(0) + data(1)),
                OpKind::Mul => TapeNode::new(TapeValue::Mul(pair()), data(0) * data(1)),
                OpKind::Pow => TapeNode::new(TapeValue::Pow(pair()), data(0).powf(data(1))),
                OpKind::Relu => {
                    let x = data(0);
                    // NaN survives, anything negative is cut to zero
                    let y = if x < 0. { 0. } else { x };
                    TapeNode::new(TapeValue::Relu([operands[0].0]), y)
                }
            }
        };
        self.push(node)
    }

    fn push(&self, node: TapeNode) -> Result<NodeId, GraphError> {
        let mut nodes = self.nodes.borrow_mut();
        let limit = self
            .config
            .max_nodes
            .unwrap_or(u32::MAX as usize)
            .min(u32::MAX as usize);
        if limit <= nodes.len() {
            log::warn!("Tape rejected a {:?} node at its limit of {limit}", node.value.kind());
            return Err(GraphError::CapacityExceeded { limit });
        }
        let idx = nodes.len() as u32;
        nodes.push(node);
        Ok(NodeId(idx))
    }

    /// Run `build`, dropping every node it appended if it fails part way.
    pub(crate) fn atomic<T>(
        &self,
        build: impl FnOnce() -> Result<T, GraphError>,
    ) -> Result<T, GraphError> {
        let len = self.len();
        let res = build();
        if res.is_err() {
            self.nodes.borrow_mut().truncate(len);
        }
        res
    }

    pub(crate) fn check(&self, id: NodeId) -> Result<u32, GraphError> {
        let len = self.len();
        if id.index() < len {
            Ok(id.0)
        } else {
            Err(GraphError::InvalidHandle { id, len })
        }
    }

    /// Wrap an existing node id into a term bound to this tape.
    pub fn term(&self, id: NodeId) -> Result<TapeTerm<'_>, GraphError> {
        let idx = self.check(id)?;
        Ok(TapeTerm { tape: self, idx })
    }

    pub fn value(&self, id: NodeId) -> Result<f64, GraphError> {
        let idx = self.check(id)?;
        Ok(self.nodes.borrow()[idx as usize].data)
    }

    pub fn grad(&self, id: NodeId) -> Result<f64, GraphError> {
        let idx = self.check(id)?;
        Ok(self.nodes.borrow()[idx as usize].grad)
    }

    pub fn kind(&self, id: NodeId) -> Result<OpKind, GraphError> {
        let idx = self.check(id)?;
        Ok(self.nodes.borrow()[idx as usize].value.kind())
    }

    /// Operands of a node, in the order they were given.
    pub fn operands(&self, id: NodeId) -> Result<Vec<NodeId>, GraphError> {
        let idx = self.check(id)?;
        let nodes = self.nodes.borrow();
        Ok(nodes[idx as usize]
            .value
            .operands()
            .iter()
            .map(|&i| NodeId(i))
            .collect())
    }

    /// Reset every gradient on the tape to zero.
    ///
    /// The reverse pass adds into gradients and never resets them, so this has
    /// to be called between two passes over the same graph.
    pub fn zero_grad(&self) {
        for node in self.nodes.borrow_mut().iter_mut() {
            node.grad = 0.;
        }
    }

    /// Drop the whole graph at once. No term can be alive across this call.
    pub fn clear(&mut self) {
        let nodes = self.nodes.get_mut();
        log::debug!("Clearing tape of {} nodes", nodes.len());
        nodes.clear();
    }
}

impl<'a> TapeTerm<'a> {
    pub fn id(&self) -> NodeId {
        NodeId(self.idx)
    }

    pub fn tape(&self) -> &'a Tape {
        self.tape
    }

    pub fn value(&self) -> f64 {
        self.tape.nodes.borrow()[self.idx as usize].data
    }

    pub fn grad(&self) -> f64 {
        self.tape.nodes.borrow()[self.idx as usize].grad
    }

    pub fn kind(&self) -> OpKind {
        self.tape.nodes.borrow()[self.idx as usize].value.kind()
    }
}

impl<'a> std::fmt::Debug for TapeTerm<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let nodes = self.tape.nodes.borrow();
        let node = &nodes[self.idx as usize];
        f.debug_struct("TapeTerm")
            .field("id", &self.idx)
            .field("value", &node.value)
            .field("data", &node.data)
            .field("grad", &node.grad)
            .finish()
    }
}
