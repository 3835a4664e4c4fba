use std::fmt::Display;

/// Stable handle of a node inside a [`crate::Tape`].
///
/// It is a plain index, so it is only meaningful on the tape that issued it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The closed set of primitive operators a node can record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
    Leaf,
    Add,
    Mul,
    Pow,
    Relu,
}

impl OpKind {
    pub fn arity(&self) -> usize {
        match self {
            Self::Leaf => 0,
            Self::Add | Self::Mul | Self::Pow => 2,
            Self::Relu => 1,
        }
    }
}

/// Operator and operands of a node. The operand count is part of the variant,
/// so a node with the wrong arity cannot exist on the tape.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum TapeValue {
    Leaf,
    Add([u32; 2]),
    Mul([u32; 2]),
    Pow([u32; 2]),
    Relu([u32; 1]),
}

impl TapeValue {
    pub(crate) fn kind(&self) -> OpKind {
        match self {
            Self::Leaf => OpKind::Leaf,
            Self::Add(_) => OpKind::Add,
            Self::Mul(_) => OpKind::Mul,
            Self::Pow(_) => OpKind::Pow,
            Self::Relu(_) => OpKind::Relu,
        }
    }

    pub(crate) fn operands(&self) -> &[u32] {
        match self {
            Self::Leaf => &[],
            Self::Add(terms) | Self::Mul(terms) | Self::Pow(terms) => terms,
            Self::Relu(term) => term,
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct TapeNode {
    pub(crate) value: TapeValue,
    pub(crate) data: f64,
    pub(crate) grad: f64,
}

impl TapeNode {
    pub(crate) fn new(value: TapeValue, data: f64) -> Self {
        Self {
            value,
            data,
            grad: 0.,
        }
    }
}
