use crate::node::{NodeId, OpKind};
use thiserror::Error;

/// Errors raised while building or differentiating a tape.
///
/// Numeric trouble (NaN, infinities) is never reported here; it flows through
/// the values and gradients like any other float.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("{kind:?} takes {expected} operand(s), got {actual}")]
    InvalidArity {
        kind: OpKind,
        expected: usize,
        actual: usize,
    },

    #[error("Leaves are created with a value, not as an operator")]
    LeafOperator,

    #[error("Tape is full: the node limit of {limit} was reached")]
    CapacityExceeded { limit: usize },

    #[error("Node {id} does not exist on this tape ({len} nodes)")]
    InvalidHandle { id: NodeId, len: usize },

    #[error("Terms from different tapes cannot be combined")]
    ForeignTerm,

    #[error("Invalid gradient clip range [{min}, {max}]")]
    InvalidClipRange { min: f64, max: f64 },
}
