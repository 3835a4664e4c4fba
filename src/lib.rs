mod backprop;
pub mod config;
pub mod error;
mod node;
mod ops;
pub mod tape;
mod topo;

pub use config::{ClipMode, ClipRange, TapeConfig};
pub use error::GraphError;
pub use node::{NodeId, OpKind};
pub use tape::{Tape, TapeTerm};
