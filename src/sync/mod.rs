//! A concurrent variant of the centered interval tree.

mod lock;
pub(crate) mod node;
mod tree;

pub use lock::*;
pub use tree::*;
