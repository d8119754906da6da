use std::fmt;

/// A blocking lock acquisition was abandoned because the waiting thread was
/// interrupted through an [`Interrupt`](crate::Interrupt).
///
/// The operation that observed it made no change to the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interrupted;

impl fmt::Display for Interrupted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("interrupted while waiting for a tree lock")
    }
}

impl std::error::Error for Interrupted {}
