//! A [centered interval tree] over arbitrary ordered keys.
//!
//! Intervals are stored in the nodes of an AVL tree positioned by midpoint:
//! each node holds every interval containing its midpoint that contains the
//! midpoint of none of its ancestors, ordered both by start and by end so
//! that stabbing (point) and overlap (range) queries visit only the
//! intervals they return, plus one root-to-leaf path.
//!
//! * [`IntervalTree`]: the single-threaded tree, with borrowing and owning
//!   iterators and a [`Cursor`] able to remove intervals mid-iteration.
//! * [`ConcurrentIntervalTree`]: a tree safe to share between threads,
//!   guarding every child pointer with a [`PromotableLock`] and restructuring
//!   by copy-on-write.
//!
//! Interval bounds may be open, closed or unbounded, over any type
//! implementing [`Key`]: the primitive integers, [`Real`] and (with the
//! `chrono` feature, enabled by default) chrono date-times.
//!
//! ```
//! use centered_interval_tree::{Interval, IntervalTree};
//!
//! let mut t = IntervalTree::default();
//! t.insert(Interval::closed_open(0, 10));
//! t.insert(Interval::closed(5, 20));
//! t.insert(Interval::less_than(3));
//!
//! let mut got = t.query_range(&Interval::closed(1, 6));
//! got.sort();
//! assert_eq!(got.len(), 3);
//! ```
//!
//! [centered interval tree]: https://en.wikipedia.org/wiki/Interval_tree#Centered_interval_tree

mod error;
mod interval;
mod iter;
mod key;
mod node;
mod set;
mod sync;
mod tree;

pub use error::*;
pub use interval::*;
pub use iter::*;
pub use key::*;
pub use sync::*;
pub use tree::*;

#[cfg(test)]
mod test_utils;

