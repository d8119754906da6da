use std::collections::{BTreeMap, BTreeSet, VecDeque};

use log::trace;

use crate::{interval::Interval, key::Key, node, tree::IntervalTree};

/// An in-order cursor over an [`IntervalTree`] that can remove the interval
/// it last yielded.
///
/// Nodes are addressed by their midpoint, so the cursor survives the
/// restructuring (rotations, node unlinking, interval assimilation) a removal
/// may cause: every interval present when the cursor was created is yielded
/// exactly once, unless removed before being reached.
///
/// Addressing by midpoint has a cost: entering each node looks it up from the
/// root in `O(log n)` and copies its interval set, so a full pass is
/// `O(n log n)` rather than the `O(n)` of [`IntervalTree::iter()`]. Use the
/// cursor only when removing while iterating.
///
/// ```
/// use centered_interval_tree::{Interval, IntervalTree};
///
/// let mut t = IntervalTree::default();
/// t.insert(Interval::closed(0, 10));
/// t.insert(Interval::closed(20, 30));
///
/// let mut cursor = t.cursor();
/// while let Some(v) = cursor.next() {
///     if v.contains(&25) {
///         cursor.remove_current();
///     }
/// }
///
/// assert_eq!(t.iter().collect::<Vec<_>>(), [&Interval::closed(0, 10)]);
/// ```
#[derive(Debug)]
pub struct Cursor<'a, T> {
    tree: &'a mut IntervalTree<T>,

    /// Midpoints of the nodes still to visit, the next on top.
    stack: Vec<T>,

    /// Midpoint of the node being visited.
    node: Option<T>,

    /// The intervals of the node being visited not yet yielded.
    pending: VecDeque<Interval<T>>,

    /// Intervals already yielded, and since moved into a node not yet visited.
    skip: BTreeSet<Interval<T>>,

    current: Option<Interval<T>>,
}

impl<'a, T> Cursor<'a, T>
where
    T: Key,
{
    pub(crate) fn new(tree: &'a mut IntervalTree<T>) -> Self {
        let mut this = Self {
            tree,
            stack: vec![],
            node: None,
            pending: VecDeque::new(),
            skip: BTreeSet::new(),
            current: None,
        };

        this.descend(None);
        this
    }

    /// Advance the cursor, returning the next interval.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<&Interval<T>> {
        self.current = None;

        loop {
            if let Some(v) = self.pending.pop_front() {
                if self.skip.remove(&v) {
                    continue;
                }
                return Some(&*self.current.insert(v));
            }

            let mid = self.stack.pop()?;
            let n = node::find(self.tree.root(), &mid)
                .expect("cursor stack holds the midpoints of linked nodes");

            self.pending.extend(n.intervals().iter().cloned());

            // Descend down the left side of the right hand child of this node,
            // if any.
            let mut ptr = n.right();
            while let Some(v) = ptr {
                self.stack.push(v.midpoint().clone());
                ptr = v.left();
            }

            self.node = Some(mid);
        }
    }

    /// Remove the interval last returned by [`Cursor::next()`] from the tree.
    ///
    /// Returns false if there is no such interval, or it was already removed.
    pub fn remove_current(&mut self) -> bool {
        let interval = match self.current.take() {
            Some(v) => v,
            None => return false,
        };
        let mid = match self.node.clone() {
            Some(v) => v,
            None => return false,
        };

        // Removing anything but the last interval of a node leaves the tree
        // structure untouched.
        let unlinks = node::find_holder(self.tree.root(), &interval)
            .is_some_and(|n| n.intervals().len() == 1);
        if !unlinks {
            return self.tree.remove(&interval);
        }

        // Unlinking a node may move intervals between nodes, and any moving
        // between a visited and an unvisited node spans the cursor position.
        // Those moving into a visited node must still be yielded, and those
        // moving into an unvisited node must not be yielded twice.
        let before = self.spanning(&mid);
        let removed = self.tree.remove(&interval);
        let after = self.spanning(&mid);

        for (v, visited) in before {
            match (visited, after.get(&v)) {
                (true, Some(false)) => {
                    self.skip.insert(v);
                }
                (false, Some(true)) => self.pending.push_back(v),
                _ => {}
            }
        }

        self.descend(Some(&mid));
        trace!("rebuilt cursor stack after unlinking node");

        removed
    }

    /// Rebuild the stack of nodes to visit with every node positioned after
    /// `after`, or all nodes if [`None`].
    fn descend(&mut self, after: Option<&T>) {
        self.stack.clear();

        let mut ptr = self.tree.root();
        while let Some(n) = ptr {
            match after {
                Some(mid) if n.midpoint() <= mid => ptr = n.right(),
                _ => {
                    self.stack.push(n.midpoint().clone());
                    ptr = n.left();
                }
            }
        }
    }

    /// Map every interval containing `mid` (outside of the node positioned at
    /// `mid`, if any) to true if it is stored in a node the cursor already
    /// visited.
    fn spanning(&self, mid: &T) -> BTreeMap<Interval<T>, bool> {
        let mut out = BTreeMap::new();

        node::for_each_containing(self.tree.root(), mid, |n, v| {
            if n.midpoint() != mid {
                out.insert(v.clone(), n.midpoint() < mid);
            }
        });

        out
    }
}
