use std::sync::atomic::{AtomicUsize, Ordering};

use log::debug;

use super::{
    lock::Interrupt,
    node::{self, Edge},
};
use crate::{error::Interrupted, interval::Interval, key::Key};

/// A centered interval tree safe to mutate and query from many threads at
/// once.
///
/// Every child pointer is guarded by its own [`PromotableLock`], so
/// mutations of disjoint subtrees proceed in parallel. Restructuring is
/// performed by whichever thread is the last to leave an edge, and is
/// published by swapping in a rebuilt subtree, so queries never wait on it.
///
/// A subtree whose repair was deferred (because the last thread to leave it
/// could not be promoted) may be left unbalanced, or holding an emptied node,
/// until a later mutation passes through it; [`ConcurrentIntervalTree::rebalance()`]
/// restores every invariant at once.
///
/// ```
/// use std::thread;
///
/// use centered_interval_tree::{ConcurrentIntervalTree, Interval};
///
/// let t = ConcurrentIntervalTree::default();
///
/// thread::scope(|s| {
///     for i in 0..4 {
///         let t = &t;
///         s.spawn(move || {
///             for j in 0..25 {
///                 t.insert(Interval::closed_open(i * 100 + j, i * 100 + j + 10));
///             }
///         });
///     }
/// });
///
/// assert_eq!(t.len(), 100);
/// assert_eq!(t.query_point(&5).len(), 6);
/// ```
///
/// [`PromotableLock`]: crate::PromotableLock
#[derive(Debug)]
pub struct ConcurrentIntervalTree<T> {
    root: Edge<T>,
    len: AtomicUsize,

    /// Used by the non-interruptible methods, never triggered.
    uninterruptible: Interrupt,
}

impl<T> Default for ConcurrentIntervalTree<T> {
    fn default() -> Self {
        Self {
            root: Edge::new(None),
            len: AtomicUsize::new(0),
            uninterruptible: Interrupt::new(),
        }
    }
}

impl<T> ConcurrentIntervalTree<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of intervals stored in the tree.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The height of the tree, 0 when empty.
    pub fn height(&self) -> u8 {
        node::height(self.root.load().as_deref())
    }

    /// Obtain a [`Handle`] with its own [`Interrupt`] token, through which
    /// blocking operations can be abandoned from another thread.
    pub fn handle(&self) -> Handle<'_, T> {
        Handle {
            tree: self,
            interrupt: Interrupt::new(),
        }
    }

    #[cfg(test)]
    pub(crate) fn root(&self) -> &Edge<T> {
        &self.root
    }
}

impl<T> ConcurrentIntervalTree<T>
where
    T: Key,
{
    /// Insert `interval`, returning true if it was not already present.
    ///
    /// Inserting an empty interval is a no-op, returning false.
    pub fn insert(&self, interval: Interval<T>) -> bool {
        self.insert_with(interval, &self.uninterruptible)
            .expect("private interrupt token is never triggered")
    }

    /// Remove `interval`, returning true if it was present.
    pub fn remove(&self, interval: &Interval<T>) -> bool {
        self.remove_with(interval, &self.uninterruptible)
            .expect("private interrupt token is never triggered")
    }

    pub fn contains(&self, interval: &Interval<T>) -> bool {
        node::contains(&self.root, interval, &self.uninterruptible)
            .expect("private interrupt token is never triggered")
    }

    /// Return a copy of every interval containing `point`, in no particular
    /// order.
    pub fn query_point(&self, point: &T) -> Vec<Interval<T>> {
        let mut out = Vec::new();
        node::query_point(&self.root, point, &self.uninterruptible, &mut out)
            .expect("private interrupt token is never triggered");
        out
    }

    /// Return a copy of every interval sharing at least one key with
    /// `query`, in no particular order.
    pub fn query_range(&self, query: &Interval<T>) -> Vec<Interval<T>> {
        let mut out = Vec::new();
        node::query_range(&self.root, query, &self.uninterruptible, &mut out)
            .expect("private interrupt token is never triggered");
        out
    }

    /// Return a copy of every interval, ordered by the position of the node
    /// storing them, then by start bound.
    pub fn to_vec(&self) -> Vec<Interval<T>> {
        let mut out = Vec::new();
        node::collect_in_order(&self.root, &self.uninterruptible, &mut out)
            .expect("private interrupt token is never triggered");
        out
    }

    /// Wait for exclusive access to the whole tree, then unlink every empty
    /// node and rebalance every subtree.
    pub fn rebalance(&self) {
        self.rebalance_with(&self.uninterruptible)
            .expect("private interrupt token is never triggered")
    }

    fn insert_with(
        &self,
        interval: Interval<T>,
        interrupt: &Interrupt,
    ) -> Result<bool, Interrupted> {
        if interval.is_empty() {
            return Ok(false);
        }

        let inserted = self.root.insert(interval, interrupt)?;
        if inserted {
            self.len.fetch_add(1, Ordering::AcqRel);
        }

        Ok(inserted)
    }

    fn remove_with(
        &self,
        interval: &Interval<T>,
        interrupt: &Interrupt,
    ) -> Result<bool, Interrupted> {
        if interval.is_empty() {
            return Ok(false);
        }

        let removed = self.root.remove(interval, interrupt)?;
        if removed {
            self.len.fetch_sub(1, Ordering::AcqRel);
        }

        Ok(removed)
    }

    fn rebalance_with(&self, interrupt: &Interrupt) -> Result<(), Interrupted> {
        let _guard = self.root.lock().write(interrupt)?;

        let rebuilt = node::rebuild(self.root.load());
        self.root.store(rebuilt);

        debug!("rebalanced whole tree, height {}", self.height());
        Ok(())
    }
}

impl<T> Extend<Interval<T>> for ConcurrentIntervalTree<T>
where
    T: Key,
{
    fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = Interval<T>>,
    {
        for v in iter {
            self.insert(v);
        }
    }
}

impl<T> FromIterator<Interval<T>> for ConcurrentIntervalTree<T>
where
    T: Key,
{
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = Interval<T>>,
    {
        let mut t = Self::default();
        t.extend(iter);
        t
    }
}

/// An interruptible view of a [`ConcurrentIntervalTree`].
///
/// Every blocking method returns [`Interrupted`] if the handle's
/// [`Interrupt`] is triggered while it waits for a lock, leaving the tree
/// unchanged. The interruption is consumed by the method that reports it.
#[derive(Debug)]
pub struct Handle<'a, T> {
    tree: &'a ConcurrentIntervalTree<T>,
    interrupt: Interrupt,
}

impl<T> Clone for Handle<'_, T> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree,
            interrupt: self.interrupt.clone(),
        }
    }
}

impl<T> Handle<'_, T> {
    /// The token interrupting this handle's blocked operations.
    pub fn interrupter(&self) -> Interrupt {
        self.interrupt.clone()
    }
}

impl<T> Handle<'_, T>
where
    T: Key,
{
    pub fn insert(&self, interval: Interval<T>) -> Result<bool, Interrupted> {
        self.tree.insert_with(interval, &self.interrupt)
    }

    pub fn remove(&self, interval: &Interval<T>) -> Result<bool, Interrupted> {
        self.tree.remove_with(interval, &self.interrupt)
    }

    pub fn contains(&self, interval: &Interval<T>) -> Result<bool, Interrupted> {
        node::contains(&self.tree.root, interval, &self.interrupt)
    }

    pub fn query_point(&self, point: &T) -> Result<Vec<Interval<T>>, Interrupted> {
        let mut out = Vec::new();
        node::query_point(&self.tree.root, point, &self.interrupt, &mut out)?;
        Ok(out)
    }

    pub fn query_range(&self, query: &Interval<T>) -> Result<Vec<Interval<T>>, Interrupted> {
        let mut out = Vec::new();
        node::query_range(&self.tree.root, query, &self.interrupt, &mut out)?;
        Ok(out)
    }

    pub fn rebalance(&self) -> Result<(), Interrupted> {
        self.tree.rebalance_with(&self.interrupt)
    }
}
