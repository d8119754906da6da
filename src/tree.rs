use log::debug;

use crate::{
    interval::Interval,
    iter::{Cursor, IntoIter, Iter},
    key::Key,
    node::{self, Node},
};

/// A centered interval tree: a set of [`Interval`] values supporting
/// stabbing (point) and overlap (range) queries in `O(log n + k)` time for
/// `k` results.
///
/// Nodes are positioned by a midpoint key and hold every interval containing
/// that midpoint, that contains no midpoint of an ancestor. The tree is kept
/// balanced as an AVL tree.
///
/// ```
/// use centered_interval_tree::{Interval, IntervalTree};
///
/// let mut t = IntervalTree::default();
/// t.insert(Interval::closed(0, 100));
/// t.insert(Interval::closed_open(30, 40));
/// t.insert(Interval::open_closed(10, 20));
///
/// let mut got = t.query_point(&35);
/// got.sort();
/// assert_eq!(got, [&Interval::closed(0, 100), &Interval::closed_open(30, 40)]);
/// ```
#[derive(Debug, Clone)]
pub struct IntervalTree<T> {
    root: Option<Box<Node<T>>>,
    len: usize,
}

impl<T> Default for IntervalTree<T> {
    fn default() -> Self {
        Self { root: None, len: 0 }
    }
}

impl<T> IntervalTree<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of intervals stored in the tree.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Remove all intervals.
    pub fn clear(&mut self) {
        self.root = None;
        self.len = 0;
    }

    /// The height of the tree, 0 when empty.
    pub fn height(&self) -> u8 {
        node::height(self.root())
    }

    /// Iterate over all intervals, ordered by the position of the node storing
    /// them, then by start bound.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self.root())
    }

    pub(crate) fn root(&self) -> Option<&Node<T>> {
        self.root.as_deref()
    }
}

impl<T> IntervalTree<T>
where
    T: Key,
{
    /// Insert `interval` into the tree.
    ///
    /// Returns true if the interval was not already present. Inserting an
    /// empty interval is a no-op, returning false.
    pub fn insert(&mut self, interval: Interval<T>) -> bool {
        if interval.is_empty() {
            return false;
        }

        let inserted = node::insert(&mut self.root, interval);
        if inserted {
            self.len += 1;
        }

        inserted
    }

    /// Remove `interval` from the tree, returning true if it was present.
    pub fn remove(&mut self, interval: &Interval<T>) -> bool {
        if interval.is_empty() {
            return false;
        }

        let removed = node::remove(&mut self.root, interval);
        if removed {
            self.len -= 1;
        }

        removed
    }

    pub fn contains(&self, interval: &Interval<T>) -> bool {
        node::contains(self.root(), interval)
    }

    /// Return all intervals containing `point`, in no particular order.
    pub fn query_point(&self, point: &T) -> Vec<&Interval<T>> {
        let mut out = Vec::new();
        node::query_point(self.root(), point, &mut out);
        out
    }

    /// Return all intervals sharing at least one key with `query`, in no
    /// particular order.
    pub fn query_range(&self, query: &Interval<T>) -> Vec<&Interval<T>> {
        let mut out = Vec::new();
        node::query_range(self.root(), query, &mut out);
        out
    }

    /// Obtain a [`Cursor`] over the intervals, that can remove the interval it
    /// is positioned at.
    pub fn cursor(&mut self) -> Cursor<'_, T> {
        Cursor::new(self)
    }

    /// Retain only the intervals for which `f` returns true.
    pub fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(&Interval<T>) -> bool,
    {
        let before = self.len;

        let mut cursor = self.cursor();
        while let Some(v) = cursor.next() {
            if !f(v) {
                cursor.remove_current();
            }
        }

        debug!("retain removed {} intervals", before - self.len);
    }
}

impl<T> IntoIterator for IntervalTree<T> {
    type Item = Interval<T>;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self.root)
    }
}

impl<'a, T> IntoIterator for &'a IntervalTree<T> {
    type Item = &'a Interval<T>;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T> Extend<Interval<T>> for IntervalTree<T>
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

impl<T> FromIterator<Interval<T>> for IntervalTree<T>
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
