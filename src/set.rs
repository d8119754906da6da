use std::{
    cmp::Ordering,
    collections::{btree_set, BTreeSet},
};

use crate::{interval::Interval, key::Key};

/// An [`Interval`] ordered by its end bound (tie-broken by the start bound).
#[derive(Debug, Clone, PartialEq, Eq)]
struct ByEnd<T>(Interval<T>);

impl<T> PartialOrd for ByEnd<T>
where
    T: Ord,
{
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for ByEnd<T>
where
    T: Ord,
{
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .cmp_ends(&other.0)
            .then_with(|| self.0.cmp_starts(&other.0))
    }
}

/// The intervals stored in a single tree node, held in two orders:
///
///   * by start bound, ascending
///   * by end bound, descending
///
/// All intervals contain the owning node's midpoint, so a scan for a point
/// left of the midpoint walks the start order and stops at the first interval
/// starting after the point (and symmetrically for the right side).
#[derive(Debug, Clone)]
pub(crate) struct IntervalSet<T> {
    by_start: BTreeSet<Interval<T>>,
    by_end: BTreeSet<ByEnd<T>>,
}

impl<T> IntervalSet<T> {
    pub(crate) fn len(&self) -> usize {
        debug_assert_eq!(self.by_start.len(), self.by_end.len());
        self.by_start.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.by_start.is_empty()
    }

    /// Iterate over the intervals in start order.
    pub(crate) fn iter(&self) -> btree_set::Iter<'_, Interval<T>> {
        self.by_start.iter()
    }
}

impl<T> IntervalSet<T>
where
    T: Ord + Clone,
{
    pub(crate) fn new(interval: Interval<T>) -> Self {
        let mut s = Self {
            by_start: BTreeSet::new(),
            by_end: BTreeSet::new(),
        };
        s.insert(interval);
        s
    }

    /// Insert `interval`, returning false if it was already present.
    pub(crate) fn insert(&mut self, interval: Interval<T>) -> bool {
        if !self.by_start.insert(interval.clone()) {
            return false;
        }
        let inserted = self.by_end.insert(ByEnd(interval));
        debug_assert!(inserted);
        true
    }

    /// Remove `interval`, returning true if it was present.
    pub(crate) fn remove(&mut self, interval: &Interval<T>) -> bool {
        if !self.by_start.remove(interval) {
            return false;
        }
        let removed = self.by_end.remove(&ByEnd(interval.clone()));
        debug_assert!(removed);
        true
    }

    pub(crate) fn contains(&self, interval: &Interval<T>) -> bool {
        self.by_start.contains(interval)
    }

    /// Remove and return every interval containing `point`.
    ///
    /// All intervals in the set contain `own_midpoint`, so only a prefix of
    /// one of the two orders needs visiting: the start order when `point`
    /// lies left of `own_midpoint`, the descending end order otherwise.
    pub(crate) fn split_off_containing(
        &mut self,
        point: &T,
        own_midpoint: &T,
    ) -> Vec<Interval<T>> {
        let taken: Vec<Interval<T>> = if point < own_midpoint {
            self.by_start
                .iter()
                .take_while(|v| !v.is_right_of(point))
                .cloned()
                .collect()
        } else {
            self.by_end
                .iter()
                .rev()
                .take_while(|v| !v.0.is_left_of(point))
                .map(|v| v.0.clone())
                .collect()
        };

        for v in &taken {
            self.remove(v);
        }

        taken
    }

    /// Call `f` for every interval containing `point`.
    pub(crate) fn scan_point<'a, F>(&'a self, point: &T, midpoint: &T, mut f: F)
    where
        F: FnMut(&'a Interval<T>),
    {
        if point <= midpoint {
            self.by_start
                .iter()
                .take_while(|v| !v.is_right_of(point))
                .for_each(&mut f);
        } else {
            self.by_end
                .iter()
                .rev()
                .take_while(|v| !v.0.is_left_of(point))
                .for_each(|v| f(&v.0));
        }
    }

    /// Call `f` for every interval intersecting `query`.
    pub(crate) fn scan_range<'a, F>(&'a self, query: &Interval<T>, midpoint: &T, mut f: F)
    where
        T: Key,
        F: FnMut(&'a Interval<T>),
    {
        if query.contains(midpoint) {
            // Every interval holds the midpoint, and therefore intersects.
            self.by_start.iter().for_each(f);
        } else if query.is_left_of(midpoint) {
            self.by_start
                .iter()
                .take_while(|v| !query.is_left_of_interval(v))
                .filter(|v| v.intersects(query))
                .for_each(&mut f);
        } else {
            self.by_end
                .iter()
                .rev()
                .take_while(|v| !v.0.is_left_of_interval(query))
                .filter(|v| v.0.intersects(query))
                .for_each(|v| f(&v.0));
        }
    }
}

impl<T> Extend<Interval<T>> for IntervalSet<T>
where
    T: Ord + Clone,
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

impl<T> IntoIterator for IntervalSet<T> {
    type Item = Interval<T>;
    type IntoIter = btree_set::IntoIter<Interval<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.by_start.into_iter()
    }
}
