use std::{
    cmp::Ordering,
    sync::{
        atomic::{self, AtomicU8},
        Arc,
    },
};

use log::trace;
use parking_lot::{Mutex, RwLock};

use super::lock::{Interrupt, PromotableLock, ReadGuard};
use crate::{error::Interrupted, interval::Interval, key::Key, set::IntervalSet};

type SharedSet<T> = Arc<RwLock<IntervalSet<T>>>;

/// A child pointer of a concurrent [`Node`], and the lock guarding it.
///
/// Threads mutating the subtree below an edge hold its read lock for the
/// whole descent. The last of them to leave promotes to a writer, and with
/// the subtree to itself repairs it and publishes the replacement root.
#[derive(Debug)]
pub(crate) struct Edge<T> {
    lock: PromotableLock,
    child: Mutex<Option<Arc<Node<T>>>>,
}

impl<T> Edge<T> {
    pub(crate) fn new(child: Option<Arc<Node<T>>>) -> Self {
        Self {
            lock: PromotableLock::new(),
            child: Mutex::new(child),
        }
    }

    /// The current child, without taking the edge lock.
    pub(crate) fn load(&self) -> Option<Arc<Node<T>>> {
        self.child.lock().clone()
    }

    pub(crate) fn store(&self, child: Option<Arc<Node<T>>>) {
        *self.child.lock() = child;
    }

    pub(crate) fn lock(&self) -> &PromotableLock {
        &self.lock
    }

    /// Read the child under the edge lock, releasing it before returning.
    pub(crate) fn read_child(
        &self,
        interrupt: &Interrupt,
    ) -> Result<Option<Arc<Node<T>>>, Interrupted> {
        let _guard = self.lock.read(interrupt)?;
        Ok(self.load())
    }

    fn child_height(&self) -> u8 {
        self.child.lock().as_deref().map(Node::height).unwrap_or_default()
    }
}

impl<T> Edge<T>
where
    T: Key,
{
    /// Insert `interval` into the subtree below this edge, creating the
    /// child node if there is none.
    pub(crate) fn insert(
        &self,
        interval: Interval<T>,
        interrupt: &Interrupt,
    ) -> Result<bool, Interrupted> {
        loop {
            let guard = self.lock.read(interrupt)?;

            if let Some(child) = self.load() {
                let inserted = child.insert(interval, interrupt)?;
                if inserted {
                    self.settle(guard);
                }
                return Ok(inserted);
            }

            // Creating the child needs the edge to itself.
            drop(guard);
            let _guard = self.lock.write(interrupt)?;

            if self.load().is_some() {
                // Another thread created it first.
                continue;
            }

            let midpoint = match interval.midpoint() {
                Some(v) => v,
                None => return Ok(false),
            };

            trace!("creating concurrent node for new interval");
            self.store(Some(Arc::new(Node::new(midpoint, interval))));
            return Ok(true);
        }
    }

    /// Remove `interval` from the subtree below this edge.
    pub(crate) fn remove(
        &self,
        interval: &Interval<T>,
        interrupt: &Interrupt,
    ) -> Result<bool, Interrupted> {
        let guard = self.lock.read(interrupt)?;

        let child = match self.load() {
            Some(v) => v,
            None => return Ok(false),
        };

        let removed = child.remove(interval, interrupt)?;
        if removed {
            self.settle(guard);
        }

        Ok(removed)
    }

    /// Repair the subtree below this edge if `guard` is the last reader,
    /// releasing the lock either way.
    fn settle(&self, guard: ReadGuard<'_>) {
        match guard.try_promote() {
            Ok(_guard) => {
                trace!("promoted to writer, repairing subtree");
                let repaired = self.load().and_then(repair);
                self.store(repaired);
            }
            Err(_guard) => trace!("promotion refused, deferring repair"),
        }
    }
}

/// A node of the concurrent tree.
///
/// Once published, a node's position (midpoint) and children never change:
/// restructuring builds replacement nodes and swaps them into the parent
/// edge, so a reader holding an old node keeps a consistent view of the
/// subtree below it. Only the height is refreshed in place, under the write
/// lock of the edge above the node. The interval set is shared between a node and its
/// replacements, and only copied when restructuring moves intervals out of
/// or into it.
///
/// A removal that empties a node leaves it in place until a thread is
/// promoted on the edge above it.
#[derive(Debug)]
pub(crate) struct Node<T> {
    midpoint: T,
    intervals: SharedSet<T>,

    /// Recomputed in place on repair, under the parent edge's write lock.
    height: AtomicU8,

    left: Edge<T>,
    right: Edge<T>,
}

impl<T> Node<T> {
    pub(crate) fn midpoint(&self) -> &T {
        &self.midpoint
    }

    pub(crate) fn height(&self) -> u8 {
        self.height.load(atomic::Ordering::Relaxed)
    }

    pub(crate) fn left_edge(&self) -> &Edge<T> {
        &self.left
    }

    pub(crate) fn right_edge(&self) -> &Edge<T> {
        &self.right
    }

    fn is_empty(&self) -> bool {
        self.intervals.read().is_empty()
    }

    fn update_height(&self) {
        let h = 1 + self.left.child_height().max(self.right.child_height());
        self.height.store(h, atomic::Ordering::Relaxed);
    }

    /// Compute the "balance factor" of the subtree rooted at this node; a
    /// positive number when left heavy.
    fn balance(&self) -> i16 {
        self.left.child_height() as i16 - self.right.child_height() as i16
    }
}

impl<T> Node<T>
where
    T: Key,
{
    pub(crate) fn new(midpoint: T, interval: Interval<T>) -> Self {
        debug_assert!(interval.contains(&midpoint));

        Self {
            midpoint,
            intervals: Arc::new(RwLock::new(IntervalSet::new(interval))),
            height: AtomicU8::new(1),
            left: Edge::new(None),
            right: Edge::new(None),
        }
    }

    /// Build an unpublished node positioned at `midpoint`.
    fn build(
        midpoint: T,
        intervals: SharedSet<T>,
        left: Option<Arc<Self>>,
        right: Option<Arc<Self>>,
    ) -> Arc<Self> {
        let height = 1 + height(left.as_deref()).max(height(right.as_deref()));

        Arc::new(Self {
            midpoint,
            intervals,
            height: AtomicU8::new(height),
            left: Edge::new(left),
            right: Edge::new(right),
        })
    }

    /// A copy of the intervals stored in this node, in start order.
    pub(crate) fn intervals_snapshot(&self) -> Vec<Interval<T>> {
        self.intervals.read().iter().cloned().collect()
    }

    fn insert(&self, interval: Interval<T>, interrupt: &Interrupt) -> Result<bool, Interrupted> {
        if interval.contains(&self.midpoint) {
            return Ok(self.intervals.write().insert(interval));
        }

        if interval.is_left_of(&self.midpoint) {
            self.left.insert(interval, interrupt)
        } else {
            debug_assert!(interval.is_right_of(&self.midpoint));
            self.right.insert(interval, interrupt)
        }
    }

    fn remove(&self, interval: &Interval<T>, interrupt: &Interrupt) -> Result<bool, Interrupted> {
        if interval.contains(&self.midpoint) {
            return Ok(self.intervals.write().remove(interval));
        }

        if interval.is_left_of(&self.midpoint) {
            self.left.remove(interval, interrupt)
        } else if interval.is_right_of(&self.midpoint) {
            self.right.remove(interval, interrupt)
        } else {
            Ok(false)
        }
    }
}

pub(crate) fn height<T>(n: Option<&Node<T>>) -> u8 {
    n.map(Node::height).unwrap_or_default()
}

/// Returns true if `interval` is stored below `edge`.
pub(crate) fn contains<T>(
    edge: &Edge<T>,
    interval: &Interval<T>,
    interrupt: &Interrupt,
) -> Result<bool, Interrupted>
where
    T: Key,
{
    if interval.is_empty() {
        return Ok(false);
    }

    let mut next = edge.read_child(interrupt)?;
    while let Some(n) = next {
        if interval.contains(n.midpoint()) {
            return Ok(n.intervals.read().contains(interval));
        }

        next = if interval.is_left_of(n.midpoint()) {
            n.left.read_child(interrupt)?
        } else {
            n.right.read_child(interrupt)?
        };
    }

    Ok(false)
}

/// Push a copy of every interval below `edge` containing `point` into `out`.
pub(crate) fn query_point<T>(
    edge: &Edge<T>,
    point: &T,
    interrupt: &Interrupt,
    out: &mut Vec<Interval<T>>,
) -> Result<(), Interrupted>
where
    T: Key,
{
    let mut next = edge.read_child(interrupt)?;

    while let Some(n) = next {
        n.intervals
            .read()
            .scan_point(point, n.midpoint(), |v| out.push(v.clone()));

        next = match point.cmp(n.midpoint()) {
            Ordering::Less => n.left.read_child(interrupt)?,
            Ordering::Equal => None,
            Ordering::Greater => n.right.read_child(interrupt)?,
        };
    }

    Ok(())
}

/// Push a copy of every interval below `edge` intersecting `query` into
/// `out`.
pub(crate) fn query_range<T>(
    edge: &Edge<T>,
    query: &Interval<T>,
    interrupt: &Interrupt,
    out: &mut Vec<Interval<T>>,
) -> Result<(), Interrupted>
where
    T: Key,
{
    if query.is_empty() {
        return Ok(());
    }

    let mut stack: Vec<Arc<Node<T>>> = edge.read_child(interrupt)?.into_iter().collect();

    while let Some(n) = stack.pop() {
        n.intervals
            .read()
            .scan_range(query, n.midpoint(), |v| out.push(v.clone()));

        // A subtree on the far side of a midpoint outside the query holds
        // nothing that can intersect it.
        if query.contains(n.midpoint()) {
            stack.extend(n.left.read_child(interrupt)?);
            stack.extend(n.right.read_child(interrupt)?);
        } else if query.is_left_of(n.midpoint()) {
            stack.extend(n.left.read_child(interrupt)?);
        } else {
            stack.extend(n.right.read_child(interrupt)?);
        }
    }

    Ok(())
}

/// Push a copy of every interval below `edge` into `out`, ordered by node
/// position then start bound.
pub(crate) fn collect_in_order<T>(
    edge: &Edge<T>,
    interrupt: &Interrupt,
    out: &mut Vec<Interval<T>>,
) -> Result<(), Interrupted>
where
    T: Key,
{
    let n = match edge.read_child(interrupt)? {
        Some(v) => v,
        None => return Ok(()),
    };

    collect_in_order(n.left_edge(), interrupt, out)?;
    out.extend(n.intervals_snapshot());
    collect_in_order(n.right_edge(), interrupt, out)
}

/// Repair the subtree rooted at `n` after a mutation below it: unlink `n` if
/// it was emptied, otherwise refresh its height and restore its balance.
///
/// The caller must hold the write lock on the edge pointing at `n`.
fn repair<T>(n: Arc<Node<T>>) -> Option<Arc<Node<T>>>
where
    T: Key,
{
    if n.is_empty() {
        return delete_node(&n);
    }

    Some(rebalance(n))
}

/// Rebuild the whole subtree below `n`, unlinking every empty node and
/// restoring the balance of every node.
///
/// The caller must hold the write lock on the edge pointing at `n`.
pub(crate) fn rebuild<T>(n: Option<Arc<Node<T>>>) -> Option<Arc<Node<T>>>
where
    T: Key,
{
    let n = n?;

    let left = rebuild(n.left.load());
    let right = rebuild(n.right.load());
    let m = Node::build(n.midpoint.clone(), Arc::clone(&n.intervals), left, right);

    if m.is_empty() {
        return delete_node(&m);
    }

    Some(rebalance(m))
}

/// Restore the AVL property of the subtree rooted at `n`, the children of
/// which must already be balanced, returning the (possibly new) subtree root.
fn rebalance<T>(mut n: Arc<Node<T>>) -> Arc<Node<T>>
where
    T: Key,
{
    loop {
        n.update_height();

        n = match n.balance() {
            (2..) => {
                let left = n.left.load().expect("left heavy node has a left child");
                if left.balance() < 0 {
                    let left = rotate_left(&left);
                    n = Node::build(
                        n.midpoint.clone(),
                        Arc::clone(&n.intervals),
                        Some(left),
                        n.right.load(),
                    );
                }
                rotate_right(&n)
            }
            (..=-2) => {
                let right = n.right.load().expect("right heavy node has a right child");
                if right.balance() > 0 {
                    let right = rotate_right(&right);
                    n = Node::build(
                        n.midpoint.clone(),
                        Arc::clone(&n.intervals),
                        n.left.load(),
                        Some(right),
                    );
                }
                rotate_left(&n)
            }
            _ => break,
        };
    }

    debug_assert!(n.balance().abs() <= 1);
    n
}

/// Build the left rotation of the subtree rooted at `x`, promoting its
/// right child `P` and moving every interval of `x` containing the midpoint
/// of `P` up into it.
///
/// ```text
///
///      x
///     / \                               P
///    1   P         Rotate Left        /   \
///       / \      --------------->    x     y
///      2   y                        / \   / \
///         / \                      1   2 3   4
///        3   4
/// ```
///
/// `x` is unlinked if this leaves it empty.
///
/// # Panics
///
/// Panics if `x` has no right child.
fn rotate_left<T>(x: &Node<T>) -> Arc<Node<T>>
where
    T: Key,
{
    let p = x.right.load().expect("left rotation requires a right child");
    trace!("rotating left (copy on write)");

    let (demoted_set, taken) = split_containing(&x.intervals, &p.midpoint, &x.midpoint);
    let head_set = merge(&p.intervals, taken);

    let demoted = Node::build(
        x.midpoint.clone(),
        demoted_set,
        x.left.load(),
        p.left.load(),
    );
    let demoted = repair(demoted);

    Node::build(p.midpoint.clone(), head_set, demoted, p.right.load())
}

/// The mirror of [`rotate_left()`].
///
/// ```text
///          y
///         / \                           P
///        P   4     Rotate Right       /   \
///       / \      --------------->    x     y
///      x   3                        / \   / \
///     / \                          1   2 3   4
///    1   2
/// ```
///
/// # Panics
///
/// Panics if `y` has no left child.
fn rotate_right<T>(y: &Node<T>) -> Arc<Node<T>>
where
    T: Key,
{
    let p = y.left.load().expect("right rotation requires a left child");
    trace!("rotating right (copy on write)");

    let (demoted_set, taken) = split_containing(&y.intervals, &p.midpoint, &y.midpoint);
    let head_set = merge(&p.intervals, taken);

    let demoted = Node::build(
        y.midpoint.clone(),
        demoted_set,
        p.right.load(),
        y.right.load(),
    );
    let demoted = repair(demoted);

    Node::build(p.midpoint.clone(), head_set, p.left.load(), demoted)
}

/// Split the intervals of `set` containing `point` from the rest, copying
/// the set only if any do.
fn split_containing<T>(
    set: &SharedSet<T>,
    point: &T,
    own_midpoint: &T) -> (SharedSet<T>, Vec<Interval<T>>,
)
where
    T: Key,
{
    let mut taken = Vec::new();
    set.read().scan_point(point, own_midpoint, |v| taken.push(v.clone()));

    if taken.is_empty() {
        return (Arc::clone(set), taken);
    }

    let mut rest = set.read().clone();
    for v in &taken {
        rest.remove(v);
    }

    (Arc::new(RwLock::new(rest)), taken)
}

/// Add `taken` to a copy of `set`, or share `set` if there is nothing to add.
fn merge<T>(set: &SharedSet<T>, taken: Vec<Interval<T>>) -> SharedSet<T>
where
    T: Key,
{
    if taken.is_empty() {
        return Arc::clone(set);
    }

    trace!("assimilated {} intervals into promoted node", taken.len());

    let mut merged = set.read().clone();
    merged.extend(taken);
    Arc::new(RwLock::new(merged))
}

/// Build the balanced replacement for the empty node `n`.
///
/// A node with two children is replaced by its in-order predecessor, into
/// which the intervals along the right spine of the remaining left subtree
/// that contain its midpoint are pulled.
fn delete_node<T>(n: &Node<T>) -> Option<Arc<Node<T>>>
where
    T: Key,
{
    trace!("unlinking empty concurrent node");

    let (left, right) = match (n.left.load(), n.right.load()) {
        (None, None) => return None,
        (Some(v), None) | (None, Some(v)) => return Some(v),
        (Some(l), Some(r)) => (l, r),
    };

    let (rest, pred) = extract_max(&left);

    let mut taken = Vec::new();
    let rest = absorb_spine(&pred.midpoint, &mut taken, rest);
    let head_set = merge(&pred.intervals, taken);

    let replacement = Node::build(
        pred.midpoint.clone(),
        head_set,
        rest,
        Some(right),
    );
    Some(rebalance(replacement))
}

/// Split the node with the maximum midpoint from the subtree rooted at
/// `root`, returning the balanced remainder and the extracted node.
///
/// The extracted node's children are not part of the result, its left
/// subtree having been linked into the remainder.
fn extract_max<T>(root: &Arc<Node<T>>) -> (Option<Arc<Node<T>>>, Arc<Node<T>>)
where
    T: Key,
{
    let right = match root.right.load() {
        Some(v) => v,
        None => return (root.left.load(), Arc::clone(root)),
    };

    let (rest, max) = extract_max(&right);
    let root = Node::build(
        root.midpoint.clone(),
        Arc::clone(&root.intervals),
        root.left.load(),
        rest,
    );

    (Some(rebalance(root)), max)
}

/// Walk from `slot` towards `head_midpoint`, moving every interval containing
/// it into `taken`, and return the rebuilt subtree.
fn absorb_spine<T>(
    head_midpoint: &T,
    taken: &mut Vec<Interval<T>>,
    slot: Option<Arc<Node<T>>>,
) -> Option<Arc<Node<T>>>
where
    T: Key,
{
    let n = slot?;

    let (set, moved) = split_containing(&n.intervals, head_midpoint, &n.midpoint);
    taken.extend(moved);

    let (left, right) = if *head_midpoint < n.midpoint {
        (absorb_spine(head_midpoint, taken, n.left.load()), n.right.load())
    } else {
        (n.left.load(), absorb_spine(head_midpoint, taken, n.right.load()))
    };

    repair(Node::build(n.midpoint.clone(), set, left, right))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::validate_tree_structure;

    fn point(v: i32) -> Arc<Node<i32>> {
        Arc::new(Node::new(v, Interval::point(v)))
    }

    fn with(
        n: Arc<Node<i32>>,
        left: Option<Arc<Node<i32>>>,
        right: Option<Arc<Node<i32>>>,
    ) -> Arc<Node<i32>> {
        Node::build(n.midpoint, Arc::clone(&n.intervals), left, right)
    }

    fn midpoints(n: Option<Arc<Node<i32>>>, out: &mut Vec<i32>) {
        if let Some(n) = n {
            midpoints(n.left.load(), out);
            out.push(n.midpoint);
            midpoints(n.right.load(), out);
        }
    }

    #[test]
    fn test_rotate_left_copies_on_write() {
        let six = with(point(6), Some(point(5)), Some(point(7)));
        let four = with(point(4), Some(point(3)), Some(six));
        let two = with(point(2), Some(point(1)), Some(Arc::clone(&four)));

        let got = rotate_left(&two);
        assert_eq!(got.midpoint, 4);
        assert_eq!(got.height(), 3);
        validate_tree_structure(Some(Arc::clone(&got)));

        // The rotated nodes were replaced, not mutated.
        assert_eq!(two.height(), 4);
        assert_eq!(two.right.load().unwrap().midpoint, 4);
        assert_eq!(four.left.load().unwrap().midpoint, 3);

        let mut old = Vec::new();
        midpoints(Some(two), &mut old);
        let mut new = Vec::new();
        midpoints(Some(got), &mut new);
        assert_eq!(old, new);
    }

    #[test]
    fn test_rotate_assimilates_without_touching_old_sets() {
        //
        //      2                     4
        //       \                   /
        //        4      ->         2
        //
        // [1, 5] is stored at 2, and contains 4.
        let wide = Interval::closed(1, 5);
        let two = Arc::new(Node::new(2, wide.clone()));
        two.intervals.write().insert(Interval::closed(1, 3));
        let two = with(two, None, Some(point(4)));

        let got = rotate_left(&two);

        assert_eq!(got.midpoint, 4);
        assert_eq!(got.intervals_snapshot(), [wide.clone(), Interval::point(4)]);
        assert_eq!(
            got.left.load().unwrap().intervals_snapshot(),
            [Interval::closed(1, 3)]
        );

        // The old node keeps its interval set.
        assert!(two.intervals.read().contains(&wide));
        validate_tree_structure(Some(got));
    }

    #[test]
    fn test_rotate_unlinks_emptied_node() {
        let two = Arc::new(Node::new(2, Interval::closed(1, 5)));
        let two = with(two, Some(point(1)), Some(point(4)));

        let got = rotate_left(&two);

        assert_eq!(got.midpoint, 4);
        assert_eq!(got.left.load().unwrap().midpoint, 1);
        validate_tree_structure(Some(got));
    }

    #[test]
    fn test_delete_node_absorbs_spine() {
        //
        //          10 (empty)
        //         /  \
        //        4    12
        //         \
        //          6
        //
        // [3, 7] is stored at 4, and contains the predecessor midpoint 6.
        let four = Arc::new(Node::new(4, Interval::closed(3, 7)));
        let four = with(four, None, Some(point(6)));
        let ten = Arc::new(Node::new(10, Interval::point(10)));
        ten.intervals.write().remove(&Interval::point(10));
        let ten = with(ten, Some(four), Some(point(12)));

        let got = delete_node(&ten).unwrap();

        assert_eq!(got.midpoint, 6);
        assert_eq!(
            got.intervals_snapshot(),
            [Interval::closed(3, 7), Interval::point(6)]
        );
        validate_tree_structure(Some(got));
    }

    #[test]
    fn test_rebuild_drops_empty_nodes() {
        let three = point(3);
        three.intervals.write().remove(&Interval::point(3));
        let five = point(5);
        five.intervals.write().remove(&Interval::point(5));

        let root = with(
            point(4),
            Some(with(point(2), Some(point(1)), Some(three))),
            Some(five),
        );

        let got = rebuild(Some(root));

        let mut mids = Vec::new();
        midpoints(got.clone(), &mut mids);
        assert_eq!(mids, [1, 2, 4]);
        validate_tree_structure(got);
    }
}
