use std::cmp::Ordering;

use log::trace;

use crate::{interval::Interval, key::Key, set::IntervalSet};

#[derive(Debug, Clone)]
pub(crate) struct Node<T> {
    /// Child nodes pointers.
    left: Option<Box<Node<T>>>,
    right: Option<Box<Node<T>>>,

    /// The node's AVL height.
    ///
    /// A leaf has a height of 1, an absent child a height of 0.
    height: u8,

    /// The key this node is positioned by, chosen as the midpoint of the
    /// interval that caused the node to be created. Never changes.
    midpoint: T,

    /// All intervals for which this node is the base position: they contain
    /// `midpoint`, and no ancestor's midpoint.
    intervals: IntervalSet<T>,
}

impl<T> Node<T>
where
    T: Key,
{
    pub(crate) fn new(midpoint: T, interval: Interval<T>) -> Self {
        debug_assert!(interval.contains(&midpoint));

        Self {
            left: None,
            right: None,
            height: 1,
            midpoint,
            intervals: IntervalSet::new(interval),
        }
    }
}

impl<T> Node<T> {
    pub(crate) fn midpoint(&self) -> &T {
        &self.midpoint
    }

    pub(crate) fn intervals(&self) -> &IntervalSet<T> {
        &self.intervals
    }

    pub(crate) fn height(&self) -> u8 {
        self.height
    }

    pub(crate) fn left(&self) -> Option<&Self> {
        self.left.as_deref()
    }

    pub(crate) fn right(&self) -> Option<&Self> {
        self.right.as_deref()
    }

    /// Explode this [`Node`] into its interval set and child pointers.
    pub(crate) fn into_parts(self) -> (IntervalSet<T>, Option<Box<Self>>, Option<Box<Self>>) {
        (self.intervals, self.left, self.right)
    }
}

/// Insert `interval` into the subtree rooted at `slot`, creating a node when
/// the descent reaches an empty child pointer.
///
/// Returns false if `interval` was already present (or is empty).
pub(crate) fn insert<T>(slot: &mut Option<Box<Node<T>>>, interval: Interval<T>) -> bool
where
    T: Key,
{
    let node = match slot {
        Some(v) => v,
        None => {
            let midpoint = match interval.midpoint() {
                Some(v) => v,
                None => return false,
            };

            trace!("creating node for new interval");
            *slot = Some(Box::new(Node::new(midpoint, interval)));
            return true;
        }
    };

    if interval.contains(&node.midpoint) {
        // The tree structure is unchanged, so it does not require
        // rebalancing.
        return node.intervals.insert(interval);
    }

    let child = if interval.is_left_of(&node.midpoint) {
        &mut node.left
    } else {
        debug_assert!(interval.is_right_of(&node.midpoint));
        &mut node.right
    };

    let inserted = insert(child, interval);
    if inserted {
        rebalance(node);
    }

    inserted
}

/// Remove `interval` from the subtree rooted at `slot`, unlinking the node
/// that held it if it is left empty.
pub(crate) fn remove<T>(slot: &mut Option<Box<Node<T>>>, interval: &Interval<T>) -> bool
where
    T: Key,
{
    let node = match slot.as_mut() {
        Some(v) => v,
        None => return false,
    };

    if interval.contains(&node.midpoint) {
        if !node.intervals.remove(interval) {
            return false;
        }

        if node.intervals.is_empty() {
            *slot = slot.take().and_then(delete_node);
        }

        // Either the structure is unchanged, or delete_node() returned a
        // balanced replacement.
        return true;
    }

    let removed = if interval.is_left_of(&node.midpoint) {
        remove(&mut node.left, interval)
    } else if interval.is_right_of(&node.midpoint) {
        remove(&mut node.right, interval)
    } else {
        // An empty interval, stored nowhere.
        false
    };

    if removed {
        rebalance(node);
    }

    removed
}

/// Returns true if `interval` is stored in the subtree rooted at `node`.
pub(crate) fn contains<T>(node: Option<&Node<T>>, interval: &Interval<T>) -> bool
where
    T: Key,
{
    find_holder(node, interval).is_some()
}

/// Find the node storing `interval`, if any.
pub(crate) fn find_holder<'a, T>(
    mut node: Option<&'a Node<T>>,
    interval: &Interval<T>,
) -> Option<&'a Node<T>>
where
    T: Key,
{
    if interval.is_empty() {
        return None;
    }

    while let Some(n) = node {
        if interval.contains(&n.midpoint) {
            return n.intervals.contains(interval).then_some(n);
        }

        node = if interval.is_left_of(&n.midpoint) {
            n.left()
        } else {
            n.right()
        };
    }

    None
}

/// Find the node positioned at `midpoint`, if any.
pub(crate) fn find<'a, T>(mut node: Option<&'a Node<T>>, midpoint: &T) -> Option<&'a Node<T>>
where
    T: Ord,
{
    while let Some(n) = node {
        node = match midpoint.cmp(&n.midpoint) {
            Ordering::Less => n.left(),
            Ordering::Equal => return Some(n),
            Ordering::Greater => n.right(),
        };
    }

    None
}

/// Push every interval stored in the subtree rooted at `node` containing
/// `point` into `out`.
pub(crate) fn query_point<'a, T>(
    node: Option<&'a Node<T>>,
    point: &T,
    out: &mut Vec<&'a Interval<T>>,
)
where
    T: Key,
{
    for_each_containing(node, point, |_, v| out.push(v));
}

/// Call `f` with every interval containing `point`, and the node it is
/// stored in.
pub(crate) fn for_each_containing<'a, T, F>(mut node: Option<&'a Node<T>>, point: &T, mut f: F)
where
    T: Key,
    F: FnMut(&'a Node<T>, &'a Interval<T>),
{
    while let Some(n) = node {
        n.intervals.scan_point(point, &n.midpoint, |v| f(n, v));

        // Intervals in the subtrees lie strictly to one side of the midpoint,
        // so none contain it.
        node = match point.cmp(&n.midpoint) {
            Ordering::Less => n.left(),
            Ordering::Equal => None,
            Ordering::Greater => n.right(),
        };
    }
}

/// Push every interval stored in the subtree rooted at `node` that
/// intersects `query` into `out`.
pub(crate) fn query_range<'a, T>(
    mut node: Option<&'a Node<T>>,
    query: &Interval<T>,
    out: &mut Vec<&'a Interval<T>>,
) where
    T: Key,
{
    if query.is_empty() {
        return;
    }

    // Descend until reaching the node whose midpoint the query contains, if
    // any.
    while let Some(n) = node {
        if query.contains(&n.midpoint) {
            out.extend(n.intervals.iter());
            range_left(n.left(), query, out);
            range_right(n.right(), query, out);
            return;
        }

        n.intervals.scan_range(query, &n.midpoint, |v| out.push(v));
        node = if query.is_left_of(&n.midpoint) {
            n.left()
        } else {
            n.right()
        };
    }
}

/// Walk the left subtree of a node whose midpoint lies within `query`.
///
/// Whenever a visited midpoint is also within `query`, every interval to its
/// right lies wholly between two points of the query and is collected in
/// bulk.
fn range_left<'a, T>(
    mut node: Option<&'a Node<T>>,
    query: &Interval<T>,
    out: &mut Vec<&'a Interval<T>>,
)
where
    T: Key,
{
    while let Some(n) = node {
        if query.contains(&n.midpoint) {
            out.extend(n.intervals.iter());
            collect_all(n.right(), out);
            node = n.left();
        } else {
            n.intervals.scan_range(query, &n.midpoint, |v| out.push(v));
            node = n.right();
        }
    }
}

/// The mirror of [`range_left()`].
fn range_right<'a, T>(
    mut node: Option<&'a Node<T>>,
    query: &Interval<T>,
    out: &mut Vec<&'a Interval<T>>,
)
where
    T: Key,
{
    while let Some(n) = node {
        if query.contains(&n.midpoint) {
            out.extend(n.intervals.iter());
            collect_all(n.left(), out);
            node = n.right();
        } else {
            n.intervals.scan_range(query, &n.midpoint, |v| out.push(v));
            node = n.left();
        }
    }
}

/// Push every interval in the subtree rooted at `node` into `out`.
pub(crate) fn collect_all<'a, T>(node: Option<&'a Node<T>>, out: &mut Vec<&'a Interval<T>>) {
    let mut stack: Vec<&Node<T>> = node.into_iter().collect();

    while let Some(n) = stack.pop() {
        out.extend(n.intervals.iter());
        stack.extend(n.left());
        stack.extend(n.right());
    }
}

pub(crate) fn height<T>(n: Option<&Node<T>>) -> u8 {
    n.map(|v| v.height()).unwrap_or_default()
}

fn update_height<T>(n: &mut Node<T>) {
    n.height = 1 + height(n.left()).max(height(n.right()));
}

/// Compute the "balance factor" of the subtree rooted at `n`.
///
/// Returns the subtree height skew / magnitude, which is a positive number when
/// left heavy, and a negative number when right heavy.
fn balance<T>(n: &Node<T>) -> i16 {
    // Correctness: the height is a u8, the maximal value of which fits in an
    // i16 without truncation or sign inversion.
    height(n.left()) as i16 - height(n.right()) as i16
}

/// Restore the AVL property of the subtree rooted at `node`, the children of
/// which must already be balanced.
///
/// Assimilation during a rotation can unlink the demoted node, shrinking the
/// subtree further, so this repeats until the balance factor is within 1.
fn rebalance<T>(node: &mut Box<Node<T>>)
where
    T: Key,
{
    loop {
        update_height(node);

        match balance(node) {
            (2..) => {
                if node.left().map(balance).unwrap_or_default() < 0 {
                    if let Some(v) = node.left.as_mut() {
                        rotate_left(v);
                    }
                }
                rotate_right(node);
            }
            (..=-2) => {
                if node.right().map(balance).unwrap_or_default() > 0 {
                    if let Some(v) = node.right.as_mut() {
                        rotate_right(v);
                    }
                }
                rotate_left(node);
            }
            _ => break,
        }
    }

    // Invariant: the absolute difference between tree heights ("balance
    // factor") cannot exceed 1.
    debug_assert!(balance(node).abs() <= 1);
}

/// Left rotate the given subtree rooted at `x` around the pivot point `P`,
/// moving any interval of `x` that contains the midpoint of `P` up into `P`.
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
/// If `x` is left empty by the assimilation, it is unlinked.
///
/// # Panics
///
/// Panics if `x` has no right pointer (cannot be rotated).
fn rotate_left<T>(x: &mut Box<Node<T>>)
where
    T: Key,
{
    let mut p = x.right.take().expect("left rotation requires a right child");
    std::mem::swap(x, &mut p);

    // `x` now points to the promoted node, and `p` to the demoted node.
    p.right = x.left.take();
    update_height(&mut p);

    trace!("rotating left");

    let Node {
        midpoint,
        intervals,
        left,
        ..
    } = &mut **x;
    *left = assimilate(midpoint, intervals, p);
    if let Some(v) = left.as_mut() {
        rebalance(v);
    }

    update_height(x);
}

/// Right rotate the given subtree rooted at `y` around the pivot point `P`,
/// moving any interval of `y` that contains the midpoint of `P` up into `P`.
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
/// If `y` is left empty by the assimilation, it is unlinked.
///
/// # Panics
///
/// Panics if `y` has no left pointer (cannot be rotated).
fn rotate_right<T>(y: &mut Box<Node<T>>)
where
    T: Key,
{
    let mut p = y.left.take().expect("right rotation requires a left child");
    std::mem::swap(y, &mut p);

    p.left = y.right.take();
    update_height(&mut p);

    trace!("rotating right");

    let Node {
        midpoint,
        intervals,
        right,
        ..
    } = &mut **y;
    *right = assimilate(midpoint, intervals, p);
    if let Some(v) = right.as_mut() {
        rebalance(v);
    }

    update_height(y);
}

/// Move every interval of `from` containing `head_midpoint` into
/// `head_intervals`, returning `from`, or its replacement if it was left empty.
fn assimilate<T>(
    head_midpoint: &T,
    head_intervals: &mut IntervalSet<T>,
    mut from: Box<Node<T>>,
) -> Option<Box<Node<T>>>
where
    T: Key,
{
    let taken = from
        .intervals
        .split_off_containing(head_midpoint, &from.midpoint);

    if !taken.is_empty() {
        trace!("assimilated {} intervals into promoted node", taken.len());
        head_intervals.extend(taken);
    }

    if from.intervals.is_empty() {
        return delete_node(from);
    }

    Some(from)
}

/// Unlink the empty `node`, returning the balanced subtree that replaces it.
///
/// A node with two children is replaced by its in-order predecessor. The
/// predecessor's midpoint differs from that of `node`, so intervals stored
/// along the right spine of the left subtree (the only place an interval
/// containing the predecessor's midpoint can be) are pulled up into it.
fn delete_node<T>(mut node: Box<Node<T>>) -> Option<Box<Node<T>>>
where
    T: Key,
{
    debug_assert!(node.intervals.is_empty());
    trace!("unlinking empty node");

    let (mut left, right) = match (node.left.take(), node.right.take()) {
        (None, None) => return None,
        (Some(v), None) | (None, Some(v)) => return Some(v),
        (Some(l), Some(r)) => (l, r),
    };

    let mut pred = match extract_subtree_max(&mut left) {
        Some(mut max) => {
            // The "max" node is guaranteed to have no right pointer as it is
            // the right-most / maximum node in the subtree.
            debug_assert!(max.left.is_none());
            debug_assert!(max.right.is_none());

            max.left = Some(left);
            max
        }
        None => {
            // Otherwise "left" has no right child and is itself the
            // predecessor, retaining its own left subtree.
            debug_assert!(left.right.is_none());
            left
        }
    };

    pred.right = Some(right);

    let Node {
        midpoint,
        intervals,
        left,
        ..
    } = &mut *pred;
    absorb_spine(midpoint, intervals, left);

    rebalance(&mut pred);
    Some(pred)
}

/// Extracts the node holding the maximum midpoint in a descendent of `root`,
/// if any, linking the left subtree of the extracted node in its place.
fn extract_subtree_max<T>(root: &mut Box<Node<T>>) -> Option<Box<Node<T>>>
where
    T: Key,
{
    // Descend right to the leaf.
    let v = match extract_subtree_max(root.right.as_mut()?) {
        Some(v) => Some(v),
        None => {
            // The right child is the end of the right edge.
            //
            // Unlink the left node of the right child, which will become the
            // new right node of "root" (if any).
            let right_left = root.right.as_mut().and_then(|v| v.left.take());

            std::mem::replace(&mut root.right, right_left)
        }
    };

    rebalance(root);
    v
}

/// Walk from `slot` towards `head_midpoint`, moving every interval containing
/// it into `head_intervals` and unlinking any node this leaves empty.
fn absorb_spine<T>(
    head_midpoint: &T,
    head_intervals: &mut IntervalSet<T>,
    slot: &mut Option<Box<Node<T>>>,
)
where
    T: Key,
{
    let node = match slot.as_mut() {
        Some(v) => v,
        None => return,
    };

    let taken = node
        .intervals
        .split_off_containing(head_midpoint, &node.midpoint);
    if !taken.is_empty() {
        trace!("absorbed {} intervals into replacement node", taken.len());
        head_intervals.extend(taken);
    }

    if *head_midpoint < node.midpoint {
        absorb_spine(head_midpoint, head_intervals, &mut node.left);
    } else {
        absorb_spine(head_midpoint, head_intervals, &mut node.right);
    }

    if node.intervals.is_empty() {
        *slot = slot.take().and_then(delete_node);
    } else {
        rebalance(node);
    }
}
