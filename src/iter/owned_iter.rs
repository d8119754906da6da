use std::collections::btree_set;

use crate::{interval::Interval, node::Node, set::IntervalSet};

/// An iterator of owned [`Interval`] instances as the underlying tree
/// `into_iter()` impl.
#[derive(Debug)]
pub struct IntoIter<T> {
    /// Interval sets of the nodes still to be visited, alongside their right
    /// subtree.
    stack: Vec<(IntervalSet<T>, Option<Box<Node<T>>>)>,
    current: Option<btree_set::IntoIter<Interval<T>>>,
}

impl<T> IntoIter<T> {
    pub(crate) fn new(root: Option<Box<Node<T>>>) -> Self {
        let mut this = Self {
            stack: vec![],
            current: None,
        };

        // Descend down the left side of the tree.
        if let Some(root) = root {
            this.push_subtree(root);
        }

        this
    }

    fn push_subtree(&mut self, subtree_root: Box<Node<T>>) {
        let mut ptr = Some(subtree_root);

        while let Some(v) = ptr {
            let (intervals, left, right) = (*v).into_parts();
            self.stack.push((intervals, right));
            ptr = left;
        }
    }
}

impl<T> Iterator for IntoIter<T> {
    type Item = Interval<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(v) = self.current.as_mut().and_then(|v| v.next()) {
                return Some(v);
            }

            let (intervals, right) = self.stack.pop()?;

            // Descend down the left side of the right hand child of this node,
            // if any.
            if let Some(right) = right {
                self.push_subtree(right);
            }

            self.current = Some(intervals.into_iter());
        }
    }
}
