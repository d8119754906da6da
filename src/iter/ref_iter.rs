use std::collections::btree_set;

use crate::{interval::Interval, node::Node};

/// A borrowing iterator over the intervals of an
/// [`IntervalTree`](crate::IntervalTree).
///
/// Nodes are visited in midpoint order, and the intervals within a node in
/// start order.
#[derive(Debug)]
pub struct Iter<'a, T> {
    stack: Vec<&'a Node<T>>,
    current: Option<btree_set::Iter<'a, Interval<T>>>,
}

impl<'a, T> Iter<'a, T> {
    pub(crate) fn new(root: Option<&'a Node<T>>) -> Self {
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

    fn push_subtree(&mut self, subtree_root: &'a Node<T>) {
        let mut ptr = Some(subtree_root);

        while let Some(v) = ptr {
            self.stack.push(v);
            ptr = v.left();
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a Interval<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(v) = self.current.as_mut().and_then(|v| v.next()) {
                return Some(v);
            }

            let v = self.stack.pop()?;

            // Descend down the left side of the right hand child of this node,
            // if any.
            if let Some(right) = v.right() {
                self.push_subtree(right);
            }

            self.current = Some(v.intervals().iter());
        }
    }
}
