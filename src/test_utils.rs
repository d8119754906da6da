use std::{
    fmt::{Display, Write},
    ops::Bound,
    sync::Arc,
};

use proptest::prelude::*;

use crate::{interval::Interval, key::Key, node::Node, sync};

const RANGE_MAX: i32 = 20;

fn arbitrary_bound() -> impl Strategy<Value = Bound<i32>> {
    prop_oneof![
        4 => (0..RANGE_MAX).prop_map(Bound::Included),
        4 => (0..RANGE_MAX).prop_map(Bound::Excluded),
        1 => Just(Bound::Unbounded),
    ]
}

/// Generate arbitrary (potentially empty!) intervals with bounds from
/// [0..[`RANGE_MAX`]), or unbounded.
pub(crate) fn arbitrary_interval() -> impl Strategy<Value = Interval<i32>> {
    (arbitrary_bound(), arbitrary_bound())
        .prop_map(|(start, end)| Interval::new(start, end))
}

/// A read-only view of a tree node, abstracting over the sequential and
/// concurrent node types so both can be validated and rendered.
pub(crate) trait TreeShape: Sized {
    type Key: Key + Display;

    fn midpoint(&self) -> Self::Key;
    fn intervals(&self) -> Vec<Interval<Self::Key>>;
    fn height(&self) -> u8;
    fn left(&self) -> Option<Self>;
    fn right(&self) -> Option<Self>;
}

impl<'a, T> TreeShape for &'a Node<T>
where
    T: Key + Display,
{
    type Key = T;

    fn midpoint(&self) -> T {
        Node::midpoint(*self).clone()
    }

    fn intervals(&self) -> Vec<Interval<T>> {
        Node::intervals(*self).iter().cloned().collect()
    }

    fn height(&self) -> u8 {
        Node::height(*self)
    }

    fn left(&self) -> Option<Self> {
        Node::left(*self)
    }

    fn right(&self) -> Option<Self> {
        Node::right(*self)
    }
}

impl<T> TreeShape for Arc<sync::node::Node<T>>
where
    T: Key + Display,
{
    type Key = T;

    fn midpoint(&self) -> T {
        sync::node::Node::midpoint(self).clone()
    }

    fn intervals(&self) -> Vec<Interval<T>> {
        self.intervals_snapshot()
    }

    fn height(&self) -> u8 {
        sync::node::Node::height(self)
    }

    fn left(&self) -> Option<Self> {
        self.left_edge().load()
    }

    fn right(&self) -> Option<Self> {
        self.right_edge().load()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// Assert every structural invariant of the tree rooted at `root`:
///
///   * every node holds at least one interval
///   * every interval contains the midpoint of the node holding it
///   * every interval in a left (right) subtree lies strictly left (right)
///     of the subtree root's midpoint, which orders the midpoints too
///   * no interval contains the midpoint of an ancestor of the node holding
///     it (the base position)
///   * heights are 1 + the tallest child, and balance factors are within 1
pub(crate) fn validate_tree_structure<S>(root: Option<S>)
where
    S: TreeShape + Clone,
{
    let dot = root.clone().map(print_dot).unwrap_or_default();
    let mut ancestors = Vec::new();
    validate_node(root, &mut ancestors, &dot);
}

fn validate_node<S>(n: Option<S>, ancestors: &mut Vec<(S::Key, Side)>, dot: &str) -> u8
where
    S: TreeShape,
{
    let n = match n {
        Some(v) => v,
        None => return 0,
    };

    let midpoint = n.midpoint();
    let intervals = n.intervals();

    assert!(!intervals.is_empty(), "empty node at {midpoint}\n{dot}");

    for (a, side) in ancestors.iter() {
        match side {
            Side::Left => assert!(midpoint < *a, "midpoint {midpoint} not left of {a}\n{dot}"),
            Side::Right => assert!(midpoint > *a, "midpoint {midpoint} not right of {a}\n{dot}"),
        }
    }

    for v in &intervals {
        assert!(
            v.contains(&midpoint),
            "{v} does not contain node midpoint {midpoint}\n{dot}"
        );

        for (a, side) in ancestors.iter() {
            match side {
                Side::Left => assert!(v.is_left_of(a), "{v} not left of ancestor {a}\n{dot}"),
                Side::Right => assert!(v.is_right_of(a), "{v} not right of ancestor {a}\n{dot}"),
            }
        }
    }

    ancestors.push((midpoint.clone(), Side::Left));
    let left = validate_node(n.left(), ancestors, dot);
    ancestors.pop();

    ancestors.push((midpoint.clone(), Side::Right));
    let right = validate_node(n.right(), ancestors, dot);
    ancestors.pop();

    assert_eq!(
        n.height(),
        1 + left.max(right),
        "bad height at {midpoint}\n{dot}"
    );
    assert!(
        (left as i16 - right as i16).abs() <= 1,
        "unbalanced at {midpoint} (left={left}, right={right})\n{dot}"
    );

    n.height()
}

/// Render the tree rooted at `n` in graphviz dot format.
#[allow(unused)]
pub(crate) fn print_dot<S>(n: S) -> String
where
    S: TreeShape,
{
    let mut buf = String::new();

    writeln!(buf, "digraph {{").unwrap();
    writeln!(buf, r#"bgcolor = "transparent";"#).unwrap();
    writeln!(
        buf,
        r#"node [shape = record; style = filled; fontcolor = orange4; fillcolor = white;];"#
    )
    .unwrap();
    recurse(n, &mut buf);
    writeln!(buf, "}}").unwrap();

    buf
}

#[allow(unused)]
fn recurse<S, W>(n: S, buf: &mut W)
where
    S: TreeShape,
    W: std::fmt::Write,
{
    let midpoint = n.midpoint();
    let intervals = n
        .intervals()
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ");

    writeln!(
        buf,
        r#""{}" [label="{} | {} | h={}"];"#,
        midpoint,
        midpoint,
        intervals,
        n.height(),
    )
    .unwrap();

    for v in [n.left(), n.right()] {
        match v {
            Some(v) => {
                writeln!(
                    buf,
                    "\"{}\" -> \"{}\" [color = \"orange1\";];",
                    midpoint,
                    v.midpoint()
                )
                .unwrap();
                recurse(v, buf);
            }
            None => {
                writeln!(buf, "\"null_{}\" [shape=point,style=invis];", midpoint).unwrap();
                writeln!(
                    buf,
                    "\"{}\" -> \"null_{}\" [style=invis];",
                    midpoint,
                    midpoint
                )
                .unwrap();
            }
        };
    }
}
