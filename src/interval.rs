use std::{
    cmp::Ordering,
    fmt::{self, Display},
    ops::{
        Bound, Range, RangeBounds, RangeFrom, RangeFull, RangeInclusive, RangeTo,
        RangeToInclusive,
    },
};

use crate::key::{within, Key};

/// A totally-ordered interval over a [`Key`] domain, each side of which is
/// open, closed or unbounded.
///
/// An [`Interval`] is ordered by its start bound, and tie-broken by its end
/// bound (see [`Interval::cmp_starts()`] and [`Interval::cmp_ends()`]). Two
/// intervals compare equal only when both bounds, including their
/// inclusivity, match.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Interval<T> {
    start: Bound<T>,
    end: Bound<T>,
}

impl<T> Interval<T> {
    /// Construct an interval from an explicit pair of bounds.
    pub fn new(start: Bound<T>, end: Bound<T>) -> Self {
        Self { start, end }
    }

    /// `[start, end]`
    pub fn closed(start: T, end: T) -> Self {
        Self::new(Bound::Included(start), Bound::Included(end))
    }

    /// `(start, end)`
    pub fn open(start: T, end: T) -> Self {
        Self::new(Bound::Excluded(start), Bound::Excluded(end))
    }

    /// `[start, end)`
    pub fn closed_open(start: T, end: T) -> Self {
        Self::new(Bound::Included(start), Bound::Excluded(end))
    }

    /// `(start, end]`
    pub fn open_closed(start: T, end: T) -> Self {
        Self::new(Bound::Excluded(start), Bound::Included(end))
    }

    /// `[start, +∞)`
    pub fn at_least(start: T) -> Self {
        Self::new(Bound::Included(start), Bound::Unbounded)
    }

    /// `(start, +∞)`
    pub fn greater_than(start: T) -> Self {
        Self::new(Bound::Excluded(start), Bound::Unbounded)
    }

    /// `(-∞, end]`
    pub fn at_most(end: T) -> Self {
        Self::new(Bound::Unbounded, Bound::Included(end))
    }

    /// `(-∞, end)`
    pub fn less_than(end: T) -> Self {
        Self::new(Bound::Unbounded, Bound::Excluded(end))
    }

    /// `(-∞, +∞)`
    pub fn unbounded() -> Self {
        Self::new(Bound::Unbounded, Bound::Unbounded)
    }

    /// `[v, v]`
    pub fn point(v: T) -> Self
    where
        T: Clone,
    {
        Self::closed(v.clone(), v)
    }

    pub fn start(&self) -> Bound<&T> {
        self.start.as_ref()
    }

    pub fn end(&self) -> Bound<&T> {
        self.end.as_ref()
    }

    /// Returns true unless the start bound is open. An unbounded start counts
    /// as inclusive.
    pub fn is_start_inclusive(&self) -> bool {
        !matches!(self.start, Bound::Excluded(_))
    }

    /// Returns true unless the end bound is open. An unbounded end counts as
    /// inclusive.
    pub fn is_end_inclusive(&self) -> bool {
        !matches!(self.end, Bound::Excluded(_))
    }

    /// Explode this [`Interval`] into its start and end bounds.
    pub fn into_bounds(self) -> (Bound<T>, Bound<T>) {
        (self.start, self.end)
    }
}

impl<T> Interval<T>
where
    T: Ord,
{
    /// Order `self` and `other` by their start bounds.
    ///
    /// An unbounded start sorts first; at equal keys an inclusive start sorts
    /// before an exclusive one.
    pub fn cmp_starts(&self, other: &Self) -> Ordering {
        cmp_start_bounds(self.start(), other.start())
    }

    /// Order `self` and `other` by their end bounds.
    ///
    /// An unbounded end sorts last; at equal keys an exclusive end sorts
    /// before an inclusive one.
    pub fn cmp_ends(&self, other: &Self) -> Ordering {
        cmp_end_bounds(self.end(), other.end())
    }

    /// Returns true if both bounds are the same key.
    pub fn is_point(&self) -> bool {
        match (self.start(), self.end()) {
            (Bound::Included(s) | Bound::Excluded(s), Bound::Included(e) | Bound::Excluded(e)) => {
                s == e
            }
            _ => false,
        }
    }

    /// Returns true if every key in `self` lies strictly before `point`.
    pub fn is_left_of(&self, point: &T) -> bool {
        match self.end() {
            Bound::Included(e) => e < point,
            Bound::Excluded(e) => e <= point,
            Bound::Unbounded => false,
        }
    }

    /// Returns true if every key in `self` lies strictly after `point`.
    pub fn is_right_of(&self, point: &T) -> bool {
        match self.start() {
            Bound::Included(s) => s > point,
            Bound::Excluded(s) => s >= point,
            Bound::Unbounded => false,
        }
    }

    /// Returns true if `self` ends before `other` begins.
    pub fn is_left_of_interval(&self, other: &Self) -> bool {
        match (self.end(), other.start()) {
            (Bound::Unbounded, _) | (_, Bound::Unbounded) => false,
            (Bound::Included(e), Bound::Included(s)) => e < s,
            (Bound::Included(e) | Bound::Excluded(e), Bound::Included(s) | Bound::Excluded(s)) => {
                e <= s
            }
        }
    }

    /// Returns true if `self` begins after `other` ends.
    pub fn is_right_of_interval(&self, other: &Self) -> bool {
        other.is_left_of_interval(self)
    }
}

impl<T> Interval<T>
where
    T: Key,
{
    /// Returns true if no key of the domain lies within this interval.
    pub fn is_empty(&self) -> bool {
        !admits_some_key(self.start(), self.end())
    }

    /// Return the centre of the interval as defined by the [`Key`] domain, or
    /// [`None`] if the interval is empty.
    ///
    /// The returned key is always contained by `self`.
    pub fn midpoint(&self) -> Option<T> {
        if inverted(self.start(), self.end()) {
            return None;
        }
        T::midpoint(self.start(), self.end())
    }

    /// Returns true if `point` lies within this (non-empty) interval.
    pub fn contains(&self, point: &T) -> bool {
        within(self.start(), self.end(), point) && !self.is_empty()
    }

    /// Returns true if every key of `other` lies within `self`, and both are
    /// non-empty.
    pub fn contains_interval(&self, other: &Self) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.cmp_starts(other) != Ordering::Greater && self.cmp_ends(other) != Ordering::Less
    }

    /// Returns true if `self` and `other` share at least one key.
    pub fn intersects(&self, other: &Self) -> bool {
        let start = max_start(self.start(), other.start());
        let end = min_end(self.end(), other.end());
        admits_some_key(start, end)
    }

    /// Return the interval of keys shared by `self` and `other`, or [`None`]
    /// when they are disjoint.
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let start = max_start(self.start(), other.start());
        let end = min_end(self.end(), other.end());

        if !admits_some_key(start, end) {
            return None;
        }

        Some(Self::new(start.cloned(), end.cloned()))
    }
}

impl<T> PartialOrd for Interval<T>
where
    T: Ord,
{
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Interval<T>
where
    T: Ord,
{
    fn cmp(&self, other: &Self) -> Ordering {
        // To provide ordering of an interval, the start bound is used as the
        // primary ordering value, falling back to the end bound when the start
        // bounds are equal.
        self.cmp_starts(other).then_with(|| self.cmp_ends(other))
    }
}

impl<T> RangeBounds<T> for Interval<T> {
    fn start_bound(&self) -> Bound<&T> {
        self.start()
    }

    fn end_bound(&self) -> Bound<&T> {
        self.end()
    }
}

impl<T> Display for Interval<T>
where
    T: Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.start() {
            Bound::Included(v) => write!(f, "[{v}, ")?,
            Bound::Excluded(v) => write!(f, "({v}, ")?,
            Bound::Unbounded => write!(f, "(-∞, ")?,
        }
        match self.end() {
            Bound::Included(v) => write!(f, "{v}]"),
            Bound::Excluded(v) => write!(f, "{v})"),
            Bound::Unbounded => write!(f, "+∞)"),
        }
    }
}

impl<T> From<Range<T>> for Interval<T> {
    fn from(value: Range<T>) -> Self {
        Self::closed_open(value.start, value.end)
    }
}

impl<T> From<RangeInclusive<T>> for Interval<T> {
    fn from(value: RangeInclusive<T>) -> Self {
        let (start, end) = value.into_inner();
        Self::closed(start, end)
    }
}

impl<T> From<RangeFrom<T>> for Interval<T> {
    fn from(value: RangeFrom<T>) -> Self {
        Self::at_least(value.start)
    }
}

impl<T> From<RangeTo<T>> for Interval<T> {
    fn from(value: RangeTo<T>) -> Self {
        Self::less_than(value.end)
    }
}

impl<T> From<RangeToInclusive<T>> for Interval<T> {
    fn from(value: RangeToInclusive<T>) -> Self {
        Self::at_most(value.end)
    }
}

impl<T> From<RangeFull> for Interval<T> {
    fn from(_value: RangeFull) -> Self {
        Self::unbounded()
    }
}

fn cmp_start_bounds<T>(a: Bound<&T>, b: Bound<&T>) -> Ordering
where
    T: Ord,
{
    match (a, b) {
        (Bound::Unbounded, Bound::Unbounded) => Ordering::Equal,
        (Bound::Unbounded, _) => Ordering::Less,
        (_, Bound::Unbounded) => Ordering::Greater,
        (Bound::Included(x), Bound::Included(y)) | (Bound::Excluded(x), Bound::Excluded(y)) => {
            x.cmp(y)
        }
        (Bound::Included(x), Bound::Excluded(y)) => x.cmp(y).then(Ordering::Less),
        (Bound::Excluded(x), Bound::Included(y)) => x.cmp(y).then(Ordering::Greater),
    }
}

fn cmp_end_bounds<T>(a: Bound<&T>, b: Bound<&T>) -> Ordering
where
    T: Ord,
{
    match (a, b) {
        (Bound::Unbounded, Bound::Unbounded) => Ordering::Equal,
        (Bound::Unbounded, _) => Ordering::Greater,
        (_, Bound::Unbounded) => Ordering::Less,
        (Bound::Included(x), Bound::Included(y)) | (Bound::Excluded(x), Bound::Excluded(y)) => {
            x.cmp(y)
        }
        (Bound::Included(x), Bound::Excluded(y)) => x.cmp(y).then(Ordering::Greater),
        (Bound::Excluded(x), Bound::Included(y)) => x.cmp(y).then(Ordering::Less),
    }
}

/// The tighter (later) of two start bounds.
fn max_start<'a, T>(a: Bound<&'a T>, b: Bound<&'a T>) -> Bound<&'a T>
where
    T: Ord,
{
    match cmp_start_bounds(a, b) {
        Ordering::Less => b,
        _ => a,
    }
}

/// The tighter (earlier) of two end bounds.
fn min_end<'a, T>(a: Bound<&'a T>, b: Bound<&'a T>) -> Bound<&'a T>
where
    T: Ord,
{
    match cmp_end_bounds(a, b) {
        Ordering::Greater => b,
        _ => a,
    }
}

/// Returns true if `start` lies after `end`, or both name the same key and
/// either side excludes it.
fn inverted<T>(start: Bound<&T>, end: Bound<&T>) -> bool
where
    T: Ord,
{
    match (start, end) {
        (Bound::Unbounded, _) | (_, Bound::Unbounded) => false,
        (Bound::Included(s), Bound::Included(e)) => s > e,
        (Bound::Included(s) | Bound::Excluded(s), Bound::Included(e) | Bound::Excluded(e)) => {
            s >= e
        }
    }
}

fn admits_some_key<T>(start: Bound<&T>, end: Bound<&T>) -> bool
where
    T: Key,
{
    !inverted(start, end) && T::midpoint(start, end).is_some()
}
