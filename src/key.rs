use std::{
    cmp::Ordering,
    fmt::{self, Display},
    hash::{Hash, Hasher},
    ops::Bound,
};

/// A totally ordered key domain over which [`Interval`] values are defined.
///
/// The domain decides where the centre of an interval lies, and by extension
/// whether an interval holds any key at all: an integer interval `(4, 5)` has
/// no member, while the real interval `(4.0, 5.0)` does.
///
/// [`Interval`]: crate::Interval
pub trait Key: Ord + Clone {
    /// Return a key lying within the bounds `start` and `end`, or [`None`] if
    /// no representable key does.
    ///
    /// Implementations may assume `start` does not lie after `end`. An
    /// unbounded side stands in for the smallest / largest value of the
    /// domain. A returned key MUST be admitted by both bounds.
    fn midpoint(start: Bound<&Self>, end: Bound<&Self>) -> Option<Self>;
}

/// Returns true when `v` is admitted by both `start` and `end`.
pub(crate) fn within<T>(start: Bound<&T>, end: Bound<&T>, v: &T) -> bool
where
    T: Ord,
{
    let after_start = match start {
        Bound::Included(s) => v >= s,
        Bound::Excluded(s) => v > s,
        Bound::Unbounded => true,
    };

    let before_end = match end {
        Bound::Included(e) => v <= e,
        Bound::Excluded(e) => v < e,
        Bound::Unbounded => true,
    };

    after_start && before_end
}

macro_rules! impl_integer_key {
    ($($t:ty),* $(,)?) => {$(
        impl Key for $t {
            fn midpoint(start: Bound<&Self>, end: Bound<&Self>) -> Option<Self> {
                // Tighten open bounds to the closed integer range [lo, hi].
                let lo = match start {
                    Bound::Included(v) => *v as i128,
                    Bound::Excluded(v) => *v as i128 + 1,
                    Bound::Unbounded => <$t>::MIN as i128,
                };
                let hi = match end {
                    Bound::Included(v) => *v as i128,
                    Bound::Excluded(v) => *v as i128 - 1,
                    Bound::Unbounded => <$t>::MAX as i128,
                };

                if lo > hi {
                    return None;
                }

                // Both lo and hi fit in $t, so the result does too.
                Some((lo + (hi - lo) / 2) as $t)
            }
        }
    )*};
}

impl_integer_key!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

/// A totally ordered `f64`.
///
/// Ordering follows [`f64::total_cmp`], so `-0.0 < 0.0` and NaN values sort
/// above infinity. An interval with a NaN bound is always empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct Real(pub f64);

impl PartialEq for Real {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Real {}

impl PartialOrd for Real {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Real {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Hash for Real {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state)
    }
}

impl From<f64> for Real {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl Display for Real {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Key for Real {
    fn midpoint(start: Bound<&Self>, end: Bound<&Self>) -> Option<Self> {
        let lo = match start {
            Bound::Included(v) | Bound::Excluded(v) => v.0,
            Bound::Unbounded => -f64::MAX,
        };
        let hi = match end {
            Bound::Included(v) | Bound::Excluded(v) => v.0,
            Bound::Unbounded => f64::MAX,
        };

        if lo.is_nan() || hi.is_nan() {
            return None;
        }

        // Halving first cannot overflow. Opposing infinities sum to NaN.
        let mid = lo / 2.0 + hi / 2.0;
        let mid = Real(if mid.is_nan() { 0.0 } else { mid });

        // Adjacent floats with an open side leave nothing in between.
        within(start, end, &mid).then_some(mid)
    }
}

#[cfg(feature = "chrono")]
mod datetime {
    use std::ops::Bound;

    use chrono::{DateTime, NaiveDateTime, Utc};

    use super::{within, Key};

    macro_rules! impl_datetime_key {
        ($t:ty, $min:expr, $max:expr) => {
            impl Key for $t {
                fn midpoint(start: Bound<&Self>, end: Bound<&Self>) -> Option<Self> {
                    let lo = match start {
                        Bound::Included(v) | Bound::Excluded(v) => *v,
                        Bound::Unbounded => $min,
                    };
                    let hi = match end {
                        Bound::Included(v) | Bound::Excluded(v) => *v,
                        Bound::Unbounded => $max,
                    };

                    if lo > hi {
                        return None;
                    }

                    let mid = lo.checked_add_signed(hi.signed_duration_since(lo) / 2)?;
                    within(start, end, &mid).then_some(mid)
                }
            }
        };
    }

    impl_datetime_key!(DateTime<Utc>, DateTime::<Utc>::MIN_UTC, DateTime::<Utc>::MAX_UTC);
    impl_datetime_key!(NaiveDateTime, NaiveDateTime::MIN, NaiveDateTime::MAX);
}
