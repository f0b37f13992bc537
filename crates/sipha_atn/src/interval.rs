//! # Interval Sets
//!
//! Ordered sets of integers stored as inclusive ranges. Both character
//! classes (code points) and token sets (token type ids) are represented
//! with the same structure.
//!
//! ## Invariant
//!
//! The ranges held by an [`IntervalSet`] are always sorted ascending,
//! pairwise disjoint and non-adjacent: adding `3..=4` to `{1..=2}` yields
//! the single range `1..=4`. Every mutating operation re-establishes this
//! invariant on insert, so readers never need to normalize.
//!
//! ## Usage
//!
//! ```rust
//! use sipha_atn::interval::IntervalSet;
//!
//! let mut digits = IntervalSet::of_range('0' as i32, '9' as i32);
//! digits.add('a' as i32);
//! assert!(digits.contains('5' as i32));
//! assert_eq!(digits.size(), 11);
//! ```

use std::fmt;

use crate::symbol;

/// An inclusive range `a..=b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Interval {
    pub a: i32,
    pub b: i32,
}

impl Interval {
    #[must_use]
    pub const fn new(a: i32, b: i32) -> Self {
        Self { a, b }
    }

    /// Number of integers covered, zero for an inverted range.
    #[must_use]
    pub const fn len(&self) -> usize {
        if self.b < self.a {
            0
        } else {
            (self.b as i64 - self.a as i64 + 1) as usize
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.b < self.a
    }

    #[must_use]
    pub const fn contains(&self, value: i32) -> bool {
        self.a <= value && value <= self.b
    }
}

/// A set of integers kept as sorted, disjoint, non-adjacent ranges.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct IntervalSet {
    intervals: Vec<Interval>,
}

impl IntervalSet {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            intervals: Vec::new(),
        }
    }

    /// A set holding a single value.
    #[must_use]
    pub fn of(value: i32) -> Self {
        Self::of_range(value, value)
    }

    /// A set holding `a..=b`; empty when `b < a`.
    #[must_use]
    pub fn of_range(a: i32, b: i32) -> Self {
        let mut set = Self::new();
        set.add_range(a, b);
        set
    }

    /// Every code point a lexer may match.
    #[must_use]
    pub fn complete_char_set() -> Self {
        Self::of_range(symbol::MIN_CHAR_VALUE, symbol::MAX_CHAR_VALUE)
    }

    pub fn add(&mut self, value: i32) {
        self.add_range(value, value);
    }

    /// Insert `a..=b`, merging with every overlapping or adjacent range.
    pub fn add_range(&mut self, a: i32, b: i32) {
        if b < a {
            return;
        }
        let (lo, hi) = (i64::from(a), i64::from(b));
        let start = self
            .intervals
            .partition_point(|iv| i64::from(iv.b) + 1 < lo);
        let mut merged = Interval::new(a, b);
        let mut end = start;
        while end < self.intervals.len() && i64::from(self.intervals[end].a) <= hi + 1 {
            let next = self.intervals[end];
            merged.a = merged.a.min(next.a);
            merged.b = merged.b.max(next.b);
            end += 1;
        }
        self.intervals.splice(start..end, std::iter::once(merged));
    }

    pub fn add_interval(&mut self, interval: Interval) {
        self.add_range(interval.a, interval.b);
    }

    pub fn add_all(&mut self, other: &IntervalSet) {
        for iv in &other.intervals {
            self.add_range(iv.a, iv.b);
        }
    }

    /// Remove a single value, splitting its range when needed.
    pub fn remove(&mut self, value: i32) {
        let idx = self.intervals.partition_point(|iv| iv.b < value);
        let Some(iv) = self.intervals.get(idx).copied() else {
            return;
        };
        if !iv.contains(value) {
            return;
        }
        match (iv.a == value, iv.b == value) {
            (true, true) => {
                self.intervals.remove(idx);
            }
            (true, false) => self.intervals[idx].a = value + 1,
            (false, true) => self.intervals[idx].b = value - 1,
            (false, false) => {
                self.intervals[idx].b = value - 1;
                self.intervals
                    .insert(idx + 1, Interval::new(value + 1, iv.b));
            }
        }
    }

    #[must_use]
    pub fn contains(&self, value: i32) -> bool {
        let idx = self.intervals.partition_point(|iv| iv.b < value);
        self.intervals
            .get(idx)
            .is_some_and(|iv| iv.contains(value))
    }

    /// Number of integers in the set.
    #[must_use]
    pub fn size(&self) -> usize {
        self.intervals.iter().map(Interval::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    #[must_use]
    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    #[must_use]
    pub fn min_element(&self) -> Option<i32> {
        self.intervals.first().map(|iv| iv.a)
    }

    #[must_use]
    pub fn max_element(&self) -> Option<i32> {
        self.intervals.last().map(|iv| iv.b)
    }

    /// Iterate over every element in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        self.intervals.iter().flat_map(|iv| iv.a..=iv.b)
    }

    /// Union.
    #[must_use]
    pub fn or(&self, other: &IntervalSet) -> IntervalSet {
        let mut result = self.clone();
        result.add_all(other);
        result
    }

    /// Intersection.
    #[must_use]
    pub fn and(&self, other: &IntervalSet) -> IntervalSet {
        let mut result = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.intervals.len() && j < other.intervals.len() {
            let x = self.intervals[i];
            let y = other.intervals[j];
            let lo = x.a.max(y.a);
            let hi = x.b.min(y.b);
            if lo <= hi {
                result.push(Interval::new(lo, hi));
            }
            if x.b < y.b {
                i += 1;
            } else {
                j += 1;
            }
        }
        IntervalSet { intervals: result }
    }

    /// Everything in `self` that is not in `other`.
    #[must_use]
    pub fn subtract(&self, other: &IntervalSet) -> IntervalSet {
        let mut result = Vec::new();
        let mut j = 0;
        for iv in &self.intervals {
            let mut a = i64::from(iv.a);
            let b = i64::from(iv.b);
            while j < other.intervals.len() && i64::from(other.intervals[j].b) < a {
                j += 1;
            }
            let mut k = j;
            while a <= b && k < other.intervals.len() && i64::from(other.intervals[k].a) <= b {
                let cut = other.intervals[k];
                if i64::from(cut.a) > a {
                    result.push(Interval::new(a as i32, cut.a - 1));
                }
                a = a.max(i64::from(cut.b) + 1);
                k += 1;
            }
            if a <= b {
                result.push(Interval::new(a as i32, b as i32));
            }
        }
        IntervalSet { intervals: result }
    }

    /// Everything in `vocabulary` that is not in `self`.
    #[must_use]
    pub fn complement(&self, vocabulary: &IntervalSet) -> IntervalSet {
        vocabulary.subtract(self)
    }

    /// Render with every element passed through `name`, ranges expanded.
    ///
    /// Used for token sets, where `{A, B, C}` reads better than `1..3`.
    pub fn to_string_with(&self, name: impl Fn(i32) -> String) -> String {
        if self.intervals.is_empty() {
            return "{}".to_string();
        }
        let braces = self.size() > 1;
        let names: Vec<String> = self
            .iter()
            .map(|t| match t {
                symbol::EOF => "<EOF>".to_string(),
                symbol::EPSILON => "<EPSILON>".to_string(),
                _ => name(t),
            })
            .collect();
        let body = names.join(", ");
        if braces { format!("{{{body}}}") } else { body }
    }

    /// Render elements as quoted code points, e.g. `{'0'..'9', '_'}`.
    #[must_use]
    pub fn to_char_string(&self) -> String {
        if self.intervals.is_empty() {
            return "{}".to_string();
        }
        let mut parts = Vec::with_capacity(self.intervals.len());
        for iv in &self.intervals {
            if iv.a == iv.b {
                if iv.a == symbol::EOF {
                    parts.push("<EOF>".to_string());
                } else {
                    parts.push(char_literal(iv.a));
                }
            } else {
                parts.push(format!("{}..{}", char_literal(iv.a), char_literal(iv.b)));
            }
        }
        let body = parts.join(", ");
        if self.size() > 1 {
            format!("{{{body}}}")
        } else {
            body
        }
    }
}

impl fmt::Display for IntervalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.intervals.is_empty() {
            return f.write_str("{}");
        }
        let braces = self.size() > 1;
        if braces {
            f.write_str("{")?;
        }
        for (i, iv) in self.intervals.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match (iv.a == iv.b, iv.a) {
                (true, symbol::EOF) => f.write_str("<EOF>")?,
                (true, a) => write!(f, "{a}")?,
                (false, a) => write!(f, "{a}..{}", iv.b)?,
            }
        }
        if braces {
            f.write_str("}")?;
        }
        Ok(())
    }
}

impl FromIterator<i32> for IntervalSet {
    fn from_iter<I: IntoIterator<Item = i32>>(iter: I) -> Self {
        let mut set = IntervalSet::new();
        for value in iter {
            set.add(value);
        }
        set
    }
}

impl FromIterator<Interval> for IntervalSet {
    fn from_iter<I: IntoIterator<Item = Interval>>(iter: I) -> Self {
        let mut set = IntervalSet::new();
        for iv in iter {
            set.add_interval(iv);
        }
        set
    }
}

/// A code point as a quoted grammar literal: `'a'`, `'\n'`, `'\u00E9'`.
///
/// Printable ASCII is written as is; everything else is escaped.
#[must_use]
pub fn char_literal(cp: i32) -> String {
    let escaped = match cp {
        symbol::EOF => return "EOF".to_string(),
        0x0A => "\\n".to_string(),
        0x0D => "\\r".to_string(),
        0x09 => "\\t".to_string(),
        0x08 => "\\b".to_string(),
        0x0C => "\\f".to_string(),
        0x5C => "\\\\".to_string(),
        0x27 => "\\'".to_string(),
        0x20..=0x7E => u32::try_from(cp)
            .ok()
            .and_then(char::from_u32)
            .map_or_else(String::new, String::from),
        0..=0xFFFF => format!("\\u{cp:04X}"),
        _ => format!("\\u{{{cp:X}}}"),
    };
    format!("'{escaped}'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_merges_adjacent() {
        let mut set = IntervalSet::new();
        set.add_range(1, 2);
        set.add_range(3, 4);
        assert_eq!(set.intervals(), &[Interval::new(1, 4)]);
    }

    #[test]
    fn test_add_bridges_gap() {
        let mut set = IntervalSet::new();
        set.add_range(1, 2);
        set.add_range(10, 12);
        set.add_range(20, 25);
        set.add_range(2, 19);
        assert_eq!(set.intervals(), &[Interval::new(1, 25)]);
    }

    #[test]
    fn test_add_inserts_before() {
        let mut set = IntervalSet::of_range(10, 20);
        set.add(5);
        assert_eq!(
            set.intervals(),
            &[Interval::new(5, 5), Interval::new(10, 20)]
        );
    }

    #[test]
    fn test_inverted_range_is_ignored() {
        let set = IntervalSet::of_range(9, 3);
        assert!(set.is_empty());
    }

    #[test]
    fn test_remove_splits() {
        let mut set = IntervalSet::of_range(1, 5);
        set.remove(3);
        assert_eq!(
            set.intervals(),
            &[Interval::new(1, 2), Interval::new(4, 5)]
        );
        set.remove(1);
        set.remove(5);
        assert_eq!(
            set.intervals(),
            &[Interval::new(2, 2), Interval::new(4, 4)]
        );
    }

    #[test]
    fn test_subtract() {
        let a = IntervalSet::of_range(0, 100);
        let mut b = IntervalSet::of_range(10, 20);
        b.add_range(50, 200);
        let diff = a.subtract(&b);
        assert_eq!(
            diff.intervals(),
            &[Interval::new(0, 9), Interval::new(21, 49)]
        );
    }

    #[test]
    fn test_and() {
        let mut a = IntervalSet::of_range(1, 10);
        a.add_range(20, 30);
        let b = IntervalSet::of_range(5, 25);
        assert_eq!(
            a.and(&b).intervals(),
            &[Interval::new(5, 10), Interval::new(20, 25)]
        );
    }

    #[test]
    fn test_complement_of_token_set() {
        let vocab = IntervalSet::of_range(1, 5);
        let set: IntervalSet = [2, 4].into_iter().collect();
        let comp = set.complement(&vocab);
        assert_eq!(comp.iter().collect::<Vec<_>>(), vec![1, 3, 5]);
    }

    #[test]
    fn test_extreme_bounds_do_not_overflow() {
        let mut set = IntervalSet::of_range(i32::MAX - 1, i32::MAX);
        set.add(i32::MIN);
        assert_eq!(set.size(), 3);
        assert!(set.subtract(&IntervalSet::of(i32::MAX)).contains(i32::MAX - 1));
    }

    #[test]
    fn test_display() {
        let mut set = IntervalSet::of(symbol::EOF);
        set.add_range(3, 5);
        assert_eq!(set.to_string(), "{<EOF>, 3..5}");
        assert_eq!(IntervalSet::of(7).to_string(), "7");
        assert_eq!(IntervalSet::new().to_string(), "{}");
    }

    #[test]
    fn test_char_display() {
        let mut set = IntervalSet::of_range('a' as i32, 'z' as i32);
        set.add('_' as i32);
        assert_eq!(set.to_char_string(), "{'_', 'a'..'z'}");
    }

    #[test]
    fn test_char_literal_escapes() {
        assert_eq!(char_literal('a' as i32), "'a'");
        assert_eq!(char_literal('\n' as i32), "'\\n'");
        assert_eq!(char_literal('\'' as i32), "'\\''");
        assert_eq!(char_literal(0xE9), "'\\u00E9'");
        assert_eq!(char_literal(0x1F600), "'\\u{1F600}'");
        assert_eq!(char_literal(symbol::EOF), "EOF");
    }

    #[test]
    fn test_named_display_expands_ranges() {
        let mut set = IntervalSet::of_range(1, 2);
        set.add(symbol::EOF);
        let rendered = set.to_string_with(|t| format!("T{t}"));
        assert_eq!(rendered, "{<EOF>, T1, T2}");
    }
}
