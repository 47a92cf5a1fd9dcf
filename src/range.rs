//! Half-open record intervals over a table.

use std::fmt;

/// A half-open interval `[start, end)` of record indices within one table.
///
/// Ranges are immutable once built; a list of them describing one file is
/// expected to be contiguous, ascending and non-overlapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EntryRange {
    start: u64,
    end: u64,
}

impl EntryRange {
    /// Build a range, returning `None` when it would be empty or inverted.
    pub fn new(start: u64, end: u64) -> Option<Self> {
        (end > start).then_some(Self { start, end })
    }

    /// First record index covered by the range.
    pub fn start(&self) -> u64 {
        self.start
    }

    /// One past the last record index covered by the range.
    pub fn end(&self) -> u64 {
        self.end
    }

    /// Number of records covered.
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    /// Always `false`; present so `len` has its usual companion.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether `next` starts exactly where `self` ends.
    pub fn abuts(&self, next: &EntryRange) -> bool {
        self.end == next.start
    }

    /// Fuse two abutting ranges into one spanning both.
    pub(crate) fn span(first: &EntryRange, last: &EntryRange) -> EntryRange {
        debug_assert!(first.start <= last.start);
        EntryRange {
            start: first.start,
            end: last.end,
        }
    }
}

impl fmt::Display for EntryRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Split `[0, total)` into consecutive ranges of the given sizes, skipping zero sizes.
pub fn ranges_from_sizes(sizes: impl IntoIterator<Item = u64>) -> Vec<EntryRange> {
    let mut start = 0;
    sizes
        .into_iter()
        .filter_map(|size| {
            let range = EntryRange::new(start, start + size);
            start += size;
            range
        })
        .collect()
}

/// Whether `ranges` is ascending, abutting, starts at zero and ends at `records`.
pub fn covers_exactly(ranges: &[EntryRange], records: u64) -> bool {
    match (ranges.first(), ranges.last()) {
        (None, None) => records == 0,
        (Some(first), Some(last)) => {
            first.start() == 0
                && last.end() == records
                && ranges.windows(2).all(|pair| pair[0].abuts(&pair[1]))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_inverted() {
        assert!(EntryRange::new(3, 3).is_none());
        assert!(EntryRange::new(4, 3).is_none());
        let range = EntryRange::new(3, 7).unwrap();
        assert_eq!(range.len(), 4);
        assert_eq!(range.to_string(), "[3, 7)");
    }

    #[test]
    fn sizes_become_abutting_ranges() {
        let ranges = ranges_from_sizes([5, 0, 3, 2]);
        assert_eq!(
            ranges,
            vec![
                EntryRange::new(0, 5).unwrap(),
                EntryRange::new(5, 8).unwrap(),
                EntryRange::new(8, 10).unwrap(),
            ]
        );
        assert!(covers_exactly(&ranges, 10));
        assert!(!covers_exactly(&ranges, 11));
        assert!(covers_exactly(&[], 0));
    }

    #[test]
    fn gaps_are_not_coverage() {
        let ranges = [EntryRange::new(0, 2).unwrap(), EntryRange::new(3, 5).unwrap()];
        assert!(!covers_exactly(&ranges, 5));
    }
}
