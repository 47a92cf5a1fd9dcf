//! Byte accounting shared by every read task.
//!
//! [`ByteData`] forms a commutative monoid under pointwise addition, so totals
//! do not depend on how many workers ran or in which order tasks finished.

use std::{iter::Sum, ops::Add};

/// Bytes moved by one read, or by any fold of reads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ByteData {
    /// Bytes materialised in memory after decoding.
    pub uncompressed: u64,
    /// Bytes fetched from the underlying storage.
    pub compressed: u64,
}

impl ByteData {
    /// Build a value from its two counters.
    pub const fn new(uncompressed: u64, compressed: u64) -> Self {
        Self {
            uncompressed,
            compressed,
        }
    }

    /// The neutral element: `{0, 0}`.
    pub const fn identity() -> Self {
        Self::new(0, 0)
    }

    /// Pointwise sum, producing a new value. Counters saturate at `u64::MAX`.
    #[must_use]
    pub const fn combine(self, other: ByteData) -> ByteData {
        ByteData {
            uncompressed: self.uncompressed.saturating_add(other.uncompressed),
            compressed: self.compressed.saturating_add(other.compressed),
        }
    }
}

impl Add for ByteData {
    type Output = ByteData;

    fn add(self, rhs: ByteData) -> ByteData {
        self.combine(rhs)
    }
}

impl Sum for ByteData {
    fn sum<I: Iterator<Item = ByteData>>(iter: I) -> Self {
        iter.fold(ByteData::identity(), ByteData::combine)
    }
}
