//! Block iterator
//!
//! Enumerates the block-size-aligned, half-open intervals of a source
//! namespace that intersect a requested time range, in chronological order.
//! Intervals are aligned to the retention epoch (unix epoch), never overlap,
//! and the iterator is lazy and cheap to recreate.

use crate::types::TimeRange;

/// Floor division that rounds toward negative infinity, so pre-epoch
/// timestamps align to the block strictly at or before them.
fn floor_div(a: i64, b: i64) -> i64 {
    let d = a / b;
    if (a % b != 0) && ((a < 0) != (b < 0)) {
        d - 1
    } else {
        d
    }
}

/// Align a timestamp down to its enclosing block start
pub fn block_start(timestamp: i64, block_size_ms: i64) -> i64 {
    floor_div(timestamp, block_size_ms) * block_size_ms
}

/// Iterator over the source blocks intersecting a half-open range
#[derive(Debug, Clone)]
pub struct BlockIterator {
    current: i64,
    end: i64,
    block_size_ms: i64,
}

impl BlockIterator {
    /// Create an iterator over blocks of `block_size_ms` intersecting
    /// `range`
    pub fn new(range: TimeRange, block_size_ms: i64) -> Self {
        debug_assert!(block_size_ms > 0);
        Self {
            current: block_start(range.start, block_size_ms),
            end: range.end,
            block_size_ms,
        }
    }

    /// Number of blocks this iterator will produce
    pub fn remaining_blocks(&self) -> i64 {
        if self.current >= self.end {
            0
        } else {
            floor_div(self.end - 1 - self.current, self.block_size_ms) + 1
        }
    }
}

impl Iterator for BlockIterator {
    type Item = TimeRange;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current >= self.end {
            return None;
        }
        let block = TimeRange::new_unchecked(self.current, self.current + self.block_size_ms);
        self.current += self.block_size_ms;
        Some(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR_MS: i64 = 3_600_000;

    #[test]
    fn test_aligned_range() {
        let range = TimeRange::new(0, 6 * HOUR_MS).unwrap();
        let blocks: Vec<_> = BlockIterator::new(range, 2 * HOUR_MS).collect();

        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0], TimeRange::new_unchecked(0, 2 * HOUR_MS));
        assert_eq!(blocks[1], TimeRange::new_unchecked(2 * HOUR_MS, 4 * HOUR_MS));
        assert_eq!(blocks[2], TimeRange::new_unchecked(4 * HOUR_MS, 6 * HOUR_MS));
    }

    #[test]
    fn test_unaligned_start_snaps_to_block_boundary() {
        // Range starts mid-block; the first emitted block covers it fully
        let range = TimeRange::new(HOUR_MS / 2, 3 * HOUR_MS).unwrap();
        let blocks: Vec<_> = BlockIterator::new(range, 2 * HOUR_MS).collect();

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].start, 0);
        assert_eq!(blocks[1].end, 4 * HOUR_MS);
    }

    #[test]
    fn test_blocks_ordered_and_disjoint() {
        let range = TimeRange::new(100, 10 * HOUR_MS).unwrap();
        let blocks: Vec<_> = BlockIterator::new(range, 2 * HOUR_MS).collect();

        for pair in blocks.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
            assert!(!pair[0].overlaps(&pair[1]));
        }
        // Every block intersects the request
        for block in &blocks {
            assert!(block.overlaps(&range));
        }
    }

    #[test]
    fn test_remaining_blocks_matches_iteration() {
        let range = TimeRange::new(HOUR_MS / 2, 7 * HOUR_MS).unwrap();
        let it = BlockIterator::new(range, 2 * HOUR_MS);
        assert_eq!(it.remaining_blocks() as usize, it.count());
    }

    #[test]
    fn test_pre_epoch_alignment() {
        assert_eq!(block_start(-1, 2 * HOUR_MS), -2 * HOUR_MS);
        assert_eq!(block_start(0, 2 * HOUR_MS), 0);
        assert_eq!(block_start(2 * HOUR_MS - 1, 2 * HOUR_MS), 0);
    }

    #[test]
    fn test_iterator_is_restartable() {
        let range = TimeRange::new(0, 4 * HOUR_MS).unwrap();
        let first: Vec<_> = BlockIterator::new(range, 2 * HOUR_MS).collect();
        let second: Vec<_> = BlockIterator::new(range, 2 * HOUR_MS).collect();
        assert_eq!(first, second);
    }
}
