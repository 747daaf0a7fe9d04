//! Bucketing and aggregation policy
//!
//! Partitions a series' ordered datapoints into step-aligned half-open
//! buckets and reduces each bucket to exactly one tile. The reduction
//! policy is a closed set of variants dispatched through one interface, so
//! the bucketing mechanism stays policy-agnostic.

use serde::{Deserialize, Serialize};

use crate::tile::blocks::block_start;
use crate::types::{DataPoint, TimeUnit};

/// Aggregation policy applied within each bucket
///
/// `LastValue` keeps the datapoint with the greatest timestamp in the
/// bucket, preserving that datapoint's own timestamp in the emitted tile.
/// The other policies emit their aggregate at the bucket start instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AggregationPolicy {
    /// Value of the datapoint with the greatest timestamp; ties broken by
    /// the datapoint encountered last in scan order
    #[default]
    LastValue,

    /// Sum of all values in the bucket
    Sum,

    /// Minimum value in the bucket
    Min,

    /// Maximum value in the bucket
    Max,

    /// Number of datapoints in the bucket
    Count,
}

impl AggregationPolicy {
    /// Short policy name for logs
    pub fn name(&self) -> &'static str {
        match self {
            AggregationPolicy::LastValue => "last",
            AggregationPolicy::Sum => "sum",
            AggregationPolicy::Min => "min",
            AggregationPolicy::Max => "max",
            AggregationPolicy::Count => "count",
        }
    }
}

/// Incremental reduction state for one bucket
#[derive(Debug)]
struct BucketState {
    bucket_start: i64,
    sum: f64,
    count: u64,
    min: f64,
    max: f64,
    // Last datapoint seen in scan order; >= on timestamps means an equal
    // timestamp later in the scan replaces the earlier one
    last: (i64, f64),
    unit: TimeUnit,
}

impl BucketState {
    fn open(bucket_start: i64, point: &DataPoint) -> Self {
        Self {
            bucket_start,
            sum: point.value,
            count: 1,
            min: point.value,
            max: point.value,
            last: (point.timestamp, point.value),
            unit: point.unit,
        }
    }

    fn add(&mut self, point: &DataPoint) {
        self.sum += point.value;
        self.count += 1;
        if point.value < self.min {
            self.min = point.value;
        }
        if point.value > self.max {
            self.max = point.value;
        }
        if point.timestamp >= self.last.0 {
            self.last = (point.timestamp, point.value);
            self.unit = point.unit;
        }
    }

    /// Reduce the bucket to its tile
    ///
    /// A state always holds at least one datapoint; empty buckets are never
    /// opened, so no gap-filling can occur.
    fn finalize(&self, policy: AggregationPolicy) -> DataPoint {
        let (timestamp, value) = match policy {
            AggregationPolicy::LastValue => self.last,
            AggregationPolicy::Sum => (self.bucket_start, self.sum),
            AggregationPolicy::Min => (self.bucket_start, self.min),
            AggregationPolicy::Max => (self.bucket_start, self.max),
            AggregationPolicy::Count => (self.bucket_start, self.count as f64),
        };
        // Tiles never carry annotations
        DataPoint::with_unit(timestamp, value, self.unit)
    }
}

/// Aggregate one series' ordered datapoints into tiles
///
/// Datapoint `d` belongs to the half-open bucket
/// `[⌊d.timestamp / step⌋ · step, … + step)`. Buckets with no datapoints
/// produce no tile. The input must already be restricted to the scanned
/// interval and ordered by timestamp.
pub fn aggregate_series(
    points: &[DataPoint],
    step_ms: i64,
    policy: AggregationPolicy,
) -> Vec<DataPoint> {
    debug_assert!(step_ms > 0);

    let mut tiles = Vec::new();
    let mut state: Option<BucketState> = None;

    for point in points {
        let bucket = block_start(point.timestamp, step_ms);
        match state.as_mut() {
            Some(current) if current.bucket_start == bucket => current.add(point),
            Some(current) => {
                tiles.push(current.finalize(policy));
                state = Some(BucketState::open(bucket, point));
            }
            None => state = Some(BucketState::open(bucket, point)),
        }
    }
    if let Some(current) = state {
        tiles.push(current.finalize(policy));
    }
    tiles
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN_MS: i64 = 60_000;

    fn points(data: &[(i64, f64)]) -> Vec<DataPoint> {
        data.iter().map(|&(ts, v)| DataPoint::new(ts, v)).collect()
    }

    #[test]
    fn test_last_value_per_bucket() {
        // Two buckets of 10 minutes; last value of each wins
        let raw = points(&[
            (0, 1.0),
            (4 * MIN_MS, 2.0),
            (9 * MIN_MS, 3.0),
            (12 * MIN_MS, 4.0),
        ]);
        let tiles = aggregate_series(&raw, 10 * MIN_MS, AggregationPolicy::LastValue);

        assert_eq!(tiles.len(), 2);
        // Tile keeps the last datapoint's own timestamp
        assert_eq!((tiles[0].timestamp, tiles[0].value), (9 * MIN_MS, 3.0));
        assert_eq!((tiles[1].timestamp, tiles[1].value), (12 * MIN_MS, 4.0));
    }

    #[test]
    fn test_equal_timestamps_last_in_scan_order_wins() {
        let raw = points(&[(MIN_MS, 1.0), (MIN_MS, 7.0)]);
        let tiles = aggregate_series(&raw, 10 * MIN_MS, AggregationPolicy::LastValue);
        assert_eq!(tiles.len(), 1);
        assert_eq!(tiles[0].value, 7.0);
    }

    #[test]
    fn test_bucket_boundary_is_half_open() {
        // A point exactly at a bucket boundary opens the next bucket
        let raw = points(&[(9 * MIN_MS, 1.0), (10 * MIN_MS, 2.0)]);
        let tiles = aggregate_series(&raw, 10 * MIN_MS, AggregationPolicy::LastValue);
        assert_eq!(tiles.len(), 2);
        assert_eq!(tiles[1].timestamp, 10 * MIN_MS);
    }

    #[test]
    fn test_empty_input_produces_no_tiles() {
        let tiles = aggregate_series(&[], 10 * MIN_MS, AggregationPolicy::LastValue);
        assert!(tiles.is_empty());
    }

    #[test]
    fn test_sum_min_max_count_emit_bucket_start() {
        let raw = points(&[(MIN_MS, 3.0), (2 * MIN_MS, 1.0), (3 * MIN_MS, 5.0)]);

        let sum = aggregate_series(&raw, 10 * MIN_MS, AggregationPolicy::Sum);
        assert_eq!((sum[0].timestamp, sum[0].value), (0, 9.0));

        let min = aggregate_series(&raw, 10 * MIN_MS, AggregationPolicy::Min);
        assert_eq!(min[0].value, 1.0);

        let max = aggregate_series(&raw, 10 * MIN_MS, AggregationPolicy::Max);
        assert_eq!(max[0].value, 5.0);

        let count = aggregate_series(&raw, 10 * MIN_MS, AggregationPolicy::Count);
        assert_eq!(count[0].value, 3.0);
    }

    #[test]
    fn test_tiles_carry_no_annotation() {
        let raw = vec![DataPoint::new(MIN_MS, 1.0)
            .with_annotation(bytes::Bytes::from_static(b"note"))];
        let tiles = aggregate_series(&raw, 10 * MIN_MS, AggregationPolicy::LastValue);
        assert!(tiles[0].annotation.is_none());
    }

    #[test]
    fn test_sparse_buckets_produce_no_gap_tiles() {
        // Points only in buckets 0 and 5
        let raw = points(&[(MIN_MS, 1.0), (51 * MIN_MS, 2.0)]);
        let tiles = aggregate_series(&raw, 10 * MIN_MS, AggregationPolicy::LastValue);
        assert_eq!(tiles.len(), 2);
    }
}
