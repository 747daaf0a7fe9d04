//! Core data types used throughout the tile aggregation engine
//!
//! # Key Types
//!
//! - **`DataPoint`**: A single measurement (timestamp + value + unit)
//! - **`SeriesIdentity`**: Stable key + ordered tags identifying one series
//! - **`TimeRange`**: Half-open time window `[start, end)`
//! - **`TimeUnit`**: Precision annotation carried with each datapoint
//!
//! All bucketing and block-overlap computations in this crate use the
//! half-open convention: a timestamp exactly at `end` is excluded, a
//! timestamp exactly at `start` is included.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

/// Time precision carried with a datapoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TimeUnit {
    /// One-second precision
    Seconds,
    /// One-millisecond precision
    #[default]
    Milliseconds,
    /// One-microsecond precision
    Microseconds,
    /// One-nanosecond precision
    Nanoseconds,
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TimeUnit::Seconds => "s",
            TimeUnit::Milliseconds => "ms",
            TimeUnit::Microseconds => "us",
            TimeUnit::Nanoseconds => "ns",
        };
        write!(f, "{}", s)
    }
}

/// A single data point in a time-series
///
/// Raw datapoints may carry an opaque annotation payload; aggregated (tile)
/// datapoints never do.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPoint {
    /// Unix timestamp in milliseconds since epoch
    pub timestamp: i64,

    /// Floating-point measurement value
    pub value: f64,

    /// Time precision of the measurement
    pub unit: TimeUnit,

    /// Opaque annotation payload (raw ingestion only)
    pub annotation: Option<Bytes>,
}

impl DataPoint {
    /// Create a new data point with the default unit and no annotation
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self {
            timestamp,
            value,
            unit: TimeUnit::default(),
            annotation: None,
        }
    }

    /// Create a data point with an explicit unit
    pub fn with_unit(timestamp: i64, value: f64, unit: TimeUnit) -> Self {
        Self {
            timestamp,
            value,
            unit,
            annotation: None,
        }
    }

    /// Attach an annotation payload
    pub fn with_annotation(mut self, annotation: Bytes) -> Self {
        self.annotation = Some(annotation);
        self
    }
}

/// A single key/value tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    /// Tag name
    pub name: String,
    /// Tag value
    pub value: String,
}

impl Tag {
    /// Create a tag from string slices
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

/// An ordered set of tags
///
/// Order is preserved as given; two tag sets with the same pairs in a
/// different order are distinct identities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TagSet(pub Vec<Tag>);

impl TagSet {
    /// Create an empty tag set
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Create from name/value pairs
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self(pairs.iter().map(|(n, v)| Tag::new(n, v)).collect())
    }

    /// Append a tag, preserving order
    pub fn push(&mut self, name: &str, value: &str) {
        self.0.push(Tag::new(name, value));
    }

    /// Look up a tag value by name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.value.as_str())
    }

    /// Number of tags
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Stable identity of one time series
///
/// The key and tag set are stable across namespaces, so a series aggregated
/// from a source namespace lands under the same identity in the target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeriesIdentity {
    /// Opaque series key
    pub key: String,

    /// Ordered tags
    pub tags: TagSet,
}

impl SeriesIdentity {
    /// Create a series identity
    pub fn new(key: &str, tags: TagSet) -> Self {
        Self {
            key: key.to_string(),
            tags,
        }
    }
}

impl fmt::Display for SeriesIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key)
    }
}

/// Half-open time range `[start, end)`
///
/// # Example
///
/// ```rust
/// use tessera_tsdb::types::TimeRange;
///
/// let range = TimeRange::new(1000, 2000).unwrap();
/// assert!(range.contains(1000)); // start is inclusive
/// assert!(!range.contains(2000)); // end is exclusive
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Start timestamp in milliseconds (inclusive)
    pub start: i64,

    /// End timestamp in milliseconds (exclusive)
    pub end: i64,
}

impl TimeRange {
    /// Create a new time range, validating `start < end`
    pub fn new(start: i64, end: i64) -> std::result::Result<Self, ValidationError> {
        if start >= end {
            return Err(ValidationError::InvalidTimeRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Create a range without validation
    ///
    /// Only for ranges already known to be well-formed (e.g. block
    /// intervals produced by the block iterator).
    pub fn new_unchecked(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Check whether a timestamp falls within `[start, end)`
    pub fn contains(&self, timestamp: i64) -> bool {
        timestamp >= self.start && timestamp < self.end
    }

    /// Check whether two half-open ranges intersect
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Intersection of two half-open ranges, if non-empty
    pub fn intersect(&self, other: &TimeRange) -> Option<TimeRange> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if start < end {
            Some(TimeRange { start, end })
        } else {
            None
        }
    }

    /// Duration of this range in milliseconds
    pub fn duration_ms(&self) -> i64 {
        self.end - self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_range_half_open() {
        let range = TimeRange::new(100, 200).unwrap();
        assert!(range.contains(100));
        assert!(range.contains(150));
        assert!(range.contains(199));
        assert!(!range.contains(200));
        assert!(!range.contains(99));
        assert_eq!(range.duration_ms(), 100);
    }

    #[test]
    fn test_time_range_rejects_empty_and_inverted() {
        assert!(TimeRange::new(200, 100).is_err());
        assert!(TimeRange::new(100, 100).is_err());
    }

    #[test]
    fn test_time_range_overlaps() {
        let a = TimeRange::new(0, 100).unwrap();
        let b = TimeRange::new(100, 200).unwrap();
        let c = TimeRange::new(50, 150).unwrap();

        // Touching half-open ranges do not overlap
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(b.overlaps(&c));
    }

    #[test]
    fn test_time_range_intersect() {
        let a = TimeRange::new(0, 100).unwrap();
        let c = TimeRange::new(50, 150).unwrap();

        assert_eq!(a.intersect(&c), Some(TimeRange::new_unchecked(50, 100)));
        let b = TimeRange::new(100, 200).unwrap();
        assert_eq!(a.intersect(&b), None);
    }

    #[test]
    fn test_tag_set_order_preserved() {
        let tags = TagSet::from_pairs(&[("__name__", "cpu"), ("job", "job1")]);
        assert_eq!(tags.get("__name__"), Some("cpu"));
        assert_eq!(tags.get("job"), Some("job1"));
        assert_eq!(tags.0[0].name, "__name__");

        let reordered = TagSet::from_pairs(&[("job", "job1"), ("__name__", "cpu")]);
        assert_ne!(tags, reordered);
    }

    #[test]
    fn test_data_point_annotation() {
        let dp = DataPoint::new(1000, 42.5).with_annotation(Bytes::from_static(b"meta"));
        assert!(dp.annotation.is_some());

        let plain = DataPoint::with_unit(1000, 42.5, TimeUnit::Seconds);
        assert!(plain.annotation.is_none());
        assert_eq!(plain.unit.to_string(), "s");
    }
}
