//! Half-open time ranges.

use num_rational::Rational64;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SpliceError;
use crate::label::SchemaLabel;
use crate::time::{ratio_sum, RationalTime};

/// A time range with inclusive start and exclusive end:
/// `[start_time, start_time + duration)`.
///
/// `duration` is expected to be non-negative. Constructors and
/// `duration_extended_by` keep whatever duration their inputs give, so an
/// end before the start yields a negative one. `clamped_range` and
/// `intersection` never produce a negative duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "TimeRangeRepr", try_from = "TimeRangeRepr")]
pub struct TimeRange {
    pub start_time: RationalTime,
    pub duration: RationalTime,
}

impl TimeRange {
    /// Create a new time range from start and duration.
    #[inline]
    pub fn new(start_time: RationalTime, duration: RationalTime) -> Self {
        Self {
            start_time,
            duration,
        }
    }

    /// A range of `duration` starting at zero in the duration's rate.
    #[inline]
    pub fn from_duration(duration: RationalTime) -> Self {
        Self {
            start_time: RationalTime::from_ratio(Rational64::from_integer(0), duration.rate_ratio()),
            duration,
        }
    }

    /// Create a time range from start and exclusive end times.
    pub fn from_start_end_time(start_time: RationalTime, end_time_exclusive: RationalTime) -> Self {
        Self {
            start_time,
            duration: RationalTime::duration_from_start_end_time(start_time, end_time_exclusive),
        }
    }

    /// Create a time range from start and inclusive end times.
    pub fn from_start_end_time_inclusive(
        start_time: RationalTime,
        end_time_inclusive: RationalTime,
    ) -> Self {
        Self {
            start_time,
            duration: RationalTime::duration_from_start_end_time_inclusive(
                start_time,
                end_time_inclusive,
            ),
        }
    }

    /// End time (exclusive), at the start time's rate.
    #[inline]
    pub fn end_time_exclusive(self) -> RationalTime {
        RationalTime::from_ratio(
            ratio_sum(
                self.duration
                    .value_rescaled_to_ratio(self.start_time.rate_ratio()),
                self.start_time.value_ratio(),
            ),
            self.start_time.rate_ratio(),
        )
    }

    /// The last frame inside the range, one frame of the duration's rate
    /// before the exclusive end. Ranges shorter than a frame report their
    /// start time.
    pub fn end_time_inclusive(self) -> RationalTime {
        let end = self.end_time_exclusive();
        let span = end - self.start_time.rescaled_to_time(self.duration);
        if span.value_ratio() > Rational64::from_integer(1) {
            if self.duration.value_ratio().is_integer() {
                end - RationalTime::from_ratio(
                    Rational64::from_integer(1),
                    self.duration.rate_ratio(),
                )
            } else {
                end.floor()
            }
        } else {
            self.start_time
        }
    }

    /// Same start, duration grown by `other`.
    #[inline]
    pub fn duration_extended_by(self, other: RationalTime) -> Self {
        Self::new(self.start_time, self.duration + other)
    }

    /// Smallest range covering both `self` and `other`.
    pub fn extended_by(self, other: Self) -> Self {
        let start = self.start_time.min(other.start_time);
        let end = self.end_time_exclusive().max(other.end_time_exclusive());
        Self::from_start_end_time(start, end)
    }

    /// Clamp `time` into `[start_time, end_time_inclusive]`.
    pub fn clamped_time(self, time: RationalTime) -> RationalTime {
        time.max(self.start_time).min(self.end_time_inclusive())
    }

    /// Clamp `other` so that it lies inside this range.
    pub fn clamped_range(self, other: Self) -> Self {
        let start = other.start_time.max(self.start_time);
        let end = other
            .end_time_exclusive()
            .min(self.end_time_exclusive())
            .max(start);
        Self::from_start_end_time(start, end)
    }

    /// Check if a time is within this range.
    #[inline]
    pub fn contains(self, time: RationalTime) -> bool {
        self.start_time <= time && time < self.end_time_exclusive()
    }

    /// Check if `other` lies entirely within this range.
    #[inline]
    pub fn contains_range(self, other: Self) -> bool {
        self.start_time <= other.start_time
            && self.end_time_exclusive() >= other.end_time_exclusive()
    }

    /// `time` lies strictly inside the range, excluding the start instant.
    #[inline]
    pub fn overlaps_time(self, time: RationalTime) -> bool {
        self.start_time < time && time < self.end_time_exclusive()
    }

    /// Check if two ranges share any instant.
    ///
    /// A zero-length range overlaps a range that strictly contains its
    /// start.
    pub fn overlaps(self, other: Self) -> bool {
        self.start_time < other.end_time_exclusive()
            && other.start_time < self.end_time_exclusive()
    }

    /// Compute the intersection of two ranges, if any.
    pub fn intersection(self, other: Self) -> Option<Self> {
        if !self.overlaps(other) {
            return None;
        }
        let start = self.start_time.max(other.start_time);
        let end = self.end_time_exclusive().min(other.end_time_exclusive());
        Some(Self::from_start_end_time(start, end))
    }

    /// This range ends strictly before `other` starts.
    #[inline]
    pub fn before(self, other: Self) -> bool {
        self.end_time_exclusive() < other.start_time
    }

    /// This range ends exactly where `other` starts.
    #[inline]
    pub fn meets(self, other: Self) -> bool {
        self.end_time_exclusive() == other.start_time
    }

    /// Both start together and this range ends first.
    #[inline]
    pub fn begins(self, other: Self) -> bool {
        self.start_time == other.start_time
            && self.end_time_exclusive() < other.end_time_exclusive()
    }

    /// Both end together and this range starts later.
    #[inline]
    pub fn finishes(self, other: Self) -> bool {
        self.end_time_exclusive() == other.end_time_exclusive()
            && self.start_time > other.start_time
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start_time, self.end_time_exclusive())
    }
}

/// Portable shape: `{"OTIO_SCHEMA": "TimeRange.1", "start_time": .., "duration": ..}`.
#[derive(Serialize, Deserialize)]
struct TimeRangeRepr {
    #[serde(rename = "OTIO_SCHEMA", default = "TimeRangeRepr::label")]
    schema: String,
    start_time: RationalTime,
    duration: RationalTime,
}

impl TimeRangeRepr {
    const NAME: &'static str = "TimeRange";
    const VERSION: u32 = 1;

    fn label() -> String {
        SchemaLabel::new(Self::NAME, Self::VERSION).to_string()
    }
}

impl From<TimeRange> for TimeRangeRepr {
    fn from(range: TimeRange) -> Self {
        Self {
            schema: Self::label(),
            start_time: range.start_time,
            duration: range.duration,
        }
    }
}

impl TryFrom<TimeRangeRepr> for TimeRange {
    type Error = SpliceError;

    fn try_from(repr: TimeRangeRepr) -> Result<Self, Self::Error> {
        SchemaLabel::expect(&repr.schema, TimeRangeRepr::NAME, TimeRangeRepr::VERSION)?;
        Ok(Self::new(repr.start_time, repr.duration))
    }
}
