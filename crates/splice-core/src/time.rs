//! Time representation for frame-accurate editing
//!
//! A [`RationalTime`] is a `(value, rate)` pair meaning `value / rate`
//! seconds. Callers speak `f64` at the edges, but both components are kept
//! as exact rationals so rescaling, arithmetic and comparison never drift.
//! Rounding to whole frames only happens at presentation boundaries (see
//! the timecode functions in [`crate::timecode`]).

use num_rational::{Ratio, Rational64};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use crate::error::SpliceError;
use crate::label::SchemaLabel;

const ZERO: Rational64 = Rational64::new_raw(0, 1);

/// Intermediate precision: the product of any two `Rational64` components
/// fits, so sums, differences and quotients of stored values are exact.
pub(crate) type WideRatio = Ratio<i128>;

/// Snap a float onto the simplest fraction that reproduces it exactly.
///
/// Expands the float's exact binary value as a continued fraction and stops
/// at the first convergent whose `f64` quotient equals `x`, so `29.97`
/// becomes `2997/100`, `30000.0 / 1001.0` becomes `30000/1001` and
/// `0.1234567` becomes `1234567/10000000`. Every float of magnitude between
/// `2^-10` and `2^63` is reproduced exactly. Smaller floats with no such
/// fraction inside `i64` get the closest convergent that fits, and larger
/// ones saturate. Non-finite input maps to zero.
pub fn ratio_from_f64(x: f64) -> Rational64 {
    if !x.is_finite() {
        return ZERO;
    }
    let target = x.abs();
    let magnitude = if target.fract() == 0.0 {
        // Float-to-int casts saturate outside i64.
        Rational64::from_integer(target as i64)
    } else {
        closest_convergent(target)
    };
    if x < 0.0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Continued-fraction search over the exact value of a positive,
/// non-integral float.
fn closest_convergent(target: f64) -> Rational64 {
    let bits = target.to_bits();
    let biased_exponent = ((bits >> 52) & 0x7ff) as u32;
    let fraction = bits & ((1 << 52) - 1);
    // target == mantissa / 2^shift
    let (mantissa, shift) = if biased_exponent == 0 {
        (fraction, 1074)
    } else {
        (fraction | (1 << 52), 1075 - biased_exponent)
    };
    let trailing = mantissa.trailing_zeros().min(shift);
    let (mantissa, shift) = (mantissa >> trailing, shift - trailing);
    if shift > 126 {
        return ZERO;
    }

    let (mut n, mut d) = (i128::from(mantissa), 1i128 << shift);
    let (mut h_prev, mut h) = (0i128, 1i128);
    let (mut k_prev, mut k) = (1i128, 0i128);
    let mut best = ZERO;
    while d != 0 {
        let a = n / d;
        (n, d) = (d, n % d);
        let (Some(h_next), Some(k_next)) = (
            a.checked_mul(h).and_then(|v| v.checked_add(h_prev)),
            a.checked_mul(k).and_then(|v| v.checked_add(k_prev)),
        ) else {
            break;
        };
        let (Ok(numer), Ok(denom)) = (i64::try_from(h_next), i64::try_from(k_next)) else {
            break;
        };
        (h_prev, h, k_prev, k) = (h, h_next, k, k_next);
        best = Rational64::new_raw(numer, denom);
        if ratio_to_f64(best) == target {
            break;
        }
    }
    best
}

/// Convert an exact rational to the nearest `f64`.
#[inline]
pub fn ratio_to_f64(r: Rational64) -> f64 {
    *r.numer() as f64 / *r.denom() as f64
}

#[inline]
pub(crate) fn widen(r: Rational64) -> WideRatio {
    WideRatio::new_raw(i128::from(*r.numer()), i128::from(*r.denom()))
}

#[inline]
fn wide_to_f64(r: WideRatio) -> f64 {
    *r.numer() as f64 / *r.denom() as f64
}

/// Bring an exact intermediate back to storage precision. A result that no
/// longer fits `Rational64` is re-snapped through its nearest `f64`.
pub(crate) fn narrow(r: WideRatio) -> Rational64 {
    match (i64::try_from(*r.numer()), i64::try_from(*r.denom())) {
        (Ok(numer), Ok(denom)) => Rational64::new_raw(numer, denom),
        _ => ratio_from_f64(wide_to_f64(r)),
    }
}

/// `a / b` for stored values; always exact. `b` must be non-zero.
fn exact_quotient(a: Rational64, b: Rational64) -> WideRatio {
    let (a, b) = (widen(a), widen(b));
    WideRatio::new(a.numer() * b.denom(), a.denom() * b.numer())
}

/// `a * b`, or `None` once the product leaves `i128`.
fn checked_product(a: WideRatio, b: WideRatio) -> Option<WideRatio> {
    let numer = a.numer().checked_mul(*b.numer())?;
    let denom = a.denom().checked_mul(*b.denom())?;
    Some(WideRatio::new(numer, denom))
}

#[inline]
pub(crate) fn ratio_sum(a: Rational64, b: Rational64) -> Rational64 {
    narrow(widen(a) + widen(b))
}

#[inline]
pub(crate) fn ratio_difference(a: Rational64, b: Rational64) -> Rational64 {
    narrow(widen(a) - widen(b))
}

fn ratio_abs(r: Rational64) -> Rational64 {
    if r < ZERO {
        -r
    } else {
        r
    }
}

/// A point in time (or a duration) expressed as `value / rate` seconds.
#[derive(Clone, Copy, Serialize, Deserialize)]
#[serde(into = "RationalTimeRepr", try_from = "RationalTimeRepr")]
pub struct RationalTime {
    value: Rational64,
    rate: Rational64,
}

impl RationalTime {
    /// Zero time at rate 1.
    pub const ZERO: Self = Self {
        value: ZERO,
        rate: Rational64::new_raw(1, 1),
    };

    /// The invalid time: zero value at rate 0.
    pub const INVALID: Self = Self {
        value: ZERO,
        rate: ZERO,
    };

    /// Create a time of `value` units at `rate` units per second.
    #[inline]
    pub fn new(value: f64, rate: f64) -> Self {
        Self {
            value: ratio_from_f64(value),
            rate: ratio_from_f64(rate),
        }
    }

    /// Create a time from exact rational components.
    #[inline]
    pub const fn from_ratio(value: Rational64, rate: Rational64) -> Self {
        Self { value, rate }
    }

    #[inline]
    pub fn value(self) -> f64 {
        ratio_to_f64(self.value)
    }

    #[inline]
    pub fn rate(self) -> f64 {
        ratio_to_f64(self.rate)
    }

    /// Exact value component.
    #[inline]
    pub fn value_ratio(self) -> Rational64 {
        self.value
    }

    /// Exact rate component.
    #[inline]
    pub fn rate_ratio(self) -> Rational64 {
        self.rate
    }

    /// A rate of zero or below marks the time as invalid.
    #[inline]
    pub fn is_invalid_time(self) -> bool {
        self.rate <= ZERO
    }

    /// Exact value of this time expressed at `new_rate`.
    ///
    /// Exact whenever the result fits `Rational64`. Otherwise the nearest
    /// `f64` is snapped back, saturating at the `i64` range.
    pub fn value_rescaled_to_ratio(self, new_rate: Rational64) -> Rational64 {
        if new_rate == self.rate || self.is_invalid_time() || new_rate <= ZERO {
            return self.value;
        }
        let factor = exact_quotient(new_rate, self.rate);
        match checked_product(widen(self.value), factor) {
            Some(value) => narrow(value),
            None => ratio_from_f64(ratio_to_f64(self.value) * wide_to_f64(factor)),
        }
    }

    /// Value of this time expressed at `new_rate`.
    #[inline]
    pub fn value_rescaled_to(self, new_rate: f64) -> f64 {
        ratio_to_f64(self.value_rescaled_to_ratio(ratio_from_f64(new_rate)))
    }

    /// The same instant expressed at `new_rate`.
    #[inline]
    pub fn rescaled_to(self, new_rate: f64) -> Self {
        self.rescaled_to_ratio(ratio_from_f64(new_rate))
    }

    /// The same instant expressed at an exact rate.
    pub fn rescaled_to_ratio(self, new_rate: Rational64) -> Self {
        Self {
            value: self.value_rescaled_to_ratio(new_rate),
            rate: new_rate,
        }
    }

    /// The same instant expressed at the rate of `other`.
    #[inline]
    pub fn rescaled_to_time(self, other: Self) -> Self {
        self.rescaled_to_ratio(other.rate)
    }

    /// Frame number at `rate`, truncated toward zero.
    #[inline]
    pub fn to_frames(self, rate: f64) -> i64 {
        self.value_rescaled_to_ratio(ratio_from_f64(rate)).to_integer()
    }

    /// Frame number at this time's own rate, truncated toward zero.
    #[inline]
    pub fn frames(self) -> i64 {
        self.value.to_integer()
    }

    /// Create a time from a frame number; fractional frames are truncated.
    #[inline]
    pub fn from_frames(frame: f64, rate: f64) -> Self {
        Self::new(frame.trunc(), rate)
    }

    /// Number of seconds, exact whenever it fits `Rational64`.
    #[inline]
    pub fn seconds_ratio(self) -> Rational64 {
        narrow(self.seconds_exact())
    }

    fn seconds_exact(self) -> WideRatio {
        if self.is_invalid_time() {
            return widen(self.value);
        }
        exact_quotient(self.value, self.rate)
    }

    #[inline]
    pub fn to_seconds(self) -> f64 {
        ratio_to_f64(self.seconds_ratio())
    }

    /// Create a time of `seconds` expressed at `rate`.
    #[inline]
    pub fn from_seconds(seconds: f64, rate: f64) -> Self {
        Self::from_ratio(ratio_from_f64(seconds), Rational64::from_integer(1)).rescaled_to(rate)
    }

    /// Duration between `start_time` and `end_time_exclusive`, at the
    /// start time's rate.
    pub fn duration_from_start_end_time(start_time: Self, end_time_exclusive: Self) -> Self {
        Self {
            value: ratio_difference(
                end_time_exclusive.value_rescaled_to_ratio(start_time.rate),
                start_time.value,
            ),
            rate: start_time.rate,
        }
    }

    /// Duration between `start_time` and `end_time_inclusive` (one frame
    /// longer than the exclusive form), at the start time's rate.
    pub fn duration_from_start_end_time_inclusive(
        start_time: Self,
        end_time_inclusive: Self,
    ) -> Self {
        let end = widen(end_time_inclusive.value_rescaled_to_ratio(start_time.rate));
        Self {
            value: narrow(end - widen(start_time.value) + WideRatio::from_integer(1)),
            rate: start_time.rate,
        }
    }

    /// Largest whole frame at or below this time, at its own rate.
    #[inline]
    pub fn floor(self) -> Self {
        Self {
            value: narrow(widen(self.value).floor()),
            rate: self.rate,
        }
    }

    /// Smallest whole frame at or above this time, at its own rate.
    #[inline]
    pub fn ceil(self) -> Self {
        Self {
            value: narrow(widen(self.value).ceil()),
            rate: self.rate,
        }
    }

    /// Nearest whole frame, half away from zero.
    #[inline]
    pub fn round(self) -> Self {
        Self {
            value: narrow(widen(self.value).round()),
            rate: self.rate,
        }
    }

    /// Zero, expressed at this time's rate.
    #[inline]
    pub fn zero_at_same_rate(self) -> Self {
        Self {
            value: ZERO,
            rate: self.rate,
        }
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self.value == ZERO
    }

    #[inline]
    pub fn abs(self) -> Self {
        Self {
            value: ratio_abs(self.value),
            rate: self.rate,
        }
    }

    /// Fuzzy comparison: true when the values differ by at most `delta`
    /// units of `other`'s rate. Equality itself never uses a tolerance.
    pub fn almost_equal(self, other: Self, delta: f64) -> bool {
        let diff = widen(self.value_rescaled_to_ratio(other.rate)) - widen(other.value);
        wide_to_f64(diff).abs() <= delta
    }

    /// The higher of the two rates, which every binary operation works in.
    #[inline]
    fn common_rate(self, other: Self) -> Rational64 {
        if self.rate >= other.rate {
            self.rate
        } else {
            other.rate
        }
    }

    /// Key that orders and hashes times by the instant they denote.
    /// Invalid times sort after every valid one.
    #[inline]
    fn instant_key(self) -> (bool, WideRatio) {
        (self.is_invalid_time(), self.seconds_exact())
    }
}

impl Default for RationalTime {
    fn default() -> Self {
        Self::ZERO
    }
}

impl PartialEq for RationalTime {
    fn eq(&self, other: &Self) -> bool {
        self.instant_key() == other.instant_key()
    }
}

impl Eq for RationalTime {}

impl PartialOrd for RationalTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RationalTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.instant_key().cmp(&other.instant_key())
    }
}

impl Hash for RationalTime {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.instant_key().hash(state);
    }
}

impl Add for RationalTime {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        let rate = self.common_rate(rhs);
        Self {
            value: ratio_sum(
                self.value_rescaled_to_ratio(rate),
                rhs.value_rescaled_to_ratio(rate),
            ),
            rate,
        }
    }
}

impl Sub for RationalTime {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        let rate = self.common_rate(rhs);
        Self {
            value: ratio_difference(
                self.value_rescaled_to_ratio(rate),
                rhs.value_rescaled_to_ratio(rate),
            ),
            rate,
        }
    }
}

impl AddAssign for RationalTime {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for RationalTime {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Neg for RationalTime {
    type Output = Self;
    fn neg(self) -> Self {
        Self {
            value: -self.value,
            rate: self.rate,
        }
    }
}

impl fmt::Debug for RationalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RationalTime")
            .field("value", &self.value())
            .field("rate", &self.rate())
            .finish()
    }
}

impl fmt::Display for RationalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.value(), self.rate())
    }
}

/// Portable shape: `{"OTIO_SCHEMA": "RationalTime.1", "value": .., "rate": ..}`.
#[derive(Serialize, Deserialize)]
struct RationalTimeRepr {
    #[serde(rename = "OTIO_SCHEMA", default = "RationalTimeRepr::label")]
    schema: String,
    value: f64,
    rate: f64,
}

impl RationalTimeRepr {
    const NAME: &'static str = "RationalTime";
    const VERSION: u32 = 1;

    fn label() -> String {
        SchemaLabel::new(Self::NAME, Self::VERSION).to_string()
    }
}

impl From<RationalTime> for RationalTimeRepr {
    fn from(time: RationalTime) -> Self {
        Self {
            schema: Self::label(),
            value: time.value(),
            rate: time.rate(),
        }
    }
}

impl TryFrom<RationalTimeRepr> for RationalTime {
    type Error = SpliceError;

    fn try_from(repr: RationalTimeRepr) -> Result<Self, Self::Error> {
        SchemaLabel::expect(&repr.schema, RationalTimeRepr::NAME, RationalTimeRepr::VERSION)?;
        Ok(Self::new(repr.value, repr.rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rational_time_frames() {
        let time = RationalTime::from_frames(48.0, 24.0);
        assert_eq!(time.to_seconds(), 2.0);
        assert_eq!(time.to_frames(24.0), 48);
        assert_eq!(time.to_frames(48.0), 96);
    }

    #[test]
    fn test_snapping_keeps_ntsc_rates_exact() {
        let rate = ratio_from_f64(30000.0 / 1001.0);
        assert_eq!(rate, Rational64::new(30000, 1001));
        assert_eq!(ratio_from_f64(29.97), Rational64::new(2997, 100));
        assert_eq!(ratio_from_f64(-0.25), Rational64::new(-1, 4));
        assert_eq!(ratio_from_f64(f64::NAN), ZERO);
    }

    #[test]
    fn test_snapping_reproduces_fine_fractions() {
        assert_eq!(ratio_from_f64(0.1234567), Rational64::new(1_234_567, 10_000_000));
        for value in [0.1234567, 86_399.958_333_3, 1.0 / 3.0, 12_345.678_901_234] {
            let t = RationalTime::new(value, 24.0);
            assert_eq!(t.value(), value);
        }
    }

    #[test]
    fn test_large_values_rescale_without_overflow() {
        let ntsc = 30000.0 / 1001.0;
        let t = RationalTime::new(1.0e15, 24.0);
        let rescaled = t.rescaled_to(ntsc);
        assert_eq!(rescaled, t);
        assert_eq!(rescaled.rescaled_to(24.0).value(), 1.0e15);

        let sum = t + RationalTime::new(1.0e15, ntsc);
        assert_eq!(sum.rate(), ntsc);
        assert!(sum > t);
        assert_eq!(sum - t, RationalTime::new(1.0e15, ntsc));
    }

    #[test]
    fn test_denominators_past_i64_fall_back_to_nearest_float() {
        let fine = RationalTime::from_ratio(
            Rational64::new(1, 4_000_000_001),
            Rational64::from_integer(1),
        );
        let rescaled = fine.rescaled_to_ratio(Rational64::new(7, 4_000_000_003));
        let drift = (rescaled.to_seconds() - fine.to_seconds()).abs() / fine.to_seconds();
        assert!(drift < 1.0e-12);
    }

    #[test]
    fn test_equality_rescales_to_common_rate() {
        assert_eq!(RationalTime::new(24.0, 24.0), RationalTime::new(1.0, 1.0));
        assert_eq!(RationalTime::new(50.0, 25.0), RationalTime::new(48.0, 24.0));
        assert_ne!(RationalTime::new(1.0, 24.0), RationalTime::new(1.0, 25.0));
    }

    #[test]
    fn test_arithmetic_takes_higher_rate() {
        let a = RationalTime::new(12.0, 24.0);
        let b = RationalTime::new(15.0, 30.0);
        let sum = a + b;
        assert_eq!(sum.rate(), 30.0);
        assert_eq!(sum.value(), 30.0);
        let diff = b - a;
        assert_eq!(diff.rate(), 30.0);
        assert!(diff.is_zero());
    }

    #[test]
    fn test_rescale_round_trip_is_exact() {
        let t = RationalTime::new(1001.0, 30000.0 / 1001.0);
        let back = t.rescaled_to(24.0).rescaled_to(t.rate());
        assert_eq!(back.value(), t.value());
        assert_eq!(back.rate(), t.rate());
    }

    #[test]
    fn test_ordering() {
        let a = RationalTime::new(23.0, 24.0);
        let b = RationalTime::new(1.0, 1.0);
        assert!(a < b);
        assert!(-b < a);
        assert!(RationalTime::INVALID > b);
    }

    #[test]
    fn test_duration_from_start_end_time() {
        let start = RationalTime::new(10.0, 24.0);
        let end = RationalTime::new(1.0, 1.0);
        let d = RationalTime::duration_from_start_end_time(start, end);
        assert_eq!(d.rate(), 24.0);
        assert_eq!(d.value(), 14.0);
        let inclusive = RationalTime::duration_from_start_end_time_inclusive(start, end);
        assert_eq!(inclusive.value(), 15.0);
    }

    #[test]
    fn test_from_seconds() {
        let t = RationalTime::from_seconds(1.5, 24.0);
        assert_eq!(t.value(), 36.0);
        assert_eq!(t.rate(), 24.0);
    }

    #[test]
    fn test_almost_equal_is_explicit() {
        let a = RationalTime::new(10.0, 24.0);
        let b = RationalTime::new(10.1, 24.0);
        assert_ne!(a, b);
        assert!(a.almost_equal(b, 0.2));
        assert!(!a.almost_equal(b, 0.05));
    }

    #[test]
    fn test_serde_shape() {
        let t = RationalTime::new(18.0, 24.0);
        let json = serde_json::to_value(t).unwrap();
        assert_eq!(json["OTIO_SCHEMA"], "RationalTime.1");
        assert_eq!(json["value"], 18.0);
        let back: RationalTime = serde_json::from_value(json).unwrap();
        assert_eq!(back, t);

        let future = serde_json::json!({"OTIO_SCHEMA": "RationalTime.2", "value": 1.0, "rate": 24.0});
        assert!(serde_json::from_value::<RationalTime>(future).is_err());
    }

    #[test]
    fn test_invalid_time_never_panics() {
        let t = RationalTime::new(5.0, 0.0);
        assert!(t.is_invalid_time());
        assert_eq!(t.rescaled_to(24.0).value(), 5.0);
        let _ = t + RationalTime::new(1.0, 24.0);
    }
}
