//! SMPTE timecode and time-string conversions.
//!
//! These are the only places where a [`RationalTime`] is rounded onto a
//! whole frame. Drop-frame timecode (29.97 and 59.94 families) skips frame
//! numbers 0 and 1 (or 0 to 3) at the start of every minute that is not a
//! multiple of ten, so the displayed clock tracks wall time.

use num_rational::Rational64;

use crate::error::{Result, SpliceError};
use crate::time::{ratio_from_f64, ratio_sum, widen, RationalTime};

/// Rates that have a timecode representation.
const VALID_TIMECODE_RATES: [f64; 16] = [
    1.0,
    12.0,
    23.97,
    23.976,
    23.98,
    24000.0 / 1001.0,
    24.0,
    25.0,
    29.97,
    30000.0 / 1001.0,
    30.0,
    48.0,
    50.0,
    59.94,
    60000.0 / 1001.0,
    60.0,
];

const DROP_FRAME_RATES: [f64; 4] = [29.97, 30000.0 / 1001.0, 59.94, 60000.0 / 1001.0];

/// Whether a timecode uses the drop-frame counting scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DropFrame {
    /// Drop frames exactly when the rate is a drop-frame rate.
    #[default]
    InferFromRate,
    /// Always drop frames; fails on rates that have no drop-frame form.
    ForceYes,
    /// Never drop frames.
    ForceNo,
}

/// How a time that falls between frames is placed onto a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameRounding {
    Floor,
    Nearest,
    Ceil,
}

/// Frames skipped per minute for a drop-frame rate.
fn dropped_frames_per_minute(rate: f64) -> i64 {
    if rate == 29.97 || rate == 30000.0 / 1001.0 {
        2
    } else if rate == 59.94 || rate == 60000.0 / 1001.0 {
        4
    } else {
        0
    }
}

impl RationalTime {
    /// Whether `rate` has a timecode representation.
    pub fn is_valid_timecode_rate(rate: f64) -> bool {
        VALID_TIMECODE_RATES.contains(&rate)
    }

    /// Whether `rate` counts timecode in drop-frame.
    pub fn is_drop_frame_rate(rate: f64) -> bool {
        DROP_FRAME_RATES.contains(&rate)
    }

    /// Format this time as `HH:MM:SS:FF` (or `HH:MM:SS;FF` for drop-frame)
    /// at `rate`.
    ///
    /// Fails with [`SpliceError::FractionalFrame`] if the time does not land
    /// on a whole frame at `rate`; use [`Self::to_timecode_rounded`] to pick
    /// a frame explicitly.
    pub fn to_timecode(self, rate: f64, drop_frame: DropFrame) -> Result<String> {
        let frames = self.frames_at_timecode_rate(rate)?;
        if !frames.is_integer() {
            return Err(SpliceError::FractionalFrame {
                frames: crate::time::ratio_to_f64(frames),
                rate,
            });
        }
        format_timecode(frames.to_integer(), rate, drop_frame)
    }

    /// Format this time as timecode, rounding onto a frame with `rounding`.
    pub fn to_timecode_rounded(
        self,
        rate: f64,
        drop_frame: DropFrame,
        rounding: FrameRounding,
    ) -> Result<String> {
        let frames = self.frames_at_timecode_rate(rate)?;
        let frames = match rounding {
            FrameRounding::Floor => frames.floor(),
            FrameRounding::Nearest => frames.round(),
            FrameRounding::Ceil => frames.ceil(),
        };
        format_timecode(frames.to_integer(), rate, drop_frame)
    }

    fn frames_at_timecode_rate(self, rate: f64) -> Result<Rational64> {
        let frames = self.value_rescaled_to_ratio(ratio_from_f64(rate));
        if frames < Rational64::from_integer(0) {
            return Err(SpliceError::NegativeTimecode);
        }
        if !Self::is_valid_timecode_rate(rate) {
            return Err(SpliceError::InvalidTimecodeRate(rate));
        }
        Ok(frames)
    }

    /// Parse `HH:MM:SS:FF` or `HH:MM:SS;FF` at `rate`.
    ///
    /// A `;` divider selects drop-frame counting and is only accepted for
    /// drop-frame rates.
    pub fn from_timecode(timecode: &str, rate: f64) -> Result<Self> {
        if !Self::is_valid_timecode_rate(rate) {
            return Err(SpliceError::InvalidTimecodeRate(rate));
        }

        let drop_frame = if timecode.contains(';') {
            if !Self::is_drop_frame_rate(rate) {
                return Err(SpliceError::NonDropFrameRate {
                    timecode: timecode.to_string(),
                    rate,
                });
            }
            true
        } else {
            false
        };

        let fields = timecode
            .trim()
            .split([':', ';'])
            .map(|field| field.parse::<i64>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| SpliceError::InvalidTimecodeString(timecode.to_string()))?;
        let [hours, minutes, seconds, frames] = fields[..] else {
            return Err(SpliceError::InvalidTimecodeString(timecode.to_string()));
        };
        if [hours, minutes, seconds, frames].iter().any(|&v| v < 0) {
            return Err(SpliceError::InvalidTimecodeString(timecode.to_string()));
        }

        let nominal_fps = rate.ceil() as i64;
        if frames >= nominal_fps {
            return Err(SpliceError::TimecodeRateMismatch {
                timecode: timecode.to_string(),
                rate,
            });
        }

        let dropframes = if drop_frame {
            dropped_frames_per_minute(rate)
        } else {
            0
        };
        let total_minutes = hours * 60 + minutes;
        let value = (total_minutes * 60 + seconds) * nominal_fps + frames
            - dropframes * (total_minutes - total_minutes / 10);

        Ok(Self::new(value as f64, rate))
    }

    /// Format as `HH:MM:SS.s` with up to microsecond precision, wrapping at
    /// 24 hours. Negative times carry a leading `-`.
    pub fn to_time_string(self) -> String {
        let seconds = widen(self.seconds_ratio());
        let negative = *seconds.numer() < 0;
        let magnitude = if negative { -seconds } else { seconds };

        const MICROS_PER_DAY: i128 = 86_400 * 1_000_000;
        let micros = ((magnitude * 1_000_000).round().to_integer() % MICROS_PER_DAY) as i64;

        let hours = micros / 3_600_000_000;
        let minutes = (micros / 60_000_000) % 60;
        let whole_seconds = (micros / 1_000_000) % 60;
        let fraction = micros % 1_000_000;

        let mut fraction_digits = format!("{fraction:06}");
        while fraction_digits.len() > 1 && fraction_digits.ends_with('0') {
            fraction_digits.pop();
        }

        format!(
            "{}{hours:02}:{minutes:02}:{whole_seconds:02}.{fraction_digits}",
            if negative { "-" } else { "" }
        )
    }

    /// Parse `HH:MM:SS.s` into a time at `rate`.
    pub fn from_time_string(time_string: &str, rate: f64) -> Result<Self> {
        if !Self::is_valid_timecode_rate(rate) {
            return Err(SpliceError::InvalidTimecodeRate(rate));
        }
        let invalid = || SpliceError::InvalidTimeString(time_string.to_string());

        let trimmed = time_string.trim();
        let (negative, body) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        let mut parts = body.splitn(3, ':');
        let hours = parts.next().ok_or_else(invalid)?;
        let minutes = parts.next().ok_or_else(invalid)?;
        let seconds = parts.next().ok_or_else(invalid)?;

        let hours: i64 = hours.parse().map_err(|_| invalid())?;
        let minutes: i64 = minutes.parse().map_err(|_| invalid())?;
        let seconds: f64 = seconds.parse().map_err(|_| invalid())?;
        if hours < 0 || minutes < 0 || seconds < 0.0 {
            return Err(invalid());
        }

        let whole = hours
            .checked_mul(3600)
            .and_then(|h| h.checked_add(minutes.checked_mul(60)?))
            .ok_or_else(invalid)?;
        let mut total = ratio_sum(Rational64::from_integer(whole), ratio_from_f64(seconds));
        if negative {
            total = -total;
        }
        Ok(Self::from_ratio(total, Rational64::from_integer(1)).rescaled_to(rate))
    }
}

/// Lay a non-negative frame count out as timecode at `rate`.
fn format_timecode(frames: i64, rate: f64, drop_frame: DropFrame) -> Result<String> {
    let rate_is_drop_frame = RationalTime::is_drop_frame_rate(rate);
    let use_drop_frame = match drop_frame {
        DropFrame::InferFromRate => rate_is_drop_frame,
        DropFrame::ForceYes if !rate_is_drop_frame => {
            return Err(SpliceError::InvalidRateForDropFrame(rate));
        }
        DropFrame::ForceYes => true,
        DropFrame::ForceNo => false,
    };

    let (dropframes, divider) = if use_drop_frame {
        (dropped_frames_per_minute(rate), ';')
    } else {
        (0, ':')
    };

    // Non-drop 23.976 and friends count like 24.
    let rate = if !use_drop_frame && rate.round() == 24.0 {
        24.0
    } else {
        rate
    };

    let frames_per_hour = (rate * 60.0 * 60.0).round() as i64;
    let frames_per_24_hours = frames_per_hour * 24;
    let frames_per_10_minutes = (rate * 60.0 * 10.0).round() as i64;
    let frames_per_minute = rate.round() as i64 * 60 - dropframes;

    let mut value = frames % frames_per_24_hours;

    if use_drop_frame {
        let ten_minute_chunks = value / frames_per_10_minutes;
        let frames_over_ten_minutes = value % frames_per_10_minutes;

        value += dropframes * 9 * ten_minute_chunks;
        if frames_over_ten_minutes > dropframes {
            value += dropframes * ((frames_over_ten_minutes - dropframes) / frames_per_minute);
        }
    }

    let nominal_fps = rate.ceil() as i64;
    let frame = value % nominal_fps;
    let seconds_total = value / nominal_fps;
    let seconds = seconds_total % 60;
    let minutes = (seconds_total / 60) % 60;
    let hours = seconds_total / 3600;

    Ok(format!(
        "{hours:02}:{minutes:02}:{seconds:02}{divider}{frame:02}"
    ))
}
