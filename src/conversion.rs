//! Internal timestamp conversion helpers.
//!
//! All rescaling goes through 128-bit integer arithmetic so frame numbers
//! map to exact time base ticks. Rationals with a zero numerator or
//! denominator are treated as unknown.

use std::time::Duration;

use ffmpeg_next::Rational;

/// The FFmpeg-internal time base (`AV_TIME_BASE`, microseconds).
pub(crate) const MICROSECONDS: Rational = Rational(1, 1_000_000);

fn is_valid(rational: Rational) -> bool {
    rational.numerator() > 0 && rational.denominator() > 0
}

/// Rescale `value` from time base `from` to time base `to`, rounding to
/// the nearest tick (halves round up), as `av_rescale` does.
pub(crate) fn rescale(value: i64, from: Rational, to: Rational) -> Option<i64> {
    if !is_valid(from) || !is_valid(to) {
        return None;
    }
    let numerator = value as i128 * from.numerator() as i128 * to.denominator() as i128;
    let denominator = from.denominator() as i128 * to.numerator() as i128;
    i64::try_from((2 * numerator + denominator).div_euclid(2 * denominator)).ok()
}

/// Convert a PTS value to seconds. Returns 0.0 for an unusable time base.
pub(crate) fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    if !is_valid(time_base) {
        return 0.0;
    }
    pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64
}

/// Convert a tick count to a [`Duration`]; negative counts clamp to zero.
pub(crate) fn ticks_to_duration(ticks: i64, time_base: Rational) -> Option<Duration> {
    if !is_valid(time_base) {
        return None;
    }
    let micros = rescale(ticks.max(0), time_base, MICROSECONDS)?;
    Some(Duration::from_micros(micros as u64))
}

/// Timestamp of `frame` given a constant frame rate, in `time_base` ticks.
///
/// `frame * (1 / frame_rate) / time_base`.
pub(crate) fn frame_to_ticks(frame: u64, frame_rate: Rational, time_base: Rational) -> Option<i64> {
    if !is_valid(frame_rate) {
        return None;
    }
    let frame = i64::try_from(frame).ok()?;
    let frame_duration = Rational(frame_rate.denominator(), frame_rate.numerator());
    rescale(frame, frame_duration, time_base)
}

/// Number of whole frames in `duration` at `frame_rate`.
pub(crate) fn frames_in(duration: Duration, frame_rate: Rational) -> Option<u64> {
    if !is_valid(frame_rate) {
        return None;
    }
    let frames = duration.as_micros()
        * frame_rate.numerator() as u128
        / (frame_rate.denominator() as u128 * 1_000_000);
    u64::try_from(frames).ok()
}

/// Bits per second for `bytes` delivered over `duration`.
pub(crate) fn bit_rate(bytes: u64, duration: Duration) -> Option<u64> {
    let micros = duration.as_micros();
    if micros == 0 {
        return None;
    }
    u64::try_from(bytes as u128 * 8 * 1_000_000 / micros).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rescale_between_time_bases() {
        assert_eq!(rescale(90_000, Rational::new(1, 90_000), MICROSECONDS), Some(1_000_000));
        assert_eq!(rescale(3, Rational::new(1, 25), Rational::new(1, 1000)), Some(120));
    }

    #[test]
    fn rescale_rejects_zero_denominator() {
        assert_eq!(rescale(10, Rational::new(1, 0), MICROSECONDS), None);
        assert_eq!(pts_to_seconds(10, Rational::new(0, 0)), 0.0);
    }

    #[test]
    fn frame_to_ticks_uses_frame_rate() {
        // Frame 50 at 25 fps is two seconds, i.e. 180 000 ticks at 90 kHz.
        let ticks = frame_to_ticks(50, Rational::new(25, 1), Rational::new(1, 90_000));
        assert_eq!(ticks, Some(180_000));

        // NTSC: frame 30 at 30000/1001 fps is 1.001 s.
        let ticks = frame_to_ticks(30, Rational::new(30_000, 1001), Rational::new(1, 30_000));
        assert_eq!(ticks, Some(30_030));
    }

    #[test]
    fn frames_in_duration() {
        assert_eq!(frames_in(Duration::from_secs(4), Rational::new(25, 1)), Some(100));
        assert_eq!(frames_in(Duration::from_secs(4), Rational::new(0, 1)), None);
    }

    #[test]
    fn bit_rate_from_bytes() {
        assert_eq!(bit_rate(1000, Duration::from_secs(1)), Some(8000));
        assert_eq!(bit_rate(1000, Duration::ZERO), None);
    }

    #[test]
    fn rescale_rounds_to_nearest() {
        // 1/3 s is 333 333.33 µs, 2/3 s is 666 666.67 µs.
        assert_eq!(rescale(1, Rational::new(1, 3), MICROSECONDS), Some(333_333));
        assert_eq!(rescale(2, Rational::new(1, 3), MICROSECONDS), Some(666_667));
    }

    #[test]
    fn ticks_to_duration_clamps_negative_counts() {
        let time_base = Rational::new(1, 1000);
        assert_eq!(ticks_to_duration(2500, time_base), Some(Duration::from_millis(2500)));
        assert_eq!(ticks_to_duration(-40, time_base), Some(Duration::ZERO));
        assert_eq!(ticks_to_duration(40, Rational::new(1, 0)), None);
    }
}
