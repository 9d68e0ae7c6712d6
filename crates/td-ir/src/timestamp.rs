//! Conversions between stream seconds and frame counts.

/// Convert a (possibly fractional) frame count to seconds at `sample_rate`.
pub fn frames_to_seconds(frames: f64, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    frames / sample_rate as f64
}

/// Convert seconds to a whole frame index at `sample_rate`, rounding down.
/// Negative and non-finite inputs map to frame 0.
pub fn seconds_to_frames(seconds: f64, sample_rate: u32) -> u64 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    libm::floor(seconds * sample_rate as f64) as u64
}

/// Clamp `seconds` into `[0, length]`. NaN clamps to 0.
pub fn clamp_seconds(seconds: f64, length: f64) -> f64 {
    let length = if length.is_finite() { length.max(0.0) } else { 0.0 };
    if seconds.is_nan() {
        return 0.0;
    }
    seconds.clamp(0.0, length)
}
