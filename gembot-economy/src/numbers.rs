//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Floor a f64 and clamp it to the u64 range, returning 0 for non-finite or negative values.
#[must_use]
pub fn floor_f64_to_u64(value: f64) -> u64 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    let max = cast::<u64, f64>(u64::MAX).unwrap_or(f64::MAX);
    let clamped = value.min(max).floor();
    cast::<f64, u64>(clamped).unwrap_or(u64::MAX)
}

/// Convert u64 to f64 while allowing precision loss in a single location.
#[must_use]
pub fn u64_to_f64(value: u64) -> f64 {
    cast::<u64, f64>(value).unwrap_or(0.0)
}

/// Signed difference `gain - loss`, saturating at the i64 bounds.
#[must_use]
pub fn signed_delta(gain: u64, loss: u64) -> i64 {
    let delta = i128::from(gain) - i128::from(loss);
    i64::try_from(delta).unwrap_or(if delta < 0 { i64::MIN } else { i64::MAX })
}

/// Split a duration in seconds into whole minutes and the remaining whole seconds.
#[must_use]
pub fn split_minutes_seconds(seconds: f64) -> (u64, u64) {
    let whole = floor_f64_to_u64(seconds);
    (whole / 60, whole % 60)
}

/// Render an amount with `,` thousands separators.
#[must_use]
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Signed variant of [`group_thousands`], always carrying an explicit sign.
#[must_use]
pub fn group_thousands_signed(value: i64) -> String {
    let sign = if value < 0 { '-' } else { '+' };
    format!("{sign}{}", group_thousands(value.unsigned_abs()))
}
