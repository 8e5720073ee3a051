//! Float helpers for optional measurements.

/// `Some(v)` only when `v` is present and finite.
pub fn finite(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite())
}

/// True for finite values `>= 0`.
pub fn is_non_negative(v: f64) -> bool {
    v.is_finite() && v >= 0.0
}
