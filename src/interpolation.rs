//! Interpolation helpers for single segments of a profile.

/// Linear interpolation between (x1, y1) and (x2, y2).
#[inline]
pub(crate) fn linear_interp(x_val: f64, x1: f64, x2: f64, y1: f64, y2: f64) -> f64 {
    debug_assert!(x1 != x2);

    let run = x2 - x1;
    let rise = y2 - y1;
    let dx = x_val - x1;

    y1 + dx * (rise / run)
}

/// Interpolate linearly in the logarithm of pressure.
#[inline]
pub(crate) fn log_pressure_interp(p: f64, p1: f64, p2: f64, y1: f64, y2: f64) -> f64 {
    linear_interp(p.ln(), p1.ln(), p2.ln(), y1, y2)
}

/// Where a segment with end values `d0` and `d1` crosses zero, as a fraction of the segment.
#[inline]
pub(crate) fn zero_fraction(d0: f64, d1: f64) -> f64 {
    d0 / (d0 - d1)
}

/// Pressure at `frac` of the way from `p0` to `p1`, linear in `ln p` or in `p`.
#[inline]
pub(crate) fn pressure_at_fraction(p0: f64, p1: f64, frac: f64, log_x: bool) -> f64 {
    if log_x {
        (p0.ln() + frac * (p1.ln() - p0.ln())).exp()
    } else {
        p0 + frac * (p1 - p0)
    }
}
