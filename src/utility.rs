//! Small numerical helpers shared by the batch algorithms.

// Same tolerances as numpy's `isclose`.
const RTOL: f64 = 1.0e-5;
const ATOL: f64 = 1.0e-8;

/// Check if two values are equal within a relative and absolute tolerance. `NaN` is never close
/// to anything.
#[inline]
pub fn is_close(a: f64, b: f64) -> bool {
    (a - b).abs() <= ATOL + RTOL * b.abs()
}

/// `a > b` or `a` is close to `b`.
#[inline]
pub fn greater_or_close(a: f64, b: f64) -> bool {
    a > b || is_close(a, b)
}

/// `a < b` or `a` is close to `b`.
#[inline]
pub fn less_or_close(a: f64, b: f64) -> bool {
    a < b || is_close(a, b)
}

/// Index of the first maximum in a row, ignoring `NaN`. Ties go to the lowest index and a row
/// with nothing larger than negative infinity returns 0.
pub(crate) fn argmax_first<'a, I: IntoIterator<Item = &'a f64>>(row: I) -> usize {
    row.into_iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .fold((0, std::f64::NEG_INFINITY), |(max_idx, max_val), (i, &v)| {
            if v > max_val {
                (i, v)
            } else {
                (max_idx, max_val)
            }
        })
        .0
}

/// Index of the first minimum in a row, ignoring `NaN`. Ties go to the lowest index and a row
/// with nothing smaller than positive infinity returns 0.
pub(crate) fn argmin_first<'a, I: IntoIterator<Item = &'a f64>>(row: I) -> usize {
    row.into_iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .fold((0, std::f64::INFINITY), |(min_idx, min_val), (i, &v)| {
            if v < min_val {
                (i, v)
            } else {
                (min_idx, min_val)
            }
        })
        .0
}
