//! Trapezoid rule integration along the vertical axis of a batch.
//!
//! Any segment with a `NaN` at either end, in either the integrand or the coordinate, contributes
//! nothing. Padding and masked out levels can therefore be expressed as `NaN`.
use ndarray::{Array1, ArrayView1, ArrayView2, Zip};

fn trapz_row<F>(y: ArrayView1<f64>, x: ArrayView1<f64>, keep_segment: F) -> f64
where
    F: Fn(usize) -> bool,
{
    let mut sum = 0.0;

    for j in 1..y.len() {
        let (y0, y1) = (y[j - 1], y[j]);
        let (x0, x1) = (x[j - 1], x[j]);

        if y0.is_nan() || y1.is_nan() || x0.is_nan() || x1.is_nan() || !keep_segment(j) {
            continue;
        }

        sum += 0.5 * (y0 + y1) * (x1 - x0);
    }

    sum
}

/// Integrate every row of `y` against the matching row of `x`.
pub(crate) fn trapz(y: ArrayView2<f64>, x: ArrayView2<f64>) -> Array1<f64> {
    debug_assert_eq!(y.dim(), x.dim());

    Zip::from(y.rows())
        .and(x.rows())
        .par_map_collect(|y_row, x_row| trapz_row(y_row, x_row, |_| true))
}

/// Integrate several arrays against `x` at once, using only segments whose two end points are
/// both inside `mask`. Returns one result per input array.
pub(crate) fn trapz_where(
    ys: &[ArrayView2<f64>],
    x: ArrayView2<f64>,
    mask: ArrayView2<bool>,
) -> Vec<Array1<f64>> {
    ys.iter()
        .map(|y| {
            debug_assert_eq!(y.dim(), x.dim());

            Zip::from(y.rows())
                .and(x.rows())
                .and(mask.rows())
                .par_map_collect(|y_row, x_row, m_row| {
                    trapz_row(y_row, x_row, |j| m_row[j - 1] && m_row[j])
                })
        })
        .collect()
}
