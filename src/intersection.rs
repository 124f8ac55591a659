//! Find where curves cross each other, or zero, in every sounding of a batch.
use crate::{
    interpolation::{pressure_at_fraction, zero_fraction},
    profile::{is_above, is_below, is_between},
};
use metfor::{HectoPascal, Kelvin};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayViewMut1, Zip};
use optional::{none, some, Optioned};
use std::f64::NAN;
use strum_macros::{Display, EnumIter, EnumString};

/// Which candidate to keep when a sounding has more than one crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Pick {
    /// The highest candidate, lowest pressure.
    Top,
    /// The lowest candidate, highest pressure.
    Bottom,
}

/// The direction curve `a` crosses curve `b` going up through the sounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Direction {
    /// `a` goes from less than `b` to greater than or equal to `b`.
    Increasing,
    /// `a` goes from greater than or equal to `b` to less than `b`.
    Decreasing,
}

impl Direction {
    #[inline]
    fn is_crossing(self, d0: f64, d1: f64) -> bool {
        match self {
            Direction::Increasing => d0 < 0.0 && d1 >= 0.0,
            Direction::Decreasing => d0 >= 0.0 && d1 < 0.0,
        }
    }
}

/// A single named level, like the LCL or EL, for every sounding in a batch.
///
/// Soundings where the level does not exist have `NaN` pressure and temperature.
#[derive(Clone, Debug, PartialEq)]
pub struct Level {
    /// Pressure (Pa) of the level.
    pub pressure: Array1<f64>,
    /// Temperature (K) at the level.
    pub temperature: Array1<f64>,
}

impl Level {
    /// A level that does not exist in any of `n` soundings.
    pub fn nan(n: usize) -> Self {
        Level {
            pressure: Array1::from_elem(n, NAN),
            temperature: Array1::from_elem(n, NAN),
        }
    }

    /// Number of soundings.
    #[inline]
    pub fn len(&self) -> usize {
        self.pressure.len()
    }

    /// True if the batch is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pressure.is_empty()
    }

    /// Which soundings do not have this level.
    pub fn is_nan(&self) -> Array1<bool> {
        self.pressure.mapv(f64::is_nan)
    }

    /// Pressure of the level in sounding `i`, if it exists.
    pub fn pressure_at(&self, i: usize) -> Optioned<HectoPascal> {
        match self.pressure.get(i) {
            Some(&p) if !p.is_nan() => some(HectoPascal(p / 100.0)),
            _ => none(),
        }
    }

    /// Temperature of the level in sounding `i`, if it exists.
    pub fn temperature_at(&self, i: usize) -> Optioned<Kelvin> {
        match self.temperature.get(i) {
            Some(&t) if !t.is_nan() => some(Kelvin(t)),
            _ => none(),
        }
    }

    /// Build a level by choosing, per sounding, from the first choice whose condition is true.
    /// Soundings where no condition holds get `NaN`.
    pub(crate) fn select(n: usize, choices: &[(&Array1<bool>, &Level)]) -> Level {
        let mut out = Level::nan(n);

        // Apply in reverse so earlier choices overwrite later ones.
        for &(cond, lvl) in choices.iter().rev() {
            Zip::from(&mut out.pressure)
                .and(&mut out.temperature)
                .and(cond)
                .and(&lvl.pressure)
                .and(&lvl.temperature)
                .for_each(|p, t, &c, &lvl_p, &lvl_t| {
                    if c {
                        *p = lvl_p;
                        *t = lvl_t;
                    }
                });
        }

        out
    }

    /// Levels of `pressure` at or above this level, i.e. the level is below them.
    pub(crate) fn is_below(&self, pressure: ArrayView2<f64>, close: bool) -> Array2<bool> {
        is_above(pressure, self.pressure.view(), close)
    }
}

/// All crossing candidates for every sounding, ordered bottom to top and padded with `NaN`.
#[derive(Clone, Debug)]
pub struct Intersections {
    /// Pressure (Pa) of each candidate.
    pub pressure: Array2<f64>,
    /// Value of curve `a` at each candidate.
    pub value: Array2<f64>,
}

impl Intersections {
    fn clear_where<F>(&mut self, mut discard: F)
    where
        F: FnMut(usize, f64) -> bool,
    {
        Zip::indexed(&mut self.pressure)
            .and(&mut self.value)
            .for_each(|(i, _), p, v| {
                if discard(i, *p) {
                    *p = NAN;
                    *v = NAN;
                }
            });
    }

    /// Keep only candidates strictly above `level`. Soundings without the level lose all of
    /// their candidates.
    pub(crate) fn retain_above(&mut self, level: &Level) {
        let lvl = &level.pressure;
        self.clear_where(|i, p| !(p < lvl[i]));
    }

    /// Drop every candidate of the soundings where `rows` is false.
    pub(crate) fn retain_rows(&mut self, rows: &Array1<bool>) {
        self.clear_where(|i, _| !rows[i]);
    }

    /// Which soundings have no candidates left.
    pub fn no_candidates(&self) -> Array1<bool> {
        self.pressure
            .rows()
            .into_iter()
            .map(|row| row.iter().all(|p| p.is_nan()))
            .collect()
    }

    /// Reduce to one level per sounding.
    pub fn pick(&self, which: Pick) -> Level {
        let n = self.pressure.nrows();
        let mut level = Level::nan(n);

        Zip::from(&mut level.pressure)
            .and(&mut level.temperature)
            .and(self.pressure.rows())
            .and(self.value.rows())
            .for_each(|lvl_p, lvl_t, p_row, v_row| {
                let mut candidates = p_row
                    .iter()
                    .zip(v_row.iter())
                    .filter(|(p, _)| !p.is_nan());

                let picked = match which {
                    Pick::Bottom => candidates.next(),
                    Pick::Top => candidates.last(),
                };

                if let Some((&p, &v)) = picked {
                    *lvl_p = p;
                    *lvl_t = v;
                }
            });

        level
    }
}

/// Find every place curve `a` crosses curve `b` in the given direction.
///
/// The crossing point is interpolated linearly in `ln(p)` when `log_x` is true, otherwise
/// linearly in pressure.
pub fn find_intersections(
    pressure: ArrayView2<f64>,
    a: ArrayView2<f64>,
    b: ArrayView2<f64>,
    direction: Direction,
    log_x: bool,
) -> Intersections {
    let (n, z) = pressure.dim();
    let width = z.saturating_sub(1);

    let mut out = Intersections {
        pressure: Array2::from_elem((n, width), NAN),
        value: Array2::from_elem((n, width), NAN),
    };

    Zip::from(out.pressure.rows_mut())
        .and(out.value.rows_mut())
        .and(pressure.rows())
        .and(a.rows())
        .and(b.rows())
        .par_for_each(|out_p, out_v, p, a, b| {
            intersect_row(out_p, out_v, p, a, b, direction, log_x)
        });

    out
}

fn intersect_row(
    mut out_p: ArrayViewMut1<f64>,
    mut out_v: ArrayViewMut1<f64>,
    p: ArrayView1<f64>,
    a: ArrayView1<f64>,
    b: ArrayView1<f64>,
    direction: Direction,
    log_x: bool,
) {
    let mut k = 0;
    for j in 1..p.len() {
        let (p0, p1) = (p[j - 1], p[j]);
        let (a0, a1) = (a[j - 1], a[j]);
        let d0 = a0 - b[j - 1];
        let d1 = a1 - b[j];

        if p0.is_nan() || p1.is_nan() || d0.is_nan() || d1.is_nan() {
            continue;
        }

        if !direction.is_crossing(d0, d1) {
            continue;
        }

        let frac = zero_fraction(d0, d1);
        out_p[k] = pressure_at_fraction(p0, p1, frac, log_x);
        out_v[k] = a0 + frac * (a1 - a0);
        k += 1;
    }
}

/// A signed curve with a zero inserted wherever it changes sign between two levels.
///
/// Points stay in profile order, surface first. Each row is `2 * Z - 1` wide and padded with
/// `NaN`.
#[derive(Clone, Debug)]
pub struct ZeroCrossings {
    /// Pressure (Pa) of each point.
    pub pressure: Array2<f64>,
    /// Value of the curve at each point.
    pub value: Array2<f64>,
}

impl ZeroCrossings {
    fn masked(&self, keep: Array2<bool>) -> ZeroCrossings {
        let mut out = self.clone();
        Zip::from(&mut out.pressure)
            .and(&mut out.value)
            .and(&keep)
            .for_each(|p, v, &k| {
                if !k {
                    *p = NAN;
                    *v = NAN;
                }
            });
        out
    }

    /// Only the points between `bottom` and `top`, inclusive and with tolerance.
    pub(crate) fn between(&self, bottom: &Level, top: &Level) -> ZeroCrossings {
        self.masked(is_between(
            self.pressure.view(),
            bottom.pressure.view(),
            top.pressure.view(),
        ))
    }

    /// Only the points below `level`, or close to it.
    pub(crate) fn below(&self, level: &Level) -> ZeroCrossings {
        self.masked(is_below(self.pressure.view(), level.pressure.view(), true))
    }
}

/// Insert the zeros of the signed curve `values` between its sample points.
pub fn find_zero_crossings(pressure: ArrayView2<f64>, values: ArrayView2<f64>) -> ZeroCrossings {
    let (n, z) = pressure.dim();
    let width = (2 * z).saturating_sub(1);

    let mut out = ZeroCrossings {
        pressure: Array2::from_elem((n, width), NAN),
        value: Array2::from_elem((n, width), NAN),
    };

    Zip::from(out.pressure.rows_mut())
        .and(out.value.rows_mut())
        .and(pressure.rows())
        .and(values.rows())
        .par_for_each(|mut out_p, mut out_v, p, d| {
            let mut k = 0;
            let mut push = |pres: f64, val: f64| {
                out_p[k] = pres;
                out_v[k] = val;
                k += 1;
            };

            let mut prev: Option<(f64, f64)> = None;
            for (&p1, &d1) in p.iter().zip(d.iter()) {
                if p1.is_nan() || d1.is_nan() {
                    prev = None;
                    continue;
                }

                if let Some((p0, d0)) = prev {
                    if (d0 < 0.0 && d1 > 0.0) || (d0 > 0.0 && d1 < 0.0) {
                        let frac = zero_fraction(d0, d1);
                        push(pressure_at_fraction(p0, p1, frac, true), 0.0);
                    }
                }

                push(p1, d1);
                prev = Some((p1, d1));
            }
        });

    out
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::utility::test_tools::*;
    use ndarray::array;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    fn pressure() -> Array2<f64> {
        array![[100_000.0, 90_000.0, 80_000.0, 70_000.0, 60_000.0]]
    }

    #[test]
    fn test_enums_parse() {
        assert_eq!(Pick::from_str("top").unwrap(), Pick::Top);
        assert_eq!(Pick::from_str("bottom").unwrap(), Pick::Bottom);
        assert_eq!(Direction::from_str("increasing").unwrap(), Direction::Increasing);
        assert!(Pick::from_str("middle").is_err());

        for pick in Pick::iter() {
            assert_eq!(Pick::from_str(&pick.to_string()).unwrap(), pick);
        }
    }

    #[test]
    fn test_find_intersections_by_direction() {
        let p = pressure();
        let a = array![[0.0, 2.0, 2.0, -1.0, 1.0]];
        let b = array![[1.0, 1.0, 1.0, 1.0, 0.0]];

        let up = find_intersections(p.view(), a.view(), b.view(), Direction::Increasing, false);
        let down = find_intersections(p.view(), a.view(), b.view(), Direction::Decreasing, false);

        assert_eq!(up.pressure.dim(), (1, 4));
        assert!(approx_equal(up.pressure[[0, 0]], 95_000.0, 1.0e-6));
        assert!(approx_equal(up.value[[0, 0]], 1.0, 1.0e-12));
        // Second upward crossing between 70 and 60 kPa where a - b goes from -2 to 1.
        assert!(up.pressure[[0, 1]] < 70_000.0 && up.pressure[[0, 1]] > 60_000.0);
        assert!(up.pressure[[0, 2]].is_nan());

        assert!(approx_equal(down.pressure[[0, 0]], 76_666.666_666, 1.0e-3));
        assert!(down.pressure[[0, 1]].is_nan());
    }

    #[test]
    fn test_pick_and_retain() {
        let p = pressure();
        let a = array![[0.0, 2.0, 0.0, 2.0, 0.0]];
        let b = array![[1.0, 1.0, 1.0, 1.0, 1.0]];

        let mut up = find_intersections(p.view(), a.view(), b.view(), Direction::Increasing, true);

        let bottom = up.pick(Pick::Bottom);
        let top = up.pick(Pick::Top);
        assert!(bottom.pressure[0] > top.pressure[0]);
        assert!(!up.no_candidates()[0]);

        let lcl = Level {
            pressure: array![90_000.0],
            temperature: array![280.0],
        };
        up.retain_above(&lcl);
        assert_eq!(up.pick(Pick::Bottom).pressure[0], top.pressure[0]);

        up.retain_rows(&array![false]);
        assert!(up.no_candidates()[0]);
        assert!(up.pick(Pick::Top).pressure[0].is_nan());
    }

    #[test]
    fn test_retain_above_missing_level() {
        let p = pressure();
        let a = array![[0.0, 2.0, 2.0, 2.0, 2.0]];
        let b = array![[1.0, 1.0, 1.0, 1.0, 1.0]];

        let mut up = find_intersections(p.view(), a.view(), b.view(), Direction::Increasing, true);
        up.retain_above(&Level::nan(1));
        assert!(up.no_candidates()[0]);
    }

    #[test]
    fn test_select_first_match_wins() {
        let first = Level {
            pressure: array![1.0, 1.0, 1.0],
            temperature: array![10.0, 10.0, 10.0],
        };
        let second = Level {
            pressure: array![2.0, 2.0, 2.0],
            temperature: array![20.0, 20.0, 20.0],
        };

        let c1 = array![true, false, false];
        let c2 = array![true, true, false];

        let sel = Level::select(3, &[(&c1, &first), (&c2, &second)]);
        assert_eq!(sel.pressure[0], 1.0);
        assert_eq!(sel.temperature[1], 20.0);
        assert!(sel.pressure[2].is_nan());
        assert_eq!(sel.is_nan(), array![false, false, true]);
    }

    #[test]
    fn test_optioned_accessors() {
        let lvl = Level {
            pressure: array![85_000.0, NAN],
            temperature: array![285.0, NAN],
        };

        assert_eq!(lvl.pressure_at(0).unwrap(), HectoPascal(850.0));
        assert_eq!(lvl.temperature_at(0).unwrap(), Kelvin(285.0));
        assert!(lvl.pressure_at(1).is_none());
        assert!(lvl.temperature_at(7).is_none());
    }

    #[test]
    fn test_zero_crossings_inserts_zeros() {
        let p = array![[100_000.0, 90_000.0, 80_000.0, NAN]];
        let d = array![[-1.0, 1.0, 0.0, NAN]];

        let zc = find_zero_crossings(p.view(), d.view());
        assert_eq!(zc.pressure.dim(), (1, 7));

        assert_eq!(zc.pressure[[0, 0]], 100_000.0);
        assert!(zc.pressure[[0, 1]] < 100_000.0 && zc.pressure[[0, 1]] > 90_000.0);
        assert_eq!(zc.value[[0, 1]], 0.0);
        assert_eq!(zc.pressure[[0, 2]], 90_000.0);
        assert_eq!(zc.pressure[[0, 3]], 80_000.0);
        assert!(zc.pressure[[0, 4]].is_nan());
    }

    #[test]
    fn test_zero_crossings_match_intersections() {
        let p = array![[100_000.0, 90_000.0, 80_000.0]];
        let a = array![[280.0, 283.0, 279.0]];
        let b = array![[281.0, 281.0, 281.0]];
        let d = &a - &b;

        let up = find_intersections(p.view(), a.view(), b.view(), Direction::Increasing, true);
        let zc = find_zero_crossings(p.view(), d.view());

        assert_eq!(up.pressure[[0, 0]], zc.pressure[[0, 1]]);
    }

    #[test]
    fn test_zero_crossings_windows() {
        let p = array![[100_000.0, 90_000.0, 80_000.0, 70_000.0]];
        let d = array![[1.0, 1.0, 1.0, 1.0]];
        let zc = find_zero_crossings(p.view(), d.view());

        let bottom = Level {
            pressure: array![90_000.5],
            temperature: array![NAN],
        };
        let top = Level {
            pressure: array![80_000.0],
            temperature: array![NAN],
        };

        let win = zc.between(&bottom, &top);
        let kept: Vec<f64> = win.pressure.iter().copied().filter(|p| !p.is_nan()).collect();
        assert_eq!(kept, vec![90_000.0, 80_000.0]);

        let below = zc.below(&top);
        let kept: Vec<f64> = below.pressure.iter().copied().filter(|p| !p.is_nan()).collect();
        assert_eq!(kept, vec![100_000.0, 90_000.0, 80_000.0]);

        let none = zc.below(&Level::nan(1));
        assert!(none.pressure.iter().all(|p| p.is_nan()));
    }
}
