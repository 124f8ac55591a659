//! Create profiles from lifting or descending a parcel through each sounding of a batch.
use crate::{
    error::Result,
    interpolation::log_pressure_interp,
    met_formulas::{
        dry_lapse, lcl, saturated_equivalent_potential_temperature,
        temperature_from_saturated_theta_e,
    },
    profile::Profiles,
    utility::is_close,
};
use itertools::izip;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Zip};
use rayon::prelude::*;
use std::f64::NAN;

/// A batch of parcel ascents with the LCL inserted as an extra level.
///
/// All four matrices are `(N, Z + 1)`. The environment temperature and dew point at an inserted
/// LCL are interpolated in log-pressure, the remaining levels are the environment levels that
/// took part in the ascent. Unused columns at the end of a row are `NaN`.
#[derive(Clone, Debug)]
pub struct ParcelAscent {
    /// Pressure (Pa) of every level, LCL included.
    pub pressure: Array2<f64>,
    /// Environment temperature (K).
    pub temperature: Array2<f64>,
    /// Environment dew point (K).
    pub dew_point: Array2<f64>,
    /// Parcel temperature (K).
    pub parcel_temperature: Array2<f64>,
}

impl ParcelAscent {
    /// The environment at the levels of this ascent, as a batch of profiles.
    pub fn environment(&self) -> Result<Profiles> {
        Profiles::from_nz(
            self.pressure.clone(),
            self.temperature.clone(),
            self.dew_point.clone(),
        )
    }
}

/// Lift the lowest level of every sounding dry adiabatically to its LCL and moist adiabatically
/// above it.
pub fn parcel_profile(profiles: &Profiles) -> ParcelAscent {
    tracing::debug!(
        n = profiles.n_profiles(),
        z = profiles.n_levels(),
        "lifting surface parcels"
    );

    let (p, t, td) = profiles.views();
    parcel_profile_with_lcl(p, t, td, None)
}

/// Lift a parcel in every row, starting from the first level where `start` is true and using
/// only levels where `start` is true.
///
/// Selected levels are packed to the left of the output, so the parcel's starting level is
/// always in column 0.
pub(crate) fn parcel_profile_with_lcl(
    pressure: ArrayView2<f64>,
    temperature: ArrayView2<f64>,
    dew_point: ArrayView2<f64>,
    start: Option<ArrayView2<bool>>,
) -> ParcelAscent {
    let (n, z) = pressure.dim();
    let width = z + 1;

    let rows: Vec<LiftedRow> = (0..n)
        .into_par_iter()
        .map(|i| {
            lift_row(
                pressure.row(i),
                temperature.row(i),
                dew_point.row(i),
                start.as_ref().map(|mask| mask.row(i)),
                width,
            )
        })
        .collect();

    let mut ascent = ParcelAscent {
        pressure: Array2::from_elem((n, width), NAN),
        temperature: Array2::from_elem((n, width), NAN),
        dew_point: Array2::from_elem((n, width), NAN),
        parcel_temperature: Array2::from_elem((n, width), NAN),
    };

    for (i, row) in rows.into_iter().enumerate() {
        ascent.pressure.row_mut(i).assign(&Array1::from(row.pressure));
        ascent.temperature.row_mut(i).assign(&Array1::from(row.temperature));
        ascent.dew_point.row_mut(i).assign(&Array1::from(row.dew_point));
        ascent
            .parcel_temperature
            .row_mut(i)
            .assign(&Array1::from(row.parcel_temperature));
    }

    ascent
}

struct LiftedRow {
    pressure: Vec<f64>,
    temperature: Vec<f64>,
    dew_point: Vec<f64>,
    parcel_temperature: Vec<f64>,
}

impl LiftedRow {
    fn with_capacity(width: usize) -> Self {
        LiftedRow {
            pressure: Vec::with_capacity(width),
            temperature: Vec::with_capacity(width),
            dew_point: Vec::with_capacity(width),
            parcel_temperature: Vec::with_capacity(width),
        }
    }

    fn push(&mut self, p: f64, t: f64, td: f64, pcl_t: f64) {
        self.pressure.push(p);
        self.temperature.push(t);
        self.dew_point.push(td);
        self.parcel_temperature.push(pcl_t);
    }

    fn padded(mut self, width: usize) -> Self {
        self.pressure.resize(width, NAN);
        self.temperature.resize(width, NAN);
        self.dew_point.resize(width, NAN);
        self.parcel_temperature.resize(width, NAN);
        self
    }
}

fn lift_row(
    pressure: ArrayView1<f64>,
    temperature: ArrayView1<f64>,
    dew_point: ArrayView1<f64>,
    start: Option<ArrayView1<bool>>,
    width: usize,
) -> LiftedRow {
    let mut row = LiftedRow::with_capacity(width);

    let levels: Vec<(f64, f64, f64)> = izip!(0usize.., &pressure, &temperature, &dew_point)
        // Only levels selected for the ascent
        .filter(|(j, _, _, _)| start.as_ref().map(|mask| mask[*j]).unwrap_or(true))
        // Skip the NaN padding
        .filter(|(_, p, _, _)| p.is_finite())
        .map(|(_, &p, &t, &td)| (p, t, td))
        .collect();

    let (p0, t0, td0) = match levels.first() {
        Some(&lvl) => lvl,
        None => return row.padded(width),
    };

    let (p_lcl, t_lcl) = lcl(p0, t0, td0);
    let theta_e = saturated_equivalent_potential_temperature(p_lcl, t_lcl);
    let parcel_t = |p: f64| -> f64 {
        if p > p_lcl {
            dry_lapse(p, t0, p0)
        } else {
            temperature_from_saturated_theta_e(p, theta_e)
        }
    };

    row.push(p0, t0, td0, t0);

    let mut lcl_inserted = false;
    for (&(p_below, t_below, td_below), &(p, t, td)) in levels.iter().zip(levels.iter().skip(1)) {
        if !lcl_inserted
            && p_below > p_lcl
            && p_lcl > p
            && !is_close(p_lcl, p_below)
            && !is_close(p_lcl, p)
        {
            let t_env = log_pressure_interp(p_lcl, p_below, p, t_below, t);
            let td_env = log_pressure_interp(p_lcl, p_below, p, td_below, td);
            row.push(p_lcl, t_env, td_env, t_lcl);
            lcl_inserted = true;
        }

        row.push(p, t, td, parcel_t(p));
    }

    row.padded(width)
}

/// Lower a saturated parcel from (`start_pressure`, `start_temperature`) along a moist adiabat
/// to every pressure in its row. `NaN` pressures stay `NaN`.
pub(crate) fn descend_moist(
    pressure: ArrayView2<f64>,
    start_temperature: ArrayView1<f64>,
    start_pressure: ArrayView1<f64>,
) -> Array2<f64> {
    let mut trace = Array2::from_elem(pressure.dim(), NAN);

    Zip::from(trace.rows_mut())
        .and(pressure.rows())
        .and(&start_pressure)
        .and(&start_temperature)
        .par_for_each(|mut trace_row, p_row, &p0, &t0| {
            let theta_e = saturated_equivalent_potential_temperature(p0, t0);
            Zip::from(&mut trace_row).and(&p_row).for_each(|out, &p| {
                *out = if p == p0 {
                    t0
                } else {
                    temperature_from_saturated_theta_e(p, theta_e)
                };
            });
        });

    trace
}
