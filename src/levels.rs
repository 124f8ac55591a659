//! This module finds the levels a lifted parcel passes through: the lifting condensation level,
//! the level of free convection, the equilibrium level, and the convective condensation level.
//!
//! Each function returns a [`Level`](crate::Level) holding one pressure and temperature per
//! sounding. Soundings where the level does not exist get `NaN`.
use crate::{
    error::{AnalysisError, Result},
    intersection::{find_intersections, Direction, Level, Pick},
    met_formulas::{
        dew_point_from_mixing_ratio, dry_lapse, lcl as lcl_point, mixing_ratio,
        saturation_vapor_pressure,
    },
    parcel_profile::parcel_profile_with_lcl,
    profile::Profiles,
    utility::greater_or_close,
};
use itertools::izip;
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Zip};

/// Options for the convective condensation level.
#[derive(Debug, Clone, Default)]
pub struct CclOptions {
    /// Use the mean mixing ratio of a surface based layer this deep (Pa). Not supported.
    pub mixed_layer_depth: Option<f64>,
    /// Height based layer. Not supported.
    pub height: Option<f64>,
}

/// The convective condensation level of every sounding.
#[derive(Debug, Clone)]
pub struct Ccl {
    /// Pressure and temperature of the CCL.
    pub level: Level,
    /// Surface temperature (K) needed for convection to reach the CCL.
    pub convective_temperature: Array1<f64>,
}

/// The lifting condensation level of a parcel lifted from the lowest level of each sounding.
pub fn lcl(profiles: &Profiles) -> Level {
    let (p0, t0, td0) = profiles.surface();
    lcl_nz(p0.view(), t0.view(), td0.view())
}

pub(crate) fn lcl_nz(
    pressure: ArrayView1<f64>,
    temperature: ArrayView1<f64>,
    dew_point: ArrayView1<f64>,
) -> Level {
    let mut level = Level::nan(pressure.len());

    Zip::from(&mut level.pressure)
        .and(&mut level.temperature)
        .and(pressure)
        .and(temperature)
        .and(dew_point)
        .par_for_each(|lcl_p, lcl_t, &p, &t, &td| {
            let (p, t) = lcl_point(p, t, td);
            *lcl_p = p;
            *lcl_t = t;
        });

    level
}

/// The equilibrium level.
///
/// If `parcel_profile` is `None`, a surface parcel is lifted through each sounding. Otherwise it
/// must have the same shape as the profiles.
pub fn el(
    profiles: &Profiles,
    parcel_profile: Option<&Array2<f64>>,
    which: Pick,
) -> Result<Level> {
    tracing::debug!(n = profiles.n_profiles(), z = profiles.n_levels(), %which, "el");

    with_parcel(profiles, parcel_profile, None, |p, t, pcl, lcl| {
        el_nz(p, t, pcl, lcl, which)
    })
}

/// The level of free convection.
///
/// The LCL is used when the parcel never crosses the environment above the LCL but is already at
/// least as warm as the environment there. `dew_point_start` overrides the surface dew point used
/// to find the LCL.
pub fn lfc(
    profiles: &Profiles,
    parcel_profile: Option<&Array2<f64>>,
    which: Pick,
    dew_point_start: Option<&Array1<f64>>,
) -> Result<Level> {
    tracing::debug!(n = profiles.n_profiles(), z = profiles.n_levels(), %which, "lfc");

    with_parcel(profiles, parcel_profile, dew_point_start, |p, t, pcl, lcl| {
        lfc_nz(p, t, pcl, lcl, which)
    })
}

/// The equilibrium level and level of free convection, in that order.
pub fn el_lfc(
    profiles: &Profiles,
    parcel_profile: Option<&Array2<f64>>,
    which_lfc: Pick,
    which_el: Pick,
    dew_point_start: Option<&Array1<f64>>,
) -> Result<(Level, Level)> {
    tracing::debug!(
        n = profiles.n_profiles(),
        z = profiles.n_levels(),
        %which_lfc,
        %which_el,
        "el and lfc"
    );

    with_parcel(profiles, parcel_profile, dew_point_start, |p, t, pcl, lcl| {
        (
            el_nz(p, t, pcl, lcl, which_el),
            lfc_nz(p, t, pcl, lcl, which_lfc),
        )
    })
}

/// Check the optional inputs, lift a surface parcel if none was given, find its LCL, and hand
/// the environment, parcel and LCL to `f`.
fn with_parcel<F, R>(
    profiles: &Profiles,
    parcel_profile: Option<&Array2<f64>>,
    dew_point_start: Option<&Array1<f64>>,
    f: F,
) -> Result<R>
where
    F: FnOnce(ArrayView2<f64>, ArrayView2<f64>, ArrayView2<f64>, &Level) -> R,
{
    let n = profiles.n_profiles();
    if let Some(td0) = dew_point_start {
        if td0.len() != n {
            return Err(AnalysisError::ShapeMismatch(format!(
                "dew point start has {} values for {} soundings",
                td0.len(),
                n
            )));
        }
    }

    let (p, t, td) = profiles.views();

    match parcel_profile {
        Some(parcel) => {
            if parcel.dim() != p.dim() {
                return Err(AnalysisError::ShapeMismatch(format!(
                    "parcel profile {:?} for profiles {:?}",
                    parcel.dim(),
                    p.dim()
                )));
            }

            let td0 = dew_point_start.map_or_else(|| td.column(0), |td0| td0.view());
            let lcl = lcl_nz(p.column(0), t.column(0), td0);

            Ok(f(p, t, parcel.view(), &lcl))
        }
        None => {
            let ascent = parcel_profile_with_lcl(p, t, td, None);
            let (p, t) = (ascent.pressure.view(), ascent.temperature.view());

            let td0 = dew_point_start
                .map_or_else(|| ascent.dew_point.column(0), |td0| td0.view());
            let lcl = lcl_nz(p.column(0), t.column(0), td0);

            Ok(f(p, t, ascent.parcel_temperature.view(), &lcl))
        }
    }
}

// The first column of every row is the parcel's starting level and is never searched.
fn aloft(arr: ArrayView2<f64>) -> ArrayView2<f64> {
    arr.slice_move(s![.., 1..])
}

/// Decreasing crossings of the parcel through the environment above the LCL. There is no EL
/// where the parcel is still warmer than the environment at the top of the sounding.
pub(crate) fn el_nz(
    pressure: ArrayView2<f64>,
    temperature: ArrayView2<f64>,
    parcel_temperature: ArrayView2<f64>,
    lcl: &Level,
    which: Pick,
) -> Level {
    let pressure = aloft(pressure);
    let temperature = aloft(temperature);
    let parcel_temperature = aloft(parcel_temperature);

    let cool_at_top: Array1<bool> = izip!(
        pressure.rows(),
        temperature.rows(),
        parcel_temperature.rows()
    )
    .map(|(p, t, pcl)| match p.iter().rposition(|p| !p.is_nan()) {
        Some(top) => pcl[top] <= t[top],
        None => false,
    })
    .collect();

    let mut candidates = find_intersections(
        pressure,
        parcel_temperature,
        temperature,
        Direction::Decreasing,
        true,
    );
    candidates.retain_above(lcl);
    candidates.retain_rows(&cool_at_top);

    let el = candidates.pick(which);
    tracing::trace!(
        missing = el.is_nan().iter().filter(|&&b| b).count(),
        "soundings without an EL"
    );

    el
}

/// Increasing crossings of the parcel through the environment above the LCL, falling back to the
/// LCL itself where there is no crossing but the parcel is buoyant at or above the LCL.
pub(crate) fn lfc_nz(
    pressure: ArrayView2<f64>,
    temperature: ArrayView2<f64>,
    parcel_temperature: ArrayView2<f64>,
    lcl: &Level,
    which: Pick,
) -> Level {
    let n = pressure.nrows();
    let pressure = aloft(pressure);
    let temperature = aloft(temperature);
    let parcel_temperature = aloft(parcel_temperature);

    let mut candidates = find_intersections(
        pressure,
        parcel_temperature,
        temperature,
        Direction::Increasing,
        true,
    );
    candidates.retain_above(lcl);

    let no_lfc = candidates.no_candidates();
    let has_lfc = no_lfc.mapv(|b| !b);

    let buoyant_above_lcl = buoyant_above(pressure, temperature, parcel_temperature, lcl);
    let is_lcl = &no_lfc & &buoyant_above_lcl;

    let lfc = Level::select(
        n,
        &[(&has_lfc, &candidates.pick(which)), (&is_lcl, lcl)],
    );

    tracing::trace!(
        at_lcl = is_lcl.iter().filter(|&&b| b).count(),
        missing = lfc.is_nan().iter().filter(|&&b| b).count(),
        "soundings with the LFC at the LCL or without an LFC"
    );

    lfc
}

/// Is the parcel at least as warm as the environment, with tolerance, anywhere at or above the
/// LCL?
fn buoyant_above(
    pressure: ArrayView2<f64>,
    temperature: ArrayView2<f64>,
    parcel_temperature: ArrayView2<f64>,
    lcl: &Level,
) -> Array1<bool> {
    let at_or_above_lcl = lcl.is_below(pressure, true);

    Zip::from(at_or_above_lcl.rows())
        .and(temperature.rows())
        .and(parcel_temperature.rows())
        .par_map_collect(|mask, t, pcl| {
            izip!(mask, t, pcl).any(|(&m, &t, &pcl)| m && greater_or_close(pcl, t))
        })
}

/// The convective condensation level, where air with the surface mixing ratio becomes saturated
/// when the environment is heated from below.
pub fn ccl(profiles: &Profiles, which: Pick, opts: &CclOptions) -> Result<Ccl> {
    if opts.mixed_layer_depth.is_some() {
        return Err(AnalysisError::NotImplemented("mixed layer depth for the CCL"));
    }
    if opts.height.is_some() {
        return Err(AnalysisError::NotImplemented("height based CCL"));
    }

    tracing::debug!(n = profiles.n_profiles(), z = profiles.n_levels(), %which, "ccl");

    let (p, t, td) = profiles.views();
    Ok(ccl_nz(p, t, td, which))
}

pub(crate) fn ccl_nz(
    pressure: ArrayView2<f64>,
    temperature: ArrayView2<f64>,
    dew_point: ArrayView2<f64>,
    which: Pick,
) -> Ccl {
    let p0 = pressure.column(0);

    let surface_mw = Zip::from(p0)
        .and(dew_point.column(0))
        .map_collect(|&p, &td| mixing_ratio(saturation_vapor_pressure(td), p));

    let mut constant_mw_dew_point = Array2::from_elem(pressure.dim(), std::f64::NAN);
    Zip::from(constant_mw_dew_point.rows_mut())
        .and(pressure.rows())
        .and(&surface_mw)
        .par_for_each(|mut out, p, &mw| {
            Zip::from(&mut out)
                .and(&p)
                .for_each(|o, &p| *o = dew_point_from_mixing_ratio(p, mw));
        });

    let level = find_intersections(
        pressure,
        constant_mw_dew_point.view(),
        temperature,
        Direction::Increasing,
        true,
    )
    .pick(which);

    let convective_temperature = Zip::from(p0)
        .and(&level.pressure)
        .and(&level.temperature)
        .map_collect(|&p0, &p, &t| dry_lapse(p0, t, p));

    Ccl {
        level,
        convective_temperature,
    }
}
