//! Choose and describe the parcels used for convective analysis.
//!
//! Every sounding in the batch gets its own parcel. Parcels are selected with masks over the
//! whole batch, and soundings where a window holds no data get a deterministic fallback rather
//! than an error.
use crate::{
    error::{AnalysisError, Result},
    integrate::trapz_where,
    met_formulas::{
        equivalent_potential_temperature, lcl, map2_into, map3_into, saturation_mixing_ratio,
    },
    profile::{is_below, is_between, per_row, Profiles},
    utility::argmax_first,
};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Zip};
use std::f64::NAN;

/// Options for finding the most unstable parcel.
#[derive(Debug, Clone)]
pub struct MostUnstableOptions {
    /// Depth (Pa) of the search window above its bottom.
    pub depth: f64,
    /// Bottom (Pa) of the search window, one value for every sounding or a single value for all
    /// of them. Defaults to the surface pressure.
    pub bottom: Option<Array1<f64>>,
    /// Height based search window. Not supported.
    pub height: Option<f64>,
}

impl Default for MostUnstableOptions {
    fn default() -> Self {
        MostUnstableOptions {
            depth: 30_000.0,
            bottom: None,
            height: None,
        }
    }
}

impl MostUnstableOptions {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.height.is_some() {
            return Err(AnalysisError::NotImplemented("height based most unstable parcel"));
        }

        if !self.depth.is_finite() {
            return Err(AnalysisError::InvalidInput(format!("depth = {}", self.depth)));
        }

        Ok(())
    }
}

/// Options for averaging the mixed layer.
#[derive(Debug, Clone)]
pub struct MixedLayerOptions {
    /// Depth (Pa) of the layer.
    pub depth: f64,
    /// Bottom (Pa) of the layer, per sounding or one value for all. Defaults to the surface.
    pub bottom: Option<Array1<f64>>,
    /// Height based layer depth. Not supported.
    pub height: Option<f64>,
    /// Interpolate the profile at the layer edges. Not supported.
    pub interpolate: bool,
}

impl Default for MixedLayerOptions {
    fn default() -> Self {
        MixedLayerOptions {
            depth: 10_000.0,
            bottom: None,
            height: None,
            interpolate: false,
        }
    }
}

impl MixedLayerOptions {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.height.is_some() {
            return Err(AnalysisError::NotImplemented("height based mixed layer"));
        }

        if self.interpolate {
            return Err(AnalysisError::NotImplemented("mixed layer interpolation"));
        }

        if !self.depth.is_finite() {
            return Err(AnalysisError::InvalidInput(format!("depth = {}", self.depth)));
        }

        Ok(())
    }
}

/// The most unstable parcel of every sounding.
#[derive(Debug, Clone)]
pub struct MostUnstableParcel {
    /// Pressure (Pa)
    pub pressure: Array1<f64>,
    /// Temperature (K)
    pub temperature: Array1<f64>,
    /// Dew point (K)
    pub dew_point: Array1<f64>,
    /// Column of the parcel in the profile.
    pub index: Array1<usize>,
}

/// Mean properties of the mixed layer of every sounding.
#[derive(Debug, Clone)]
pub struct MixedLayer {
    /// Pressure weighted mean temperature (K).
    pub temperature: Array1<f64>,
    /// Pressure weighted mean dew point (K).
    pub dew_point: Array1<f64>,
    /// Depth (Pa) actually covered by data, never more than the requested depth.
    pub depth: Array1<f64>,
}

/// Mixing ratio of a lifted parcel at every level.
///
/// Below the LCL the parcel keeps the moisture of the dew point, at and above it the parcel is
/// saturated at the temperature. When `below_lcl` is not given it is found by comparing each
/// level with the LCL of the first level of the sounding.
pub fn parcel_mixing_ratio(
    profiles: &Profiles,
    below_lcl: Option<&Array2<bool>>,
) -> Result<Array2<f64>> {
    if let Some(mask) = below_lcl {
        if mask.dim() != profiles.pressure().dim() {
            return Err(AnalysisError::ShapeMismatch(format!(
                "mask {:?} for profiles {:?}",
                mask.dim(),
                profiles.pressure().dim()
            )));
        }
    }

    let (p, t, td) = profiles.views();
    Ok(parcel_mixing_ratio_nz(p, t, td, below_lcl.map(|m| m.view())))
}

pub(crate) fn parcel_mixing_ratio_nz(
    pressure: ArrayView2<f64>,
    temperature: ArrayView2<f64>,
    dew_point: ArrayView2<f64>,
    below_lcl: Option<ArrayView2<bool>>,
) -> Array2<f64> {
    let below_lcl = match below_lcl {
        Some(mask) => mask.to_owned(),
        None => {
            let lcl_p = Zip::from(pressure.column(0))
                .and(temperature.column(0))
                .and(dew_point.column(0))
                .map_collect(|&p, &t, &td| lcl(p, t, td).0);
            is_below(pressure, lcl_p.view(), false)
        }
    };
    let at_or_above_lcl = below_lcl.mapv(|b| !b);

    let mut r = Array2::from_elem(pressure.dim(), NAN);
    map2_into(
        pressure,
        dew_point,
        &mut r,
        Some(below_lcl.view()),
        saturation_mixing_ratio,
    );
    map2_into(
        pressure,
        temperature,
        &mut r,
        Some(at_or_above_lcl.view()),
        saturation_mixing_ratio,
    );

    r
}

/// Find the column of the most unstable parcel, the level with the highest equivalent potential
/// temperature in the search window.
///
/// Ties go to the lowest column. Soundings with no data in the window get column 0.
pub fn most_unstable_parcel_index(
    profiles: &Profiles,
    opts: &MostUnstableOptions,
) -> Result<Array1<usize>> {
    opts.validate()?;

    tracing::debug!(
        n = profiles.n_profiles(),
        z = profiles.n_levels(),
        depth = opts.depth,
        "most unstable parcel index"
    );

    let (p, t, td) = profiles.views();
    let bottom = per_row("bottom", opts.bottom.as_ref(), p.column(0))?;

    Ok(most_unstable_parcel_index_nz(p, t, td, opts.depth, bottom.view()))
}

pub(crate) fn most_unstable_parcel_index_nz(
    pressure: ArrayView2<f64>,
    temperature: ArrayView2<f64>,
    dew_point: ArrayView2<f64>,
    depth: f64,
    bottom: ArrayView1<f64>,
) -> Array1<usize> {
    let top = bottom.mapv(|b| b - depth);
    let window = is_between(pressure, bottom, top.view());

    let mut theta_e = Array2::from_elem(pressure.dim(), std::f64::NEG_INFINITY);
    map3_into(
        pressure,
        temperature,
        dew_point,
        &mut theta_e,
        Some(window.view()),
        equivalent_potential_temperature,
    );

    let empty = window.rows().into_iter().filter(|row| !row.iter().any(|&w| w)).count();
    if empty > 0 {
        tracing::trace!(empty, "soundings with an empty most unstable search window");
    }

    theta_e.rows().into_iter().map(argmax_first).collect()
}

/// Find the most unstable parcel in every sounding.
pub fn most_unstable_parcel(
    profiles: &Profiles,
    opts: &MostUnstableOptions,
) -> Result<MostUnstableParcel> {
    let index = most_unstable_parcel_index(profiles, opts)?;
    let (p, t, td) = profiles.views();

    Ok(gather_parcel(p, t, td, index))
}

fn gather_parcel(
    pressure: ArrayView2<f64>,
    temperature: ArrayView2<f64>,
    dew_point: ArrayView2<f64>,
    index: Array1<usize>,
) -> MostUnstableParcel {
    let gather = |arr: ArrayView2<f64>| -> Array1<f64> {
        index
            .iter()
            .enumerate()
            .map(|(i, &j)| arr[[i, j]])
            .collect()
    };

    MostUnstableParcel {
        pressure: gather(pressure),
        temperature: gather(temperature),
        dew_point: gather(dew_point),
        index,
    }
}

/// Pressure weighted mean temperature and dew point over the lowest layer of every sounding.
pub fn mixed_layer(profiles: &Profiles, opts: &MixedLayerOptions) -> Result<MixedLayer> {
    opts.validate()?;

    tracing::debug!(
        n = profiles.n_profiles(),
        z = profiles.n_levels(),
        depth = opts.depth,
        "mixed layer"
    );

    let (p, t, td) = profiles.views();
    let bottom = per_row("bottom", opts.bottom.as_ref(), p.column(0))?;

    Ok(mixed_layer_nz(p, t, td, opts.depth, bottom.view()))
}

pub(crate) fn mixed_layer_nz<'a>(
    pressure: ArrayView2<f64>,
    temperature: ArrayView2<'a, f64>,
    dew_point: ArrayView2<'a, f64>,
    depth: f64,
    bottom: ArrayView1<f64>,
) -> MixedLayer {
    let top = bottom.mapv(|b| b - depth);
    let window = is_between(pressure, bottom, top.view());

    let realized: Array1<f64> = Zip::from(pressure.rows())
        .and(window.rows())
        .map_collect(|p_row, w_row| {
            let (max, min) = p_row
                .iter()
                .zip(w_row.iter())
                .filter(|&(_, &w)| w)
                .fold(
                    (std::f64::NEG_INFINITY, std::f64::INFINITY),
                    |(max, min), (&p, _)| (max.max(p), min.min(p)),
                );

            if max >= min {
                max - min
            } else {
                NAN
            }
        });

    let sums = trapz_where(&[temperature, dew_point], pressure, window.view());
    let temperature = &sums[0] / &realized.mapv(|d| -d);
    let dew_point = &sums[1] / &realized.mapv(|d| -d);

    MixedLayer {
        temperature,
        dew_point,
        depth: realized,
    }
}
