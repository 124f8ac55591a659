//! The canonical batch of soundings.
//!
//! Every algorithm in this crate works on an `(N, Z)` layout: `N` independent soundings (rows),
//! each with `Z` levels (columns) ordered from the surface upward, so pressure strictly
//! decreases along a row. Soundings with fewer levels are padded at the top with `NaN`.
//!
//! Units are SI throughout: pressure in Pa, temperature and dew point in K.
use crate::{
    error::{AnalysisError, Result},
    utility::is_close,
};
use ndarray::{Array1, Array2, ArrayD, ArrayView1, ArrayView2, Zip};

/// Anything that can be lifted into a profile array before shape normalization.
///
/// One dimensional inputs are a single sounding. Inputs with more than two dimensions are
/// flattened so the last axis is the vertical one.
pub trait IntoProfileArray {
    /// Convert into a dynamically shaped array.
    fn into_profile_array(self) -> ArrayD<f64>;
}

impl IntoProfileArray for ArrayD<f64> {
    fn into_profile_array(self) -> ArrayD<f64> {
        self
    }
}

impl IntoProfileArray for Array1<f64> {
    fn into_profile_array(self) -> ArrayD<f64> {
        self.into_dyn()
    }
}

impl IntoProfileArray for Array2<f64> {
    fn into_profile_array(self) -> ArrayD<f64> {
        self.into_dyn()
    }
}

impl<'a> IntoProfileArray for ArrayView1<'a, f64> {
    fn into_profile_array(self) -> ArrayD<f64> {
        self.to_owned().into_dyn()
    }
}

impl<'a> IntoProfileArray for ArrayView2<'a, f64> {
    fn into_profile_array(self) -> ArrayD<f64> {
        self.to_owned().into_dyn()
    }
}

impl IntoProfileArray for Vec<f64> {
    fn into_profile_array(self) -> ArrayD<f64> {
        Array1::from(self).into_dyn()
    }
}

impl<'a> IntoProfileArray for &'a [f64] {
    fn into_profile_array(self) -> ArrayD<f64> {
        Array1::from(self.to_vec()).into_dyn()
    }
}

/// A batch of pressure, temperature, and dew point profiles in the canonical `(N, Z)` layout.
#[derive(Clone, Debug)]
pub struct Profiles {
    pressure: Array2<f64>,
    temperature: Array2<f64>,
    dew_point: Array2<f64>,
}

impl Profiles {
    /// Normalize and broadcast raw inputs into a batch.
    ///
    /// A one dimensional (or single row) input is broadcast across every sounding in the batch,
    /// which is how a shared vertical pressure grid is supplied.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ndarray::array;
    /// use sounding_convection::Profiles;
    ///
    /// let pressure = vec![100_000.0, 85_000.0, 70_000.0];
    /// let temperature = array![[300.0, 290.0, 280.0], [295.0, 287.0, 276.0]];
    /// let dew_point = array![[295.0, 280.0, 260.0], [290.0, 275.0, 255.0]];
    ///
    /// let profiles = Profiles::new(pressure, temperature, dew_point).unwrap();
    /// assert_eq!(profiles.n_profiles(), 2);
    /// assert_eq!(profiles.n_levels(), 3);
    ///
    /// // Vertical grids that do not line up are rejected.
    /// assert!(Profiles::new(vec![1.0, 2.0], vec![1.0, 2.0, 3.0], vec![1.0, 2.0]).is_err());
    /// ```
    pub fn new<P, T, D>(pressure: P, temperature: T, dew_point: D) -> Result<Self>
    where
        P: IntoProfileArray,
        T: IntoProfileArray,
        D: IntoProfileArray,
    {
        let pressure = into_rows("pressure", pressure.into_profile_array())?;
        let temperature = into_rows("temperature", temperature.into_profile_array())?;
        let dew_point = into_rows("dew point", dew_point.into_profile_array())?;

        let n = pressure
            .nrows()
            .max(temperature.nrows())
            .max(dew_point.nrows());
        let z = pressure.ncols();

        let pressure = broadcast_rows("pressure", pressure, n, z)?;
        let temperature = broadcast_rows("temperature", temperature, n, z)?;
        let dew_point = broadcast_rows("dew point", dew_point, n, z)?;

        Ok(Profiles {
            pressure,
            temperature,
            dew_point,
        })
    }

    /// Build a batch from matrices that are already in the canonical layout.
    pub fn from_nz(
        pressure: Array2<f64>,
        temperature: Array2<f64>,
        dew_point: Array2<f64>,
    ) -> Result<Self> {
        if pressure.dim() != temperature.dim() || pressure.dim() != dew_point.dim() {
            return Err(AnalysisError::ShapeMismatch(format!(
                "pressure {:?}, temperature {:?}, dew point {:?}",
                pressure.dim(),
                temperature.dim(),
                dew_point.dim()
            )));
        }

        if pressure.is_empty() {
            return Err(AnalysisError::NotEnoughData);
        }

        Ok(Profiles {
            pressure,
            temperature,
            dew_point,
        })
    }

    /// Number of soundings in the batch.
    #[inline]
    pub fn n_profiles(&self) -> usize {
        self.pressure.nrows()
    }

    /// Number of vertical levels, including any `NaN` padding.
    #[inline]
    pub fn n_levels(&self) -> usize {
        self.pressure.ncols()
    }

    /// Get the pressure matrix.
    #[inline]
    pub fn pressure(&self) -> ArrayView2<f64> {
        self.pressure.view()
    }

    /// Get the temperature matrix.
    #[inline]
    pub fn temperature(&self) -> ArrayView2<f64> {
        self.temperature.view()
    }

    /// Get the dew point matrix.
    #[inline]
    pub fn dew_point(&self) -> ArrayView2<f64> {
        self.dew_point.view()
    }

    /// The lowest level of every sounding as (pressure, temperature, dew point).
    pub fn surface(&self) -> (Array1<f64>, Array1<f64>, Array1<f64>) {
        (
            self.pressure.column(0).to_owned(),
            self.temperature.column(0).to_owned(),
            self.dew_point.column(0).to_owned(),
        )
    }

    /// Views of all three matrices at once.
    #[inline]
    pub(crate) fn views(&self) -> (ArrayView2<f64>, ArrayView2<f64>, ArrayView2<f64>) {
        (
            self.pressure.view(),
            self.temperature.view(),
            self.dew_point.view(),
        )
    }
}

fn into_rows(name: &str, arr: ArrayD<f64>) -> Result<Array2<f64>> {
    let z = *arr
        .shape()
        .last()
        .ok_or_else(|| AnalysisError::ShapeMismatch(format!("{} is a scalar", name)))?;

    if z == 0 || arr.is_empty() {
        return Err(AnalysisError::NotEnoughData);
    }

    let n = arr.len() / z;
    let data: Vec<f64> = arr.iter().copied().collect();

    Array2::from_shape_vec((n, z), data)
        .map_err(|err| AnalysisError::ShapeMismatch(format!("{}: {}", name, err)))
}

fn broadcast_rows(name: &str, arr: Array2<f64>, n: usize, z: usize) -> Result<Array2<f64>> {
    if arr.dim() == (n, z) {
        return Ok(arr);
    }

    arr.broadcast((n, z))
        .map(|view| view.to_owned())
        .ok_or_else(|| {
            AnalysisError::ShapeMismatch(format!(
                "{} has shape {:?}, expected ({}, {}) or something that broadcasts to it",
                name,
                arr.dim(),
                n,
                z
            ))
        })
}

/// Broadcast an optional per-row value to the batch, falling back to `default` when absent.
pub(crate) fn per_row(
    name: &str,
    values: Option<&Array1<f64>>,
    default: ArrayView1<f64>,
) -> Result<Array1<f64>> {
    let n = default.len();
    match values {
        None => Ok(default.to_owned()),
        Some(vals) if vals.len() == n => Ok(vals.clone()),
        Some(vals) if vals.len() == 1 => Ok(Array1::from_elem(n, vals[0])),
        Some(vals) => Err(AnalysisError::ShapeMismatch(format!(
            "{} has {} values for {} soundings",
            name,
            vals.len(),
            n
        ))),
    }
}

fn compare_rows<F>(pressure: ArrayView2<f64>, level: ArrayView1<f64>, f: F) -> Array2<bool>
where
    F: Fn(f64, f64) -> bool + Sync + Send,
{
    let mut out = Array2::from_elem(pressure.dim(), false);

    Zip::from(out.rows_mut())
        .and(pressure.rows())
        .and(level)
        .par_for_each(|mut out_row, p_row, &lvl| {
            Zip::from(&mut out_row)
                .and(&p_row)
                .for_each(|o, &p| *o = f(p, lvl));
        });

    out
}

/// Levels at a higher pressure (lower altitude) than `level`, optionally including levels
/// that are close to it.
pub(crate) fn is_below(
    pressure: ArrayView2<f64>,
    level: ArrayView1<f64>,
    close: bool,
) -> Array2<bool> {
    compare_rows(pressure, level, move |p, lvl| p > lvl || (close && is_close(p, lvl)))
}

/// Levels at a lower pressure (higher altitude) than `level`, optionally including levels that
/// are close to it.
pub(crate) fn is_above(
    pressure: ArrayView2<f64>,
    level: ArrayView1<f64>,
    close: bool,
) -> Array2<bool> {
    compare_rows(pressure, level, move |p, lvl| p < lvl || (close && is_close(p, lvl)))
}

/// Levels inside the closed pressure window `[top, bottom]`.
pub(crate) fn is_between(
    pressure: ArrayView2<f64>,
    bottom: ArrayView1<f64>,
    top: ArrayView1<f64>,
) -> Array2<bool> {
    let below_top = is_below(pressure, top, true);
    let above_bottom = is_above(pressure, bottom, true);

    below_top & &above_bottom
}
