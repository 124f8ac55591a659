//! Single level thermodynamic formulas in SI units, and helpers to apply them across a batch.
//!
//! The formulas themselves come from `metfor`, which works in hectopascals and typed
//! temperatures. These wrappers take and return plain `f64` values in Pa and K so they can be
//! mapped over `ndarray` matrices. Any `NaN` input, or a value `metfor` refuses to compute,
//! produces `NaN`.
use metfor::{self, HectoPascal, Kelvin, Quantity};
use ndarray::{Array2, ArrayView2, Zip};
use std::f64::NAN;

/// Gas constant for dry air, J/(kg K).
pub const RD: f64 = metfor::Rd.0;

#[inline]
fn hpa(pressure: f64) -> HectoPascal {
    HectoPascal(pressure / 100.0)
}

#[inline]
fn kelvin<T>(t: T) -> f64
where
    Kelvin: From<T>,
{
    Kelvin::from(t).unpack()
}

/// Saturation vapor pressure over liquid water (Pa).
pub fn saturation_vapor_pressure(temperature: f64) -> f64 {
    if !temperature.is_finite() {
        return NAN;
    }

    metfor::vapor_pressure_water(Kelvin(temperature))
        .map(|e| e.unpack() * 100.0)
        .unwrap_or(NAN)
}

/// Mixing ratio (kg/kg) from a partial pressure and total pressure.
#[inline]
pub fn mixing_ratio(partial_pressure: f64, pressure: f64) -> f64 {
    metfor::epsilon * partial_pressure / (pressure - partial_pressure)
}

/// Mixing ratio (kg/kg) of saturated air at `temperature`.
pub fn saturation_mixing_ratio(pressure: f64, temperature: f64) -> f64 {
    if !pressure.is_finite() || !temperature.is_finite() {
        return NAN;
    }

    metfor::mixing_ratio(Kelvin(temperature), hpa(pressure)).unwrap_or(NAN)
}

/// Vapor pressure (Pa) of air with the given mixing ratio.
#[inline]
pub fn vapor_pressure(pressure: f64, mixing_ratio: f64) -> f64 {
    pressure * mixing_ratio / (metfor::epsilon + mixing_ratio)
}

/// Virtual temperature (K) from temperature and mixing ratio.
#[inline]
pub fn virtual_temperature(temperature: f64, mixing_ratio: f64) -> f64 {
    temperature * ((mixing_ratio + metfor::epsilon) / (metfor::epsilon * (1.0 + mixing_ratio)))
}

/// Dew point (K) of air at `pressure` holding `mixing_ratio` of water vapor.
pub fn dew_point_from_mixing_ratio(pressure: f64, mixing_ratio: f64) -> f64 {
    if !pressure.is_finite() || !mixing_ratio.is_finite() {
        return NAN;
    }

    metfor::dew_point_from_p_and_mw(hpa(pressure), mixing_ratio)
        .map(kelvin)
        .unwrap_or(NAN)
}

/// Equivalent potential temperature (K).
pub fn equivalent_potential_temperature(pressure: f64, temperature: f64, dew_point: f64) -> f64 {
    if !pressure.is_finite() || !temperature.is_finite() || !dew_point.is_finite() {
        return NAN;
    }

    metfor::equiv_pot_temperature(Kelvin(temperature), Kelvin(dew_point), hpa(pressure))
        .map(kelvin)
        .unwrap_or(NAN)
}

/// Equivalent potential temperature (K) of saturated air, the label of a moist adiabat.
#[inline]
pub fn saturated_equivalent_potential_temperature(pressure: f64, temperature: f64) -> f64 {
    equivalent_potential_temperature(pressure, temperature, temperature)
}

/// Temperature (K) on the moist adiabat labeled `theta_e` at `pressure`.
pub fn temperature_from_saturated_theta_e(pressure: f64, theta_e: f64) -> f64 {
    if !pressure.is_finite() || !theta_e.is_finite() {
        return NAN;
    }

    metfor::temperature_from_equiv_pot_temp_saturated_and_pressure(hpa(pressure), Kelvin(theta_e))
        .map(kelvin)
        .unwrap_or(NAN)
}

/// Wet bulb temperature (K).
pub fn wet_bulb_temperature(pressure: f64, temperature: f64, dew_point: f64) -> f64 {
    if !pressure.is_finite() || !temperature.is_finite() || !dew_point.is_finite() {
        return NAN;
    }

    metfor::wet_bulb(Kelvin(temperature), Kelvin(dew_point), hpa(pressure))
        .map(kelvin)
        .unwrap_or(NAN)
}

/// Temperature (K) at `target_pressure` of a parcel moved dry adiabatically from
/// (`pressure`, `temperature`).
pub fn dry_lapse(target_pressure: f64, temperature: f64, pressure: f64) -> f64 {
    if !target_pressure.is_finite() || !temperature.is_finite() || !pressure.is_finite() {
        return NAN;
    }

    let theta = metfor::potential_temperature(hpa(pressure), Kelvin(temperature));
    kelvin(metfor::temperature_from_pot_temp(theta, hpa(target_pressure)))
}

/// Pressure (Pa) and temperature (K) at the lifting condensation level.
///
/// Saturated (or supersaturated) air is already at its LCL. The LCL is never below the
/// starting pressure.
pub fn lcl(pressure: f64, temperature: f64, dew_point: f64) -> (f64, f64) {
    if !pressure.is_finite() || !temperature.is_finite() || !dew_point.is_finite() {
        return (NAN, NAN);
    }

    if dew_point >= temperature {
        return (pressure, temperature);
    }

    metfor::pressure_and_temperature_at_lcl(Kelvin(temperature), Kelvin(dew_point), hpa(pressure))
        .map(|(p_lcl, t_lcl)| ((p_lcl.unpack() * 100.0).min(pressure), kelvin(t_lcl)))
        .unwrap_or((NAN, NAN))
}

/// Apply a two argument formula elementwise.
pub fn map2<F>(a: ArrayView2<f64>, b: ArrayView2<f64>, f: F) -> Array2<f64>
where
    F: Fn(f64, f64) -> f64 + Sync + Send,
{
    Zip::from(&a).and(&b).par_map_collect(|&a, &b| f(a, b))
}

/// Apply a three argument formula elementwise.
pub fn map3<F>(a: ArrayView2<f64>, b: ArrayView2<f64>, c: ArrayView2<f64>, f: F) -> Array2<f64>
where
    F: Fn(f64, f64, f64) -> f64 + Sync + Send,
{
    Zip::from(&a)
        .and(&b)
        .and(&c)
        .par_map_collect(|&a, &b, &c| f(a, b, c))
}

/// Apply a two argument formula elementwise into `out`, only where `mask` is true. Values
/// outside the mask are left untouched.
pub fn map2_into<F>(
    a: ArrayView2<f64>,
    b: ArrayView2<f64>,
    out: &mut Array2<f64>,
    mask: Option<ArrayView2<bool>>,
    f: F,
) where
    F: Fn(f64, f64) -> f64 + Sync + Send,
{
    match mask {
        Some(mask) => Zip::from(out)
            .and(&a)
            .and(&b)
            .and(&mask)
            .par_for_each(|o, &a, &b, &m| {
                if m {
                    *o = f(a, b)
                }
            }),
        None => Zip::from(out)
            .and(&a)
            .and(&b)
            .par_for_each(|o, &a, &b| *o = f(a, b)),
    }
}

/// Apply a three argument formula elementwise into `out`, only where `mask` is true. Values
/// outside the mask are left untouched.
pub fn map3_into<F>(
    a: ArrayView2<f64>,
    b: ArrayView2<f64>,
    c: ArrayView2<f64>,
    out: &mut Array2<f64>,
    mask: Option<ArrayView2<bool>>,
    f: F,
) where
    F: Fn(f64, f64, f64) -> f64 + Sync + Send,
{
    match mask {
        Some(mask) => Zip::from(out)
            .and(&a)
            .and(&b)
            .and(&c)
            .and(&mask)
            .par_for_each(|o, &a, &b, &c, &m| {
                if m {
                    *o = f(a, b, c)
                }
            }),
        None => Zip::from(out)
            .and(&a)
            .and(&b)
            .and(&c)
            .par_for_each(|o, &a, &b, &c| *o = f(a, b, c)),
    }
}
