use ndarray::{Array1, Array2};
use sounding_convection::{met_formulas, Profiles};
use std::f64::NAN;

pub mod index_tests;
pub mod level_tests;
pub mod parcel_tests;

/// Run the checks every sounding should pass, whatever its shape.
#[allow(unused_macros)] // False alarm
macro_rules! check_invariants {
    ($test_name:ident, $builder:expr) => {
        #[test]
        fn $test_name() {
            let profiles = $builder;

            utils::level_tests::check_el_lfc_round_trip(&profiles);
            utils::index_tests::check_energy_signs(&profiles);
            utils::parcel_tests::check_mixed_layer_depth(&profiles);
        }
    };
}

pub fn approx_equal(val1: f64, val2: f64, eps: f64) -> bool {
    assert!(eps > 0.0);

    (val1 - val2).abs() < eps
}

/// Equality that treats two `NaN` values as equal.
pub fn nan_equal(val1: f64, val2: f64) -> bool {
    (val1.is_nan() && val2.is_nan()) || val1 == val2
}

pub fn standard_pressure() -> Vec<f64> {
    (0..9).map(|i| 100_000.0 - 10_000.0 * i as f64).collect()
}

/// Saturated at the surface and buoyant right away, capped by a warm layer at the top.
pub fn conditionally_unstable_t() -> Vec<f64> {
    vec![300.0, 293.0, 287.0, 281.0, 274.0, 266.0, 256.0, 242.0, 250.0]
}

pub fn conditionally_unstable_td() -> Vec<f64> {
    vec![300.0, 285.0, 275.0, 265.0, 255.0, 245.0, 235.0, 225.0, 215.0]
}

pub fn conditionally_unstable() -> Profiles {
    Profiles::new(
        standard_pressure(),
        conditionally_unstable_t(),
        conditionally_unstable_td(),
    )
    .unwrap()
}

/// Saturated and isothermal.
pub fn saturated_isothermal() -> Profiles {
    Profiles::new(standard_pressure(), vec![280.0; 9], vec![280.0; 9]).unwrap()
}

pub fn dry_stable_t() -> Vec<f64> {
    vec![290.0, 286.0, 282.0, 278.0, 274.0, 270.0, 266.0, 262.0, 258.0]
}

pub fn dry_stable_td() -> Vec<f64> {
    dry_stable_t().iter().map(|t| t - 30.0).collect()
}

/// Dew points far below the temperature and a lapse rate much less than dry adiabatic.
pub fn dry_stable() -> Profiles {
    Profiles::new(standard_pressure(), dry_stable_t(), dry_stable_td()).unwrap()
}

/// A saturated environment that follows a moist adiabat through the mid levels.
pub fn moist_adiabatic() -> Profiles {
    let p = standard_pressure();
    let theta_e = met_formulas::saturated_equivalent_potential_temperature(100_000.0, 295.0);
    let t: Vec<f64> = p
        .iter()
        .map(|&p| met_formulas::temperature_from_saturated_theta_e(p, theta_e))
        .collect();

    Profiles::new(p, t.clone(), t).unwrap()
}

/// Several soundings in one batch: the conditionally unstable and dry stable soundings, a
/// sounding with no data, and the conditionally unstable sounding cut off above 40 kPa.
pub fn mixed_batch() -> Profiles {
    let p = standard_pressure();
    let z = p.len();

    let mut pressure = Array2::from_elem((4, z), NAN);
    let mut temperature = Array2::from_elem((4, z), NAN);
    let mut dew_point = Array2::from_elem((4, z), NAN);

    for row in &[0, 1, 3] {
        pressure.row_mut(*row).assign(&Array1::from(p.clone()));
    }

    temperature
        .row_mut(0)
        .assign(&Array1::from(conditionally_unstable_t()));
    dew_point
        .row_mut(0)
        .assign(&Array1::from(conditionally_unstable_td()));

    temperature.row_mut(1).assign(&Array1::from(dry_stable_t()));
    dew_point.row_mut(1).assign(&Array1::from(dry_stable_td()));

    temperature
        .row_mut(3)
        .assign(&Array1::from(conditionally_unstable_t()));
    dew_point
        .row_mut(3)
        .assign(&Array1::from(conditionally_unstable_td()));
    for j in 7..z {
        pressure[[3, j]] = NAN;
        temperature[[3, j]] = NAN;
        dew_point[[3, j]] = NAN;
    }

    Profiles::from_nz(pressure, temperature, dew_point).unwrap()
}

/// The cut off sounding in `mixed_batch` on its own.
pub fn truncated_conditionally_unstable() -> Profiles {
    Profiles::new(
        standard_pressure()[..7].to_vec(),
        conditionally_unstable_t()[..7].to_vec(),
        conditionally_unstable_td()[..7].to_vec(),
    )
    .unwrap()
}
