use ndarray::Array2;
use sounding_convection::Profiles;
use std::f64::NAN;

const N_PROFILES: usize = 512;
const N_LEVELS: usize = 40;

/// A batch of synthetic soundings. Every few rows the top of the sounding is cut off so the
/// NaN padding paths get exercised too.
pub fn load_batch() -> Profiles {
    let mut pressure = Array2::from_elem((N_PROFILES, N_LEVELS), NAN);
    let mut temperature = Array2::from_elem((N_PROFILES, N_LEVELS), NAN);
    let mut dew_point = Array2::from_elem((N_PROFILES, N_LEVELS), NAN);

    for i in 0..N_PROFILES {
        let warm = (i % 17) as f64 * 0.5;
        let dry = 2.0 + (i % 11) as f64;
        let top = if i % 5 == 0 { N_LEVELS - 8 } else { N_LEVELS };

        for j in 0..top {
            let p = 101_000.0 - 2_000.0 * j as f64;
            let lapse = if p > 60_000.0 { 7.0 } else { 8.5 };
            let t = 296.0 + warm - lapse * (101_000.0 - p) / 10_000.0;

            pressure[[i, j]] = p;
            temperature[[i, j]] = t;
            dew_point[[i, j]] = t - dry - 0.4 * j as f64;
        }
    }

    Profiles::from_nz(pressure, temperature, dew_point).expect("oops")
}
