use super::*;
use sounding_convection::{el, el_lfc, lfc, Pick};
use strum::IntoEnumIterator;

/// `el` and `lfc` on their own agree with `el_lfc` for every pick policy.
#[allow(dead_code)] // False alarm - lint is done before macro expansion.
pub fn check_el_lfc_round_trip(profiles: &Profiles) {
    for which_el in Pick::iter() {
        for which_lfc in Pick::iter() {
            let (el_both, lfc_both) = el_lfc(profiles, None, which_lfc, which_el, None).unwrap();
            let el_only = el(profiles, None, which_el).unwrap();
            let lfc_only = lfc(profiles, None, which_lfc, None).unwrap();

            for i in 0..profiles.n_profiles() {
                assert!(
                    nan_equal(el_only.pressure[i], el_both.pressure[i]),
                    "EL ({}) row {}: {} != {}",
                    which_el,
                    i,
                    el_only.pressure[i],
                    el_both.pressure[i]
                );
                assert!(nan_equal(el_only.temperature[i], el_both.temperature[i]));
                assert!(
                    nan_equal(lfc_only.pressure[i], lfc_both.pressure[i]),
                    "LFC ({}) row {}: {} != {}",
                    which_lfc,
                    i,
                    lfc_only.pressure[i],
                    lfc_both.pressure[i]
                );
                assert!(nan_equal(lfc_only.temperature[i], lfc_both.temperature[i]));
            }
        }
    }
}
