use super::*;
use sounding_convection::{
    mixed_layer_cape_cin, most_unstable_cape_cin, surface_based_cape_cin, MixedLayerOptions,
    MostUnstableOptions,
};

/// CAPE is never negative and CIN is never positive, for any parcel.
#[allow(dead_code)] // False alarm - lint is done before macro expansion.
pub fn check_energy_signs(profiles: &Profiles) {
    let (sb_cape, sb_cin) = surface_based_cape_cin(profiles);
    let (mu_cape, mu_cin) =
        most_unstable_cape_cin(profiles, &MostUnstableOptions::default()).unwrap();
    let (ml_cape, ml_cin) = mixed_layer_cape_cin(profiles, &MixedLayerOptions::default()).unwrap();

    for (cape, cin) in &[(sb_cape, sb_cin), (mu_cape, mu_cin), (ml_cape, ml_cin)] {
        assert_eq!(cape.len(), profiles.n_profiles());
        assert!(cape.iter().all(|&c| c >= 0.0), "negative CAPE: {}", cape);
        assert!(cin.iter().all(|&c| c <= 0.0), "positive CIN: {}", cin);
    }
}
