use super::*;
use sounding_convection::{mixed_layer, MixedLayerOptions};

/// The realized mixed layer depth is never more than requested.
#[allow(dead_code)] // False alarm - lint is done before macro expansion.
pub fn check_mixed_layer_depth(profiles: &Profiles) {
    for &depth in &[0.0, 5_000.0, 10_000.0, 25_000.0] {
        let opts = MixedLayerOptions {
            depth,
            ..MixedLayerOptions::default()
        };

        let ml = mixed_layer(profiles, &opts).unwrap();
        for &realized in ml.depth.iter().filter(|d| !d.is_nan()) {
            assert!(realized <= depth, "{} > {}", realized, depth);
            assert!(realized >= 0.0);
        }
    }
}
