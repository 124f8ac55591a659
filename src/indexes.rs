//! Energy indexes for lifted and descending parcels: CAPE, CIN, and DCAPE.
//!
//! All energies are in J/kg. CAPE is never negative and CIN is never positive.
use crate::{
    error::{AnalysisError, Result},
    integrate::trapz,
    intersection::{find_zero_crossings, Pick},
    levels::{el_nz, lcl_nz, lfc_nz},
    met_formulas::{
        equivalent_potential_temperature, map2, map3_into, saturation_mixing_ratio,
        virtual_temperature, wet_bulb_temperature, RD,
    },
    parcel::{
        mixed_layer_nz, most_unstable_parcel_index_nz, parcel_mixing_ratio_nz, MixedLayerOptions,
        MostUnstableOptions,
    },
    parcel_profile::{descend_moist, parcel_profile_with_lcl},
    profile::{is_above, is_below, per_row, Profiles},
    utility::argmin_first,
};
use ndarray::{Array1, Array2, ArrayView2, Zip};
use std::f64::NAN;

/// Top (Pa) of the default DCAPE source window.
pub const DCAPE_WINDOW_TOP: f64 = 50_000.0;
/// Bottom (Pa) of the default DCAPE source window.
pub const DCAPE_WINDOW_BOTTOM: f64 = 70_000.0;

/// CAPE and CIN of a parcel lifted through each sounding.
///
/// `parcel_profile` is the parcel temperature at every level of `profiles`, usually from
/// [`parcel_profile`](crate::parcel_profile()). Returns `(cape, cin)`.
pub fn cape_cin(
    profiles: &Profiles,
    parcel_profile: &Array2<f64>,
    which_lfc: Pick,
    which_el: Pick,
) -> Result<(Array1<f64>, Array1<f64>)> {
    let (p, t, td) = profiles.views();

    if parcel_profile.dim() != p.dim() {
        return Err(AnalysisError::ShapeMismatch(format!(
            "parcel profile {:?} for profiles {:?}",
            parcel_profile.dim(),
            p.dim()
        )));
    }

    tracing::debug!(
        n = profiles.n_profiles(),
        z = profiles.n_levels(),
        %which_lfc,
        %which_el,
        "cape and cin"
    );

    Ok(cape_cin_nz(
        p,
        t,
        td,
        parcel_profile.view(),
        which_lfc,
        which_el,
    ))
}

pub(crate) fn cape_cin_nz(
    pressure: ArrayView2<f64>,
    temperature: ArrayView2<f64>,
    dew_point: ArrayView2<f64>,
    parcel_temperature: ArrayView2<f64>,
    which_lfc: Pick,
    which_el: Pick,
) -> (Array1<f64>, Array1<f64>) {
    let parcel_mw = parcel_mixing_ratio_nz(pressure, temperature, dew_point, None);
    let parcel_vt = Zip::from(&parcel_temperature)
        .and(&parcel_mw)
        .par_map_collect(|&t, &mw| virtual_temperature(t, mw));

    let env_mw = map2(pressure, dew_point, saturation_mixing_ratio);
    let env_vt = Zip::from(&temperature)
        .and(&env_mw)
        .par_map_collect(|&t, &mw| virtual_temperature(t, mw));

    // The LCL comes from the actual temperature and dew point, not the virtual temperature.
    let lcl = lcl_nz(
        pressure.column(0),
        temperature.column(0),
        dew_point.column(0),
    );

    let el = el_nz(pressure, env_vt.view(), parcel_vt.view(), &lcl, which_el);
    let lfc = lfc_nz(pressure, env_vt.view(), parcel_vt.view(), &lcl, which_lfc);

    let buoyancy = &parcel_vt - &env_vt;
    let crossings = find_zero_crossings(pressure, buoyancy.view());

    let positive = crossings.between(&lfc, &el);
    let mut cape = trapz(
        positive.value.view(),
        positive.pressure.mapv(f64::ln).view(),
    );
    cape.mapv_inplace(|c| (-RD * c).max(0.0) + 0.0);

    let negative = crossings.below(&lfc);
    let mut cin = trapz(
        negative.value.view(),
        negative.pressure.mapv(f64::ln).view(),
    );
    cin.mapv_inplace(|c| (-RD * c).min(0.0) + 0.0);

    (cape, cin)
}

/// CAPE and CIN of a parcel lifted from the lowest level of each sounding.
pub fn surface_based_cape_cin(profiles: &Profiles) -> (Array1<f64>, Array1<f64>) {
    tracing::debug!(
        n = profiles.n_profiles(),
        z = profiles.n_levels(),
        "surface based cape and cin"
    );

    let (p, t, td) = profiles.views();
    let ascent = parcel_profile_with_lcl(p, t, td, None);

    cape_cin_nz(
        ascent.pressure.view(),
        ascent.temperature.view(),
        ascent.dew_point.view(),
        ascent.parcel_temperature.view(),
        Pick::Bottom,
        Pick::Top,
    )
}

/// CAPE and CIN of the most unstable parcel of each sounding.
///
/// The parcel is lifted from its own level, only levels at and above it take part.
pub fn most_unstable_cape_cin(
    profiles: &Profiles,
    opts: &MostUnstableOptions,
) -> Result<(Array1<f64>, Array1<f64>)> {
    opts.validate()?;

    let (p, t, td) = profiles.views();
    let bottom = per_row("bottom", opts.bottom.as_ref(), p.column(0))?;

    tracing::debug!(
        n = profiles.n_profiles(),
        z = profiles.n_levels(),
        depth = opts.depth,
        "most unstable cape and cin"
    );

    let index = most_unstable_parcel_index_nz(p, t, td, opts.depth, bottom.view());

    let mut start = Array2::from_elem(p.dim(), false);
    Zip::indexed(&mut start).for_each(|(i, j), s| *s = j >= index[i]);

    let ascent = parcel_profile_with_lcl(p, t, td, Some(start.view()));

    Ok(cape_cin_nz(
        ascent.pressure.view(),
        ascent.temperature.view(),
        ascent.dew_point.view(),
        ascent.parcel_temperature.view(),
        Pick::Bottom,
        Pick::Top,
    ))
}

/// CAPE and CIN of a parcel with the mean properties of the mixed layer.
///
/// The mixed layer parcel starts at the lowest level of each sounding. Levels inside the mixed
/// layer are skipped during the ascent.
pub fn mixed_layer_cape_cin(
    profiles: &Profiles,
    opts: &MixedLayerOptions,
) -> Result<(Array1<f64>, Array1<f64>)> {
    opts.validate()?;

    tracing::debug!(
        n = profiles.n_profiles(),
        z = profiles.n_levels(),
        depth = opts.depth,
        "mixed layer cape and cin"
    );

    let (p, t, td) = profiles.views();
    let bottom = per_row("bottom", opts.bottom.as_ref(), p.column(0))?;
    let mixed = mixed_layer_nz(p, t, td, opts.depth, bottom.view());

    let mut t = t.to_owned();
    let mut td = td.to_owned();
    t.column_mut(0).assign(&mixed.temperature);
    td.column_mut(0).assign(&mixed.dew_point);

    let top = bottom.mapv(|b| b - opts.depth);
    let mut start = is_above(p, top.view(), false);
    start.column_mut(0).fill(true);

    let ascent = parcel_profile_with_lcl(p, t.view(), td.view(), Some(start.view()));

    Ok(cape_cin_nz(
        ascent.pressure.view(),
        ascent.temperature.view(),
        ascent.dew_point.view(),
        ascent.parcel_temperature.view(),
        Pick::Bottom,
        Pick::Top,
    ))
}

/// Downdraft CAPE.
///
/// The downdraft starts at the level of minimum equivalent potential temperature inside
/// `window`, which defaults to the levels between 70 and 50 kPa. A saturated parcel at the wet
/// bulb temperature of that level descends moist adiabatically to the surface.
pub fn downdraft_cape(profiles: &Profiles, window: Option<&Array2<bool>>) -> Result<Array1<f64>> {
    let (p, t, td) = profiles.views();

    if let Some(window) = window {
        if window.dim() != p.dim() {
            return Err(AnalysisError::ShapeMismatch(format!(
                "window {:?} for profiles {:?}",
                window.dim(),
                p.dim()
            )));
        }
    }

    tracing::debug!(n = profiles.n_profiles(), z = profiles.n_levels(), "downdraft cape");

    Ok(downdraft_cape_nz(p, t, td, window.map(|w| w.view())))
}

pub(crate) fn downdraft_cape_nz(
    pressure: ArrayView2<f64>,
    temperature: ArrayView2<f64>,
    dew_point: ArrayView2<f64>,
    window: Option<ArrayView2<bool>>,
) -> Array1<f64> {
    let window = match window {
        Some(window) => window.to_owned(),
        None => pressure.mapv(|p| p <= DCAPE_WINDOW_BOTTOM && p >= DCAPE_WINDOW_TOP),
    };

    let mut theta_e = Array2::from_elem(pressure.dim(), std::f64::INFINITY);
    map3_into(
        pressure,
        temperature,
        dew_point,
        &mut theta_e,
        Some(window.view()),
        equivalent_potential_temperature,
    );

    let source: Array1<usize> = theta_e.rows().into_iter().map(argmin_first).collect();
    let at_source = |arr: ArrayView2<f64>| -> Array1<f64> {
        source
            .iter()
            .enumerate()
            .map(|(i, &j)| arr[[i, j]])
            .collect()
    };

    let p_top = at_source(pressure);
    let t_top = at_source(temperature);
    let td_top = at_source(dew_point);
    let wb_top = Zip::from(&p_top)
        .and(&t_top)
        .and(&td_top)
        .map_collect(|&p, &t, &td| wet_bulb_temperature(p, t, td));

    // Only the levels from the source down to the surface take part.
    let keep = is_below(pressure, p_top.view(), true);
    let mut pressure = pressure.to_owned();
    Zip::from(&mut pressure).and(&keep).for_each(|p, &k| {
        if !k {
            *p = NAN;
        }
    });

    let env_mw = map2(pressure.view(), dew_point, saturation_mixing_ratio);
    let env_vt = Zip::from(&temperature)
        .and(&env_mw)
        .par_map_collect(|&t, &mw| virtual_temperature(t, mw));

    let trace = descend_moist(pressure.view(), wb_top.view(), p_top.view());
    let trace_mw = map2(pressure.view(), trace.view(), saturation_mixing_ratio);
    let trace_vt = Zip::from(&trace)
        .and(&trace_mw)
        .par_map_collect(|&t, &mw| virtual_temperature(t, mw));

    let mut dcape = trapz((&trace_vt - &env_vt).view(), pressure.mapv(f64::ln).view());
    dcape.mapv_inplace(|d| RD * d);

    dcape
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::utility::test_tools::*;
    use ndarray::array;

    #[test]
    fn test_identical_parcel_and_environment() {
        let t = array![[300.0, 293.0, 287.0, 281.0, 274.0]];
        let profiles = Profiles::new(
            vec![100_000.0, 90_000.0, 80_000.0, 70_000.0, 60_000.0],
            t.clone(),
            t.clone(),
        )
        .unwrap();

        let (cape, cin) = cape_cin(&profiles, &t, Pick::Bottom, Pick::Top).unwrap();
        assert_eq!(cape[0], 0.0);
        assert_eq!(cin[0], 0.0);
        assert!(cape[0].is_sign_positive());
        assert!(cin[0].is_sign_positive());
    }

    #[test]
    fn test_every_buoyant_layer_counts() {
        let t = array![[300.0, 292.0, 284.0, 276.0, 268.0, 260.0]];
        let profiles = Profiles::new(
            vec![100_000.0, 90_000.0, 80_000.0, 70_000.0, 60_000.0, 50_000.0],
            t.clone(),
            t,
        )
        .unwrap();

        // Warm at 80 kPa only.
        let one_layer = array![[300.0, 290.0, 286.0, 275.0, 267.0, 258.0]];
        // Warm again at 60 kPa, below a cooler top.
        let two_layers = array![[300.0, 290.0, 286.0, 275.0, 270.0, 258.0]];

        let (cape_one, cin_one) = cape_cin(&profiles, &one_layer, Pick::Bottom, Pick::Top).unwrap();
        let (cape_two, cin_two) =
            cape_cin(&profiles, &two_layers, Pick::Bottom, Pick::Top).unwrap();

        assert!(cape_one[0] > 0.0);
        assert!(cape_two[0] > cape_one[0], "{} <= {}", cape_two[0], cape_one[0]);
        assert!(approx_equal(cin_one[0], cin_two[0], 1.0e-9));
    }

    #[test]
    fn test_cape_between_lfc_and_el() {
        // Saturated aloft, so the buoyancy follows the temperature difference.
        let profiles = Profiles::new(
            vec![100_000.0, 90_000.0, 80_000.0, 70_000.0, 60_000.0, 50_000.0],
            vec![300.0, 292.0, 284.0, 276.0, 272.0, 266.0],
            vec![296.0, 292.0, 284.0, 276.0, 272.0, 266.0],
        )
        .unwrap();
        let parcel = array![[300.0, 290.0, 282.0, 280.0, 274.0, 262.0]];

        let (cape, cin) = cape_cin(&profiles, &parcel, Pick::Bottom, Pick::Top).unwrap();
        assert!(cape[0] > 0.0);
        assert!(cin[0] < 0.0);
    }

    #[test]
    fn test_shape_checks() {
        let profiles = Profiles::new(
            vec![100_000.0, 90_000.0],
            vec![300.0, 292.0],
            vec![290.0, 285.0],
        )
        .unwrap();

        assert!(cape_cin(&profiles, &Array2::zeros((1, 3)), Pick::Bottom, Pick::Top).is_err());
        assert!(downdraft_cape(&profiles, Some(&Array2::from_elem((2, 2), true))).is_err());
    }

    #[test]
    fn test_dcape_is_positive_for_dry_mid_levels() {
        let profiles = Profiles::new(
            vec![
                100_000.0, 92_500.0, 85_000.0, 70_000.0, 60_000.0, 50_000.0, 40_000.0,
            ],
            vec![303.0, 297.0, 292.0, 282.0, 274.0, 265.0, 254.0],
            vec![293.0, 290.0, 285.0, 260.0, 250.0, 245.0, 235.0],
        )
        .unwrap();

        let dcape = downdraft_cape(&profiles, None).unwrap();
        assert!(dcape[0] > 100.0);
    }

    #[test]
    fn test_dcape_empty_window() {
        let profiles = Profiles::new(
            vec![100_000.0, 95_000.0, 90_000.0],
            vec![303.0, 299.0, 295.0],
            vec![293.0, 290.0, 288.0],
        )
        .unwrap();

        let dcape = downdraft_cape(&profiles, None).unwrap();
        assert!(approx_equal(dcape[0], 0.0, 1.0e-12));
    }
}
