#![warn(missing_docs)]
//! Convective indexes for whole batches of atmospheric soundings at once.
//!
//! A batch is stored as `(N, Z)` matrices: `N` independent soundings with `Z` levels each, the
//! surface first and pressure strictly decreasing along every row. Shorter soundings are padded
//! at the top with `NaN`. Pressure is in Pa, temperature and dew point in K, energies in J/kg.
//!
//! Every algorithm runs over the whole batch with masks instead of branching per sounding, so a
//! sounding where a level does not exist gets `NaN` (or zero energy) and never stops the others
//! from being analyzed. Only problems with the whole call, like mismatched shapes or options
//! that are not supported, are returned as an [`AnalysisError`].
//!
//! ```rust
//! use sounding_convection::{surface_based_cape_cin, Profiles};
//!
//! let profiles = Profiles::new(
//!     vec![100_000.0, 90_000.0, 80_000.0, 70_000.0, 60_000.0, 50_000.0],
//!     vec![300.0, 293.0, 287.0, 281.0, 274.0, 266.0],
//!     vec![295.0, 288.0, 280.0, 270.0, 260.0, 250.0],
//! )
//! .unwrap();
//!
//! let (cape, cin) = surface_based_cape_cin(&profiles);
//! assert!(cape[0] >= 0.0);
//! assert!(cin[0] <= 0.0);
//! ```

//
// API
//
pub use crate::{
    error::{AnalysisError, Result},
    indexes::{
        cape_cin, downdraft_cape, mixed_layer_cape_cin, most_unstable_cape_cin,
        surface_based_cape_cin, DCAPE_WINDOW_BOTTOM, DCAPE_WINDOW_TOP,
    },
    intersection::{
        find_intersections, find_zero_crossings, Direction, Intersections, Level, Pick,
        ZeroCrossings,
    },
    levels::{ccl, el, el_lfc, lcl, lfc, Ccl, CclOptions},
    parcel::{
        mixed_layer, most_unstable_parcel, most_unstable_parcel_index, parcel_mixing_ratio,
        MixedLayer, MixedLayerOptions, MostUnstableOptions, MostUnstableParcel,
    },
    parcel_profile::{parcel_profile, ParcelAscent},
    profile::{IntoProfileArray, Profiles},
};

pub mod met_formulas;

/// Utility functions for comparing values with a tolerance.
pub mod utility;

//
// Internal use only
//
mod error;
mod indexes;
mod integrate;
mod interpolation;
mod intersection;
mod levels;
mod parcel;
mod parcel_profile;
mod profile;
