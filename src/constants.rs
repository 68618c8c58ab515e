// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.

All physical quantities are double precision. Times are GPS seconds and
frequencies are in Hz unless stated otherwise.
 */

/// The wavelength of the main laser \[µm\]. Optic motion channels are
/// calibrated in µm, so fringe frequencies come out in Hz.
pub const LASER_WAVELENGTH_UM: f64 = 1.064;

/// The default primary channel for `lasso-correlation`. `{IFO}` is replaced
/// with the interferometer prefix.
pub const DEFAULT_LASSO_PRIMARY_CHANNEL: &str = "{IFO}:DMT-SNSW_EFFECTIVE_RANGE_MPC.mean";

/// The default trend statistic appended to auxiliary channel names.
pub const DEFAULT_TREND: &str = "mean";

/// Lasso coefficients with absolute values smaller than this are treated as
/// zero.
pub const DEFAULT_COEFFICIENT_THRESHOLD: f64 = 1e-4;

/// The minimum absolute Pearson correlation for two channels to be put in
/// the same cluster.
pub const DEFAULT_CLUSTER_COEFFICIENT: f64 = 0.85;

/// The maximum number of solver iterations for a Lasso fit.
pub const DEFAULT_LASSO_MAX_ITER: usize = 1000;

/// The relative duality gap at which a Lasso fit stops.
pub const DEFAULT_LASSO_TOL: f64 = 1e-4;

/// The number of folds used when cross-validating the Lasso regularisation
/// strength.
pub const DEFAULT_CV_FOLDS: usize = 5;

/// The number of regularisation strengths tried during cross validation.
pub const DEFAULT_NUM_ALPHAS: usize = 30;

/// The smallest regularisation strength tried during cross validation,
/// relative to the strength that zeroes every coefficient.
pub const CV_ALPHA_RATIO: f64 = 1e-3;

/// The maximum number of selected channels that get their own plots.
pub const DEFAULT_MAX_PLOTS: usize = 10;

/// The default main channel for `scattering`.
pub const DEFAULT_SCATTERING_MAIN_CHANNEL: &str = "{IFO}:GDS-CALIB_STRAIN";

/// Fringe frequencies (scaled by the threshold multiplier) at or above this
/// value \[Hz\] flag scattering.
pub const DEFAULT_FREQUENCY_THRESHOLD: f64 = 15.0;

/// The fringe harmonic used when comparing against the frequency threshold.
pub const DEFAULT_THRESHOLD_MULTIPLIER: f64 = 4.0;

/// The fringe harmonics that are projected and plotted.
pub const DEFAULT_MULTIPLIERS: [f64; 4] = [1.0, 2.0, 4.0, 8.0];

/// Scattering segments are padded by this many seconds on each side.
pub const DEFAULT_SEGMENT_PAD: f64 = 1.0;

/// Triggers quieter than this SNR are ignored.
pub const DEFAULT_SNR_THRESHOLD: f64 = 8.0;

/// Triggers above this frequency \[Hz\] are ignored.
pub const DEFAULT_TRIGGER_FMAX: f64 = 100.0;

/// Omega scans are only launched for triggers separated by at least this
/// many seconds.
pub const DEFAULT_OMEGA_WINDOW: f64 = 1.0;

/// The optics whose motion is projected into fringe frequencies.
pub const DEFAULT_OPTICS: [&str; 26] = [
    "MC1", "MC2", "MC3", "PRM", "PR2", "PR3", "BS", "SRM", "SR2", "SR3", "ITMX", "ITMY", "ETMX",
    "ETMY", "TMSX", "TMSY", "OMC", "OM1", "OM2", "OM3", "RM1", "RM2", "IM1", "IM2", "IM3", "IM4",
];

/// The degrees of freedom of each optic's top mass.
pub const DEFAULT_DOFS: [&str; 3] = ["L", "P", "Y"];

/// The executable run by each Omega-scan job.
pub const DEFAULT_OMEGA_EXECUTABLE: &str = "gwdetchar-omega";

/// The command used to submit DAGs to Condor.
pub const CONDOR_SUBMIT_DAG: &str = "condor_submit_dag";

/// The number of channels read by `profile-get-data`.
pub const DEFAULT_PROFILE_CHANNEL_COUNTS: [usize; 5] = [8192, 16384, 32768, 65536, 131072];

/// The data durations \[hours\] read by `profile-get-data`.
pub const DEFAULT_PROFILE_HOURS: [f64; 7] = [1.0, 5.0, 9.0, 13.0, 17.0, 21.0, 25.0];
