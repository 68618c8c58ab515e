// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Figures for the reports.
//!
//! Plotting is an optional feature ("plotting", on by default). Without it,
//! every function here returns `Ok(None)` and reports are written without
//! figures. Times on the x axes are relative to the GPS time given.

mod error;
#[cfg(feature = "plotting")]
mod plotting;

pub use error::PlotError;

use std::path::{Path, PathBuf};

use log::warn;
use ndarray::ArrayView1;

use crate::{segments::SegmentList, triggers::Trigger};

/// Is this build able to make figures?
pub fn enabled() -> bool {
    cfg!(feature = "plotting")
}

/// A uniformly-sampled line to draw.
#[derive(Debug, Clone, Copy)]
pub struct Line<'a> {
    pub label: &'a str,

    /// GPS time of the first sample \[seconds\].
    pub t0: f64,
    pub sample_rate: f64,
    pub data: ArrayView1<'a, f64>,
}

/// Plot one or more lines against time. Lines after the first are drawn on
/// top of it. The file written is returned.
#[cfg_attr(not(feature = "plotting"), allow(unused_variables))]
pub fn lines(
    path: &Path,
    title: &str,
    y_label: &str,
    epoch: f64,
    lines: &[Line],
) -> Result<Option<PathBuf>, PlotError> {
    if lines.is_empty() {
        return Err(PlotError::NoData);
    }
    #[cfg(feature = "plotting")]
    {
        plotting::lines(path, title, y_label, epoch, lines)?;
        Ok(Some(path.to_path_buf()))
    }
    #[cfg(not(feature = "plotting"))]
    Ok(None)
}

/// Plot the correlation of a model with its target as channels are added.
#[cfg_attr(not(feature = "plotting"), allow(unused_variables))]
pub fn cumulative(
    path: &Path,
    title: &str,
    correlations: &[f64],
) -> Result<Option<PathBuf>, PlotError> {
    if correlations.is_empty() {
        return Err(PlotError::NoData);
    }
    #[cfg(feature = "plotting")]
    {
        plotting::cumulative(path, title, correlations)?;
        Ok(Some(path.to_path_buf()))
    }
    #[cfg(not(feature = "plotting"))]
    Ok(None)
}

/// Plot fringe-frequency harmonics, with triggers drawn on top and
/// scattering segments shaded.
#[cfg_attr(not(feature = "plotting"), allow(unused_variables))]
pub fn fringes(
    path: &Path,
    title: &str,
    epoch: f64,
    harmonics: &[Line],
    triggers: &[Trigger],
    segments: &SegmentList,
    fmax: f64,
) -> Result<Option<PathBuf>, PlotError> {
    if harmonics.is_empty() {
        return Err(PlotError::NoData);
    }
    #[cfg(feature = "plotting")]
    {
        plotting::fringes(path, title, epoch, harmonics, triggers, segments, fmax)?;
        Ok(Some(path.to_path_buf()))
    }
    #[cfg(not(feature = "plotting"))]
    Ok(None)
}

/// Turn a failed plot into a warning; the figure is then left out of the
/// report.
pub fn or_warn(result: Result<Option<PathBuf>, PlotError>, what: &str) -> Option<PathBuf> {
    match result {
        Ok(p) => p,
        Err(e) => {
            warn!("Couldn't plot {what}: {e}");
            None
        }
    }
}
