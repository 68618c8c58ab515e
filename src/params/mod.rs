// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Parameters for each of the `gwdetchar` pipelines.
//!
//! The code here is kind of "mirroring" the code within the `cli` module; the
//! idea is that `cli` is unparsed, user-facing code, whereas parameters have
//! been parsed and verified and are ready to be used directly. Running a set
//! of parameters does all of the work of a sub-command.

mod lasso;
mod omega_batch;
mod profile;
mod scattering;

pub(crate) use lasso::{LassoCorrelationError, LassoParams, LassoResults};
pub(crate) use omega_batch::{CondorParams, OmegaBatchError, OmegaBatchParams};
pub(crate) use profile::{ProfileError, ProfileParams, TIMING_HEADER};
pub(crate) use scattering::{
    OmegaScanParams, ScatteringParams, ScatteringSearchError, ScatteringSummary,
};

use std::{
    borrow::Cow,
    path::{Path, PathBuf},
};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::PROGRESS_BARS;

/// A channel name that is safe to use in a file name.
pub(crate) fn file_stem(channel: &str) -> String {
    channel.replace([':', '/', ' '], "-")
}

/// A CSV field, quoted if it contains a delimiter, a quote or a line break.
pub(crate) fn csv_field(s: &str) -> Cow<str> {
    if s.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", s.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(s)
    }
}

/// Where a figure goes in the `plots` directory of a report, and the path to
/// it relative to the report's `index.html`.
pub(crate) fn plot_paths(output_dir: &Path, name: &str) -> (PathBuf, PathBuf) {
    let relative = Path::new("plots").join(format!("{name}.png"));
    (output_dir.join(&relative), relative)
}

/// A progress bar for making `num_plots` figures.
pub(crate) fn plot_progress_bar(num_plots: usize) -> ProgressBar {
    ProgressBar::with_draw_target(
        Some(num_plots as _),
        if PROGRESS_BARS.load() {
            ProgressDrawTarget::stdout()
        } else {
            ProgressDrawTarget::hidden()
        },
    )
    .with_style(
        ProgressStyle::default_bar()
            .template("{msg:16}: [{wide_bar:.blue}] {pos:3}/{len:3} plots ({elapsed_precise}<{eta_precise})")
            .unwrap()
            .progress_chars("=> "),
    )
    .with_message("Plotting")
}
