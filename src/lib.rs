// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Detector characterisation tools for gravitational-wave observatories.

`gwdetchar` finds auxiliary channels correlated with a primary channel (Lasso
regression), searches for optical scattering by projecting fringe frequencies
from optic motion, and writes Omega-scan batch workflows for Condor.
 */

mod cli;
pub mod condor;
pub mod constants;
pub mod data;
mod io;
pub mod lasso;
pub mod math;
mod params;
pub mod plot;
pub mod report;
pub mod scattering;
pub mod segments;
pub mod triggers;

#[cfg(test)]
mod tests;

// Re-exports.
pub use cli::{Detchar, DetcharError};
pub use data::{DataSource, FileSource, TimeSeries};
pub use segments::{Segment, SegmentList};
pub use triggers::Trigger;

use crossbeam_utils::atomic::AtomicCell;

lazy_static::lazy_static! {
    /// Are progress bars being drawn? This should only ever be enabled by CLI
    /// code.
    static ref PROGRESS_BARS: AtomicCell<bool> = AtomicCell::new(false);
}
