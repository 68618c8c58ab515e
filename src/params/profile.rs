// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{
    fs::OpenOptions,
    io::Write,
    path::PathBuf,
    time::{Duration, Instant},
};

use log::{debug, info};

use crate::data::{get_data, DataError, DataSource, FileSource};

/// The header of a new timing file.
pub(crate) const TIMING_HEADER: &str = "# n-chan/read, data len(hr), nproc, nbytes, read time";

pub(crate) struct ProfileParams {
    pub(crate) source: FileSource,
    pub(crate) channels: Vec<String>,
    pub(crate) out: PathBuf,
    pub(crate) gps_start: f64,

    /// Reads never go past this time.
    pub(crate) gps_end: f64,
    pub(crate) chan_counts: Vec<usize>,
    pub(crate) hours: Vec<f64>,
    pub(crate) nproc: usize,
}

/// One timed read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Timing {
    pub(crate) num_channels: usize,
    pub(crate) hours: f64,
    pub(crate) nproc: usize,
    pub(crate) nbytes: usize,
    pub(crate) elapsed: Duration,
}

impl std::fmt::Display for Timing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}, {:.1}, {}, {}, {:.3}",
            self.num_channels,
            self.hours,
            self.nproc,
            self.nbytes,
            self.elapsed.as_secs_f64()
        )
    }
}

fn time_get(
    source: &dyn DataSource,
    channels: &[String],
    start: f64,
    end: f64,
    nproc: usize,
) -> Result<Timing, DataError> {
    let now = Instant::now();
    let data = get_data(source, channels, start, end, nproc)?;
    let elapsed = now.elapsed();
    Ok(Timing {
        num_channels: channels.len(),
        hours: (end - start) / 3600.0,
        nproc,
        nbytes: data.values().map(|ts| ts.nbytes()).sum(),
        elapsed,
    })
}

impl ProfileParams {
    pub(crate) fn run(&self) -> Result<Vec<Timing>, ProfileError> {
        let io_err = |err| ProfileError::IO {
            file: self.out.clone(),
            err,
        };
        let is_new = !self.out.exists();
        let mut out = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.out)
            .map_err(io_err)?;
        if is_new {
            writeln!(out, "{TIMING_HEADER}").map_err(io_err)?;
        }
        info!("{TIMING_HEADER}");

        let mut timings = vec![];
        let mut record = |t: Timing| -> Result<(), ProfileError> {
            writeln!(out, "{t}").map_err(io_err)?;
            out.flush().map_err(io_err)?;
            info!("{t}");
            timings.push(t);
            Ok(())
        };

        // Once to prime any buffers.
        let first = &self.channels[..self.channels.len().min(1)];
        record(time_get(
            &self.source,
            first,
            self.gps_start,
            self.gps_end,
            1,
        )?)?;

        for &n in &self.chan_counts {
            if n > self.channels.len() {
                debug!(
                    "Skipping {n} channels; only {} are available",
                    self.channels.len()
                );
                continue;
            }
            for &hours in &self.hours {
                let end = (self.gps_start + hours * 3600.0).min(self.gps_end);
                record(time_get(
                    &self.source,
                    &self.channels[..n],
                    self.gps_start,
                    end,
                    self.nproc,
                )?)?;
            }
        }

        Ok(timings)
    }
}

#[derive(thiserror::Error, Debug)]
pub(crate) enum ProfileError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error("{file}: {err}")]
    IO { file: PathBuf, err: std::io::Error },
}
