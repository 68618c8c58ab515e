// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Retrieving channel data.
//!
//! Channel data are exposed through the [`DataSource`] trait. The only
//! implementation here is [`FileSource`], which reads one file per channel
//! from a directory. Many channels can be read at once on a pool of worker
//! threads with [`get_data`] and [`get_data_lossy`].

mod channels;
mod error;
mod read;
#[cfg(test)]
mod tests;

pub use channels::{fill_ifo, read_channel_list, with_trend, ChannelFilter};
pub use error::DataError;

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, trace, warn};
use ndarray::prelude::*;
use rayon::prelude::*;

use crate::PROGRESS_BARS;

/// A uniformly-sampled series of values for a single channel.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    pub channel: String,

    /// The GPS time of the first sample \[seconds\].
    pub t0: f64,

    /// \[Hz\]
    pub sample_rate: f64,

    pub data: Array1<f64>,
}

impl TimeSeries {
    pub fn new<S: Into<String>>(channel: S, t0: f64, sample_rate: f64, data: Array1<f64>) -> Self {
        Self {
            channel: channel.into(),
            t0,
            sample_rate,
            data,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The time between samples \[seconds\].
    pub fn dt(&self) -> f64 {
        self.sample_rate.recip()
    }

    pub fn start(&self) -> f64 {
        self.t0
    }

    /// The GPS time just after the last sample.
    pub fn end(&self) -> f64 {
        self.t0 + self.len() as f64 * self.dt()
    }

    /// The GPS time of every sample.
    pub fn times(&self) -> Array1<f64> {
        let dt = self.dt();
        Array1::from_iter((0..self.len()).map(|i| self.t0 + i as f64 * dt))
    }

    /// The index of the sample covering the GPS time `t`, if any.
    pub fn index_of(&self, t: f64) -> Option<usize> {
        if t < self.t0 {
            return None;
        }
        let i = ((t - self.t0) * self.sample_rate + 1e-9).floor() as usize;
        (i < self.len()).then_some(i)
    }

    /// Keep only the samples with times in `[start, end)`. `None` is returned
    /// if no samples are left.
    pub fn crop(&self, start: f64, end: f64) -> Option<TimeSeries> {
        // Index of the first sample at or after a time. The small offset
        // protects against float error in the times.
        let first_at_or_after = |t: f64| -> usize {
            let i = ((t - self.t0) * self.sample_rate - 1e-9).ceil();
            if i <= 0.0 {
                0
            } else {
                (i as usize).min(self.len())
            }
        };
        let i0 = first_at_or_after(start);
        let i1 = first_at_or_after(end);
        if i0 >= i1 {
            return None;
        }
        Some(TimeSeries {
            channel: self.channel.clone(),
            t0: self.t0 + i0 as f64 * self.dt(),
            sample_rate: self.sample_rate,
            data: self.data.slice(s![i0..i1]).to_owned(),
        })
    }

    /// The derivative of the data with respect to sample index, computed like
    /// numpy's `gradient`: central differences for interior samples and
    /// one-sided differences at the edges. Multiply by the sample rate to get
    /// a derivative with respect to time.
    pub fn gradient(&self) -> Array1<f64> {
        let n = self.len();
        let d = &self.data;
        match n {
            0 => Array1::zeros(0),
            1 => Array1::zeros(1),
            _ => {
                let mut g = Array1::zeros(n);
                g[0] = d[1] - d[0];
                g[n - 1] = d[n - 1] - d[n - 2];
                for i in 1..n - 1 {
                    g[i] = (d[i + 1] - d[i - 1]) / 2.0;
                }
                g
            }
        }
    }

    /// Are all of the samples the same value?
    pub fn is_flat(&self) -> bool {
        match self.data.first() {
            Some(first) => self.data.iter().all(|v| v == first),
            None => true,
        }
    }

    pub fn has_non_finite(&self) -> bool {
        self.data.iter().any(|v| !v.is_finite())
    }

    /// The number of bytes used by the samples.
    pub fn nbytes(&self) -> usize {
        self.len() * std::mem::size_of::<f64>()
    }
}

/// Something that can supply data for a channel over a GPS span.
pub trait DataSource: Sync {
    /// Get the data for `channel` with times in `[start, end)`.
    fn read(&self, channel: &str, start: f64, end: f64) -> Result<TimeSeries, DataError>;
}

/// Reads channel data from files in a directory. The channel
/// `L1:SUS-ETMX_M1_DAMP_L_IN1_DQ` is stored as
/// `L1-SUS-ETMX_M1_DAMP_L_IN1_DQ.txt` (or `.txt.gz`, or `.json`).
#[derive(Debug, Clone)]
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The files that may hold data for `channel`, in the order they're
    /// tried.
    pub fn candidates(&self, channel: &str) -> Vec<PathBuf> {
        let stem = channel.replace([':', '/'], "-");
        ["txt", "txt.gz", "json"]
            .into_iter()
            .map(|ext| self.root.join(format!("{stem}.{ext}")))
            .collect()
    }
}

impl DataSource for FileSource {
    fn read(&self, channel: &str, start: f64, end: f64) -> Result<TimeSeries, DataError> {
        let candidates = self.candidates(channel);
        let file = match candidates.iter().find(|p| p.is_file()) {
            Some(f) => f,
            None => {
                return Err(DataError::ChannelNotFound {
                    channel: channel.to_string(),
                    tried: candidates,
                })
            }
        };
        trace!("Reading '{channel}' from {}", file.display());

        let is_json = file.extension().and_then(|e| e.to_str()) == Some("json");
        let full = if is_json {
            read::read_json(channel, file)?
        } else {
            read::read_text(channel, file)?
        };

        let cropped = full.crop(start, end).ok_or_else(|| DataError::NoOverlap {
            channel: channel.to_string(),
            start,
            end,
            available_start: full.start(),
            available_end: full.end(),
        })?;
        if cropped.start() > start + cropped.dt() || cropped.end() < end - cropped.dt() {
            warn!(
                "Data for '{channel}' only partially cover GPS {start}-{end} (got {}-{})",
                cropped.start(),
                cropped.end()
            );
        }
        Ok(cropped)
    }
}

fn make_pool(nproc: usize) -> Result<rayon::ThreadPool, DataError> {
    Ok(rayon::ThreadPoolBuilder::new()
        .num_threads(nproc)
        .thread_name(|i| format!("get-data-{i}"))
        .build()?)
}

fn progress_bar(num_channels: usize) -> ProgressBar {
    ProgressBar::with_draw_target(
        Some(num_channels as _),
        if PROGRESS_BARS.load() {
            ProgressDrawTarget::stdout()
        } else {
            ProgressDrawTarget::hidden()
        },
    )
    .with_style(
        ProgressStyle::default_bar()
            .template("{msg:16}: [{wide_bar:.blue}] {pos:5}/{len:5} channels ({elapsed_precise}<{eta_precise})")
            .unwrap()
            .progress_chars("=> "),
    )
    .with_message("Reading data")
}

fn read_many<S: AsRef<str> + Sync>(
    source: &dyn DataSource,
    channels: &[S],
    start: f64,
    end: f64,
    nproc: usize,
) -> Result<Vec<(String, Result<TimeSeries, DataError>)>, DataError> {
    debug!(
        "Reading {} channels for GPS {start}-{end} with {nproc} threads",
        channels.len()
    );
    let pool = make_pool(nproc)?;
    let pb = progress_bar(channels.len());
    let results: Vec<_> = pool.install(|| {
        channels
            .par_iter()
            .progress_with(pb.clone())
            .map(|c| {
                let c = c.as_ref();
                (c.to_string(), source.read(c, start, end))
            })
            .collect()
    });
    pb.finish_and_clear();
    Ok(results)
}

/// Read many channels in parallel with `nproc` worker threads (0 means as
/// many threads as there are CPUs). The returned map keeps the order of
/// `channels`. Any failure to read a channel is an error.
pub fn get_data<S: AsRef<str> + Sync>(
    source: &dyn DataSource,
    channels: &[S],
    start: f64,
    end: f64,
    nproc: usize,
) -> Result<IndexMap<String, TimeSeries>, DataError> {
    read_many(source, channels, start, end, nproc)?
        .into_iter()
        .map(|(c, r)| r.map(|ts| (c, ts)))
        .collect()
}

/// The same as [`get_data`], but channels that can't be read are skipped;
/// their names and errors are returned separately.
pub fn get_data_lossy<S: AsRef<str> + Sync>(
    source: &dyn DataSource,
    channels: &[S],
    start: f64,
    end: f64,
    nproc: usize,
) -> Result<(IndexMap<String, TimeSeries>, Vec<(String, DataError)>), DataError> {
    let mut good = IndexMap::with_capacity(channels.len());
    let mut bad = vec![];
    for (c, r) in read_many(source, channels, start, end, nproc)? {
        match r {
            Ok(ts) => {
                good.insert(c, ts);
            }
            Err(e) => {
                debug!("Couldn't read '{c}': {e}");
                bad.push((c, e));
            }
        }
    }
    Ok((good, bad))
}
