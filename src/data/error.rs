// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use thiserror::Error;

/// Errors associated with reading channel data.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Couldn't find data for channel '{channel}'; tried: {}", tried.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", "))]
    ChannelNotFound {
        channel: String,
        tried: Vec<PathBuf>,
    },

    #[error("{file}:{line}: Couldn't parse '{text}' as a number")]
    ParseFloat {
        file: PathBuf,
        line: usize,
        text: String,
    },

    #[error("{file}:{line}: Expected two columns (GPS time and value), but got '{text}'")]
    BadColumns {
        file: PathBuf,
        line: usize,
        text: String,
    },

    #[error("{file}: A 'sample_rate' header was given, but there's no 't0' header")]
    MissingT0 { file: PathBuf },

    #[error("{file}: The sample rate must be positive, but got {sample_rate}")]
    BadSampleRate { file: PathBuf, sample_rate: f64 },

    #[error("{file}: Need at least two samples to work out the sample rate from the timestamps")]
    TooFewSamples { file: PathBuf },

    #[error("{file}:{line}: Samples aren't uniformly spaced (expected a spacing of {expected}s, got {got}s)")]
    NonUniformSampling {
        file: PathBuf,
        line: usize,
        expected: f64,
        got: f64,
    },

    #[error("Data for channel '{channel}' span GPS {available_start}-{available_end}, which doesn't overlap the requested GPS {start}-{end}")]
    NoOverlap {
        channel: String,
        start: f64,
        end: f64,
        available_start: f64,
        available_end: f64,
    },

    #[error("The channel list '{0}' has no channels")]
    EmptyChannelList(PathBuf),

    #[error("Couldn't make a pool of worker threads: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("{file}: {err}")]
    Json {
        file: PathBuf,
        err: serde_json::Error,
    },

    #[error("{file}: {err}")]
    IO { file: PathBuf, err: std::io::Error },
}
