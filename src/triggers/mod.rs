// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Event triggers (e.g. from Omicron) for the main channel.
//!
//! Trigger files are plain text with whitespace- or comma-separated columns
//! `time frequency snr`. `#` starts a comment, and a first row that can't be
//! parsed as numbers is treated as a header.


use std::{
    io::BufRead,
    path::{Path, PathBuf},
};

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::io::{get_matches_from_globs, open_text, GlobError};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    /// GPS time of the peak \[seconds\].
    pub time: f64,

    /// Peak frequency \[Hz\].
    pub frequency: f64,

    pub snr: f64,
}

/// Read all triggers from files matching the glob patterns. The triggers are
/// returned sorted by time.
pub fn read_triggers<S: AsRef<str>>(globs: &[S]) -> Result<Vec<Trigger>, TriggerReadError> {
    let files = get_matches_from_globs(globs)?;
    let mut triggers = vec![];
    for file in files {
        let n_before = triggers.len();
        read_trigger_file(&file, &mut triggers)?;
        debug!(
            "Read {} triggers from {}",
            triggers.len() - n_before,
            file.display()
        );
    }
    triggers.sort_unstable_by(|a: &Trigger, b: &Trigger| a.time.total_cmp(&b.time));
    Ok(triggers)
}

fn read_trigger_file(file: &Path, triggers: &mut Vec<Trigger>) -> Result<(), TriggerReadError> {
    let reader = open_text(file).map_err(|err| TriggerReadError::IO {
        file: file.to_path_buf(),
        err,
    })?;
    let mut first_row = true;
    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(|err| TriggerReadError::IO {
            file: file.to_path_buf(),
            err,
        })?;
        let line = line.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }
        let cols: Vec<&str> = line
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|c| !c.is_empty())
            .collect();
        let parsed = (cols.len() >= 3)
            .then(|| {
                Some(Trigger {
                    time: cols[0].parse().ok()?,
                    frequency: cols[1].parse().ok()?,
                    snr: cols[2].parse().ok()?,
                })
            })
            .flatten();
        match parsed {
            Some(t) => triggers.push(t),
            None if first_row => trace!("Treating '{line}' in {} as a header", file.display()),
            None => {
                return Err(TriggerReadError::BadLine {
                    file: file.to_path_buf(),
                    line: i + 1,
                    text: line.to_string(),
                })
            }
        }
        first_row = false;
    }
    Ok(())
}

/// Keep only triggers that are at least as loud as `snr_threshold`, no
/// higher in frequency than `fmax`, and within `[start, end)`.
pub fn filter_triggers(
    triggers: &[Trigger],
    snr_threshold: f64,
    fmax: f64,
    start: f64,
    end: f64,
) -> Vec<Trigger> {
    triggers
        .iter()
        .filter(|t| t.snr >= snr_threshold && t.frequency <= fmax)
        .filter(|t| start <= t.time && t.time < end)
        .copied()
        .collect()
}

/// The `n` loudest triggers, such that no two are within `window` seconds of
/// each other. The result is sorted by descending SNR.
pub fn loudest_distinct(triggers: &[Trigger], n: usize, window: f64) -> Vec<Trigger> {
    let mut by_snr: Vec<&Trigger> = triggers.iter().collect();
    by_snr.sort_unstable_by(|a, b| b.snr.total_cmp(&a.snr));
    let mut chosen: Vec<Trigger> = Vec::with_capacity(n);
    for t in by_snr {
        if chosen.len() == n {
            break;
        }
        if chosen.iter().all(|c| (c.time - t.time).abs() >= window) {
            chosen.push(*t);
        }
    }
    chosen
}

#[derive(Error, Debug)]
pub enum TriggerReadError {
    #[error("{file}:{line}: Expected 'time frequency snr' columns, but got '{text}'")]
    BadLine {
        file: PathBuf,
        line: usize,
        text: String,
    },

    #[error(transparent)]
    Glob(#[from] GlobError),

    #[error("{file}: {err}")]
    IO { file: PathBuf, err: std::io::Error },
}
