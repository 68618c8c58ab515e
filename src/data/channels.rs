// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Channel names and lists.

use std::{collections::HashSet, io::BufRead, path::Path};

use regex::Regex;

use super::DataError;
use crate::io::open_text;

/// Replace `{IFO}` in a channel-name template with the interferometer
/// prefix (e.g. "L1").
pub fn fill_ifo(template: &str, ifo: &str) -> String {
    template.replace("{IFO}", ifo)
}

/// Append a trend statistic (e.g. "mean") to a channel name, unless the name
/// already carries one. The statistic "none" leaves names untouched.
pub fn with_trend(channel: &str, trend: Option<&str>) -> String {
    let name = channel.rsplit(':').next().unwrap_or(channel);
    match trend {
        Some(t) if !t.is_empty() && !t.eq_ignore_ascii_case("none") && !name.contains('.') => {
            format!("{channel}.{t}")
        }
        _ => channel.to_string(),
    }
}

/// Read a list of channels, one per line. Anything after a `#` is a comment
/// and blank lines are ignored. Only the first whitespace-separated word of a
/// line is used. Duplicates are removed; the first occurrence is kept.
pub fn read_channel_list(path: &Path) -> Result<Vec<String>, DataError> {
    let reader = open_text(path).map_err(|err| DataError::IO {
        file: path.to_path_buf(),
        err,
    })?;
    let mut seen = HashSet::new();
    let mut channels = vec![];
    for line in reader.lines() {
        let line = line.map_err(|err| DataError::IO {
            file: path.to_path_buf(),
            err,
        })?;
        let line = line.split('#').next().unwrap_or_default();
        if let Some(c) = line.split_whitespace().next() {
            if seen.insert(c.to_string()) {
                channels.push(c.to_string());
            }
        }
    }

    if channels.is_empty() {
        return Err(DataError::EmptyChannelList(path.to_path_buf()));
    }
    Ok(channels)
}

/// Include/exclude regular expressions for channel names. A channel is kept
/// if it matches any include pattern (or there are none) and no exclude
/// pattern.
#[derive(Debug, Clone, Default)]
pub struct ChannelFilter {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl ChannelFilter {
    pub fn new<S: AsRef<str>>(include: &[S], exclude: &[S]) -> Result<Self, regex::Error> {
        Ok(Self {
            include: include
                .iter()
                .map(|p| Regex::new(p.as_ref()))
                .collect::<Result<_, _>>()?,
            exclude: exclude
                .iter()
                .map(|p| Regex::new(p.as_ref()))
                .collect::<Result<_, _>>()?,
        })
    }

    pub fn is_match(&self, channel: &str) -> bool {
        (self.include.is_empty() || self.include.iter().any(|r| r.is_match(channel)))
            && !self.exclude.iter().any(|r| r.is_match(channel))
    }

    pub fn apply(&self, channels: Vec<String>) -> Vec<String> {
        channels.into_iter().filter(|c| self.is_match(c)).collect()
    }
}
