// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Time segments. Only the handful of operations used by the scattering
//! search are provided.


use std::{
    io::{BufRead, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::io::open_text;

/// A half-open GPS interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
}

impl Segment {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn contains(&self, t: f64) -> bool {
        self.start <= t && t < self.end
    }
}

/// A list of segments. Most operations leave the list coalesced, i.e. sorted
/// with no overlapping or touching segments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentList(Vec<Segment>);

impl SegmentList {
    pub fn new() -> Self {
        Self(vec![])
    }

    /// Make a list from segments; the result is coalesced. Empty and inverted
    /// segments are dropped.
    pub fn from_segments<I: IntoIterator<Item = Segment>>(segments: I) -> Self {
        let mut list = Self(segments.into_iter().collect());
        list.coalesce();
        list
    }

    /// Turn a per-sample mask into segments. Sample `i` covers
    /// `[times[i], times[i] + dt)`.
    pub fn from_mask(times: &[f64], dt: f64, mask: &[bool]) -> Self {
        let mut segments = vec![];
        let mut current: Option<Segment> = None;
        for (&t, &m) in times.iter().zip(mask.iter()) {
            if m {
                match current.as_mut() {
                    Some(seg) => seg.end = t + dt,
                    None => current = Some(Segment::new(t, t + dt)),
                }
            } else if let Some(seg) = current.take() {
                segments.push(seg);
            }
        }
        segments.extend(current);
        Self::from_segments(segments)
    }

    pub fn iter(&self) -> std::slice::Iter<Segment> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sort and merge overlapping or touching segments.
    pub fn coalesce(&mut self) {
        self.0.retain(|s| s.end > s.start);
        self.0
            .sort_unstable_by(|a, b| a.start.total_cmp(&b.start).then(a.end.total_cmp(&b.end)));
        let mut merged: Vec<Segment> = Vec::with_capacity(self.0.len());
        for seg in self.0.drain(..) {
            match merged.last_mut() {
                Some(last) if seg.start <= last.end => last.end = last.end.max(seg.end),
                _ => merged.push(seg),
            }
        }
        self.0 = merged;
    }

    /// Widen every segment by `pad` seconds on both sides, then coalesce.
    pub fn protract(&mut self, pad: f64) {
        for seg in &mut self.0 {
            seg.start -= pad;
            seg.end += pad;
        }
        self.coalesce();
    }

    /// The times covered by both lists. Both lists must be coalesced.
    pub fn intersection(&self, other: &SegmentList) -> SegmentList {
        let mut out = vec![];
        let (mut i, mut j) = (0, 0);
        while i < self.0.len() && j < other.0.len() {
            let (a, b) = (self.0[i], other.0[j]);
            let start = a.start.max(b.start);
            let end = a.end.min(b.end);
            if start < end {
                out.push(Segment::new(start, end));
            }
            if a.end < b.end {
                i += 1;
            } else {
                j += 1;
            }
        }
        SegmentList(out)
    }

    /// The union of two lists.
    pub fn union(&self, other: &SegmentList) -> SegmentList {
        SegmentList::from_segments(self.0.iter().chain(other.0.iter()).copied())
    }

    /// Is `t` inside any segment? The list must be coalesced.
    pub fn contains(&self, t: f64) -> bool {
        // Index of the first segment starting after t.
        let i = self.0.partition_point(|s| s.start <= t);
        i > 0 && self.0[i - 1].contains(t)
    }

    /// The total duration of all segments \[seconds\].
    pub fn livetime(&self) -> f64 {
        self.0.iter().map(Segment::duration).sum()
    }

    /// Read a segment file. Lines have either two columns (`start end`) or
    /// four (`index start end duration`, as written by segwizard). `#` starts
    /// a comment.
    pub fn read(path: &Path) -> Result<SegmentList, SegmentsError> {
        let reader = open_text(path).map_err(|err| SegmentsError::IO {
            file: path.to_path_buf(),
            err,
        })?;
        let mut segments = vec![];
        for (i, line) in reader.lines().enumerate() {
            let line = line.map_err(|err| SegmentsError::IO {
                file: path.to_path_buf(),
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
            let (start, end) = match cols.as_slice() {
                [s, e] | [_, s, e, _] => (*s, *e),
                _ => {
                    return Err(SegmentsError::BadLine {
                        file: path.to_path_buf(),
                        line: i + 1,
                        text: line.to_string(),
                    })
                }
            };
            let parse = |s: &str| -> Result<f64, SegmentsError> {
                s.parse().map_err(|_| SegmentsError::BadLine {
                    file: path.to_path_buf(),
                    line: i + 1,
                    text: line.to_string(),
                })
            };
            segments.push(Segment::new(parse(start)?, parse(end)?));
        }
        Ok(SegmentList::from_segments(segments))
    }

    /// Write the segments as `start end` lines.
    pub fn write(&self, path: &Path) -> Result<(), SegmentsError> {
        let to_err = |err| SegmentsError::IO {
            file: path.to_path_buf(),
            err,
        };
        let mut f = std::io::BufWriter::new(std::fs::File::create(path).map_err(to_err)?);
        writeln!(f, "# start end").map_err(to_err)?;
        for seg in &self.0 {
            writeln!(f, "{} {}", seg.start, seg.end).map_err(to_err)?;
        }
        f.flush().map_err(to_err)?;
        Ok(())
    }
}

impl<'a> IntoIterator for &'a SegmentList {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[derive(Error, Debug)]
pub enum SegmentsError {
    #[error("{file}:{line}: Expected 'start end' or 'index start end duration', but got '{text}'")]
    BadLine {
        file: PathBuf,
        line: usize,
        text: String,
    },

    #[error("{file}: {err}")]
    IO { file: PathBuf, err: std::io::Error },
}
