// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Parsers for per-channel data files.
//!
//! Text files have one of two layouts. With a `# sample_rate = <Hz>` header
//! (and a `# t0 = <GPS>` header), every other non-comment line holds a single
//! value. Without it, every line holds a GPS time and a value, and the
//! timestamps must be uniformly spaced. JSON files hold an object with `t0`,
//! `sample_rate` and `data` keys.

use std::{io::BufRead, path::Path};

use log::trace;
use ndarray::Array1;
use serde::Deserialize;

use super::{DataError, TimeSeries};
use crate::io::open_text;

/// The relative tolerance on timestamp spacing in two-column files.
const SPACING_TOLERANCE: f64 = 1e-6;

#[derive(Deserialize)]
struct JsonChannel {
    #[serde(default)]
    channel: Option<String>,
    t0: f64,
    sample_rate: f64,
    data: Vec<f64>,
}

pub(super) fn read_json(channel: &str, file: &Path) -> Result<TimeSeries, DataError> {
    trace!("Reading {} as json", file.display());
    let reader = open_text(file).map_err(|err| DataError::IO {
        file: file.to_path_buf(),
        err,
    })?;
    let j: JsonChannel = serde_json::from_reader(reader).map_err(|err| DataError::Json {
        file: file.to_path_buf(),
        err,
    })?;
    if j.sample_rate <= 0.0 || !j.sample_rate.is_finite() {
        return Err(DataError::BadSampleRate {
            file: file.to_path_buf(),
            sample_rate: j.sample_rate,
        });
    }
    Ok(TimeSeries::new(
        j.channel.unwrap_or_else(|| channel.to_string()),
        j.t0,
        j.sample_rate,
        Array1::from(j.data),
    ))
}

pub(super) fn read_text(channel: &str, file: &Path) -> Result<TimeSeries, DataError> {
    trace!("Reading {} as text", file.display());
    let reader = open_text(file).map_err(|err| DataError::IO {
        file: file.to_path_buf(),
        err,
    })?;
    parse_text(channel, file, reader)
}

fn parse_float(s: &str, file: &Path, line: usize) -> Result<f64, DataError> {
    s.parse().map_err(|_| DataError::ParseFloat {
        file: file.to_path_buf(),
        line,
        text: s.to_string(),
    })
}

pub(super) fn parse_text<R: BufRead>(
    channel: &str,
    file: &Path,
    reader: R,
) -> Result<TimeSeries, DataError> {
    let mut t0 = None;
    let mut sample_rate = None;
    // (line number, contents) of every data line.
    let mut rows = vec![];

    for (i, line) in reader.lines().enumerate() {
        let line_num = i + 1;
        let line = line.map_err(|err| DataError::IO {
            file: file.to_path_buf(),
            err,
        })?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(comment) = line.strip_prefix('#') {
            if let Some((key, value)) = comment.split_once('=') {
                match key.trim() {
                    "t0" => t0 = Some(parse_float(value.trim(), file, line_num)?),
                    "sample_rate" => {
                        sample_rate = Some(parse_float(value.trim(), file, line_num)?)
                    }
                    _ => (),
                }
            }
            continue;
        }
        rows.push((line_num, line.to_string()));
    }

    match sample_rate {
        Some(sample_rate) => {
            if sample_rate <= 0.0 || !sample_rate.is_finite() {
                return Err(DataError::BadSampleRate {
                    file: file.to_path_buf(),
                    sample_rate,
                });
            }
            let t0 = t0.ok_or_else(|| DataError::MissingT0 {
                file: file.to_path_buf(),
            })?;
            let data = rows
                .iter()
                .map(|(line_num, row)| {
                    let value = row.split_whitespace().next().unwrap_or(row);
                    parse_float(value, file, *line_num)
                })
                .collect::<Result<Vec<f64>, _>>()?;
            Ok(TimeSeries::new(channel, t0, sample_rate, Array1::from(data)))
        }

        None => {
            let mut times = Vec::with_capacity(rows.len());
            let mut data = Vec::with_capacity(rows.len());
            for (line_num, row) in &rows {
                let mut cols = row.split(|c: char| c.is_whitespace() || c == ',');
                let cols = (
                    cols.next(),
                    cols.find(|c| !c.is_empty()),
                    cols.find(|c| !c.is_empty()),
                );
                match cols {
                    (Some(t), Some(v), None) => {
                        times.push(parse_float(t, file, *line_num)?);
                        data.push(parse_float(v, file, *line_num)?);
                    }
                    _ => {
                        return Err(DataError::BadColumns {
                            file: file.to_path_buf(),
                            line: *line_num,
                            text: row.clone(),
                        })
                    }
                }
            }

            if times.len() < 2 {
                return Err(DataError::TooFewSamples {
                    file: file.to_path_buf(),
                });
            }
            let dt = times[1] - times[0];
            if dt <= 0.0 {
                return Err(DataError::NonUniformSampling {
                    file: file.to_path_buf(),
                    line: rows[1].0,
                    expected: dt.abs(),
                    got: dt,
                });
            }
            for (i, pair) in times.windows(2).enumerate() {
                let got = pair[1] - pair[0];
                if (got - dt).abs() > SPACING_TOLERANCE * dt {
                    return Err(DataError::NonUniformSampling {
                        file: file.to_path_buf(),
                        line: rows[i + 1].0,
                        expected: dt,
                        got,
                    });
                }
            }
            // Use the whole span to work out the rate; this is more precise
            // than a single difference.
            let sample_rate = (times.len() - 1) as f64 / (times[times.len() - 1] - times[0]);

            Ok(TimeSeries::new(
                channel,
                times[0],
                sample_rate,
                Array1::from(data),
            ))
        }
    }
}
