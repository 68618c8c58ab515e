// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Omega scans of many GPS times as a Condor DAG.
//!
//! Everything for a batch lives under one output directory:
//!
//! ```text
//! <output_dir>/
//!     <gps>/              one Omega scan output directory per time
//!     condor/
//!         omega.sub
//!         omega.dag
//!         logs/
//! ```

#[cfg(test)]
mod tests;

use std::{
    io::{BufRead, Write},
    path::{Path, PathBuf},
    process::Command,
};

use itertools::Itertools;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};
use thiserror::Error;
use vec1::Vec1;

use crate::{constants::CONDOR_SUBMIT_DAG, io::open_text};

lazy_static::lazy_static! {
    pub(crate) static ref UNIVERSES: String = {
        use strum::IntoEnumIterator;
        Universe::iter().join(", ")
    };
}

/// The Condor universe to run jobs in.
#[derive(
    Debug, Display, EnumIter, EnumString, Clone, Copy, PartialEq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Universe {
    /// Jobs run on the cluster's execute nodes.
    #[default]
    #[strum(serialize = "vanilla")]
    Vanilla,

    /// Jobs run on the submit machine.
    #[strum(serialize = "local")]
    Local,
}

/// A batch of Omega scans.
#[derive(Debug, Clone)]
pub struct OmegaBatch {
    /// The times to scan. Repeated times are only scanned once.
    pub gps_times: Vec1<f64>,

    pub ifo: String,
    pub output_dir: PathBuf,
    pub executable: String,
    pub config_file: Option<PathBuf>,
    pub universe: Universe,
    pub accounting_group: Option<String>,
    pub accounting_group_user: Option<String>,

    /// Extra `key = value` lines for the submit file.
    pub condor_commands: Vec<(String, String)>,

    /// Extra arguments given to the executable before the GPS time.
    pub extra_args: Vec<String>,

    /// How many times DAGMan may retry a failed scan.
    pub retry: u32,
}

/// The DAG node name for a GPS time.
pub fn job_name(gps: f64) -> String {
    format!("omega_{}", format_gps(gps).replace('.', "_"))
}

fn format_gps(gps: f64) -> String {
    format!("{gps}")
}

impl OmegaBatch {
    pub fn condor_dir(&self) -> PathBuf {
        self.output_dir.join("condor")
    }

    pub fn submit_file(&self) -> PathBuf {
        self.condor_dir().join("omega.sub")
    }

    pub fn dag_file(&self) -> PathBuf {
        self.condor_dir().join("omega.dag")
    }

    /// The GPS times to scan, in the order given and without repeats.
    pub fn unique_times(&self) -> Vec<f64> {
        self.gps_times
            .iter()
            .copied()
            .unique_by(|&t| format_gps(t))
            .collect()
    }

    /// Write the submit description, DAG and directories. Returns the path to
    /// the DAG.
    pub fn write(&self) -> Result<PathBuf, CondorError> {
        let logs = self.condor_dir().join("logs");
        crate::io::prepare_output_dir(&logs).map_err(|err| CondorError::IO {
            file: logs.clone(),
            err,
        })?;
        let submit = self.submit_file();
        self.write_submit_file(&submit)?;
        let dag = self.dag_file();
        self.write_dag(&dag, &submit)?;
        info!(
            "Wrote a DAG for {} Omega scans to {}",
            self.unique_times().len(),
            dag.display()
        );
        Ok(dag)
    }

    /// The contents of the Condor submit description.
    pub fn submit_description(&self) -> String {
        let logs = self.condor_dir().join("logs");
        let mut arguments = vec![
            "--ifo".to_string(),
            self.ifo.clone(),
            "--output-directory".to_string(),
            "$(outdir)".to_string(),
        ];
        if let Some(config) = &self.config_file {
            arguments.push("--config-file".to_string());
            arguments.push(config.display().to_string());
        }
        arguments.extend(self.extra_args.iter().cloned());
        arguments.push("$(gpstime)".to_string());

        let mut lines = vec![
            format!("universe = {}", self.universe),
            format!("executable = {}", self.executable),
            format!(
                "arguments = \"{}\"",
                arguments.iter().map(|a| quote_argument(a)).join(" ")
            ),
            "getenv = True".to_string(),
            format!("log = {}", logs.join("omega-$(cluster).log").display()),
            format!(
                "output = {}",
                logs.join("omega-$(cluster)-$(process).out").display()
            ),
            format!(
                "error = {}",
                logs.join("omega-$(cluster)-$(process).err").display()
            ),
        ];
        if let Some(group) = &self.accounting_group {
            lines.push(format!("accounting_group = {group}"));
        }
        if let Some(user) = &self.accounting_group_user {
            lines.push(format!("accounting_group_user = {user}"));
        }
        for (key, value) in &self.condor_commands {
            lines.push(format!("{key} = {value}"));
        }
        lines.push("queue 1".to_string());
        let mut s = lines.join("\n");
        s.push('\n');
        s
    }

    pub fn write_submit_file(&self, path: &Path) -> Result<(), CondorError> {
        debug!("Writing Condor submit file {}", path.display());
        std::fs::write(path, self.submit_description()).map_err(|err| CondorError::IO {
            file: path.to_path_buf(),
            err,
        })
    }

    /// Write a DAG with one node per unique GPS time, all using the submit
    /// description at `submit`.
    pub fn write_dag(&self, path: &Path, submit: &Path) -> Result<(), CondorError> {
        debug!("Writing DAG {}", path.display());
        let to_err = |err| CondorError::IO {
            file: path.to_path_buf(),
            err,
        };
        let mut f = std::io::BufWriter::new(std::fs::File::create(path).map_err(to_err)?);
        for gps in self.unique_times() {
            let name = job_name(gps);
            let gps = format_gps(gps);
            let outdir = self.output_dir.join(&gps);
            writeln!(f, "JOB {name} {}", submit.display()).map_err(to_err)?;
            writeln!(
                f,
                "VARS {name} gpstime=\"{gps}\" outdir=\"{}\"",
                outdir.display()
            )
            .map_err(to_err)?;
            writeln!(f, "RETRY {name} {}", self.retry).map_err(to_err)?;
        }
        f.flush().map_err(to_err)?;
        Ok(())
    }
}

/// Quote one argument for the double-quoted `arguments` syntax of a submit
/// description. Double quotes are doubled. Arguments with white space or
/// single quotes are wrapped in single quotes, with single quotes doubled.
pub fn quote_argument(arg: &str) -> String {
    let arg = arg.replace('"', "\"\"");
    if arg.is_empty() || arg.contains(|c: char| c.is_whitespace() || c == '\'') {
        format!("'{}'", arg.replace('\'', "''"))
    } else {
        arg
    }
}

/// Hand a DAG to `condor_submit_dag`. The command's standard output is
/// returned.
pub fn submit_dag(dag: &Path) -> Result<String, CondorError> {
    submit_dag_with(CONDOR_SUBMIT_DAG, dag)
}

fn submit_dag_with(program: &str, dag: &Path) -> Result<String, CondorError> {
    info!("Submitting {}", dag.display());
    let output = Command::new(program)
        .arg(dag)
        .output()
        .map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                CondorError::SubmitNotFound(program.to_string())
            } else {
                CondorError::IO {
                    file: PathBuf::from(program),
                    err,
                }
            }
        })?;
    if !output.status.success() {
        return Err(CondorError::SubmitFailed {
            dag: dag.to_path_buf(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Read GPS times from a file. The first column of each line is used; `#`
/// starts a comment.
pub fn read_gps_file(path: &Path) -> Result<Vec<f64>, CondorError> {
    let to_err = |err| CondorError::IO {
        file: path.to_path_buf(),
        err,
    };
    let mut times = vec![];
    for (i, line) in open_text(path).map_err(to_err)?.lines().enumerate() {
        let line = line.map_err(to_err)?;
        let first = match line.split('#').next().and_then(|l| l.split_whitespace().next()) {
            Some(first) => first,
            None => continue,
        };
        let gps: f64 = first.parse().map_err(|_| CondorError::BadGpsTime {
            file: path.to_path_buf(),
            line: i + 1,
            text: first.to_string(),
        })?;
        times.push(gps);
    }
    Ok(times)
}

/// Parse a `key=value` submit command.
pub fn parse_condor_command(s: &str) -> Result<(String, String), CondorError> {
    match s.split_once('=') {
        Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.trim().to_string())),
        _ => Err(CondorError::BadCondorCommand(s.to_string())),
    }
}

/// Collect GPS times into the non-empty list needed for a batch.
pub fn gps_times(times: Vec<f64>) -> Result<Vec1<f64>, CondorError> {
    Vec1::try_from_vec(times).map_err(|_| CondorError::NoGpsTimes)
}

#[derive(Error, Debug)]
pub enum CondorError {
    #[error("No GPS times were given")]
    NoGpsTimes,

    #[error("{file}:{line}: Couldn't parse '{text}' as a GPS time")]
    BadGpsTime {
        file: PathBuf,
        line: usize,
        text: String,
    },

    #[error("Condor commands must look like 'key=value'; got '{0}'")]
    BadCondorCommand(String),

    #[error("Couldn't find '{0}'; is Condor installed?")]
    SubmitNotFound(String),

    #[error("Submitting {dag} failed ({status}): {stderr}")]
    SubmitFailed {
        dag: PathBuf,
        status: String,
        stderr: String,
    },

    #[error("{file}: {err}")]
    IO { file: PathBuf, err: std::io::Error },
}
