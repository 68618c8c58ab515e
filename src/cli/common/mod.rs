// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Common arguments for command-line interfaces. e.g. the `lasso-correlation`
//! and `scattering` subcommands both read channel data over a GPS span, so the
//! same data arguments are shared between them.

mod printers;
#[cfg(test)]
mod tests;

pub(super) use printers::InfoPrinter;
pub(crate) use printers::{display_warnings, Warn};

use std::path::PathBuf;

use clap::Parser;
use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use crate::{
    condor::{parse_condor_command, CondorError, Universe, UNIVERSES},
    constants::DEFAULT_OMEGA_EXECUTABLE,
    data::FileSource,
    params::CondorParams,
};

lazy_static::lazy_static! {
    pub(super) static ref ARG_FILE_TYPES_COMMA_SEPARATED: String = ArgFileTypes::iter().join(", ");

    pub(super) static ref ARG_FILE_HELP: String =
        format!("All arguments may be specified in a file. Any CLI arguments override arguments set in the file. Supported formats: {}", *ARG_FILE_TYPES_COMMA_SEPARATED);

    static ref UNIVERSE_HELP: String =
        format!("The Condor universe to run jobs in. Supported universes: {}. Default: {}", *UNIVERSES, Universe::default());

    static ref EXECUTABLE_HELP: String =
        format!("The executable that runs each Omega scan. Default: {DEFAULT_OMEGA_EXECUTABLE}");
}

#[derive(Debug, Display, EnumIter, EnumString)]
pub(super) enum ArgFileTypes {
    #[strum(serialize = "toml")]
    Toml,
    #[strum(serialize = "json")]
    Json,
}

macro_rules! unpack_arg_file {
    ($arg_file:expr) => ({
        use std::{fs::File, io::Read, str::FromStr};

        use crate::cli::common::{ArgFileTypes, ARG_FILE_TYPES_COMMA_SEPARATED};

        debug!("Attempting to parse argument file {}", $arg_file.display());

        let mut contents = String::new();
        let arg_file_type = $arg_file
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .and_then(|e| ArgFileTypes::from_str(&e).ok());

        match arg_file_type {
            Some(ArgFileTypes::Toml) => {
                debug!("Parsing toml file...");
                let mut fh = File::open(&$arg_file)?;
                fh.read_to_string(&mut contents)?;
                match toml::from_str(&contents) {
                    Ok(p) => p,
                    Err(err) => {
                        return Err(DetcharError::ArgFile(format!(
                            "Couldn't decode toml structure from {:?}:\n{err}",
                            $arg_file
                        )))
                    }
                }
            }
            Some(ArgFileTypes::Json) => {
                debug!("Parsing json file...");
                let mut fh = File::open(&$arg_file)?;
                fh.read_to_string(&mut contents)?;
                match serde_json::from_str(&contents) {
                    Ok(p) => p,
                    Err(err) => {
                        return Err(DetcharError::ArgFile(format!(
                            "Couldn't decode json structure from {:?}:\n{err}",
                            $arg_file
                        )))
                    }
                }
            }

            _ => {
                return Err(DetcharError::ArgFile(format!(
                    "Argument file '{:?}' doesn't have a recognised file extension! Valid extensions are: {}", $arg_file, *ARG_FILE_TYPES_COMMA_SEPARATED)
                ))
            }
        }
    });
}

/// Check an interferometer prefix, e.g. "H1" or "L1".
pub(super) fn parse_ifo(ifo: Option<String>) -> Result<String, DataArgsError> {
    let ifo = ifo.ok_or(DataArgsError::NoIfo)?;
    let mut chars = ifo.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some(a), Some(b), None) if a.is_ascii_uppercase() && b.is_ascii_digit() => Ok(ifo),
        _ => Err(DataArgsError::BadIfo(ifo)),
    }
}

/// Where channel data come from, and the GPS span to read.
#[derive(Parser, Debug, Clone, Default, Serialize, Deserialize)]
pub(super) struct DataArgs {
    /// GPS start time of the analysis.
    #[clap(short = 's', long, help_heading = "DATA")]
    pub(super) gps_start: Option<f64>,

    /// GPS end time of the analysis.
    #[clap(short = 'e', long, help_heading = "DATA")]
    pub(super) gps_end: Option<f64>,

    /// The directory holding per-channel data files. A channel "H1:ABC-DEF" is
    /// read from "H1-ABC-DEF.txt", "H1-ABC-DEF.txt.gz" or "H1-ABC-DEF.json".
    #[clap(short = 'd', long, help_heading = "DATA")]
    pub(super) data_dir: Option<PathBuf>,

    /// The number of threads used to read data. Default: the number of CPUs.
    #[clap(short = 'j', long, help_heading = "DATA")]
    pub(super) nproc: Option<usize>,
}

/// Parsed [`DataArgs`].
#[derive(Debug, Clone)]
pub(super) struct DataSpan {
    pub(super) gps_start: f64,
    pub(super) gps_end: f64,
    pub(super) source: FileSource,
    pub(super) nproc: usize,
}

impl DataArgs {
    pub(super) fn merge(self, other: Self) -> Self {
        DataArgs {
            gps_start: self.gps_start.or(other.gps_start),
            gps_end: self.gps_end.or(other.gps_end),
            data_dir: self.data_dir.or(other.data_dir),
            nproc: self.nproc.or(other.nproc),
        }
    }

    pub(super) fn parse(self) -> Result<DataSpan, DataArgsError> {
        let Self {
            gps_start,
            gps_end,
            data_dir,
            nproc,
        } = self;

        let gps_start = gps_start.ok_or(DataArgsError::NoGpsStart)?;
        let gps_end = gps_end.ok_or(DataArgsError::NoGpsEnd)?;
        if !(gps_start.is_finite() && gps_end.is_finite()) || gps_end <= gps_start {
            return Err(DataArgsError::BadSpan {
                start: gps_start,
                end: gps_end,
            });
        }
        let data_dir = data_dir.ok_or(DataArgsError::NoDataDir)?;
        if !data_dir.is_dir() {
            return Err(DataArgsError::DataDirMissing(data_dir));
        }
        let nproc = match nproc {
            Some(0) | None => rayon::current_num_threads(),
            Some(n) => n,
        };
        debug!("Reading data from {} with {nproc} threads", data_dir.display());

        Ok(DataSpan {
            gps_start,
            gps_end,
            source: FileSource::new(data_dir),
            nproc,
        })
    }
}

/// How Omega scans are run on Condor.
#[derive(Parser, Debug, Clone, Default, Serialize, Deserialize)]
pub(super) struct CondorArgs {
    #[clap(long, help = EXECUTABLE_HELP.as_str(), help_heading = "CONDOR")]
    pub(super) executable: Option<String>,

    /// A configuration file given to every Omega scan.
    #[clap(long, help_heading = "CONDOR")]
    pub(super) config_file: Option<PathBuf>,

    #[clap(long, help = UNIVERSE_HELP.as_str(), help_heading = "CONDOR")]
    pub(super) universe: Option<String>,

    /// The accounting group tag of the jobs.
    #[clap(long, help_heading = "CONDOR")]
    pub(super) accounting_group: Option<String>,

    /// The user the jobs are accounted to.
    #[clap(long, help_heading = "CONDOR")]
    pub(super) accounting_group_user: Option<String>,

    /// Extra "key=value" lines for the Condor submit file. May be given many
    /// times.
    #[clap(long, multiple_occurrences(true), help_heading = "CONDOR")]
    pub(super) condor_command: Option<Vec<String>>,

    /// Extra arguments for the Omega-scan executable. May be given many
    /// times.
    #[clap(
        long,
        multiple_occurrences(true),
        allow_hyphen_values(true),
        help_heading = "CONDOR"
    )]
    pub(super) omega_arg: Option<Vec<String>>,

    /// How many times a failed scan is retried. Default: 1
    #[clap(long, help_heading = "CONDOR")]
    pub(super) retry: Option<u32>,

    /// Submit the workflow to Condor after writing it.
    #[clap(long, help_heading = "CONDOR")]
    #[serde(default)]
    pub(super) submit: bool,
}

impl CondorArgs {
    pub(super) fn merge(self, other: Self) -> Self {
        CondorArgs {
            executable: self.executable.or(other.executable),
            config_file: self.config_file.or(other.config_file),
            universe: self.universe.or(other.universe),
            accounting_group: self.accounting_group.or(other.accounting_group),
            accounting_group_user: self.accounting_group_user.or(other.accounting_group_user),
            condor_command: self.condor_command.or(other.condor_command),
            omega_arg: self.omega_arg.or(other.omega_arg),
            retry: self.retry.or(other.retry),
            submit: self.submit || other.submit,
        }
    }

    pub(super) fn parse(self) -> Result<CondorParams, CondorArgsError> {
        let Self {
            executable,
            config_file,
            universe,
            accounting_group,
            accounting_group_user,
            condor_command,
            omega_arg,
            retry,
            submit,
        } = self;

        let universe = match universe {
            Some(u) => u
                .to_lowercase()
                .parse()
                .map_err(|_| CondorArgsError::BadUniverse(u))?,
            None => Universe::default(),
        };
        if let Some(c) = config_file.as_ref() {
            if !c.is_file() {
                return Err(CondorArgsError::ConfigFileMissing(c.clone()));
            }
        }
        let condor_commands = condor_command
            .unwrap_or_default()
            .iter()
            .map(|c| parse_condor_command(c))
            .collect::<Result<Vec<_>, _>>()?;
        if accounting_group.is_none() && universe != Universe::Local {
            "No accounting group was given; Condor may refuse the jobs".warn();
        }

        Ok(CondorParams {
            executable: executable.unwrap_or_else(|| DEFAULT_OMEGA_EXECUTABLE.to_string()),
            config_file,
            universe,
            accounting_group,
            accounting_group_user,
            condor_commands,
            extra_args: omega_arg.unwrap_or_default(),
            retry: retry.unwrap_or(1),
            submit,
        })
    }
}

#[derive(thiserror::Error, Debug)]
pub(super) enum DataArgsError {
    #[error("No interferometer was given (e.g. --ifo L1)")]
    NoIfo,

    #[error("'{0}' isn't an interferometer prefix; expected something like 'H1' or 'L1'")]
    BadIfo(String),

    #[error("No GPS start time was given")]
    NoGpsStart,

    #[error("No GPS end time was given")]
    NoGpsEnd,

    #[error("The GPS end time ({end}) must be after the start time ({start})")]
    BadSpan { start: f64, end: f64 },

    #[error("No data directory was given")]
    NoDataDir,

    #[error("The data directory '{0}' doesn't exist")]
    DataDirMissing(PathBuf),
}

#[derive(thiserror::Error, Debug)]
pub(super) enum CondorArgsError {
    #[error("'{0}' isn't a Condor universe; supported universes: {}", *UNIVERSES)]
    BadUniverse(String),

    #[error("The Omega-scan configuration file '{0}' doesn't exist")]
    ConfigFileMissing(PathBuf),

    #[error(transparent)]
    Condor(#[from] CondorError),
}
