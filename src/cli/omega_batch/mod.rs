// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.


use std::path::PathBuf;

use clap::Parser;
use log::{debug, info, trace};
use serde::{Deserialize, Serialize};

use super::common::{parse_ifo, CondorArgs, InfoPrinter, ARG_FILE_HELP};
use crate::{
    cli::common::display_warnings,
    condor::{gps_times, read_gps_file},
    params::OmegaBatchParams,
    DetcharError,
};

#[derive(Parser, Debug, Clone, Default, Serialize, Deserialize)]
pub(super) struct OmegaBatchArgs {
    // GPS times take the positional slot, so the argument file is a flag here.
    #[clap(long, help = ARG_FILE_HELP.as_str(), parse(from_os_str))]
    pub(super) args_file: Option<PathBuf>,

    /// The GPS times to scan.
    #[clap(name = "GPS_TIMES", multiple_values(true))]
    #[serde(default)]
    pub(super) gps_times: Vec<f64>,

    /// A file of GPS times to scan, one per line. These are scanned as well as
    /// any times given on the command line.
    #[clap(short = 'f', long)]
    pub(super) gps_file: Option<PathBuf>,

    /// The interferometer prefix, e.g. "L1".
    #[clap(short, long)]
    pub(super) ifo: Option<String>,

    /// The directory that scans are written into. Default: the current
    /// directory.
    #[clap(short, long)]
    pub(super) output_dir: Option<PathBuf>,

    #[clap(flatten)]
    #[serde(rename = "condor")]
    #[serde(default)]
    pub(super) condor_args: CondorArgs,
}

impl OmegaBatchArgs {
    pub(super) fn merge(self) -> Result<OmegaBatchArgs, DetcharError> {
        debug!("Merging command-line arguments with the argument file");

        let cli_args = self;

        if let Some(arg_file) = cli_args.args_file {
            let OmegaBatchArgs {
                args_file: _,
                gps_times,
                gps_file,
                ifo,
                output_dir,
                condor_args,
            } = unpack_arg_file!(arg_file);

            Ok(OmegaBatchArgs {
                args_file: None,
                gps_times: if cli_args.gps_times.is_empty() {
                    gps_times
                } else {
                    cli_args.gps_times
                },
                gps_file: cli_args.gps_file.or(gps_file),
                ifo: cli_args.ifo.or(ifo),
                output_dir: cli_args.output_dir.or(output_dir),
                condor_args: cli_args.condor_args.merge(condor_args),
            })
        } else {
            Ok(cli_args)
        }
    }

    pub(super) fn parse(self) -> Result<OmegaBatchParams, DetcharError> {
        debug!("{:#?}", self);

        let Self {
            args_file: _,
            gps_times: mut times,
            gps_file,
            ifo,
            output_dir,
            condor_args,
        } = self;

        let ifo = parse_ifo(ifo)?;
        if let Some(f) = gps_file.as_ref() {
            let from_file = read_gps_file(f)?;
            debug!("Read {} GPS times from {}", from_file.len(), f.display());
            times.extend(from_file);
        }
        if let Some(&t) = times.iter().find(|t| !(t.is_finite() && **t > 0.0)) {
            return Err(OmegaBatchArgsError::BadGpsTime(t).into());
        }
        let gps_times = gps_times(times)?;
        let condor = condor_args.parse()?;
        let output_dir = output_dir.unwrap_or_else(|| PathBuf::from("."));

        let mut printer = InfoPrinter::new("Omega-scan batch".into());
        printer.push_line(format!("Interferometer: {ifo}").into());
        printer.push_block(vec![
            format!("{} GPS times", gps_times.len()).into(),
            format!("first: {}", gps_times.first()).into(),
        ]);
        printer.push_block(vec![
            format!("Executable: {}", condor.executable).into(),
            format!("Universe: {}", condor.universe).into(),
            format!("Retries: {}", condor.retry).into(),
        ]);
        printer.push_line(format!("Output directory: {}", output_dir.display()).into());
        printer.display();
        display_warnings();

        Ok(OmegaBatchParams {
            gps_times,
            ifo,
            output_dir,
            condor,
        })
    }

    pub(super) fn run(self, dry_run: bool) -> Result<(), DetcharError> {
        debug!("Converting arguments into parameters");
        trace!("{:#?}", self);
        let params = self.parse()?;

        if dry_run {
            info!("Dry run -- exiting now.");
            return Ok(());
        }

        let dag = params.run()?;
        info!("Workflow written to {}", dag.display());
        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub(super) enum OmegaBatchArgsError {
    #[error("{0} isn't a valid GPS time")]
    BadGpsTime(f64),
}
