// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.


use std::path::PathBuf;

use clap::Parser;
use itertools::Itertools;
use log::{debug, info, trace};
use serde::{Deserialize, Serialize};

use super::common::{DataArgs, InfoPrinter, Warn, ARG_FILE_HELP};
use crate::{
    cli::common::display_warnings,
    constants::{DEFAULT_PROFILE_CHANNEL_COUNTS, DEFAULT_PROFILE_HOURS},
    data::{read_channel_list, DataError},
    params::ProfileParams,
    DetcharError,
};

lazy_static::lazy_static! {
    static ref CHAN_COUNTS_HELP: String =
        format!("The numbers of channels to read at once. Default: {}", DEFAULT_PROFILE_CHANNEL_COUNTS.iter().join(","));

    static ref HOURS_HELP: String =
        format!("The durations to read [hours]. Default: {}", DEFAULT_PROFILE_HOURS.iter().join(","));
}

#[derive(Parser, Debug, Clone, Default, Serialize, Deserialize)]
pub(super) struct ProfileGetDataArgs {
    #[clap(name = "ARGUMENTS_FILE", help = ARG_FILE_HELP.as_str(), parse(from_os_str))]
    pub(super) args_file: Option<PathBuf>,

    #[clap(flatten)]
    #[serde(rename = "data")]
    #[serde(default)]
    pub(super) data_args: DataArgs,

    /// A file listing the channels to read, one per line.
    #[clap(short = 'C', long)]
    pub(super) chan_list: Option<PathBuf>,

    /// The file that timings are appended to.
    #[clap(short, long)]
    pub(super) out: Option<PathBuf>,

    #[clap(long, multiple_values(true), help = CHAN_COUNTS_HELP.as_str())]
    pub(super) chan_counts: Option<Vec<usize>>,

    #[clap(long, multiple_values(true), help = HOURS_HELP.as_str())]
    pub(super) hours: Option<Vec<f64>>,
}

impl ProfileGetDataArgs {
    pub(super) fn merge(self) -> Result<ProfileGetDataArgs, DetcharError> {
        debug!("Merging command-line arguments with the argument file");

        let cli_args = self;

        if let Some(arg_file) = cli_args.args_file {
            let ProfileGetDataArgs {
                args_file: _,
                data_args,
                chan_list,
                out,
                chan_counts,
                hours,
            } = unpack_arg_file!(arg_file);

            Ok(ProfileGetDataArgs {
                args_file: None,
                data_args: cli_args.data_args.merge(data_args),
                chan_list: cli_args.chan_list.or(chan_list),
                out: cli_args.out.or(out),
                chan_counts: cli_args.chan_counts.or(chan_counts),
                hours: cli_args.hours.or(hours),
            })
        } else {
            Ok(cli_args)
        }
    }

    pub(super) fn parse(self) -> Result<ProfileParams, DetcharError> {
        debug!("{:#?}", self);

        let Self {
            args_file: _,
            data_args,
            chan_list,
            out,
            chan_counts,
            hours,
        } = self;

        let span = data_args.parse()?;
        let chan_list = chan_list.ok_or(ProfileArgsError::NoChanList)?;
        let channels = read_channel_list(&chan_list).map_err(ProfileArgsError::ChanList)?;
        let out = out.ok_or(ProfileArgsError::NoOut)?;

        let chan_counts = chan_counts.unwrap_or_else(|| DEFAULT_PROFILE_CHANNEL_COUNTS.to_vec());
        if chan_counts.contains(&0) {
            return Err(ProfileArgsError::ZeroChannels.into());
        }
        let hours = hours.unwrap_or_else(|| DEFAULT_PROFILE_HOURS.to_vec());
        if let Some(&h) = hours.iter().find(|h| !(h.is_finite() && **h > 0.0)) {
            return Err(ProfileArgsError::BadHours(h).into());
        }
        if chan_counts.iter().all(|&n| n > channels.len()) {
            format!(
                "Only {} channels are listed; only the priming read will be timed",
                channels.len()
            )
            .warn();
        }

        let mut printer = InfoPrinter::new("Profiling data reads".into());
        printer.push_block(vec![
            format!("Data from: {}", span.source.root().display()).into(),
            format!("GPS span: {} to {}", span.gps_start, span.gps_end).into(),
        ]);
        printer.push_block(vec![
            format!("{} channels listed in {}", channels.len(), chan_list.display()).into(),
            format!("Channel counts: {}", chan_counts.iter().join(", ")).into(),
            format!("Hours: {}", hours.iter().join(", ")).into(),
        ]);
        printer.push_line(format!("Threads: {}", span.nproc).into());
        printer.push_line(format!("Timings to: {}", out.display()).into());
        printer.display();
        display_warnings();

        Ok(ProfileParams {
            source: span.source,
            channels,
            out,
            gps_start: span.gps_start,
            gps_end: span.gps_end,
            chan_counts,
            hours,
            nproc: span.nproc,
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

        let timings = params.run()?;
        info!("{} reads timed", timings.len());
        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub(super) enum ProfileArgsError {
    #[error("No channel list was given (--chan-list)")]
    NoChanList,

    #[error("No output file was given (--out)")]
    NoOut,

    #[error("Channel counts must be positive")]
    ZeroChannels,

    #[error("Durations must be a positive number of hours, but got {0}")]
    BadHours(f64),

    #[error("Couldn't read the channel list: {0}")]
    ChanList(DataError),
}
