// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.


use std::path::PathBuf;

use clap::Parser;
use itertools::Itertools;
use log::{debug, info, trace};
use serde::{Deserialize, Serialize};

use super::common::{parse_ifo, CondorArgs, DataArgs, InfoPrinter, Warn, ARG_FILE_HELP};
use crate::{
    cli::common::display_warnings,
    constants::*,
    data::{fill_ifo, read_channel_list, DataError},
    params::{OmegaScanParams, ScatteringParams},
    scattering::{optic_channels, ScatterConfig},
    segments::{Segment, SegmentList, SegmentsError},
    DetcharError,
};

lazy_static::lazy_static! {
    static ref MAIN_CHANNEL_HELP: String =
        format!("The channel the triggers belong to. \"{{IFO}}\" is replaced by the interferometer. Default: {DEFAULT_SCATTERING_MAIN_CHANNEL}");

    static ref OPTICS_HELP: String =
        format!("The optics whose top-mass motion is searched. Ignored if a channel file is given. Default: {}", DEFAULT_OPTICS.join(","));

    static ref DOFS_HELP: String =
        format!("The degrees of freedom of each optic. Default: {}", DEFAULT_DOFS.join(","));

    static ref FREQUENCY_THRESHOLD_HELP: String =
        format!("Times when the scaled fringe frequency reaches this are flagged [Hz]. Default: {DEFAULT_FREQUENCY_THRESHOLD}");

    static ref THRESHOLD_MULTIPLIER_HELP: String =
        format!("The fundamental fringe frequency is scaled by this before it's compared with the frequency threshold. Default: {DEFAULT_THRESHOLD_MULTIPLIER}");

    static ref MULTIPLIERS_HELP: String =
        format!("The fringe harmonics to project. Default: {}", DEFAULT_MULTIPLIERS.iter().join(","));

    static ref SEGMENT_PAD_HELP: String =
        format!("Scattering segments are padded on each side by this many seconds. Default: {DEFAULT_SEGMENT_PAD}");

    static ref SNR_THRESHOLD_HELP: String =
        format!("Triggers quieter than this are ignored. Default: {DEFAULT_SNR_THRESHOLD}");

    static ref FMAX_HELP: String =
        format!("Triggers above this frequency are ignored [Hz]. Default: {DEFAULT_TRIGGER_FMAX}");

    static ref OMEGA_WINDOW_HELP: String =
        format!("Omega-scanned triggers are at least this many seconds apart. Default: {DEFAULT_OMEGA_WINDOW}");
}

#[derive(Parser, Debug, Clone, Default, Serialize, Deserialize)]
pub(super) struct ScatteringArgs {
    #[clap(name = "ARGUMENTS_FILE", help = ARG_FILE_HELP.as_str(), parse(from_os_str))]
    pub(super) args_file: Option<PathBuf>,

    /// The interferometer prefix, e.g. "L1".
    #[clap(short, long)]
    pub(super) ifo: Option<String>,

    #[clap(flatten)]
    #[serde(rename = "data")]
    #[serde(default)]
    pub(super) data_args: DataArgs,

    /// Trigger files for the main channel. Globs are expanded.
    #[clap(short = 'T', long, multiple_values(true), help_heading = "TRIGGERS")]
    pub(super) trigger_files: Option<Vec<String>>,

    #[clap(short, long, help = MAIN_CHANNEL_HELP.as_str(), help_heading = "TRIGGERS")]
    pub(super) main_channel: Option<String>,

    #[clap(long, help = SNR_THRESHOLD_HELP.as_str(), help_heading = "TRIGGERS")]
    pub(super) snr_threshold: Option<f64>,

    #[clap(long, help = FMAX_HELP.as_str(), help_heading = "TRIGGERS")]
    pub(super) fmax: Option<f64>,

    /// A file of analysis segments ("start end" per line). Default: the whole
    /// GPS span.
    #[clap(long, help_heading = "SEGMENTS")]
    pub(super) segment_file: Option<PathBuf>,

    /// A file listing optic motion channels, one per line.
    #[clap(short = 'C', long, help_heading = "CHANNELS")]
    pub(super) channel_file: Option<PathBuf>,

    #[clap(long, multiple_values(true), help = OPTICS_HELP.as_str(), help_heading = "CHANNELS")]
    pub(super) optics: Option<Vec<String>>,

    #[clap(long, multiple_values(true), help = DOFS_HELP.as_str(), help_heading = "CHANNELS")]
    pub(super) dofs: Option<Vec<String>>,

    #[clap(long, help = FREQUENCY_THRESHOLD_HELP.as_str(), help_heading = "FRINGES")]
    pub(super) frequency_threshold: Option<f64>,

    #[clap(long, help = THRESHOLD_MULTIPLIER_HELP.as_str(), help_heading = "FRINGES")]
    pub(super) threshold_multiplier: Option<f64>,

    #[clap(long, multiple_values(true), help = MULTIPLIERS_HELP.as_str(), help_heading = "FRINGES")]
    pub(super) multipliers: Option<Vec<f64>>,

    #[clap(long, help = SEGMENT_PAD_HELP.as_str(), help_heading = "FRINGES")]
    pub(super) segment_pad: Option<f64>,

    /// Run Omega scans of up to this many of the loudest triggers inside
    /// scattering segments. Default: 0
    #[clap(long, help_heading = "OMEGA SCANS")]
    pub(super) omega_scans: Option<usize>,

    #[clap(long, help = OMEGA_WINDOW_HELP.as_str(), help_heading = "OMEGA SCANS")]
    pub(super) omega_window: Option<f64>,

    #[clap(flatten)]
    #[serde(rename = "condor")]
    #[serde(default)]
    pub(super) condor_args: CondorArgs,

    /// The directory to write results into. Default: the current directory.
    #[clap(short, long, help_heading = "OUTPUT")]
    pub(super) output_dir: Option<PathBuf>,

    /// Don't make any figures.
    #[clap(long, help_heading = "OUTPUT")]
    #[serde(default)]
    pub(super) no_plots: bool,
}

impl ScatteringArgs {
    /// Consolidate the command-line arguments with those in the argument file,
    /// preferring the command line.
    pub(super) fn merge(self) -> Result<ScatteringArgs, DetcharError> {
        debug!("Merging command-line arguments with the argument file");

        let cli_args = self;

        if let Some(arg_file) = cli_args.args_file {
            let ScatteringArgs {
                args_file: _,
                ifo,
                data_args,
                trigger_files,
                main_channel,
                snr_threshold,
                fmax,
                segment_file,
                channel_file,
                optics,
                dofs,
                frequency_threshold,
                threshold_multiplier,
                multipliers,
                segment_pad,
                omega_scans,
                omega_window,
                condor_args,
                output_dir,
                no_plots,
            } = unpack_arg_file!(arg_file);

            Ok(ScatteringArgs {
                args_file: None,
                ifo: cli_args.ifo.or(ifo),
                data_args: cli_args.data_args.merge(data_args),
                trigger_files: cli_args.trigger_files.or(trigger_files),
                main_channel: cli_args.main_channel.or(main_channel),
                snr_threshold: cli_args.snr_threshold.or(snr_threshold),
                fmax: cli_args.fmax.or(fmax),
                segment_file: cli_args.segment_file.or(segment_file),
                channel_file: cli_args.channel_file.or(channel_file),
                optics: cli_args.optics.or(optics),
                dofs: cli_args.dofs.or(dofs),
                frequency_threshold: cli_args.frequency_threshold.or(frequency_threshold),
                threshold_multiplier: cli_args.threshold_multiplier.or(threshold_multiplier),
                multipliers: cli_args.multipliers.or(multipliers),
                segment_pad: cli_args.segment_pad.or(segment_pad),
                omega_scans: cli_args.omega_scans.or(omega_scans),
                omega_window: cli_args.omega_window.or(omega_window),
                condor_args: cli_args.condor_args.merge(condor_args),
                output_dir: cli_args.output_dir.or(output_dir),
                no_plots: cli_args.no_plots || no_plots,
            })
        } else {
            Ok(cli_args)
        }
    }

    pub(super) fn parse(self) -> Result<ScatteringParams, DetcharError> {
        debug!("{:#?}", self);

        let Self {
            args_file: _,
            ifo,
            data_args,
            trigger_files,
            main_channel,
            snr_threshold,
            fmax,
            segment_file,
            channel_file,
            optics,
            dofs,
            frequency_threshold,
            threshold_multiplier,
            multipliers,
            segment_pad,
            omega_scans,
            omega_window,
            condor_args,
            output_dir,
            no_plots,
        } = self;

        let ifo = parse_ifo(ifo)?;
        let span = data_args.parse()?;

        let multipliers = multipliers.unwrap_or_else(|| DEFAULT_MULTIPLIERS.to_vec());
        if multipliers.is_empty() {
            return Err(ScatteringArgsError::NoMultipliers.into());
        }
        if let Some(&m) = multipliers.iter().find(|m| !(m.is_finite() && **m > 0.0)) {
            return Err(ScatteringArgsError::NotPositive {
                what: "fringe multiplier",
                value: m,
            }
            .into());
        }
        let frequency_threshold = frequency_threshold.unwrap_or(DEFAULT_FREQUENCY_THRESHOLD);
        let threshold_multiplier = threshold_multiplier.unwrap_or(DEFAULT_THRESHOLD_MULTIPLIER);
        let fmax = fmax.unwrap_or(DEFAULT_TRIGGER_FMAX);
        for (what, value) in [
            ("frequency threshold", frequency_threshold),
            ("threshold multiplier", threshold_multiplier),
            ("maximum trigger frequency", fmax),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ScatteringArgsError::NotPositive { what, value }.into());
            }
        }
        let segment_pad = segment_pad.unwrap_or(DEFAULT_SEGMENT_PAD);
        if !(segment_pad.is_finite() && segment_pad >= 0.0) {
            return Err(ScatteringArgsError::BadSegmentPad(segment_pad).into());
        }
        let snr_threshold = snr_threshold.unwrap_or(DEFAULT_SNR_THRESHOLD);

        let main_channel = fill_ifo(
            main_channel
                .as_deref()
                .unwrap_or(DEFAULT_SCATTERING_MAIN_CHANNEL),
            &ifo,
        );
        let trigger_files = trigger_files.unwrap_or_default();
        if trigger_files.is_empty() {
            format!("No trigger files were given; only scattering segments will be made for {main_channel}").warn();
        }

        let channels: Vec<String> = match channel_file.as_ref() {
            Some(f) => {
                if optics.is_some() || dofs.is_some() {
                    "A channel file was given, so --optics and --dofs are ignored".warn();
                }
                read_channel_list(f)
                    .map_err(ScatteringArgsError::ChannelList)?
                    .iter()
                    .map(|c| fill_ifo(c, &ifo))
                    .collect()
            }
            None => {
                let optics: Vec<String> = optics
                    .map(|o| o.into_iter().map(|o| o.to_uppercase()).collect())
                    .unwrap_or_else(|| DEFAULT_OPTICS.iter().map(|o| o.to_string()).collect());
                let dofs: Vec<String> = dofs
                    .map(|d| d.into_iter().map(|d| d.to_uppercase()).collect())
                    .unwrap_or_else(|| DEFAULT_DOFS.iter().map(|d| d.to_string()).collect());
                optic_channels(&ifo, &optics, &dofs)
            }
        };
        if channels.is_empty() {
            return Err(ScatteringArgsError::NoChannels.into());
        }

        let whole_span = SegmentList::from_segments([Segment::new(span.gps_start, span.gps_end)]);
        let analysis = match segment_file.as_ref() {
            Some(f) => SegmentList::read(f)
                .map_err(ScatteringArgsError::SegmentFile)?
                .intersection(&whole_span),
            None => whole_span,
        };
        if analysis.is_empty() {
            return Err(ScatteringArgsError::NoAnalysisTime {
                start: span.gps_start,
                end: span.gps_end,
            }
            .into());
        }

        let omega = match omega_scans.unwrap_or(0) {
            0 => None,
            num_scans => Some(OmegaScanParams {
                num_scans,
                window: omega_window.unwrap_or(DEFAULT_OMEGA_WINDOW),
                condor: condor_args.parse()?,
            }),
        };

        let output_dir = output_dir.unwrap_or_else(|| PathBuf::from("."));
        let plots = !no_plots;
        if plots && !crate::plot::enabled() {
            "Not compiled with the \"plotting\" feature; no figures will be made".warn();
        }

        let mut printer = InfoPrinter::new("Scattering search".into());
        printer.push_block(vec![
            format!("Interferometer: {ifo}").into(),
            format!("GPS span: {} to {}", span.gps_start, span.gps_end).into(),
            format!(
                "Analysing {} s in {} segments",
                analysis.livetime(),
                analysis.len()
            )
            .into(),
        ]);
        printer.push_block(vec![
            format!("Main channel: {main_channel}").into(),
            format!("Trigger files: {}", trigger_files.len()).into(),
            format!("SNR >= {snr_threshold}, frequency <= {fmax} Hz").into(),
        ]);
        printer.push_line(format!("Optic channels: {}", channels.len()).into());
        printer.push_block(vec![
            format!("Fringe harmonics: {}", multipliers.iter().join(", ")).into(),
            format!(
                "Segments where {threshold_multiplier} x fringe >= {frequency_threshold} Hz, padded by {segment_pad} s"
            )
            .into(),
        ]);
        if let Some(o) = omega.as_ref() {
            printer.push_line(
                format!(
                    "Omega scans: up to {} in the {} universe",
                    o.num_scans, o.condor.universe
                )
                .into(),
            );
        }
        printer.push_line(format!("Output directory: {}", output_dir.display()).into());
        printer.display();
        display_warnings();

        Ok(ScatteringParams {
            ifo,
            gps_start: span.gps_start,
            gps_end: span.gps_end,
            source: span.source,
            trigger_files,
            main_channel,
            analysis,
            channels,
            config: ScatterConfig {
                multipliers,
                threshold_multiplier,
                frequency_threshold,
                segment_pad,
            },
            snr_threshold,
            fmax,
            omega,
            nproc: span.nproc,
            output_dir,
            plots,
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

        let summary = params.run()?;
        match summary.channels.first() {
            Some(c) if !c.segments.is_empty() => info!(
                "{} scattered for {} s; {} s flagged by all channels",
                c.channel, c.livetime, summary.livetime
            ),
            _ => info!("No scattering was found"),
        }
        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub(super) enum ScatteringArgsError {
    #[error("At least one fringe multiplier is needed")]
    NoMultipliers,

    #[error("The {what} must be positive, but got {value}")]
    NotPositive { what: &'static str, value: f64 },

    #[error("The segment padding must not be negative, but got {0}")]
    BadSegmentPad(f64),

    #[error("No optic channels to search")]
    NoChannels,

    #[error("None of the analysis segments overlap the GPS span {start} to {end}")]
    NoAnalysisTime { start: f64, end: f64 },

    #[error("Couldn't read the channel list: {0}")]
    ChannelList(DataError),

    #[error("Couldn't read the analysis segments: {0}")]
    SegmentFile(SegmentsError),
}
