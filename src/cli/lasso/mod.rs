// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.


use std::path::PathBuf;

use clap::Parser;
use log::{debug, info, trace};
use serde::{Deserialize, Serialize};

use super::common::{parse_ifo, DataArgs, InfoPrinter, Warn, ARG_FILE_HELP};
use crate::{
    cli::common::display_warnings,
    constants::*,
    data::{fill_ifo, read_channel_list, with_trend, ChannelFilter, DataError},
    params::LassoParams,
    DetcharError,
};

lazy_static::lazy_static! {
    static ref PRIMARY_CHANNEL_HELP: String =
        format!("The channel to model. \"{{IFO}}\" is replaced by the interferometer. Default: {DEFAULT_LASSO_PRIMARY_CHANNEL}");

    static ref TREND_HELP: String =
        format!("The trend statistic appended to auxiliary channel names, or \"none\". Default: {DEFAULT_TREND}");

    static ref CV_FOLDS_HELP: String =
        format!("The number of cross-validation folds used to choose alpha. Default: {DEFAULT_CV_FOLDS}");

    static ref NUM_ALPHAS_HELP: String =
        format!("The number of alphas tried in cross validation. Default: {DEFAULT_NUM_ALPHAS}");

    static ref MAX_ITER_HELP: String =
        format!("The maximum number of Lasso solver iterations. Default: {DEFAULT_LASSO_MAX_ITER}");

    static ref TOL_HELP: String =
        format!("The relative duality gap at which the Lasso solver stops. Default: {DEFAULT_LASSO_TOL:e}");

    static ref THRESHOLD_HELP: String =
        format!("Coefficients with a magnitude at or below this are not selected. Default: {DEFAULT_COEFFICIENT_THRESHOLD:e}");

    static ref CLUSTER_COEFFICIENT_HELP: String =
        format!("Channels correlated with a selected channel at least this strongly join its cluster. Default: {DEFAULT_CLUSTER_COEFFICIENT}");

    static ref MAX_PLOTS_HELP: String =
        format!("The number of selected channels that get their own figure. Default: {DEFAULT_MAX_PLOTS}");
}

#[derive(Parser, Debug, Clone, Default, Serialize, Deserialize)]
pub(super) struct LassoArgs {
    #[clap(name = "ARGUMENTS_FILE", help = ARG_FILE_HELP.as_str(), parse(from_os_str))]
    pub(super) args_file: Option<PathBuf>,

    /// The interferometer prefix, e.g. "L1".
    #[clap(short, long)]
    pub(super) ifo: Option<String>,

    #[clap(flatten)]
    #[serde(rename = "data")]
    #[serde(default)]
    pub(super) data_args: DataArgs,

    /// A file listing the auxiliary channels, one per line.
    #[clap(short = 'C', long, help_heading = "CHANNELS")]
    pub(super) channel_file: Option<PathBuf>,

    #[clap(short = 'p', long, help = PRIMARY_CHANNEL_HELP.as_str(), help_heading = "CHANNELS")]
    pub(super) primary_channel: Option<String>,

    #[clap(short = 't', long, help = TREND_HELP.as_str(), help_heading = "CHANNELS")]
    pub(super) trend: Option<String>,

    /// Only use auxiliary channels matching one of these regular expressions.
    #[clap(long, multiple_values(true), help_heading = "CHANNELS")]
    pub(super) include: Option<Vec<String>>,

    /// Don't use auxiliary channels matching any of these regular
    /// expressions.
    #[clap(long, multiple_values(true), help_heading = "CHANNELS")]
    pub(super) exclude: Option<Vec<String>>,

    /// Replace primary-channel samples more than this many standard deviations
    /// from the mean (after iterative clipping) with the median. Off by
    /// default.
    #[clap(long, help_heading = "MODEL")]
    pub(super) remove_outliers: Option<f64>,

    /// The regularisation strength. If this isn't given, it's chosen by
    /// cross validation.
    #[clap(short, long, help_heading = "MODEL")]
    pub(super) alpha: Option<f64>,

    #[clap(long, help = CV_FOLDS_HELP.as_str(), help_heading = "MODEL")]
    pub(super) cv_folds: Option<usize>,

    #[clap(long, help = NUM_ALPHAS_HELP.as_str(), help_heading = "MODEL")]
    pub(super) num_alphas: Option<usize>,

    #[clap(long, help = MAX_ITER_HELP.as_str(), help_heading = "MODEL")]
    pub(super) max_iter: Option<usize>,

    #[clap(long, help = TOL_HELP.as_str(), help_heading = "MODEL")]
    pub(super) tol: Option<f64>,

    #[clap(long, help = THRESHOLD_HELP.as_str(), help_heading = "MODEL")]
    pub(super) threshold: Option<f64>,

    #[clap(long, help = CLUSTER_COEFFICIENT_HELP.as_str(), help_heading = "MODEL")]
    pub(super) cluster_coefficient: Option<f64>,

    #[clap(long, help = MAX_PLOTS_HELP.as_str(), help_heading = "OUTPUT")]
    pub(super) max_plots: Option<usize>,

    /// The directory to write results into. Default: the current directory.
    #[clap(short, long, help_heading = "OUTPUT")]
    pub(super) output_dir: Option<PathBuf>,

    /// Don't make any figures.
    #[clap(long, help_heading = "OUTPUT")]
    #[serde(default)]
    pub(super) no_plots: bool,
}

impl LassoArgs {
    /// Both command-line and file arguments overlap in terms of what is
    /// available; this function consolidates everything that was specified into
    /// a single struct. Where applicable, it will prefer CLI parameters over
    /// those in the file.
    pub(super) fn merge(self) -> Result<LassoArgs, DetcharError> {
        debug!("Merging command-line arguments with the argument file");

        let cli_args = self;

        if let Some(arg_file) = cli_args.args_file {
            let LassoArgs {
                args_file: _,
                ifo,
                data_args,
                channel_file,
                primary_channel,
                trend,
                include,
                exclude,
                remove_outliers,
                alpha,
                cv_folds,
                num_alphas,
                max_iter,
                tol,
                threshold,
                cluster_coefficient,
                max_plots,
                output_dir,
                no_plots,
            } = unpack_arg_file!(arg_file);

            Ok(LassoArgs {
                args_file: None,
                ifo: cli_args.ifo.or(ifo),
                data_args: cli_args.data_args.merge(data_args),
                channel_file: cli_args.channel_file.or(channel_file),
                primary_channel: cli_args.primary_channel.or(primary_channel),
                trend: cli_args.trend.or(trend),
                include: cli_args.include.or(include),
                exclude: cli_args.exclude.or(exclude),
                remove_outliers: cli_args.remove_outliers.or(remove_outliers),
                alpha: cli_args.alpha.or(alpha),
                cv_folds: cli_args.cv_folds.or(cv_folds),
                num_alphas: cli_args.num_alphas.or(num_alphas),
                max_iter: cli_args.max_iter.or(max_iter),
                tol: cli_args.tol.or(tol),
                threshold: cli_args.threshold.or(threshold),
                cluster_coefficient: cli_args.cluster_coefficient.or(cluster_coefficient),
                max_plots: cli_args.max_plots.or(max_plots),
                output_dir: cli_args.output_dir.or(output_dir),
                no_plots: cli_args.no_plots || no_plots,
            })
        } else {
            Ok(cli_args)
        }
    }

    pub(super) fn parse(self) -> Result<LassoParams, DetcharError> {
        debug!("{:#?}", self);

        let Self {
            args_file: _,
            ifo,
            data_args,
            channel_file,
            primary_channel,
            trend,
            include,
            exclude,
            remove_outliers,
            alpha,
            cv_folds,
            num_alphas,
            max_iter,
            tol,
            threshold,
            cluster_coefficient,
            max_plots,
            output_dir,
            no_plots,
        } = self;

        let ifo = parse_ifo(ifo)?;
        let span = data_args.parse()?;

        if let Some(a) = alpha {
            if !(a.is_finite() && a > 0.0) {
                return Err(LassoArgsError::BadAlpha(a).into());
            }
        }
        if let Some(s) = remove_outliers {
            if !(s.is_finite() && s > 0.0) {
                return Err(LassoArgsError::BadOutlierSigma(s).into());
            }
        }
        let cv_folds = cv_folds.unwrap_or(DEFAULT_CV_FOLDS);
        if cv_folds < 2 {
            return Err(LassoArgsError::BadCvFolds(cv_folds).into());
        }
        let num_alphas = num_alphas.unwrap_or(DEFAULT_NUM_ALPHAS).max(1);
        let max_iter = max_iter.unwrap_or(DEFAULT_LASSO_MAX_ITER);
        let tol = tol.unwrap_or(DEFAULT_LASSO_TOL);
        let threshold = threshold.unwrap_or(DEFAULT_COEFFICIENT_THRESHOLD);
        if !(threshold.is_finite() && threshold >= 0.0) {
            return Err(LassoArgsError::BadThreshold(threshold).into());
        }
        let cluster_coefficient = cluster_coefficient.unwrap_or(DEFAULT_CLUSTER_COEFFICIENT);
        if !(cluster_coefficient > 0.0 && cluster_coefficient <= 1.0) {
            return Err(LassoArgsError::BadClusterCoefficient(cluster_coefficient).into());
        }

        let primary_channel = fill_ifo(
            primary_channel
                .as_deref()
                .unwrap_or(DEFAULT_LASSO_PRIMARY_CHANNEL),
            &ifo,
        );
        let trend = trend.unwrap_or_else(|| DEFAULT_TREND.to_string());
        let channel_file = channel_file.ok_or(LassoArgsError::NoChannelFile)?;
        let listed = read_channel_list(&channel_file).map_err(LassoArgsError::ChannelList)?;
        let num_listed = listed.len();
        let filter = ChannelFilter::new(
            include.as_deref().unwrap_or_default(),
            exclude.as_deref().unwrap_or_default(),
        )
        .map_err(|e| LassoArgsError::BadRegex(e.to_string()))?;
        let channels = filter.apply(
            listed
                .iter()
                .map(|c| with_trend(&fill_ifo(c, &ifo), Some(&trend)))
                .collect(),
        );
        if channels.is_empty() {
            return Err(LassoArgsError::NoChannelsAfterFilter(channel_file).into());
        }
        if channels.len() < num_listed {
            format!(
                "{} of {num_listed} listed channels were removed by the include/exclude patterns",
                num_listed - channels.len()
            )
            .warn();
        }

        let output_dir = output_dir.unwrap_or_else(|| PathBuf::from("."));
        let plots = !no_plots;
        if plots && !crate::plot::enabled() {
            "Not compiled with the \"plotting\" feature; no figures will be made".warn();
        }

        let mut printer = InfoPrinter::new("Lasso correlation".into());
        printer.push_block(vec![
            format!("Interferometer: {ifo}").into(),
            format!("GPS span: {} to {}", span.gps_start, span.gps_end).into(),
            format!("Data from: {}", span.source.root().display()).into(),
        ]);
        printer.push_line(format!("Primary channel: {primary_channel}").into());
        printer.push_block(vec![
            format!("Auxiliary channels: {}", channels.len()).into(),
            format!("from {}", channel_file.display()).into(),
        ]);
        printer.push_block(vec![
            match alpha {
                Some(a) => format!("alpha: {a}").into(),
                None => format!("alpha: chosen by {cv_folds}-fold cross validation").into(),
            },
            format!("Selection threshold: {threshold:e}").into(),
            format!("Cluster coefficient: {cluster_coefficient}").into(),
        ]);
        if let Some(s) = remove_outliers {
            printer.push_line(format!("Removing primary outliers beyond {s} sigma").into());
        }
        printer.push_line(format!("Output directory: {}", output_dir.display()).into());
        printer.display();
        display_warnings();

        Ok(LassoParams {
            ifo,
            gps_start: span.gps_start,
            gps_end: span.gps_end,
            source: span.source,
            primary_channel,
            channels,
            remove_outliers,
            alpha,
            cv_folds,
            num_alphas,
            max_iter,
            tol,
            threshold,
            cluster_coefficient,
            max_plots: max_plots.unwrap_or(DEFAULT_MAX_PLOTS),
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

        let results = params.run()?;
        info!(
            "Selected {} of {} channels; the model correlates with the primary channel at r = {:.3}",
            results.selected.len(),
            results.num_channels_fit,
            results.model_r
        );
        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub(super) enum LassoArgsError {
    #[error("No auxiliary channel file was given (--channel-file)")]
    NoChannelFile,

    #[error("alpha must be positive, but got {0}")]
    BadAlpha(f64),

    #[error("The outlier threshold must be a positive number of standard deviations, but got {0}")]
    BadOutlierSigma(f64),

    #[error("Cross validation needs at least 2 folds, but got {0}")]
    BadCvFolds(usize),

    #[error("The selection threshold must not be negative, but got {0}")]
    BadThreshold(f64),

    #[error("The cluster coefficient must be in (0, 1], but got {0}")]
    BadClusterCoefficient(f64),

    #[error("Couldn't compile a channel pattern: {0}")]
    BadRegex(String),

    #[error("Couldn't read the channel list: {0}")]
    ChannelList(DataError),

    #[error("No channels listed in '{0}' survived the include/exclude patterns")]
    NoChannelsAfterFilter(PathBuf),
}
