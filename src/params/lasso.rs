// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use indexmap::IndexMap;
use indicatif::ParallelProgressIterator;
use log::{debug, info, warn};
use ndarray::prelude::*;
use rayon::prelude::*;
use serde::Serialize;

use super::{csv_field, file_stem, plot_paths, plot_progress_bar};
use crate::{
    constants::CV_ALPHA_RATIO,
    data::{get_data, get_data_lossy, DataError, FileSource, TimeSeries},
    io::prepare_output_dir,
    lasso::{
        cumulative_contributions, design_matrix, find_clusters, remove_bad, remove_flat,
        remove_outliers, select_alpha_cv, standardise_columns, ClusterMember, CvResult, Lasso,
        LassoError, LassoModel,
    },
    math::{pearson, zscore},
    plot::{self, Line},
    report::{escape, gps_with_utc, Cell, Page, ReportError},
};

pub(crate) struct LassoParams {
    pub(crate) ifo: String,
    pub(crate) gps_start: f64,
    pub(crate) gps_end: f64,
    pub(crate) source: FileSource,
    pub(crate) primary_channel: String,

    /// The auxiliary channels, with trends and filters already applied.
    pub(crate) channels: Vec<String>,

    /// Replace primary-channel samples further than this many standard
    /// deviations from the median.
    pub(crate) remove_outliers: Option<f64>,

    /// If this isn't set, the regularisation strength is cross validated.
    pub(crate) alpha: Option<f64>,
    pub(crate) cv_folds: usize,
    pub(crate) num_alphas: usize,
    pub(crate) max_iter: usize,
    pub(crate) tol: f64,
    pub(crate) threshold: f64,
    pub(crate) cluster_coefficient: f64,
    pub(crate) max_plots: usize,
    pub(crate) nproc: usize,
    pub(crate) output_dir: PathBuf,
    pub(crate) plots: bool,
}

/// A channel with a non-zero Lasso coefficient.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct SelectedChannel {
    pub(crate) channel: String,
    pub(crate) coefficient: f64,

    /// The Pearson correlation with the primary channel.
    pub(crate) r: f64,

    /// Other channels strongly correlated with this one.
    pub(crate) cluster: Vec<ClusterMember>,
}

/// Auxiliary channels left out of the fit, by reason.
#[derive(Debug, Clone, Default, Serialize)]
pub(crate) struct DroppedChannels {
    pub(crate) unreadable: Vec<String>,
    pub(crate) wrong_length: Vec<String>,
    pub(crate) flat: Vec<String>,
    pub(crate) bad: Vec<String>,
}

impl DroppedChannels {
    fn total(&self) -> usize {
        self.unreadable.len() + self.wrong_length.len() + self.flat.len() + self.bad.len()
    }
}

/// Everything written to `lasso_results.json`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct LassoResults {
    pub(crate) ifo: String,
    pub(crate) primary_channel: String,
    pub(crate) gps_start: f64,
    pub(crate) gps_end: f64,
    pub(crate) alpha: f64,
    pub(crate) cross_validated: bool,
    pub(crate) intercept: f64,
    pub(crate) num_outliers: usize,
    pub(crate) num_channels_fit: usize,

    /// The Pearson correlation between the primary channel and the model.
    pub(crate) model_r: f64,
    pub(crate) selected: Vec<SelectedChannel>,

    /// The model's correlation with the primary channel as the selected
    /// channels are added one at a time.
    pub(crate) cumulative_r: Vec<f64>,
    pub(crate) dropped: DroppedChannels,
}

/// The figures of a report, as paths relative to the report.
#[derive(Debug, Default)]
struct LassoFigures {
    primary: Option<PathBuf>,
    model: Option<PathBuf>,
    cumulative: Option<PathBuf>,
    channels: IndexMap<String, PathBuf>,
}

impl LassoParams {
    pub(crate) fn run(&self) -> Result<LassoResults, LassoCorrelationError> {
        let Self {
            ifo,
            gps_start,
            gps_end,
            source,
            primary_channel,
            channels,
            remove_outliers: outlier_sigma,
            alpha,
            cv_folds,
            num_alphas,
            max_iter,
            tol,
            threshold,
            cluster_coefficient,
            max_plots: _,
            nproc,
            output_dir,
            plots,
        } = self;
        let (gps_start, gps_end) = (*gps_start, *gps_end);

        prepare_output_dir(output_dir).map_err(|err| LassoCorrelationError::IO {
            file: output_dir.clone(),
            err,
        })?;

        info!("Reading the primary channel '{primary_channel}'");
        let mut primary = get_data(source, &[primary_channel], gps_start, gps_end, *nproc)?
            .shift_remove(primary_channel)
            .ok_or_else(|| LassoCorrelationError::PrimaryMissing(primary_channel.clone()))?;
        if primary.is_flat() {
            return Err(LassoCorrelationError::PrimaryFlat(primary_channel.clone()));
        }
        if primary.has_non_finite() && outlier_sigma.is_none() {
            return Err(LassoCorrelationError::PrimaryNonFinite(
                primary_channel.clone(),
            ));
        }
        let num_outliers = match outlier_sigma {
            Some(nsigma) => {
                let n = remove_outliers(&mut primary, *nsigma);
                info!("Replaced {n} outlier samples in the primary channel ({nsigma} sigma)");
                n
            }
            None => 0,
        };

        info!("Reading {} auxiliary channels", channels.len());
        let (mut aux, unreadable) = get_data_lossy(source, channels.as_slice(), gps_start, gps_end, *nproc)?;
        let mut dropped = DroppedChannels {
            unreadable: unreadable.into_iter().map(|(c, _)| c).collect(),
            ..Default::default()
        };
        if !dropped.unreadable.is_empty() {
            warn!(
                "Couldn't read {} auxiliary channels; they are left out",
                dropped.unreadable.len()
            );
        }
        aux.shift_remove(primary_channel);
        dropped.wrong_length = aux
            .iter()
            .filter(|(_, ts)| ts.len() != primary.len())
            .map(|(c, _)| c.clone())
            .collect();
        aux.retain(|_, ts| ts.len() == primary.len());
        dropped.flat = remove_flat(&mut aux);
        dropped.bad = remove_bad(&mut aux);
        debug!(
            "Dropped {} channels ({} unreadable, {} with the wrong length, {} flat, {} with bad values)",
            dropped.total(),
            dropped.unreadable.len(),
            dropped.wrong_length.len(),
            dropped.flat.len(),
            dropped.bad.len()
        );
        if aux.is_empty() {
            return Err(LassoCorrelationError::NoChannels);
        }
        info!("Fitting {} auxiliary channels", aux.len());

        let mut x = design_matrix(aux.values(), primary.len())?;
        standardise_columns(&mut x);
        let (y, y_mean, y_std) = zscore(primary.data.view());

        let cv: Option<CvResult> = match alpha {
            Some(_) => None,
            None => Some(select_alpha_cv(
                x.view(),
                y.view(),
                *num_alphas,
                CV_ALPHA_RATIO,
                *cv_folds,
                *max_iter,
                *tol,
            )?),
        };
        let alpha = alpha.or(cv.as_ref().map(|cv| cv.alpha)).unwrap_or_default();
        info!("Using alpha = {alpha:.4e}");

        let fit = Lasso {
            alpha,
            max_iter: *max_iter,
            tol: *tol,
        }
        .fit(x.view(), y.view())?;
        let model = LassoModel::new(aux.keys().cloned().collect(), fit);

        let selected = model.selected(*threshold);
        info!(
            "{} of {} channels have non-zero coefficients",
            selected.len(),
            aux.len()
        );

        let model_scaled = model.predict(x.view());
        let model_units = model_scaled.mapv(|v| v * y_std + y_mean);
        let model_r = pearson(y.view(), model_scaled.view());
        info!("Correlation between the model and the primary channel: {model_r:.4}");

        let cumulative_r = cumulative_contributions(
            x.view(),
            y.view(),
            &selected.iter().map(|&(i, _, c)| (i, c)).collect::<Vec<_>>(),
        );
        let selected_names: Vec<&str> = selected.iter().map(|&(_, c, _)| c).collect();
        let mut clusters = find_clusters(&aux, &selected_names, *cluster_coefficient);

        let selected_channels: Vec<SelectedChannel> = selected
            .iter()
            .map(|&(_, channel, coefficient)| SelectedChannel {
                channel: channel.to_string(),
                coefficient,
                r: aux
                    .get(channel)
                    .map(|ts| pearson(primary.data.view(), ts.data.view()))
                    .unwrap_or(f64::NAN),
                cluster: clusters.shift_remove(channel).unwrap_or_default(),
            })
            .collect();

        let results = LassoResults {
            ifo: ifo.clone(),
            primary_channel: primary_channel.clone(),
            gps_start,
            gps_end,
            alpha,
            cross_validated: cv.is_some(),
            intercept: model.intercept,
            num_outliers,
            num_channels_fit: aux.len(),
            model_r,
            selected: selected_channels,
            cumulative_r,
            dropped,
        };

        let figures = if *plots && plot::enabled() {
            self.make_plots(
                &primary,
                &model_units,
                y.view(),
                &x,
                &selected,
                &results.cumulative_r,
            )
        } else {
            debug!("Not plotting");
            LassoFigures::default()
        };

        write_json(&output_dir.join("lasso_results.json"), &results)?;
        write_csv(&output_dir.join("lasso_results.csv"), &results)?;
        self.report(&results, &figures, cv.as_ref())
            .write(output_dir)?;

        Ok(results)
    }

    fn make_plots(
        &self,
        primary: &TimeSeries,
        model_units: &Array1<f64>,
        y: ArrayView1<f64>,
        x: &Array2<f64>,
        selected: &[(usize, &str, f64)],
        cumulative_r: &[f64],
    ) -> LassoFigures {
        let plots_dir = self.output_dir.join("plots");
        if let Err(e) = prepare_output_dir(&plots_dir) {
            warn!("Couldn't make {}: {e}; not plotting", plots_dir.display());
            return LassoFigures::default();
        }
        let epoch = self.gps_start;
        let primary_line = Line {
            label: &primary.channel,
            t0: primary.t0,
            sample_rate: primary.sample_rate,
            data: primary.data.view(),
        };

        let (path, relative) = plot_paths(&self.output_dir, "primary");
        let primary_fig = plot::or_warn(
            plot::lines(
                &path,
                &self.primary_channel,
                "Primary channel",
                epoch,
                &[primary_line],
            ),
            "the primary channel",
        )
        .map(|_| relative);

        let (path, relative) = plot_paths(&self.output_dir, "model");
        let model_fig = plot::or_warn(
            plot::lines(
                &path,
                &format!("Lasso model of {}", self.primary_channel),
                "Primary channel",
                epoch,
                &[
                    primary_line,
                    Line {
                        label: "Lasso model",
                        t0: primary.t0,
                        sample_rate: primary.sample_rate,
                        data: model_units.view(),
                    },
                ],
            ),
            "the model",
        )
        .map(|_| relative);

        let (path, relative) = plot_paths(&self.output_dir, "cumulative");
        let cumulative_fig = if cumulative_r.is_empty() {
            None
        } else {
            plot::or_warn(
                plot::cumulative(&path, "Cumulative contribution", cumulative_r),
                "the cumulative contributions",
            )
            .map(|_| relative)
        };

        // One overlay per selected channel, scaled and signed to match the
        // standardised primary channel.
        let to_plot = &selected[..selected.len().min(self.max_plots)];
        let pb = plot_progress_bar(to_plot.len());
        let channel_figs: Vec<(String, Option<PathBuf>)> = to_plot
            .par_iter()
            .progress_with(pb.clone())
            .map(|&(i, channel, coef)| {
                let scaled = x.column(i).mapv(|v| v * coef.signum());
                let (path, relative) = plot_paths(&self.output_dir, &file_stem(channel));
                let fig = plot::or_warn(
                    plot::lines(
                        &path,
                        channel,
                        "Standardised amplitude",
                        epoch,
                        &[
                            Line {
                                label: &self.primary_channel,
                                t0: primary.t0,
                                sample_rate: primary.sample_rate,
                                data: y.view(),
                            },
                            Line {
                                label: channel,
                                t0: primary.t0,
                                sample_rate: primary.sample_rate,
                                data: scaled.view(),
                            },
                        ],
                    ),
                    channel,
                );
                (channel.to_string(), fig.map(|_| relative))
            })
            .collect();
        pb.finish_and_clear();

        LassoFigures {
            primary: primary_fig,
            model: model_fig,
            cumulative: cumulative_fig,
            channels: channel_figs
                .into_iter()
                .filter_map(|(c, f)| f.map(|f| (c, f)))
                .collect(),
        }
    }

    fn report(&self, results: &LassoResults, figures: &LassoFigures, cv: Option<&CvResult>) -> Page {
        let mut page = Page::new(format!("{} Lasso correlation", self.ifo));
        page.heading(2, "Parameters").parameters(&[
            ("Interferometer", self.ifo.clone()),
            ("Start", gps_with_utc(self.gps_start)),
            ("End", gps_with_utc(self.gps_end)),
            ("Primary channel", self.primary_channel.clone()),
            (
                "Alpha",
                match cv {
                    Some(cv) => format!(
                        "{:.4e} (cross validated over {} values with {} folds)",
                        results.alpha,
                        cv.alphas.len(),
                        self.cv_folds
                    ),
                    None => format!("{:.4e}", results.alpha),
                },
            ),
            ("Channels fit", results.num_channels_fit.to_string()),
            ("Channels dropped", results.dropped.total().to_string()),
            (
                "Outliers replaced",
                match self.remove_outliers {
                    Some(n) => format!("{} ({n} sigma)", results.num_outliers),
                    None => "not removed".to_string(),
                },
            ),
        ]);
        page.heading(2, "Model");
        page.paragraph(&format!(
            "Correlation between the model and the primary channel: {:.4}",
            results.model_r
        ));
        if let Some(f) = &figures.primary {
            page.figure(f, &self.primary_channel);
        }
        if let Some(f) = &figures.model {
            page.figure(f, "Primary channel and the Lasso model");
        }

        page.heading(2, "Selected channels");
        if results.selected.is_empty() {
            page.alert(
                "info",
                "No channels have a non-zero coefficient; try a smaller alpha.",
            );
        } else {
            if let Some(f) = &figures.cumulative {
                page.figure(f, "Correlation as channels are added to the model");
            }
            let rows: Vec<Vec<Cell>> = results
                .selected
                .iter()
                .enumerate()
                .map(|(rank, s)| {
                    vec![
                        Cell::from((rank + 1).to_string()),
                        match figures.channels.get(&s.channel) {
                            Some(f) => Cell::link(&s.channel, f.display().to_string()),
                            None => Cell::from(s.channel.as_str()),
                        },
                        Cell::from(format!("{:.4}", s.coefficient)),
                        Cell::from(format!("{:.4}", s.r)),
                        Cell::from(s.cluster.len().to_string()),
                    ]
                })
                .collect();
            page.table(
                &["#", "Channel", "Coefficient", "Pearson r", "Cluster size"],
                &rows,
            );

            for s in &results.selected {
                if let Some(f) = figures.channels.get(&s.channel) {
                    page.figure(f, &s.channel);
                }
                if !s.cluster.is_empty() {
                    page.collapsible(
                        &format!("Channels correlated with {}", s.channel),
                        |p| {
                            p.table(
                                &["Channel", "Pearson r"],
                                &s.cluster
                                    .iter()
                                    .map(|m| {
                                        vec![
                                            Cell::from(m.channel.as_str()),
                                            Cell::from(format!("{:.4}", m.r)),
                                        ]
                                    })
                                    .collect::<Vec<_>>(),
                            );
                        },
                    );
                }
            }
        }

        if results.dropped.total() > 0 {
            page.heading(2, "Dropped channels");
            let d = &results.dropped;
            for (why, names) in [
                ("Unreadable", &d.unreadable),
                ("Wrong length", &d.wrong_length),
                ("Flat", &d.flat),
                ("Non-finite values", &d.bad),
            ] {
                if names.is_empty() {
                    continue;
                }
                page.collapsible(&format!("{why} ({})", names.len()), |p| {
                    p.raw(&format!(
                        "<pre>{}</pre>",
                        names.iter().map(|n| escape(n)).collect::<Vec<_>>().join("\n")
                    ));
                });
            }
        }

        page.paragraph("Results are also available as lasso_results.json and lasso_results.csv.");
        page
    }
}

fn write_json(path: &Path, results: &LassoResults) -> Result<(), LassoCorrelationError> {
    let io_err = |err| LassoCorrelationError::IO {
        file: path.to_path_buf(),
        err,
    };
    let mut f = BufWriter::new(File::create(path).map_err(io_err)?);
    serde_json::to_writer_pretty(&mut f, results)?;
    f.flush().map_err(io_err)?;
    info!("Wrote {}", path.display());
    Ok(())
}

fn write_csv(path: &Path, results: &LassoResults) -> Result<(), LassoCorrelationError> {
    let io_err = |err| LassoCorrelationError::IO {
        file: path.to_path_buf(),
        err,
    };
    let mut f = BufWriter::new(File::create(path).map_err(io_err)?);
    writeln!(f, "channel,coefficient,r").map_err(io_err)?;
    for s in &results.selected {
        writeln!(f, "{},{},{}", csv_field(&s.channel), s.coefficient, s.r).map_err(io_err)?;
    }
    f.flush().map_err(io_err)?;
    info!("Wrote {}", path.display());
    Ok(())
}

#[derive(thiserror::Error, Debug)]
pub(crate) enum LassoCorrelationError {
    #[error("The primary channel '{0}' wasn't read")]
    PrimaryMissing(String),

    #[error("The primary channel '{0}' is flat; there's nothing to correlate against")]
    PrimaryFlat(String),

    #[error("The primary channel '{0}' has non-finite values; consider using --remove-outliers")]
    PrimaryNonFinite(String),

    #[error("No auxiliary channels are left to fit after removing unreadable, flat and bad channels")]
    NoChannels,

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Lasso(#[from] LassoError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("Couldn't write JSON results: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{file}: {err}")]
    IO { file: PathBuf, err: std::io::Error },
}
