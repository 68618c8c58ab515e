// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use indexmap::IndexMap;
use indicatif::ParallelProgressIterator;
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;
use vec1::Vec1;

use super::{file_stem, omega_batch::CondorParams, plot_paths, plot_progress_bar};
use crate::{
    condor::CondorError,
    data::{get_data_lossy, DataError, FileSource, TimeSeries},
    io::prepare_output_dir,
    plot::{self, Line},
    report::{gps_with_utc, Cell, Page, ReportError},
    scattering::{
        analyse_channels, harmonics, union_segments, ChannelScatter, ScatterConfig,
        ScatteringError,
    },
    segments::{SegmentList, SegmentsError},
    triggers::{filter_triggers, loudest_distinct, read_triggers, Trigger, TriggerReadError},
};

/// Omega scans of the loudest triggers in scattering segments.
#[derive(Debug, Clone)]
pub(crate) struct OmegaScanParams {
    /// The most scans to run.
    pub(crate) num_scans: usize,

    /// Scanned triggers are at least this many seconds apart.
    pub(crate) window: f64,
    pub(crate) condor: CondorParams,
}

pub(crate) struct ScatteringParams {
    pub(crate) ifo: String,
    pub(crate) gps_start: f64,
    pub(crate) gps_end: f64,
    pub(crate) source: FileSource,

    /// Globs of trigger files for the main channel.
    pub(crate) trigger_files: Vec<String>,
    pub(crate) main_channel: String,

    /// Only these times are analysed.
    pub(crate) analysis: SegmentList,

    /// The optic motion channels.
    pub(crate) channels: Vec<String>,
    pub(crate) config: ScatterConfig,
    pub(crate) snr_threshold: f64,
    pub(crate) fmax: f64,
    pub(crate) omega: Option<OmegaScanParams>,
    pub(crate) nproc: usize,
    pub(crate) output_dir: PathBuf,
    pub(crate) plots: bool,
}

/// Everything written to `scattering_summary.json`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ScatteringSummary {
    pub(crate) ifo: String,
    pub(crate) main_channel: String,
    pub(crate) gps_start: f64,
    pub(crate) gps_end: f64,
    pub(crate) analysis_livetime: f64,
    pub(crate) num_triggers: usize,
    pub(crate) unreadable: Vec<String>,

    /// The union of all channels' scattering segments.
    pub(crate) segments: SegmentList,
    pub(crate) livetime: f64,

    /// Ranked, most significant first.
    pub(crate) channels: Vec<ChannelScatter>,
    pub(crate) omega_times: Vec<f64>,
    pub(crate) omega_dag: Option<PathBuf>,
}

impl ScatteringParams {
    pub(crate) fn run(&self) -> Result<ScatteringSummary, ScatteringSearchError> {
        let Self {
            ifo,
            gps_start,
            gps_end,
            source,
            trigger_files,
            main_channel,
            analysis,
            channels,
            config,
            snr_threshold,
            fmax,
            omega,
            nproc,
            output_dir,
            plots,
        } = self;
        let (gps_start, gps_end) = (*gps_start, *gps_end);

        let segments_dir = output_dir.join("segments");
        prepare_output_dir(&segments_dir).map_err(|err| ScatteringSearchError::IO {
            file: segments_dir.clone(),
            err,
        })?;

        let triggers: Vec<Trigger> = if trigger_files.is_empty() {
            warn!("No trigger files were given; efficiencies will all be 0");
            vec![]
        } else {
            let all = read_triggers(trigger_files.as_slice())?;
            let mut triggers = filter_triggers(&all, *snr_threshold, *fmax, gps_start, gps_end);
            triggers.retain(|t| analysis.contains(t.time));
            info!(
                "Using {} of {} triggers for {main_channel} (SNR >= {snr_threshold}, f <= {fmax} Hz, in the analysis segments)",
                triggers.len(),
                all.len()
            );
            triggers
        };

        info!("Reading {} optic channels", channels.len());
        let (series, unreadable) =
            get_data_lossy(source, channels.as_slice(), gps_start, gps_end, *nproc)?;
        if !unreadable.is_empty() {
            warn!("Couldn't read {} optic channels", unreadable.len());
        }
        if series.is_empty() {
            return Err(ScatteringSearchError::NoChannels);
        }

        let results = analyse_channels(series.par_values(), &triggers, analysis, config)?;
        for r in results.iter().filter(|r| !r.segments.is_empty()) {
            r.segments
                .write(&segments_dir.join(format!("{}.txt", file_stem(&r.channel))))?;
        }
        let union = union_segments(&results);
        union.write(&output_dir.join("scattering-segments.txt"))?;
        info!(
            "{} channels show scattering; {} segments, {} s in total",
            results.iter().filter(|r| !r.segments.is_empty()).count(),
            union.len(),
            union.livetime()
        );

        let (omega_times, omega_dag) = match omega {
            Some(o) if o.num_scans > 0 => self.omega_scans(o, &triggers, &union)?,
            _ => (vec![], None),
        };

        let summary = ScatteringSummary {
            ifo: ifo.clone(),
            main_channel: main_channel.clone(),
            gps_start,
            gps_end,
            analysis_livetime: analysis.livetime(),
            num_triggers: triggers.len(),
            unreadable: unreadable.into_iter().map(|(c, _)| c).collect(),
            livetime: union.livetime(),
            segments: union,
            channels: results,
            omega_times,
            omega_dag,
        };

        let figures = if *plots && plot::enabled() {
            self.make_plots(&series, &summary.channels, &triggers)
        } else {
            debug!("Not plotting");
            IndexMap::new()
        };

        let json = output_dir.join("scattering_summary.json");
        let contents = serde_json::to_string_pretty(&summary)?;
        std::fs::write(&json, contents).map_err(|err| ScatteringSearchError::IO {
            file: json.clone(),
            err,
        })?;
        info!("Wrote {}", json.display());

        self.report(&summary, &figures).write(output_dir)?;
        Ok(summary)
    }

    /// Write (and maybe submit) Omega scans of the loudest triggers inside
    /// the scattering segments.
    fn omega_scans(
        &self,
        omega: &OmegaScanParams,
        triggers: &[Trigger],
        union: &SegmentList,
    ) -> Result<(Vec<f64>, Option<PathBuf>), ScatteringSearchError> {
        let in_segments: Vec<Trigger> = triggers
            .iter()
            .filter(|t| union.contains(t.time))
            .copied()
            .collect();
        let times: Vec<f64> = loudest_distinct(&in_segments, omega.num_scans, omega.window)
            .into_iter()
            .map(|t| t.time)
            .collect();
        let gps_times = match Vec1::try_from_vec(times.clone()) {
            Ok(v) => v,
            Err(_) => {
                warn!("No triggers are inside scattering segments; not writing Omega scans");
                return Ok((vec![], None));
            }
        };
        let batch = omega
            .condor
            .batch(gps_times, &self.ifo, &self.output_dir.join("omega"));
        let dag = omega.condor.write_and_submit(&batch)?;
        Ok((times, Some(dag)))
    }

    /// Fringe plots for every channel that shows scattering. Returned paths
    /// are relative to the report.
    fn make_plots(
        &self,
        series: &IndexMap<String, TimeSeries>,
        results: &[ChannelScatter],
        triggers: &[Trigger],
    ) -> IndexMap<String, PathBuf> {
        let plots_dir = self.output_dir.join("plots");
        if let Err(e) = prepare_output_dir(&plots_dir) {
            warn!("Couldn't make {}: {e}; not plotting", plots_dir.display());
            return IndexMap::new();
        }
        let to_plot: Vec<&ChannelScatter> =
            results.iter().filter(|r| !r.segments.is_empty()).collect();
        let pb = plot_progress_bar(to_plot.len());
        let figures: Vec<(String, Option<PathBuf>)> = to_plot
            .par_iter()
            .progress_with(pb.clone())
            .filter_map(|r| series.get(&r.channel).map(|ts| (r, ts)))
            .map(|(r, ts)| {
                let harmonics = harmonics(ts, &self.config.multipliers);
                let labels: Vec<String> = harmonics
                    .iter()
                    .map(|(m, _)| format!("f x {m}"))
                    .collect();
                let lines: Vec<Line> = harmonics
                    .iter()
                    .zip(labels.iter())
                    .map(|((_, data), label)| Line {
                        label,
                        t0: ts.t0,
                        sample_rate: ts.sample_rate,
                        data: data.view(),
                    })
                    .collect();
                let (path, relative) = plot_paths(&self.output_dir, &file_stem(&r.channel));
                let fig = plot::or_warn(
                    plot::fringes(
                        &path,
                        &r.channel,
                        self.gps_start,
                        &lines,
                        triggers,
                        &r.segments,
                        self.fmax,
                    ),
                    &r.channel,
                );
                (r.channel.clone(), fig.map(|_| relative))
            })
            .collect();
        pb.finish_and_clear();
        figures
            .into_iter()
            .filter_map(|(c, f)| f.map(|f| (c, f)))
            .collect()
    }

    fn report(&self, summary: &ScatteringSummary, figures: &IndexMap<String, PathBuf>) -> Page {
        let mut page = Page::new(format!("{} scattering", self.ifo));
        page.heading(2, "Parameters").parameters(&[
            ("Interferometer", self.ifo.clone()),
            ("Start", gps_with_utc(self.gps_start)),
            ("End", gps_with_utc(self.gps_end)),
            ("Main channel", self.main_channel.clone()),
            (
                "Analysed time",
                format!("{} s", summary.analysis_livetime),
            ),
            (
                "Triggers",
                format!(
                    "{} (SNR >= {}, frequency <= {} Hz)",
                    summary.num_triggers, self.snr_threshold, self.fmax
                ),
            ),
            (
                "Fringe threshold",
                format!(
                    "{} x fringe frequency >= {} Hz",
                    self.config.threshold_multiplier, self.config.frequency_threshold
                ),
            ),
            ("Segment padding", format!("{} s", self.config.segment_pad)),
            ("Optic channels", summary.channels.len().to_string()),
        ]);
        if !summary.unreadable.is_empty() {
            page.alert(
                "warning",
                &format!(
                    "{} channels couldn't be read: {}",
                    summary.unreadable.len(),
                    summary.unreadable.join(", ")
                ),
            );
        }

        page.heading(2, "Scattering segments");
        if summary.segments.is_empty() {
            page.alert("success", "No optic moved fast enough to scatter light.");
        } else {
            page.paragraph(&format!(
                "{} segments covering {} s ({:.2}% of the analysed time); written to scattering-segments.txt.",
                summary.segments.len(),
                summary.livetime,
                100.0 * summary.livetime / summary.analysis_livetime.max(f64::MIN_POSITIVE)
            ));
        }

        page.heading(2, "Channels");
        let rows: Vec<Vec<Cell>> = summary
            .channels
            .iter()
            .map(|r| {
                vec![
                    match figures.get(&r.channel) {
                        Some(f) => Cell::link(&r.channel, f.display().to_string()),
                        None => Cell::from(r.channel.as_str()),
                    },
                    Cell::from(format!("{:.2}", r.peak_fringe)),
                    Cell::from(format!("{}", r.livetime)),
                    Cell::from(format!("{:.2}%", 100.0 * r.deadtime)),
                    Cell::from(r.num_coincident.to_string()),
                    Cell::from(r.num_fringe_consistent.to_string()),
                    Cell::from(format!("{:.2}%", 100.0 * r.efficiency)),
                    Cell::from(format!("{:.2}", r.ratio)),
                ]
            })
            .collect();
        page.table(
            &[
                "Channel",
                "Peak fringe [Hz]",
                "Livetime [s]",
                "Deadtime",
                "Coincident triggers",
                "Fringe-consistent",
                "Efficiency",
                "Efficiency/deadtime",
            ],
            &rows,
        );
        for (channel, f) in figures {
            page.figure(f, channel);
        }

        if let Some(dag) = &summary.omega_dag {
            page.heading(2, "Omega scans");
            page.paragraph(&format!(
                "{} scans were written to {}",
                summary.omega_times.len(),
                dag.display()
            ));
            let rows: Vec<Vec<Cell>> = summary
                .omega_times
                .iter()
                .map(|&t| vec![Cell::from(gps_with_utc(t))])
                .collect();
            page.table(&["GPS time"], &rows);
        }
        page
    }
}

#[derive(thiserror::Error, Debug)]
pub(crate) enum ScatteringSearchError {
    #[error("None of the optic channels could be read")]
    NoChannels,

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Triggers(#[from] TriggerReadError),

    #[error(transparent)]
    Scattering(#[from] ScatteringError),

    #[error(transparent)]
    Segments(#[from] SegmentsError),

    #[error(transparent)]
    Condor(#[from] CondorError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("Couldn't write the JSON summary: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{file}: {err}")]
    IO { file: PathBuf, err: std::io::Error },
}
