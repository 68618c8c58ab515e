// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Searching for scattered light.
//!
//! Light scattered off a moving optic and recombined with the main beam
//! produces "fringes" at a frequency proportional to the optic's velocity.
//! The fringe frequency of each optic is projected from its motion, and times
//! when it is high enough to reach the sensitive band are compared with
//! triggers in the main channel.


use log::{debug, trace};
use ndarray::prelude::*;
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

use crate::{
    constants::LASER_WAVELENGTH_UM,
    data::{fill_ifo, TimeSeries},
    segments::{Segment, SegmentList},
    triggers::Trigger,
};

/// The projected fringe frequency \[Hz\] for a displacement series in µm:
/// `multiplier · |dx/dt| / λ`.
pub fn fringe_frequency(series: &TimeSeries, multiplier: f64) -> TimeSeries {
    let scale = multiplier * series.sample_rate / LASER_WAVELENGTH_UM;
    TimeSeries {
        channel: series.channel.clone(),
        t0: series.t0,
        sample_rate: series.sample_rate,
        data: series.gradient().mapv(|g| (g * scale).abs()),
    }
}

/// Expand optic and degree-of-freedom names into suspension damping
/// channels, e.g. `L1:SUS-ETMX_M1_DAMP_L_IN1_DQ`.
pub fn optic_channels<S: AsRef<str>, T: AsRef<str>>(
    ifo: &str,
    optics: &[S],
    dofs: &[T],
) -> Vec<String> {
    optics
        .iter()
        .flat_map(|optic| {
            dofs.iter().map(move |dof| {
                fill_ifo(
                    &format!(
                        "{{IFO}}:SUS-{}_M1_DAMP_{}_IN1_DQ",
                        optic.as_ref(),
                        dof.as_ref()
                    ),
                    ifo,
                )
            })
        })
        .collect()
}

/// Times when `threshold_multiplier` times the fringe frequency reaches
/// `frequency_threshold`. The segments are padded by `pad` seconds on each
/// side and restricted to the `analysis` segments.
pub fn scatter_segments(
    fringe: &TimeSeries,
    threshold_multiplier: f64,
    frequency_threshold: f64,
    pad: f64,
    analysis: &SegmentList,
) -> SegmentList {
    let mask: Vec<bool> = fringe
        .data
        .iter()
        .map(|&f| threshold_multiplier * f >= frequency_threshold)
        .collect();
    let times = fringe.times().to_vec();
    let mut segments = SegmentList::from_mask(&times, fringe.dt(), &mask);
    segments.protract(pad);
    segments.intersection(analysis)
}

/// Settings for [`analyse_channel`].
#[derive(Debug, Clone)]
pub struct ScatterConfig {
    /// The fringe harmonics to consider. Must not be empty.
    pub multipliers: Vec<f64>,
    pub threshold_multiplier: f64,

    /// \[Hz\]
    pub frequency_threshold: f64,

    /// \[seconds\]
    pub segment_pad: f64,
}

/// The scattering results for one optic channel.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelScatter {
    pub channel: String,
    pub segments: SegmentList,

    /// The total duration of `segments` \[seconds\].
    pub livetime: f64,

    /// The fraction of the analysed time covered by `segments`.
    pub deadtime: f64,

    /// The largest fundamental fringe frequency \[Hz\].
    pub peak_fringe: f64,

    /// The number of triggers inside `segments`.
    pub num_coincident: usize,

    /// The number of coincident triggers whose frequency is no higher than the
    /// highest fringe harmonic at the time of the trigger.
    pub num_fringe_consistent: usize,

    /// The fraction of all triggers that are coincident.
    pub efficiency: f64,

    /// `efficiency / deadtime`; 0 if there's no deadtime.
    pub ratio: f64,
}

/// Find scattering segments for a single optic channel and compare them with
/// the triggers. The triggers should already be restricted to the analysis
/// segments.
pub fn analyse_channel(
    series: &TimeSeries,
    triggers: &[Trigger],
    analysis: &SegmentList,
    config: &ScatterConfig,
) -> Result<ChannelScatter, ScatteringError> {
    let highest = config
        .multipliers
        .iter()
        .copied()
        .fold(f64::NAN, f64::max);
    if !highest.is_finite() || highest <= 0.0 {
        return Err(ScatteringError::NoHarmonics);
    }

    let fringe = fringe_frequency(series, 1.0);
    let segments = scatter_segments(
        &fringe,
        config.threshold_multiplier,
        config.frequency_threshold,
        config.segment_pad,
        analysis,
    );
    let livetime = segments.livetime();
    let analysis_livetime = analysis.livetime();
    let deadtime = if analysis_livetime > 0.0 {
        livetime / analysis_livetime
    } else {
        0.0
    };
    let peak_fringe = fringe.data.iter().copied().fold(0.0, f64::max);

    let coincident: Vec<&Trigger> = triggers
        .iter()
        .filter(|t| segments.contains(t.time))
        .collect();
    let num_fringe_consistent = coincident
        .iter()
        .filter(|t| {
            fringe
                .index_of(t.time)
                .map(|i| t.frequency <= highest * fringe.data[i])
                .unwrap_or(false)
        })
        .count();
    let num_coincident = coincident.len();
    let efficiency = if triggers.is_empty() {
        0.0
    } else {
        num_coincident as f64 / triggers.len() as f64
    };
    let ratio = if deadtime > 0.0 {
        efficiency / deadtime
    } else {
        0.0
    };
    trace!(
        "{}: {} segments, {livetime} s, {num_coincident} coincident triggers",
        series.channel,
        segments.len()
    );

    Ok(ChannelScatter {
        channel: series.channel.clone(),
        segments,
        livetime,
        deadtime,
        peak_fringe,
        num_coincident,
        num_fringe_consistent,
        efficiency,
        ratio,
    })
}

/// [`analyse_channel`] for many channels in parallel. The results are
/// [ranked](rank).
pub fn analyse_channels<'a, I>(
    channels: I,
    triggers: &[Trigger],
    analysis: &SegmentList,
    config: &ScatterConfig,
) -> Result<Vec<ChannelScatter>, ScatteringError>
where
    I: IntoParallelIterator<Item = &'a TimeSeries>,
{
    let mut results: Vec<ChannelScatter> = channels
        .into_par_iter()
        .map(|ts| analyse_channel(ts, triggers, analysis, config))
        .collect::<Result<_, _>>()?;
    rank(&mut results);
    debug!(
        "{} of {} channels show scattering",
        results.iter().filter(|r| !r.segments.is_empty()).count(),
        results.len()
    );
    Ok(results)
}

/// Sort by descending coincident trigger count, then by descending
/// efficiency/deadtime ratio.
pub fn rank(results: &mut [ChannelScatter]) {
    results.sort_by(|a, b| {
        b.num_coincident
            .cmp(&a.num_coincident)
            .then(b.ratio.total_cmp(&a.ratio))
    });
}

/// The union of all channels' scattering segments.
pub fn union_segments(results: &[ChannelScatter]) -> SegmentList {
    SegmentList::from_segments(
        results
            .iter()
            .flat_map(|r| r.segments.iter().copied())
            .collect::<Vec<Segment>>(),
    )
}

/// The fringe frequency of every harmonic, ready for plotting.
pub fn harmonics(series: &TimeSeries, multipliers: &[f64]) -> Vec<(f64, Array1<f64>)> {
    let base = fringe_frequency(series, 1.0);
    multipliers
        .iter()
        .map(|&m| (m, base.data.mapv(|f| f * m)))
        .collect()
}

#[derive(Error, Debug)]
pub enum ScatteringError {
    #[error("At least one positive fringe harmonic multiplier is required")]
    NoHarmonics,
}
