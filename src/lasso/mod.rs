// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Finding auxiliary channels that are linearly related to a primary channel
//! with L1-regularised regression.

mod error;
mod regression;
#[cfg(test)]
mod tests;

pub use error::LassoError;
pub use regression::{alpha_max, select_alpha_cv, CvResult, Lasso, LassoFit};

use indexmap::IndexMap;
use log::debug;
use ndarray::prelude::*;
use rayon::prelude::*;
use serde::Serialize;

use crate::{
    data::TimeSeries,
    math::{median, pearson},
};

/// The most clipping passes [`sigma_clip`] will make.
const MAX_CLIP_ITERATIONS: usize = 20;

/// Iteratively find samples more than `nsigma` standard deviations from the
/// median. Each pass uses the median and standard deviation of the samples
/// not yet rejected; passes stop once nothing new is rejected. The returned
/// mask is `true` for outliers. Non-finite samples are always outliers.
pub fn sigma_clip(data: ArrayView1<f64>, nsigma: f64) -> Array1<bool> {
    let mut outlier: Array1<bool> = data.mapv(|v| !v.is_finite());
    for _ in 0..MAX_CLIP_ITERATIONS {
        let kept: Array1<f64> = data
            .iter()
            .zip(outlier.iter())
            .filter(|&(_, &o)| !o)
            .map(|(&v, _)| v)
            .collect();
        if kept.len() < 2 {
            break;
        }
        let centre = median(kept.iter());
        let limit = nsigma * kept.std(0.0);

        let mut changed = false;
        for (o, &v) in outlier.iter_mut().zip(data.iter()) {
            if !*o && (v - centre).abs() > limit {
                *o = true;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    outlier
}

/// Replace the sigma-clipped samples of `series` with the median of the
/// samples that were kept. Returns the number of samples replaced.
pub fn remove_outliers(series: &mut TimeSeries, nsigma: f64) -> usize {
    let mask = sigma_clip(series.data.view(), nsigma);
    let num_outliers = mask.iter().filter(|&&o| o).count();
    if num_outliers == 0 {
        return 0;
    }
    let fill = median(
        series
            .data
            .iter()
            .zip(mask.iter())
            .filter(|&(_, &o)| !o)
            .map(|(v, _)| v),
    );
    series
        .data
        .iter_mut()
        .zip(mask.iter())
        .filter(|&(_, &o)| o)
        .for_each(|(v, _)| *v = fill);
    debug!(
        "Replaced {num_outliers} outliers in '{}' with {fill}",
        series.channel
    );
    num_outliers
}

/// Drop channels whose data don't change. Returns the dropped channel names.
pub fn remove_flat(channels: &mut IndexMap<String, TimeSeries>) -> Vec<String> {
    remove_where(channels, TimeSeries::is_flat)
}

/// Drop channels with non-finite data. Returns the dropped channel names.
pub fn remove_bad(channels: &mut IndexMap<String, TimeSeries>) -> Vec<String> {
    remove_where(channels, TimeSeries::has_non_finite)
}

fn remove_where<F: Fn(&TimeSeries) -> bool>(
    channels: &mut IndexMap<String, TimeSeries>,
    f: F,
) -> Vec<String> {
    let dropped: Vec<String> = channels
        .iter()
        .filter(|(_, ts)| f(ts))
        .map(|(c, _)| c.clone())
        .collect();
    channels.retain(|_, ts| !f(ts));
    dropped
}

/// Stack the data of the channels as columns of a design matrix. All series
/// must have `n_samples` samples.
pub fn design_matrix<'a, I>(series: I, n_samples: usize) -> Result<Array2<f64>, LassoError>
where
    I: IntoIterator<Item = &'a TimeSeries>,
{
    let columns: Vec<ArrayView1<f64>> = series
        .into_iter()
        .map(|ts| {
            if ts.len() == n_samples {
                Ok(ts.data.view())
            } else {
                Err(LassoError::LengthMismatch {
                    channel: ts.channel.clone(),
                    expected: n_samples,
                    got: ts.len(),
                })
            }
        })
        .collect::<Result<_, _>>()?;
    if columns.is_empty() {
        return Err(LassoError::EmptyDesign);
    }
    Ok(ndarray::stack(Axis(1), &columns)?)
}

/// Standardise each column of `x` to zero mean and unit variance, in place.
/// Columns without variance are only centred.
pub fn standardise_columns(x: &mut Array2<f64>) {
    for mut col in x.axis_iter_mut(Axis(1)) {
        let (scaled, _, _) = crate::math::zscore(col.view());
        col.assign(&scaled);
    }
}

/// Coefficients of a Lasso fit, labelled by channel.
#[derive(Debug, Clone, Serialize)]
pub struct LassoModel {
    pub channels: Vec<String>,
    pub coef: Vec<f64>,
    pub intercept: f64,
    pub alpha: f64,
}

impl LassoModel {
    pub fn new(channels: Vec<String>, fit: LassoFit) -> Self {
        Self {
            channels,
            coef: fit.coef.to_vec(),
            intercept: fit.intercept,
            alpha: fit.alpha,
        }
    }

    /// The channels with `|coefficient| > threshold`, sorted by descending
    /// `|coefficient|`. The index of each channel in the design matrix is
    /// also given.
    pub fn selected(&self, threshold: f64) -> Vec<(usize, &str, f64)> {
        let mut selected: Vec<(usize, &str, f64)> = self
            .channels
            .iter()
            .zip(self.coef.iter())
            .enumerate()
            .filter(|(_, (_, c))| c.abs() > threshold)
            .map(|(i, (name, &c))| (i, name.as_str(), c))
            .collect();
        selected.sort_by(|a, b| b.2.abs().total_cmp(&a.2.abs()));
        selected
    }

    pub fn predict(&self, x: ArrayView2<f64>) -> Array1<f64> {
        x.dot(&ArrayView1::from(&self.coef)) + self.intercept
    }
}

/// For each `k` in `1..=selected.len()`, the Pearson correlation between `y`
/// and the model made from only the first `k` of the selected `(column,
/// coefficient)` pairs.
pub fn cumulative_contributions(
    x: ArrayView2<f64>,
    y: ArrayView1<f64>,
    selected: &[(usize, f64)],
) -> Vec<f64> {
    let mut model: Array1<f64> = Array1::zeros(x.nrows());
    selected
        .iter()
        .map(|&(i, coef)| {
            model.scaled_add(coef, &x.column(i));
            pearson(y, model.view())
        })
        .collect()
}

/// A channel correlated with a selected channel.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterMember {
    pub channel: String,
    pub r: f64,
}

/// For each selected channel, every other auxiliary channel whose Pearson
/// correlation with it has `|r| ≥ threshold`, sorted by descending `|r|`.
/// The work is shared among the selected channels in parallel.
pub fn find_clusters(
    aux: &IndexMap<String, TimeSeries>,
    selected: &[&str],
    threshold: f64,
) -> IndexMap<String, Vec<ClusterMember>> {
    let clusters: Vec<(String, Vec<ClusterMember>)> = selected
        .par_iter()
        .map(|&name| {
            let mut members = vec![];
            if let Some(base) = aux.get(name) {
                for (other, ts) in aux {
                    if other == name {
                        continue;
                    }
                    let r = pearson(base.data.view(), ts.data.view());
                    if r.abs() >= threshold {
                        members.push(ClusterMember {
                            channel: other.clone(),
                            r,
                        });
                    }
                }
            }
            members.sort_by(|a, b| b.r.abs().total_cmp(&a.r.abs()));
            (name.to_string(), members)
        })
        .collect();
    clusters.into_iter().collect()
}
