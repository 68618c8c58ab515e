// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Some helper statistics.


use ndarray::prelude::*;
use ndarray_stats::{interpolate::Midpoint, Quantile1dExt};
use noisy_float::types::{n64, N64};

/// The median of the finite values in `x`. NaN if there are none.
pub fn median<'a, I: IntoIterator<Item = &'a f64>>(x: I) -> f64 {
    let mut finite: Array1<N64> = x
        .into_iter()
        .copied()
        .filter(|v| v.is_finite())
        .map(n64)
        .collect();
    finite
        .quantile_mut(n64(0.5), &Midpoint)
        .map(|m| m.raw())
        .unwrap_or(f64::NAN)
}

/// The Pearson correlation coefficient between two samples.
///
/// Returns a value in `[-1, 1]`, or NaN if the samples have different lengths,
/// are empty, or either has no variance. The variance test is relative to the
/// size of the samples, so the result doesn't depend on their units.
pub fn pearson(x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
    let (Some(mean_x), Some(mean_y)) = (x.mean(), y.mean()) else {
        return f64::NAN;
    };
    if x.len() != y.len() {
        return f64::NAN;
    }

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (&a, &b) in x.iter().zip(y.iter()) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    // Rounding leaves a little variance in constant samples.
    let flat = |var: f64, v: ArrayView1<f64>| var <= f64::EPSILON * v.dot(&v);
    if flat(var_x, x) || flat(var_y, y) {
        return f64::NAN;
    }

    (cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0)
}

/// Standardise a sample to zero mean and unit variance. The mean and standard
/// deviation used are also returned so that the scaling can be undone. A
/// sample with no variance is only centred.
pub fn zscore(x: ArrayView1<f64>) -> (Array1<f64>, f64, f64) {
    let m = x.mean().unwrap_or(f64::NAN);
    let s = x.std(0.0);
    let scaled = if s > 0.0 {
        x.mapv(|v| (v - m) / s)
    } else {
        x.mapv(|v| v - m)
    };
    (scaled, m, s)
}
