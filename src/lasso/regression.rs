// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! L1-regularised least squares, fitted with `smartcore`.
//!
//! `smartcore` minimises `(1/n)·||y − Xw||² + α·||w||₁`. `X` and `y` are not
//! rescaled here; callers standardise them first.

use log::{debug, trace};
use ndarray::prelude::*;
use rayon::prelude::*;
use smartcore::{
    linalg::{naive::dense_matrix::DenseMatrix, BaseMatrix},
    linear::lasso::{Lasso as FittedLasso, LassoParameters},
};

use super::LassoError;

/// Parameters for a single Lasso fit.
#[derive(Debug, Clone, Copy)]
pub struct Lasso {
    /// The regularisation strength.
    pub alpha: f64,

    /// The most interior-point iterations the solver may take.
    pub max_iter: usize,

    /// The relative duality gap at which the solver stops.
    pub tol: f64,
}

/// The result of a Lasso fit.
#[derive(Debug, Clone)]
pub struct LassoFit {
    pub coef: Array1<f64>,
    pub intercept: f64,
    pub alpha: f64,
}

fn check_shapes(x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<(), LassoError> {
    if x.nrows() != y.len() {
        return Err(LassoError::ShapeMismatch {
            samples: x.nrows(),
            targets: y.len(),
        });
    }
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(LassoError::EmptyDesign);
    }
    if x.nrows() <= x.ncols() {
        return Err(LassoError::TooFewSamples {
            samples: x.nrows(),
            channels: x.ncols(),
        });
    }
    Ok(())
}

impl Lasso {
    pub fn fit(&self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<LassoFit, LassoError> {
        check_shapes(x, y)?;
        if !(self.alpha >= 0.0) {
            return Err(LassoError::BadAlpha(self.alpha));
        }

        let rows: Vec<Vec<f64>> = x.outer_iter().map(|row| row.to_vec()).collect();
        let fitted = FittedLasso::fit(
            &DenseMatrix::from_2d_vec(&rows),
            &y.to_vec(),
            LassoParameters::default()
                .with_alpha(self.alpha)
                .with_normalize(false)
                .with_tol(self.tol)
                .with_max_iter(self.max_iter),
        )
        .map_err(|e| LassoError::Fit(e.to_string()))?;
        let coef = Array1::from_shape_fn(x.ncols(), |j| fitted.coefficients().get(j, 0));
        trace!(
            "Lasso fit with alpha {} has {} non-zero coefficients",
            self.alpha,
            coef.iter().filter(|&&c| c != 0.0).count()
        );

        Ok(LassoFit {
            coef,
            intercept: fitted.intercept(),
            alpha: self.alpha,
        })
    }
}

/// The smallest regularisation strength that sets every coefficient to zero.
pub fn alpha_max(x: ArrayView2<f64>, y: ArrayView1<f64>) -> f64 {
    let n = x.nrows() as f64;
    2.0 * x.t().dot(&y).iter().fold(0.0_f64, |acc, v| acc.max(v.abs())) / n
}

/// The outcome of choosing the regularisation strength by cross validation.
#[derive(Debug, Clone)]
pub struct CvResult {
    pub alpha: f64,

    /// Every strength tried, largest first.
    pub alphas: Vec<f64>,

    /// The mean validation mean-squared error for each strength.
    pub mse: Vec<f64>,
}

/// Choose the Lasso regularisation strength with k-fold cross validation.
///
/// Strengths are log-spaced from [`alpha_max`] down to `alpha_max · ratio`.
/// Folds are contiguous blocks of samples (time series shouldn't be
/// shuffled) and are fitted in parallel.
pub fn select_alpha_cv(
    x: ArrayView2<f64>,
    y: ArrayView1<f64>,
    n_alphas: usize,
    ratio: f64,
    n_folds: usize,
    max_iter: usize,
    tol: f64,
) -> Result<CvResult, LassoError> {
    check_shapes(x, y)?;
    let n_samples = x.nrows();
    if n_folds < 2 || n_folds > n_samples {
        return Err(LassoError::BadFolds {
            folds: n_folds,
            samples: n_samples,
        });
    }
    if n_alphas == 0 {
        return Err(LassoError::NoAlphas);
    }
    // The largest fold is left out of the smallest training set.
    let min_train = n_samples - n_samples.div_ceil(n_folds);
    if min_train <= x.ncols() {
        return Err(LassoError::TooFewSamples {
            samples: min_train,
            channels: x.ncols(),
        });
    }

    let a_max = alpha_max(x, y);
    if a_max <= 0.0 || !a_max.is_finite() {
        return Err(LassoError::NoSignal);
    }
    let alphas = Array1::geomspace(a_max, a_max * ratio, n_alphas)
        .ok_or(LassoError::NoSignal)?
        .to_vec();
    debug!(
        "Cross validating {n_alphas} alphas from {a_max:.3e} to {:.3e} with {n_folds} folds",
        a_max * ratio
    );

    // Fold boundaries; the first (n_samples % n_folds) folds get an extra
    // sample.
    let fold_bounds: Vec<(usize, usize)> = {
        let base = n_samples / n_folds;
        let extra = n_samples % n_folds;
        let mut start = 0;
        (0..n_folds)
            .map(|i| {
                let len = base + usize::from(i < extra);
                let b = (start, start + len);
                start += len;
                b
            })
            .collect()
    };

    let fold_mse: Vec<Vec<f64>> = fold_bounds
        .par_iter()
        .map(|&(v0, v1)| -> Result<Vec<f64>, LassoError> {
            let train_idx: Vec<usize> = (0..v0).chain(v1..n_samples).collect();
            let x_train = x.select(Axis(0), &train_idx);
            let y_train = y.select(Axis(0), &train_idx);
            let x_val = x.slice(s![v0..v1, ..]);
            let y_val = y.slice(s![v0..v1]);

            alphas
                .iter()
                .map(|&alpha| {
                    let fit = Lasso {
                        alpha,
                        max_iter,
                        tol,
                    }
                    .fit(x_train.view(), y_train.view())?;
                    let pred = x_val.dot(&fit.coef) + fit.intercept;
                    Ok((&pred - &y_val).mapv(|e| e * e).mean().unwrap_or(f64::NAN))
                })
                .collect()
        })
        .collect::<Result<_, _>>()?;

    let mse: Vec<f64> = (0..alphas.len())
        .map(|i| fold_mse.iter().map(|f| f[i]).sum::<f64>() / n_folds as f64)
        .collect();
    let best = mse
        .iter()
        .enumerate()
        .filter(|(_, m)| m.is_finite())
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(i, _)| i)
        .ok_or(LassoError::NoSignal)?;
    debug!(
        "Best alpha from cross validation: {:.3e} (MSE {:.3e})",
        alphas[best], mse[best]
    );

    Ok(CvResult {
        alpha: alphas[best],
        alphas,
        mse,
    })
}
