// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::f64::consts::TAU;

use approx::assert_abs_diff_eq;
use ndarray::array;

use super::*;

const N: usize = 200;

/// Sinusoids with a whole number of periods in N samples are orthogonal.
fn sinusoid(k: usize, cos: bool) -> Array1<f64> {
    Array1::from_shape_fn(N, |i| {
        let phase = TAU * (k * i) as f64 / N as f64;
        if cos {
            phase.cos()
        } else {
            phase.sin()
        }
    })
}

/// Four orthogonal columns and y = 3·x0 − 2·x2.
fn orthogonal_problem() -> (Array2<f64>, Array1<f64>) {
    let cols = [
        sinusoid(1, false),
        sinusoid(3, false),
        sinusoid(5, true),
        sinusoid(7, false),
    ];
    let views: Vec<_> = cols.iter().map(|c| c.view()).collect();
    let x = ndarray::stack(Axis(1), &views).unwrap();
    let y = &cols[0] * 3.0 - &cols[2] * 2.0;
    (x, y)
}

#[test]
fn test_lasso_fit_orthogonal_design() {
    let (x, y) = orthogonal_problem();
    let alpha = 0.1;
    let fit = Lasso {
        alpha,
        max_iter: 1000,
        tol: 1e-8,
    }
    .fit(x.view(), y.view())
    .unwrap();
    // Each column has squared norm N/2, so the L1 penalty shrinks each
    // coefficient by α.
    assert_abs_diff_eq!(
        fit.coef,
        array![3.0 - alpha, 0.0, -2.0 + alpha, 0.0],
        epsilon = 1e-3
    );
    assert_abs_diff_eq!(fit.intercept, 0.0, epsilon = 1e-9);
}

#[test]
fn test_alpha_max_zeroes_everything() {
    let (x, y) = orthogonal_problem();
    let a_max = alpha_max(x.view(), y.view());
    assert_abs_diff_eq!(a_max, 3.0, epsilon = 1e-9);

    let fit = Lasso {
        alpha: a_max * 1.01,
        max_iter: 1000,
        tol: 1e-8,
    }
    .fit(x.view(), y.view())
    .unwrap();
    assert!(fit.coef.iter().all(|&c| c.abs() < 1e-3), "{}", fit.coef);
}

#[test]
fn test_lasso_bad_inputs() {
    let (x, y) = orthogonal_problem();
    let lasso = Lasso {
        alpha: 0.1,
        max_iter: 10,
        tol: 1e-4,
    };
    assert!(matches!(
        lasso.fit(x.view(), y.slice(s![..10])),
        Err(LassoError::ShapeMismatch { .. })
    ));
    assert!(matches!(
        Lasso {
            alpha: -1.0,
            ..lasso
        }
        .fit(x.view(), y.view()),
        Err(LassoError::BadAlpha(_))
    ));
    // More channels than samples.
    assert!(matches!(
        lasso.fit(x.slice(s![..4, ..]), y.slice(s![..4])),
        Err(LassoError::TooFewSamples {
            samples: 4,
            channels: 4
        })
    ));
}

#[test]
fn test_select_alpha_cv() {
    let (x, y) = orthogonal_problem();
    let cv = select_alpha_cv(x.view(), y.view(), 30, 1e-3, 5, 1000, 1e-6).unwrap();
    assert_eq!(cv.alphas.len(), 30);
    assert_eq!(cv.mse.len(), 30);
    assert_abs_diff_eq!(cv.alphas[0], 3.0, epsilon = 1e-9);
    assert_abs_diff_eq!(cv.alphas[29], 3e-3, epsilon = 1e-9);
    // Without noise, less regularisation always predicts better.
    assert!(cv.alpha <= cv.alphas[15], "{cv:?}");
    let best = cv.mse.iter().copied().fold(f64::INFINITY, f64::min);
    assert!(best < cv.mse[0]);

    assert!(matches!(
        select_alpha_cv(x.view(), y.view(), 30, 1e-3, 1, 1000, 1e-6),
        Err(LassoError::BadFolds { folds: 1, .. })
    ));
    // 5 samples in 4 folds leave only 3 to train 4 channels.
    assert!(matches!(
        select_alpha_cv(x.slice(s![..5, ..]), y.slice(s![..5]), 5, 1e-3, 4, 1000, 1e-6),
        Err(LassoError::TooFewSamples {
            samples: 3,
            channels: 4
        })
    ));
    assert!(matches!(
        select_alpha_cv(x.view(), Array1::zeros(N).view(), 30, 1e-3, 5, 1000, 1e-6),
        Err(LassoError::NoSignal)
    ));
}

#[test]
fn test_sigma_clip_and_remove_outliers() {
    let mut data: Vec<f64> = [0.0, 1.0, -1.0].repeat(7);
    data.push(100.0);
    let mask = sigma_clip(ArrayView1::from(&data), 3.0);
    assert_eq!(mask.iter().filter(|&&o| o).count(), 1);
    assert!(mask[21]);

    let mut ts = TimeSeries::new("X1:PRIMARY", 0.0, 1.0, Array1::from(data));
    assert_eq!(remove_outliers(&mut ts, 3.0), 1);
    assert_abs_diff_eq!(ts.data[21], 0.0);
    // Nothing more to do.
    assert_eq!(remove_outliers(&mut ts, 3.0), 0);

    let with_nan = array![1.0, f64::NAN, 1.5, 1.0];
    let mask = sigma_clip(with_nan.view(), 3.0);
    assert_eq!(mask, array![false, true, false, false]);
}

#[test]
fn test_remove_flat_and_bad() {
    let mut channels: IndexMap<String, TimeSeries> = [
        ("X1:GOOD", array![1.0, 2.0, 3.0]),
        ("X1:FLAT", array![2.0, 2.0, 2.0]),
        ("X1:NAN", array![1.0, f64::NAN, 3.0]),
        ("X1:INF", array![1.0, 2.0, f64::INFINITY]),
    ]
    .into_iter()
    .map(|(c, d)| (c.to_string(), TimeSeries::new(c, 0.0, 1.0, d)))
    .collect();

    assert_eq!(remove_flat(&mut channels), vec!["X1:FLAT"]);
    assert_eq!(remove_bad(&mut channels), vec!["X1:NAN", "X1:INF"]);
    assert_eq!(channels.keys().collect::<Vec<_>>(), vec!["X1:GOOD"]);
}

#[test]
fn test_design_matrix() {
    let a = TimeSeries::new("X1:A", 0.0, 1.0, array![1.0, 2.0, 3.0]);
    let b = TimeSeries::new("X1:B", 0.0, 1.0, array![4.0, 5.0, 6.0]);
    let x = design_matrix([&a, &b], 3).unwrap();
    assert_eq!(x, array![[1.0, 4.0], [2.0, 5.0], [3.0, 6.0]]);

    let short = TimeSeries::new("X1:SHORT", 0.0, 1.0, array![1.0]);
    assert!(matches!(
        design_matrix([&a, &short], 3),
        Err(LassoError::LengthMismatch { got: 1, .. })
    ));

    let mut x = x;
    standardise_columns(&mut x);
    let scale = (1.5_f64).sqrt();
    assert_abs_diff_eq!(
        x,
        array![[-scale, -scale], [0.0, 0.0], [scale, scale]],
        epsilon = 1e-12
    );
}

#[test]
fn test_model_selection_and_prediction() {
    let model = LassoModel {
        channels: vec!["a".into(), "b".into(), "c".into(), "d".into()],
        coef: vec![0.5, -2.0, 0.0, 1e-5],
        intercept: 0.25,
        alpha: 0.1,
    };
    assert_eq!(model.selected(1e-4), vec![(1, "b", -2.0), (0, "a", 0.5)]);

    let x = array![[1.0, 1.0, 5.0, 0.0], [2.0, 0.0, 5.0, 0.0]];
    assert_abs_diff_eq!(model.predict(x.view()), array![-1.25, 1.25]);
}

#[test]
fn test_cumulative_contributions() {
    let (x, y) = orthogonal_problem();
    let r = cumulative_contributions(x.view(), y.view(), &[(0, 3.0), (2, -2.0)]);
    assert_eq!(r.len(), 2);
    assert_abs_diff_eq!(r[0], 3.0 / 13.0_f64.sqrt(), epsilon = 1e-9);
    assert_abs_diff_eq!(r[1], 1.0, epsilon = 1e-9);
}

#[test]
fn test_find_clusters() {
    let a = sinusoid(1, false);
    let b = &a * 2.0 + &sinusoid(3, false) * 0.01;
    let c = sinusoid(3, false);
    let d = -&a;
    let aux: IndexMap<String, TimeSeries> = [("a", a), ("b", b), ("c", c), ("d", d)]
        .into_iter()
        .map(|(n, data)| (n.to_string(), TimeSeries::new(n, 0.0, 1.0, data)))
        .collect();

    let clusters = find_clusters(&aux, &["a", "missing"], 0.85);
    assert_eq!(clusters.len(), 2);
    let members = &clusters["a"];
    assert_eq!(members.len(), 2);
    // Perfect anti-correlation sorts first.
    assert_eq!(members[0].channel, "d");
    assert_abs_diff_eq!(members[0].r, -1.0, epsilon = 1e-12);
    assert_eq!(members[1].channel, "b");
    assert!(members[1].r > 0.99);
    assert!(clusters["missing"].is_empty());
}
