// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LassoError {
    #[error("The design matrix has {samples} samples but there are {targets} target values")]
    ShapeMismatch { samples: usize, targets: usize },

    #[error("There are no samples or no channels to fit")]
    EmptyDesign,

    #[error("Channel '{channel}' has {got} samples, but {expected} were expected")]
    LengthMismatch {
        channel: String,
        expected: usize,
        got: usize,
    },

    #[error("Only {samples} samples for {channels} channels; the fit needs more samples than channels (try a longer span or fewer channels)")]
    TooFewSamples { samples: usize, channels: usize },

    #[error("The Lasso solver failed: {0}")]
    Fit(String),

    #[error("The regularisation strength must be non-negative; got {0}")]
    BadAlpha(f64),

    #[error("Cannot do {folds}-fold cross validation with {samples} samples; need at least 2 folds and no more folds than samples")]
    BadFolds { folds: usize, samples: usize },

    #[error("At least one alpha is needed for cross validation")]
    NoAlphas,

    #[error("The primary channel is not correlated with any auxiliary channel; nothing to fit")]
    NoSignal,

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}
