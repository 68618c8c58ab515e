// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all gwdetchar-related errors. This should be the *only*
//! error enum that is publicly visible.

use thiserror::Error;

use super::{
    common::{CondorArgsError, DataArgsError},
    lasso::LassoArgsError,
    omega_batch::OmegaBatchArgsError,
    profile_get_data::ProfileArgsError,
    scattering::ScatteringArgsError,
};
use crate::{
    condor::CondorError,
    data::DataError,
    lasso::LassoError,
    params::{LassoCorrelationError, OmegaBatchError, ProfileError, ScatteringSearchError},
    report::ReportError,
    scattering::ScatteringError,
    segments::SegmentsError,
    triggers::TriggerReadError,
};

const URL: &str = "https://gwdetchar.readthedocs.io/en/stable";

/// The *only* publicly visible error from gwdetchar. Each error message should
/// include the URL, unless it's "generic".
#[derive(Error, Debug)]
pub enum DetcharError {
    /// An error related to lasso-correlation.
    #[error("{0}\n\nSee for more info: {URL}/lasso/index.html")]
    LassoCorrelation(String),

    /// An error related to the scattering search.
    #[error("{0}\n\nSee for more info: {URL}/scattering/index.html")]
    Scattering(String),

    /// An error related to Omega-scan batches and Condor.
    #[error("{0}\n\nSee for more info: {URL}/omega/index.html")]
    OmegaBatch(String),

    /// An error related to profile-get-data.
    #[error("{0}\n\nSee for more info: {URL}/profile.html")]
    ProfileGetData(String),

    /// An error related to finding or reading channel data.
    #[error("{0}\n\nSee for more info: {URL}/data.html")]
    Data(String),

    /// An error related to segment files.
    #[error("{0}\n\nSee for more info: {URL}/segments.html")]
    Segments(String),

    /// An error related to trigger files.
    #[error("{0}\n\nSee for more info: {URL}/triggers.html")]
    Triggers(String),

    /// An error related to argument files.
    #[error("{0}\n\nSee for more info: {URL}/arg_file.html")]
    ArgFile(String),

    /// A generic error that can't be clarified further with documentation, e.g.
    /// IO errors.
    #[error("{0}")]
    Generic(String),
}

// When changing the error propagation below, ensure `Self::from(e)` uses the
// correct `e`!

// Binary sub-command errors.

impl From<LassoArgsError> for DetcharError {
    fn from(e: LassoArgsError) -> Self {
        match e {
            LassoArgsError::ChannelList(e) => Self::from(e),
            LassoArgsError::NoChannelFile
            | LassoArgsError::BadAlpha(_)
            | LassoArgsError::BadOutlierSigma(_)
            | LassoArgsError::BadCvFolds(_)
            | LassoArgsError::BadThreshold(_)
            | LassoArgsError::BadClusterCoefficient(_)
            | LassoArgsError::BadRegex(_)
            | LassoArgsError::NoChannelsAfterFilter(_) => Self::LassoCorrelation(e.to_string()),
        }
    }
}

impl From<LassoCorrelationError> for DetcharError {
    fn from(e: LassoCorrelationError) -> Self {
        match e {
            LassoCorrelationError::PrimaryMissing(_)
            | LassoCorrelationError::PrimaryFlat(_)
            | LassoCorrelationError::PrimaryNonFinite(_)
            | LassoCorrelationError::NoChannels => Self::LassoCorrelation(e.to_string()),
            LassoCorrelationError::Data(e) => Self::from(e),
            LassoCorrelationError::Lasso(e) => Self::from(e),
            LassoCorrelationError::Report(e) => Self::from(e),
            LassoCorrelationError::Json(_) | LassoCorrelationError::IO { .. } => {
                Self::Generic(e.to_string())
            }
        }
    }
}

impl From<ScatteringArgsError> for DetcharError {
    fn from(e: ScatteringArgsError) -> Self {
        match e {
            ScatteringArgsError::ChannelList(e) => Self::from(e),
            ScatteringArgsError::SegmentFile(e) => Self::from(e),
            ScatteringArgsError::NoMultipliers
            | ScatteringArgsError::NotPositive { .. }
            | ScatteringArgsError::BadSegmentPad(_)
            | ScatteringArgsError::NoChannels
            | ScatteringArgsError::NoAnalysisTime { .. } => Self::Scattering(e.to_string()),
        }
    }
}

impl From<ScatteringSearchError> for DetcharError {
    fn from(e: ScatteringSearchError) -> Self {
        match e {
            ScatteringSearchError::NoChannels => Self::Scattering(e.to_string()),
            ScatteringSearchError::Data(e) => Self::from(e),
            ScatteringSearchError::Triggers(e) => Self::from(e),
            ScatteringSearchError::Scattering(e) => Self::from(e),
            ScatteringSearchError::Segments(e) => Self::from(e),
            ScatteringSearchError::Condor(e) => Self::from(e),
            ScatteringSearchError::Report(e) => Self::from(e),
            ScatteringSearchError::Json(_) | ScatteringSearchError::IO { .. } => {
                Self::Generic(e.to_string())
            }
        }
    }
}

impl From<OmegaBatchArgsError> for DetcharError {
    fn from(e: OmegaBatchArgsError) -> Self {
        Self::OmegaBatch(e.to_string())
    }
}

impl From<OmegaBatchError> for DetcharError {
    fn from(e: OmegaBatchError) -> Self {
        match e {
            OmegaBatchError::Condor(e) => Self::from(e),
        }
    }
}

impl From<ProfileArgsError> for DetcharError {
    fn from(e: ProfileArgsError) -> Self {
        match e {
            ProfileArgsError::ChanList(e) => Self::from(e),
            ProfileArgsError::NoChanList
            | ProfileArgsError::NoOut
            | ProfileArgsError::ZeroChannels
            | ProfileArgsError::BadHours(_) => Self::ProfileGetData(e.to_string()),
        }
    }
}

impl From<ProfileError> for DetcharError {
    fn from(e: ProfileError) -> Self {
        match e {
            ProfileError::Data(e) => Self::from(e),
            ProfileError::IO { .. } => Self::Generic(e.to_string()),
        }
    }
}

// Common argument errors.

impl From<DataArgsError> for DetcharError {
    fn from(e: DataArgsError) -> Self {
        Self::Data(e.to_string())
    }
}

impl From<CondorArgsError> for DetcharError {
    fn from(e: CondorArgsError) -> Self {
        match e {
            CondorArgsError::Condor(e) => Self::from(e),
            CondorArgsError::BadUniverse(_) | CondorArgsError::ConfigFileMissing(_) => {
                Self::OmegaBatch(e.to_string())
            }
        }
    }
}

// Library errors.

impl From<DataError> for DetcharError {
    fn from(e: DataError) -> Self {
        match e {
            DataError::ThreadPool(_) | DataError::IO { .. } => Self::Generic(e.to_string()),
            _ => Self::Data(e.to_string()),
        }
    }
}

impl From<SegmentsError> for DetcharError {
    fn from(e: SegmentsError) -> Self {
        match e {
            SegmentsError::BadLine { .. } => Self::Segments(e.to_string()),
            SegmentsError::IO { .. } => Self::Generic(e.to_string()),
        }
    }
}

impl From<TriggerReadError> for DetcharError {
    fn from(e: TriggerReadError) -> Self {
        match e {
            TriggerReadError::BadLine { .. } | TriggerReadError::Glob(_) => {
                Self::Triggers(e.to_string())
            }
            TriggerReadError::IO { .. } => Self::Generic(e.to_string()),
        }
    }
}

impl From<CondorError> for DetcharError {
    fn from(e: CondorError) -> Self {
        match e {
            CondorError::IO { .. } => Self::Generic(e.to_string()),
            _ => Self::OmegaBatch(e.to_string()),
        }
    }
}

impl From<LassoError> for DetcharError {
    fn from(e: LassoError) -> Self {
        Self::LassoCorrelation(e.to_string())
    }
}

impl From<ScatteringError> for DetcharError {
    fn from(e: ScatteringError) -> Self {
        Self::Scattering(e.to_string())
    }
}

impl From<ReportError> for DetcharError {
    fn from(e: ReportError) -> Self {
        Self::Generic(e.to_string())
    }
}

impl From<std::io::Error> for DetcharError {
    fn from(e: std::io::Error) -> Self {
        Self::Generic(e.to_string())
    }
}
