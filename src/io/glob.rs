// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Functions to glob files.

use std::path::PathBuf;

use glob::glob;
use thiserror::Error;

/// Given a glob pattern, get all of the matches from the filesystem.
pub(crate) fn get_all_matches_from_glob(g: &str) -> Result<Vec<PathBuf>, GlobError> {
    let mut entries = vec![];
    for entry in glob(g)? {
        match entry {
            Ok(e) => entries.push(e),
            Err(e) => return Err(GlobError::GlobCrate(e)),
        }
    }
    Ok(entries)
}

/// Expand many glob patterns. Each pattern must match at least one file;
/// duplicate matches are removed and the result is sorted.
pub(crate) fn get_matches_from_globs<S: AsRef<str>>(globs: &[S]) -> Result<Vec<PathBuf>, GlobError> {
    let mut all = vec![];
    for g in globs {
        let g = g.as_ref();
        let entries = get_all_matches_from_glob(g)?;
        if entries.is_empty() {
            return Err(GlobError::NoMatches {
                glob: g.to_string(),
            });
        }
        all.extend(entries);
    }
    all.sort_unstable();
    all.dedup();
    Ok(all)
}

#[derive(Error, Debug)]
/// Error type associated with glob helper functions.
pub enum GlobError {
    #[error("No glob matches were found for {glob}")]
    NoMatches { glob: String },

    #[error(transparent)]
    GlobCrate(#[from] glob::GlobError),

    #[error(transparent)]
    PatternError(#[from] glob::PatternError),
}
