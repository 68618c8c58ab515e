// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use log::info;
use vec1::Vec1;

use crate::condor::{submit_dag, CondorError, OmegaBatch, Universe};

/// How Omega-scan jobs are run by Condor. Everything but the times, the
/// interferometer and where the scans go.
#[derive(Debug, Clone)]
pub(crate) struct CondorParams {
    pub(crate) executable: String,
    pub(crate) config_file: Option<PathBuf>,
    pub(crate) universe: Universe,
    pub(crate) accounting_group: Option<String>,
    pub(crate) accounting_group_user: Option<String>,
    pub(crate) condor_commands: Vec<(String, String)>,
    pub(crate) extra_args: Vec<String>,
    pub(crate) retry: u32,

    /// Submit the DAG after writing it?
    pub(crate) submit: bool,
}

impl CondorParams {
    pub(crate) fn batch(&self, gps_times: Vec1<f64>, ifo: &str, output_dir: &Path) -> OmegaBatch {
        OmegaBatch {
            gps_times,
            ifo: ifo.to_string(),
            output_dir: output_dir.to_path_buf(),
            executable: self.executable.clone(),
            config_file: self.config_file.clone(),
            universe: self.universe,
            accounting_group: self.accounting_group.clone(),
            accounting_group_user: self.accounting_group_user.clone(),
            condor_commands: self.condor_commands.clone(),
            extra_args: self.extra_args.clone(),
            retry: self.retry,
        }
    }

    /// Write the workflow for `batch` and submit it if asked to. The path to
    /// the DAG is returned.
    pub(crate) fn write_and_submit(&self, batch: &OmegaBatch) -> Result<PathBuf, CondorError> {
        let dag = batch.write()?;
        if self.submit {
            let stdout = submit_dag(&dag)?;
            info!("Submitted {}", dag.display());
            for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
                info!("  {line}");
            }
        } else {
            info!(
                "Not submitting; submit the workflow with: condor_submit_dag {}",
                dag.display()
            );
        }
        Ok(dag)
    }
}

pub(crate) struct OmegaBatchParams {
    pub(crate) gps_times: Vec1<f64>,
    pub(crate) ifo: String,
    pub(crate) output_dir: PathBuf,
    pub(crate) condor: CondorParams,
}

impl OmegaBatchParams {
    pub(crate) fn run(&self) -> Result<PathBuf, OmegaBatchError> {
        let batch = self
            .condor
            .batch(self.gps_times.clone(), &self.ifo, &self.output_dir);
        Ok(self.condor.write_and_submit(&batch)?)
    }
}

#[derive(thiserror::Error, Debug)]
pub(crate) enum OmegaBatchError {
    #[error(transparent)]
    Condor(#[from] CondorError),
}
