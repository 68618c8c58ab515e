// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Integration tests.
//!
//! Some help for laying out these tests was taken from:
//! https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html

mod lasso;
mod omega_batch;
mod scattering;

use std::{
    f64::consts::TAU,
    fmt::Write,
    path::{Path, PathBuf},
    process::Output,
    str::from_utf8,
};

use assert_cmd::{output::OutputError, Command};

const T0: f64 = 1_000_000_000.0;

fn gwdetchar() -> Command {
    Command::cargo_bin("gwdetchar").unwrap()
}

fn get_cmd_output(result: Result<Output, OutputError>) -> (String, String) {
    let output = match result {
        Ok(o) => o,
        Err(o) => o.as_output().unwrap().clone(),
    };
    (
        from_utf8(&output.stdout).unwrap().to_string(),
        from_utf8(&output.stderr).unwrap().to_string(),
    )
}

/// Write a channel the way the data directory expects it.
fn write_channel(dir: &Path, channel: &str, sample_rate: f64, data: &[f64]) -> PathBuf {
    let mut s = format!("# channel = {channel}\n# t0 = {T0}\n# sample_rate = {sample_rate}\n");
    for v in data {
        writeln!(s, "{v}").unwrap();
    }
    let path = dir.join(format!("{}.txt", channel.replace(':', "-")));
    std::fs::write(&path, s).unwrap();
    path
}

fn sinusoid(period: f64, n: usize) -> Vec<f64> {
    (0..n).map(|i| (TAU * i as f64 / period).sin()).collect()
}

#[test]
fn test_no_args_prints_help() {
    let cmd = gwdetchar().ok();
    assert!(cmd.is_err());
    let (stdout, stderr) = get_cmd_output(cmd);
    let all = format!("{stdout}{stderr}");
    assert!(all.contains("lasso-correlation"), "{all}");
    assert!(all.contains("scattering"), "{all}");
    assert!(all.contains("omega-batch"), "{all}");
}

#[test]
fn test_help_lists_subcommands() {
    let cmd = gwdetchar().arg("--help").ok();
    assert!(cmd.is_ok());
    let (stdout, _) = get_cmd_output(cmd);
    for sub in [
        "lasso-correlation",
        "scattering",
        "omega-batch",
        "profile-get-data",
    ] {
        assert!(stdout.contains(sub), "'{sub}' missing from help:\n{stdout}");
    }
}

#[test]
fn test_aliases() {
    for alias in ["lasso", "scatter", "wdq-batch", "profile"] {
        let cmd = gwdetchar().args([alias, "--help"]).ok();
        assert!(cmd.is_ok(), "{alias} isn't a recognised sub-command");
    }
}

#[test]
fn test_bad_ifo_is_an_error() {
    let cmd = gwdetchar()
        .args(["omega-batch", "1000000000", "--ifo", "hanford", "--dry-run"])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("hanford"), "{stderr}");
}
