// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::Path;

use tempfile::TempDir;

use super::*;

const N: usize = 200;

/// A primary channel built from two of four auxiliary channels. The channel
/// list is returned.
fn setup(dir: &Path) -> PathBuf {
    let a = sinusoid(25.0, N);
    let b = sinusoid(9.0, N);
    let primary: Vec<f64> = a.iter().zip(&b).map(|(a, b)| 50.0 + 4.0 * a + b).collect();
    write_channel(dir, "L1:TEST-RANGE", 1.0, &primary);
    write_channel(dir, "L1:AUX-A", 1.0, &a);
    write_channel(dir, "L1:AUX-B", 1.0, &b);
    write_channel(dir, "L1:AUX-C", 1.0, &sinusoid(4.3, N));
    write_channel(dir, "L1:AUX-FLAT", 1.0, &[1.0; N]);

    let list = dir.join("channels.txt");
    std::fs::write(
        &list,
        "{IFO}:AUX-A\n{IFO}:AUX-B\n{IFO}:AUX-C\n{IFO}:AUX-FLAT\n",
    )
    .unwrap();
    list
}

fn args(data: &Path, list: &Path, out: &Path) -> Vec<String> {
    [
        "lasso-correlation",
        "--ifo",
        "L1",
        "--gps-start",
        &T0.to_string(),
        "--gps-end",
        &(T0 + N as f64).to_string(),
        "--data-dir",
        &data.display().to_string(),
        "--channel-file",
        &list.display().to_string(),
        "--primary-channel",
        "{IFO}:TEST-RANGE",
        "--trend",
        "none",
        "--alpha",
        "0.02",
        "--output-dir",
        &out.display().to_string(),
        "--no-plots",
        "--no-progress-bars",
    ]
    .into_iter()
    .map(|s| s.to_string())
    .collect()
}

#[test]
fn test_lasso_correlation() {
    let data = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let list = setup(data.path());

    let cmd = gwdetchar().args(args(data.path(), &list, out.path())).ok();
    let ok = cmd.is_ok();
    let (stdout, stderr) = get_cmd_output(cmd);
    assert!(ok, "{stdout}\n{stderr}");
    assert!(stdout.contains("lasso-correlation complete"), "{stdout}");

    let json: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(out.path().join("lasso_results.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(json["selected"][0]["channel"], "L1:AUX-A");
    assert_eq!(json["selected"][1]["channel"], "L1:AUX-B");
    assert_eq!(json["dropped"]["flat"][0], "L1:AUX-FLAT");

    let csv = std::fs::read_to_string(out.path().join("lasso_results.csv")).unwrap();
    assert!(csv.starts_with("channel,coefficient,r\n"));
    let html = std::fs::read_to_string(out.path().join("index.html")).unwrap();
    assert!(html.contains("L1:AUX-A"));
}

#[test]
fn test_dry_run_and_save_toml() {
    let data = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let list = setup(data.path());
    let toml = data.path().join("lasso.toml");

    let cmd = gwdetchar()
        .args(args(data.path(), &list, out.path()))
        .args(["--dry-run", "--save-toml", &toml.display().to_string()])
        .ok();
    let ok = cmd.is_ok();
    let (stdout, stderr) = get_cmd_output(cmd);
    assert!(ok, "{stdout}\n{stderr}");
    assert!(stdout.contains("Dry run -- exiting now."), "{stdout}");
    assert!(!out.path().join("lasso_results.json").exists());

    // The saved arguments reproduce the run.
    let saved = std::fs::read_to_string(&toml).unwrap();
    assert!(saved.contains("alpha = 0.02"), "{saved}");
    let cmd = gwdetchar()
        .args(["lasso-correlation", &toml.display().to_string()])
        .ok();
    let ok = cmd.is_ok();
    let (stdout, stderr) = get_cmd_output(cmd);
    assert!(ok, "{stdout}\n{stderr}");
    assert!(out.path().join("lasso_results.json").is_file());
}

#[test]
fn test_missing_primary_is_an_error() {
    let data = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let list = setup(data.path());
    let mut args = args(data.path(), &list, out.path());
    let i = args.iter().position(|a| a == "{IFO}:TEST-RANGE").unwrap();
    args[i] = "{IFO}:NOT-THERE".to_string();

    let cmd = gwdetchar().args(args).ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("L1:NOT-THERE"), "{stderr}");
}
