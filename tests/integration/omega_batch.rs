// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use tempfile::TempDir;

use super::*;

#[test]
fn test_omega_batch_writes_workflow() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("scans");
    let times = tmp.path().join("times.txt");
    std::fs::write(&times, "1187008882.43\n# a comment\n1187008882.43\n").unwrap();

    let cmd = gwdetchar()
        .args([
            "wdq-batch",
            "1126259462.4",
            "--gps-file",
            &times.display().to_string(),
            "--ifo",
            "L1",
            "--output-dir",
            &out.display().to_string(),
            "--accounting-group",
            "ligo.dev.o4.detchar.transient.omega",
            "--condor-command",
            "request_memory=4096",
            "--omega-arg",
            "--colormap",
            "--omega-arg",
            "viridis",
            "--retry",
            "3",
        ])
        .ok();
    let ok = cmd.is_ok();
    let (stdout, stderr) = get_cmd_output(cmd);
    assert!(ok, "{stdout}\n{stderr}");
    assert!(stdout.contains("condor_submit_dag"), "{stdout}");

    let condor = out.join("condor");
    let dag = std::fs::read_to_string(condor.join("omega.dag")).unwrap();
    // Duplicate times are scanned once.
    assert_eq!(dag.matches("JOB ").count(), 2);
    assert_eq!(dag.matches("RETRY ").count(), 2);
    assert!(dag.contains(" 3"));

    let submit = std::fs::read_to_string(condor.join("omega.sub")).unwrap();
    assert!(submit.contains("accounting_group = ligo.dev.o4.detchar.transient.omega"));
    assert!(submit.contains("request_memory = 4096"));
    assert!(submit.contains("--colormap"));
}

#[test]
fn test_omega_batch_without_times() {
    let cmd = gwdetchar()
        .args(["omega-batch", "--ifo", "H1", "--dry-run"])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("No GPS times"), "{stderr}");
}
