// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use tempfile::TempDir;

use super::*;

#[test]
fn test_scattering_search() {
    let data = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();

    // 16 Hz motion, with a fast 10 Hz-fringe stretch from 10 to 20 s.
    let rate = 16.0;
    let motion: Vec<f64> = (0..16 * 40)
        .map(|i| {
            let t = i as f64 / rate;
            if (10.0..20.0).contains(&t) {
                10.64 * (t - 10.0)
            } else if t >= 20.0 {
                106.4
            } else {
                0.0
            }
        })
        .collect();
    write_channel(data.path(), "H1:SUS-ETMY_M1_DAMP_P_IN1_DQ", rate, &motion);
    let triggers = data.path().join("H1-TRIGGERS.txt");
    std::fs::write(
        &triggers,
        format!(
            "# time frequency snr\n{} 20.0 30.0\n{} 20.0 30.0\n",
            T0 + 15.0,
            T0 + 35.0
        ),
    )
    .unwrap();

    let cmd = gwdetchar()
        .args([
            "scattering",
            "--ifo",
            "H1",
            "--gps-start",
            &T0.to_string(),
            "--gps-end",
            &(T0 + 40.0).to_string(),
            "--data-dir",
            &data.path().display().to_string(),
            "--trigger-files",
            &data.path().join("H1-TRIG*.txt").display().to_string(),
            "--optics",
            "etmy",
            "--dofs",
            "p",
            "--omega-scans",
            "2",
            "--universe",
            "local",
            "--output-dir",
            &out.path().display().to_string(),
            "--no-plots",
            "--no-progress-bars",
        ])
        .ok();
    let ok = cmd.is_ok();
    let (stdout, stderr) = get_cmd_output(cmd);
    assert!(ok, "{stdout}\n{stderr}");

    let segments =
        std::fs::read_to_string(out.path().join("scattering-segments.txt")).unwrap();
    assert_eq!(segments.lines().filter(|l| !l.starts_with('#')).count(), 1);
    assert!(out
        .path()
        .join("segments")
        .join("H1-SUS-ETMY_M1_DAMP_P_IN1_DQ.txt")
        .is_file());

    let summary: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(out.path().join("scattering_summary.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(summary["num_triggers"], 2);
    assert_eq!(summary["channels"][0]["num_coincident"], 1);
    assert_eq!(summary["omega_times"][0], T0 + 15.0);

    let dag = std::fs::read_to_string(out.path().join("omega").join("condor").join("omega.dag"))
        .unwrap();
    assert_eq!(dag.matches("JOB ").count(), 1);
}
