// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Helpful functions for tests: synthetic channel data on disk.

use std::{
    f64::consts::TAU,
    fmt::Write as _,
    path::{Path, PathBuf},
};

/// The GPS time of the first sample of every fixture.
pub(crate) const FIXTURE_T0: f64 = 1_000_000_000.0;

/// The number of samples in the Lasso fixture.
pub(crate) const LASSO_SAMPLES: usize = 256;

/// Write a channel in the header-style text format understood by
/// [`crate::FileSource`]. The path to the file is returned.
pub(crate) fn write_channel(
    dir: &Path,
    channel: &str,
    t0: f64,
    sample_rate: f64,
    data: &[f64],
) -> PathBuf {
    let mut s = format!("# channel = {channel}\n# t0 = {t0}\n# sample_rate = {sample_rate}\n");
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

/// Channels for a Lasso run. The primary channel is `10 + 3·A − 2·B`, where
/// `A` and `B` are sinusoids. `C` is unrelated, `D` is `−A` plus a little
/// noise, `FLAT` is constant and `GLITCHY` has a NaN.
///
/// Returns the primary channel name and the auxiliary channel names.
pub(crate) fn write_lasso_fixture(dir: &Path) -> (String, Vec<String>) {
    let n = LASSO_SAMPLES;
    let a = sinusoid(32.0, n);
    let b: Vec<f64> = (0..n).map(|i| (TAU * i as f64 / 20.0).cos()).collect();
    let c = sinusoid(7.3, n);
    let d: Vec<f64> = a
        .iter()
        .zip(sinusoid(5.1, n))
        .map(|(a, e)| -a + 0.05 * e)
        .collect();
    let flat = vec![5.0; n];
    let mut glitchy = sinusoid(11.0, n);
    glitchy[17] = f64::NAN;
    let primary: Vec<f64> = a
        .iter()
        .zip(b.iter())
        .map(|(a, b)| 10.0 + 3.0 * a - 2.0 * b)
        .collect();

    let primary_name = "H1:TEST-PRIMARY".to_string();
    write_channel(dir, &primary_name, FIXTURE_T0, 1.0, &primary);
    let mut aux = vec![];
    for (name, data) in [
        ("H1:AUX-A", &a),
        ("H1:AUX-B", &b),
        ("H1:AUX-C", &c),
        ("H1:AUX-D", &d),
        ("H1:AUX-FLAT", &flat),
        ("H1:AUX-GLITCHY", &glitchy),
    ] {
        write_channel(dir, name, FIXTURE_T0, 1.0, data);
        aux.push(name.to_string());
    }
    (primary_name, aux)
}

/// Top-mass motion for a scattering run, sampled at 1 Hz for 20 s. `ETMX`
/// moves 10.64 µm per second for samples 4..9, giving a 10 Hz fringe; `ITMX`
/// stays still. A trigger file with one trigger inside the moving stretch
/// and one outside is also written.
///
/// Returns the two channel names and the trigger file.
pub(crate) fn write_scattering_fixture(dir: &Path) -> (Vec<String>, PathBuf) {
    let mut moving = vec![0.0; 20];
    for i in 4..20 {
        moving[i] = moving[i - 1] + if i < 9 { 10.64 } else { 0.0 };
    }
    let still: Vec<f64> = (0..20).map(|i| 0.01 * (i % 2) as f64).collect();

    let etmx = "H1:SUS-ETMX_M1_DAMP_L_IN1_DQ".to_string();
    let itmx = "H1:SUS-ITMX_M1_DAMP_L_IN1_DQ".to_string();
    write_channel(dir, &etmx, FIXTURE_T0, 1.0, &moving);
    write_channel(dir, &itmx, FIXTURE_T0, 1.0, &still);

    let triggers = dir.join("triggers.txt");
    std::fs::write(
        &triggers,
        format!(
            "# time frequency snr\n{} 12.0 20.0\n{} 30.0 9.0\n{} 50.0 4.0\n",
            FIXTURE_T0 + 5.5,
            FIXTURE_T0 + 15.5,
            FIXTURE_T0 + 6.5,
        ),
    )
    .unwrap();
    (vec![etmx, itmx], triggers)
}
