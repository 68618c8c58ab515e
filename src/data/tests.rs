// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{io::Write, path::Path};

use approx::assert_abs_diff_eq;
use indoc::indoc;
use ndarray::array;
use tempfile::TempDir;

use super::*;

fn write_file(dir: &Path, name: &str, contents: &str) {
    let mut f = std::fs::File::create(dir.join(name)).unwrap();
    f.write_all(contents.as_bytes()).unwrap();
}

#[test]
fn test_crop_and_times() {
    let ts = TimeSeries::new("X1:TEST", 100.0, 2.0, array![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
    assert_abs_diff_eq!(ts.end(), 103.0);
    assert_abs_diff_eq!(ts.times(), array![100.0, 100.5, 101.0, 101.5, 102.0, 102.5]);

    let c = ts.crop(100.5, 102.0).unwrap();
    assert_abs_diff_eq!(c.t0, 100.5);
    assert_abs_diff_eq!(c.data, array![1.0, 2.0, 3.0]);

    // Cropping beyond the ends only keeps what's there.
    let c = ts.crop(0.0, 1e10).unwrap();
    assert_eq!(c, ts);

    // Starting between samples rounds up to the next sample.
    let c = ts.crop(100.2, 101.1).unwrap();
    assert_abs_diff_eq!(c.t0, 100.5);
    assert_abs_diff_eq!(c.data, array![1.0, 2.0]);

    assert!(ts.crop(200.0, 300.0).is_none());
    assert!(ts.crop(101.0, 101.0).is_none());
}

#[test]
fn test_index_of() {
    let ts = TimeSeries::new("X1:TEST", 10.0, 4.0, array![0.0, 1.0, 2.0, 3.0]);
    assert_eq!(ts.index_of(9.9), None);
    assert_eq!(ts.index_of(10.0), Some(0));
    assert_eq!(ts.index_of(10.3), Some(1));
    assert_eq!(ts.index_of(10.75), Some(3));
    assert_eq!(ts.index_of(11.0), None);
}

#[test]
fn test_gradient_matches_numpy() {
    // numpy.gradient([1, 2, 4, 7, 11]) == [1, 1.5, 2.5, 3.5, 4]
    let ts = TimeSeries::new("X1:TEST", 0.0, 1.0, array![1.0, 2.0, 4.0, 7.0, 11.0]);
    assert_abs_diff_eq!(ts.gradient(), array![1.0, 1.5, 2.5, 3.5, 4.0]);

    let single = TimeSeries::new("X1:TEST", 0.0, 1.0, array![3.0]);
    assert_abs_diff_eq!(single.gradient(), array![0.0]);
}

#[test]
fn test_flat_and_non_finite() {
    let flat = TimeSeries::new("X1:A", 0.0, 1.0, array![2.0, 2.0, 2.0]);
    assert!(flat.is_flat());
    assert!(!flat.has_non_finite());

    let bad = TimeSeries::new("X1:B", 0.0, 1.0, array![2.0, f64::NAN, 2.0]);
    assert!(!bad.is_flat());
    assert!(bad.has_non_finite());
    assert_eq!(bad.nbytes(), 24);
}

#[test]
fn test_read_header_text() {
    let tmp = TempDir::new().unwrap();
    write_file(
        tmp.path(),
        "X1-TEST_CHANNEL.mean.txt",
        indoc! {"
            # channel = X1:TEST_CHANNEL.mean
            # t0 = 1000
            # sample_rate = 0.5
            1.0
            2.0

            3.0
            4.0
        "},
    );
    let source = FileSource::new(tmp.path());
    let ts = source.read("X1:TEST_CHANNEL.mean", 1000.0, 1008.0).unwrap();
    assert_eq!(ts.channel, "X1:TEST_CHANNEL.mean");
    assert_abs_diff_eq!(ts.t0, 1000.0);
    assert_abs_diff_eq!(ts.sample_rate, 0.5);
    assert_abs_diff_eq!(ts.data, array![1.0, 2.0, 3.0, 4.0]);

    // Cropping.
    let ts = source.read("X1:TEST_CHANNEL.mean", 1002.0, 1006.0).unwrap();
    assert_abs_diff_eq!(ts.t0, 1002.0);
    assert_abs_diff_eq!(ts.data, array![2.0, 3.0]);
}

#[test]
fn test_read_two_column_text() {
    let tmp = TempDir::new().unwrap();
    write_file(
        tmp.path(),
        "X1-MOTION.txt",
        indoc! {"
            # gps value
            100.00 0.5
            100.25 0.6
            100.50,0.7
            100.75 0.8
        "},
    );
    let ts = FileSource::new(tmp.path())
        .read("X1:MOTION", 0.0, 1e6)
        .unwrap();
    assert_abs_diff_eq!(ts.sample_rate, 4.0, epsilon = 1e-9);
    assert_abs_diff_eq!(ts.t0, 100.0);
    assert_abs_diff_eq!(ts.data, array![0.5, 0.6, 0.7, 0.8]);
}

#[test]
fn test_read_non_uniform_text_fails() {
    let tmp = TempDir::new().unwrap();
    write_file(tmp.path(), "X1-MOTION.txt", "0 1\n1 2\n3 3\n");
    let result = FileSource::new(tmp.path()).read("X1:MOTION", 0.0, 10.0);
    assert!(
        matches!(result, Err(DataError::NonUniformSampling { line: 3, .. })),
        "{result:?}"
    );
}

#[test]
fn test_read_bad_float_reports_line() {
    let tmp = TempDir::new().unwrap();
    write_file(
        tmp.path(),
        "X1-A.txt",
        "# t0 = 0\n# sample_rate = 1\n1.0\nfoo\n",
    );
    let result = FileSource::new(tmp.path()).read("X1:A", 0.0, 10.0);
    match result {
        Err(DataError::ParseFloat { line, text, .. }) => {
            assert_eq!(line, 4);
            assert_eq!(text, "foo");
        }
        _ => panic!("unexpected result: {result:?}"),
    }
}

#[test]
fn test_read_gz_and_json() {
    let tmp = TempDir::new().unwrap();
    let mut enc = flate2::write::GzEncoder::new(
        std::fs::File::create(tmp.path().join("X1-GZ.txt.gz")).unwrap(),
        flate2::Compression::default(),
    );
    enc.write_all(b"# t0 = 5\n# sample_rate = 1\n1\n2\n3\n")
        .unwrap();
    enc.finish().unwrap();
    write_file(
        tmp.path(),
        "X1-JS.json",
        r#"{"t0": 5, "sample_rate": 1, "data": [4, 5, 6]}"#,
    );

    let source = FileSource::new(tmp.path());
    let gz = source.read("X1:GZ", 5.0, 8.0).unwrap();
    assert_abs_diff_eq!(gz.data, array![1.0, 2.0, 3.0]);
    let js = source.read("X1:JS", 6.0, 8.0).unwrap();
    assert_eq!(js.channel, "X1:JS");
    assert_abs_diff_eq!(js.data, array![5.0, 6.0]);
}

#[test]
fn test_missing_channel_and_no_overlap() {
    let tmp = TempDir::new().unwrap();
    write_file(tmp.path(), "X1-A.txt", "# t0 = 0\n# sample_rate = 1\n1\n2\n");
    let source = FileSource::new(tmp.path());

    match source.read("X1:NOPE", 0.0, 2.0) {
        Err(DataError::ChannelNotFound { channel, tried }) => {
            assert_eq!(channel, "X1:NOPE");
            assert_eq!(tried.len(), 3);
        }
        r => panic!("unexpected result: {r:?}"),
    }

    assert!(matches!(
        source.read("X1:A", 10.0, 20.0),
        Err(DataError::NoOverlap { .. })
    ));
}

#[test]
fn test_get_data_keeps_order_and_lossy_skips() {
    let tmp = TempDir::new().unwrap();
    for (name, offset) in [("X1-C.txt", 3.0), ("X1-A.txt", 1.0), ("X1-B.txt", 2.0)] {
        write_file(
            tmp.path(),
            name,
            &format!("# t0 = 0\n# sample_rate = 1\n{offset}\n{offset}\n"),
        );
    }
    let source = FileSource::new(tmp.path());

    let channels = ["X1:C", "X1:A", "X1:B"];
    let data = get_data(&source, &channels, 0.0, 2.0, 2).unwrap();
    assert_eq!(data.keys().collect::<Vec<_>>(), vec!["X1:C", "X1:A", "X1:B"]);
    assert_abs_diff_eq!(data["X1:A"].data[0], 1.0);

    let channels = ["X1:C", "X1:MISSING", "X1:A"];
    assert!(get_data(&source, &channels, 0.0, 2.0, 1).is_err());
    let (good, bad) = get_data_lossy(&source, &channels, 0.0, 2.0, 0).unwrap();
    assert_eq!(good.keys().collect::<Vec<_>>(), vec!["X1:C", "X1:A"]);
    assert_eq!(bad.len(), 1);
    assert_eq!(bad[0].0, "X1:MISSING");
}

#[test]
fn test_channel_list_and_filters() {
    let tmp = TempDir::new().unwrap();
    write_file(
        tmp.path(),
        "channels.txt",
        indoc! {"
            # auxiliary channels
            X1:SUS-ETMX_M1_DAMP_L_IN1_DQ
            X1:ASC-AS_A_DC_NSUM_OUT_DQ   # trailing comment

            X1:SUS-ETMX_M1_DAMP_L_IN1_DQ
            X1:PEM-CS_ACC_BSC1_X_DQ
        "},
    );
    let channels = read_channel_list(&tmp.path().join("channels.txt")).unwrap();
    assert_eq!(
        channels,
        vec![
            "X1:SUS-ETMX_M1_DAMP_L_IN1_DQ",
            "X1:ASC-AS_A_DC_NSUM_OUT_DQ",
            "X1:PEM-CS_ACC_BSC1_X_DQ"
        ]
    );

    let filter = ChannelFilter::new(&["SUS-", "PEM-"], &["ACC"]).unwrap();
    assert_eq!(
        filter.apply(channels.clone()),
        vec!["X1:SUS-ETMX_M1_DAMP_L_IN1_DQ"]
    );
    let everything = ChannelFilter::new::<&str>(&[], &[]).unwrap();
    assert_eq!(everything.apply(channels.clone()), channels);
    assert!(ChannelFilter::new(&["("], &[]).is_err());

    write_file(tmp.path(), "empty.txt", "# nothing\n\n");
    assert!(matches!(
        read_channel_list(&tmp.path().join("empty.txt")),
        Err(DataError::EmptyChannelList(_))
    ));
}

#[test]
fn test_trend_and_ifo_names() {
    assert_eq!(with_trend("L1:ASC-X_DQ", Some("mean")), "L1:ASC-X_DQ.mean");
    assert_eq!(with_trend("L1:ASC-X_DQ.max", Some("mean")), "L1:ASC-X_DQ.max");
    assert_eq!(with_trend("L1:ASC-X_DQ", Some("none")), "L1:ASC-X_DQ");
    assert_eq!(with_trend("L1:ASC-X_DQ", None), "L1:ASC-X_DQ");
    assert_eq!(
        fill_ifo("{IFO}:DMT-SNSW_EFFECTIVE_RANGE_MPC.mean", "H1"),
        "H1:DMT-SNSW_EFFECTIVE_RANGE_MPC.mean"
    );
}
