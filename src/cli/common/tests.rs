// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tests against command-line interfaces that aren't big enough to go in their
//! own modules.

use std::borrow::Cow;

use tempfile::TempDir;

use super::{printers::tree_lines, *};

#[test]
fn test_parse_ifo() {
    assert_eq!(parse_ifo(Some("L1".to_string())).unwrap(), "L1");
    assert!(matches!(parse_ifo(None), Err(DataArgsError::NoIfo)));
    for bad in ["l1", "L", "LHO", "11"] {
        assert!(matches!(
            parse_ifo(Some(bad.to_string())),
            Err(DataArgsError::BadIfo(_))
        ));
    }
}

#[test]
fn test_data_args_parse() {
    let tmp = TempDir::new().unwrap();
    let args = DataArgs {
        gps_start: Some(1e9),
        gps_end: Some(1e9 + 100.0),
        data_dir: Some(tmp.path().to_path_buf()),
        nproc: Some(3),
    };
    let span = args.clone().parse().unwrap();
    assert_eq!(span.gps_start, 1e9);
    assert_eq!(span.gps_end, 1e9 + 100.0);
    assert_eq!(span.nproc, 3);
    assert_eq!(span.source.root(), tmp.path());

    // 0 threads means "all of them".
    let span = DataArgs {
        nproc: Some(0),
        ..args.clone()
    }
    .parse()
    .unwrap();
    assert!(span.nproc > 0);

    let result = DataArgs {
        gps_end: Some(1e9),
        ..args.clone()
    }
    .parse();
    assert!(matches!(result, Err(DataArgsError::BadSpan { .. })));

    let result = DataArgs {
        gps_start: None,
        ..args.clone()
    }
    .parse();
    assert!(matches!(result, Err(DataArgsError::NoGpsStart)));

    let result = DataArgs {
        data_dir: Some(tmp.path().join("nope")),
        ..args
    }
    .parse();
    assert!(matches!(result, Err(DataArgsError::DataDirMissing(_))));
}

#[test]
fn test_data_args_merge_prefers_first() {
    let cli = DataArgs {
        gps_start: Some(1.0),
        ..Default::default()
    };
    let file = DataArgs {
        gps_start: Some(2.0),
        gps_end: Some(3.0),
        ..Default::default()
    };
    let merged = cli.merge(file);
    assert_eq!(merged.gps_start, Some(1.0));
    assert_eq!(merged.gps_end, Some(3.0));
    assert!(merged.data_dir.is_none());
}

#[test]
fn test_condor_args_parse() {
    let params = CondorArgs {
        universe: Some("LOCAL".to_string()),
        condor_command: Some(vec!["request_memory = 4096".to_string()]),
        omega_arg: Some(vec!["--colormap".to_string(), "viridis".to_string()]),
        ..Default::default()
    }
    .parse()
    .unwrap();
    assert_eq!(params.universe, Universe::Local);
    assert_eq!(params.executable, DEFAULT_OMEGA_EXECUTABLE);
    assert_eq!(
        params.condor_commands,
        vec![("request_memory".to_string(), "4096".to_string())]
    );
    assert_eq!(params.extra_args.len(), 2);
    assert_eq!(params.retry, 1);
    assert!(!params.submit);

    assert!(matches!(
        CondorArgs {
            universe: Some("grid".to_string()),
            ..Default::default()
        }
        .parse(),
        Err(CondorArgsError::BadUniverse(_))
    ));
    assert!(matches!(
        CondorArgs {
            condor_command: Some(vec!["no equals sign".to_string()]),
            ..Default::default()
        }
        .parse(),
        Err(CondorArgsError::Condor(_))
    ));
    assert!(matches!(
        CondorArgs {
            config_file: Some("/does/not/exist.ini".into()),
            ..Default::default()
        }
        .parse(),
        Err(CondorArgsError::ConfigFileMissing(_))
    ));
}

#[test]
fn test_tree_lines() {
    let blocks: Vec<Vec<Cow<'static, str>>> = vec![
        vec!["Primary channel: H1:RANGE".into()],
        vec!["Channels: 3".into(), "from channels.txt".into()],
        vec!["alpha: 0.1".into()],
    ];
    assert_eq!(
        tree_lines(&blocks),
        vec![
            "├ Primary channel: H1:RANGE",
            "├ Channels: 3",
            "│ from channels.txt",
            "└ alpha: 0.1",
        ]
    );
    assert!(tree_lines(&[]).is_empty());
}
