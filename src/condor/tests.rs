// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::str::FromStr;

use indoc::{formatdoc, indoc};
use tempfile::TempDir;
use vec1::vec1;

use super::*;

fn batch(dir: &Path) -> OmegaBatch {
    OmegaBatch {
        gps_times: vec1![1126259462.4, 1126259500.0, 1126259462.4],
        ifo: "H1".to_string(),
        output_dir: dir.to_path_buf(),
        executable: "gwdetchar-omega".to_string(),
        config_file: None,
        universe: Universe::Vanilla,
        accounting_group: Some("ligo.dev.o4.detchar.transient.omega".to_string()),
        accounting_group_user: None,
        condor_commands: vec![],
        extra_args: vec![],
        retry: 2,
    }
}

#[test]
fn test_job_names() {
    assert_eq!(job_name(1126259462.4), "omega_1126259462_4");
    assert_eq!(job_name(1126259500.0), "omega_1126259500");
}

#[test]
fn test_universe_strings() {
    assert_eq!(Universe::from_str("local").unwrap(), Universe::Local);
    assert_eq!(Universe::default().to_string(), "vanilla");
    assert!(Universe::from_str("grid").is_err());
    assert_eq!(*UNIVERSES, "vanilla, local");
}

#[test]
fn test_submit_description() {
    let tmp = TempDir::new().unwrap();
    let mut b = batch(tmp.path());
    b.config_file = Some(PathBuf::from("/etc/omega.ini"));
    b.extra_args = vec!["--colormap".to_string(), "viridis".to_string()];
    b.condor_commands = vec![("request_memory".to_string(), "4096".to_string())];
    let sub = b.submit_description();

    assert!(sub.starts_with("universe = vanilla\nexecutable = gwdetchar-omega\n"));
    assert!(sub.contains(
        "arguments = \"--ifo H1 --output-directory $(outdir) --config-file /etc/omega.ini --colormap viridis $(gpstime)\"\n"
    ));
    assert!(sub.contains("getenv = True\n"));
    assert!(sub.contains("accounting_group = ligo.dev.o4.detchar.transient.omega\n"));
    assert!(!sub.contains("accounting_group_user"));
    assert!(sub.contains("request_memory = 4096\n"));
    assert!(sub.contains(&format!(
        "log = {}/condor/logs/omega-$(cluster).log\n",
        tmp.path().display()
    )));
    assert!(sub.ends_with("queue 1\n"));
}

#[test]
fn test_write_dag_dedupes_times() {
    let tmp = TempDir::new().unwrap();
    let b = batch(tmp.path());
    let dag = b.write().unwrap();
    assert_eq!(dag, tmp.path().join("condor").join("omega.dag"));
    assert!(tmp.path().join("condor").join("omega.sub").is_file());
    assert!(tmp.path().join("condor").join("logs").is_dir());

    let contents = std::fs::read_to_string(&dag).unwrap();
    let sub = b.submit_file();
    let expected = formatdoc! {r#"
            JOB omega_1126259462_4 {sub}
            VARS omega_1126259462_4 gpstime="1126259462.4" outdir="{dir}/1126259462.4"
            RETRY omega_1126259462_4 2
            JOB omega_1126259500 {sub}
            VARS omega_1126259500 gpstime="1126259500" outdir="{dir}/1126259500"
            RETRY omega_1126259500 2
        "#,
        sub = sub.display(),
        dir = tmp.path().display()
    };
    assert_eq!(contents, expected);
}

#[test]
fn test_read_gps_file() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("times.txt");
    std::fs::write(
        &path,
        indoc! {"
            # gps snr
            1126259462.4 24.0

            1187008882 32.4
        "},
    )
    .unwrap();
    assert_eq!(read_gps_file(&path).unwrap(), vec![1126259462.4, 1187008882.0]);

    std::fs::write(&path, "1126259462\nyesterday\n").unwrap();
    assert!(matches!(
        read_gps_file(&path),
        Err(CondorError::BadGpsTime { line: 2, .. })
    ));
}

#[test]
fn test_parse_condor_command() {
    assert_eq!(
        parse_condor_command("request_memory = 4096").unwrap(),
        ("request_memory".to_string(), "4096".to_string())
    );
    assert_eq!(
        parse_condor_command("requirements=(Machine == \"a=b\")").unwrap(),
        (
            "requirements".to_string(),
            "(Machine == \"a=b\")".to_string()
        )
    );
    assert!(parse_condor_command("no_equals").is_err());
    assert!(parse_condor_command("=value").is_err());
}

#[test]
fn test_gps_times_must_not_be_empty() {
    assert!(matches!(gps_times(vec![]), Err(CondorError::NoGpsTimes)));
    assert_eq!(gps_times(vec![1.0]).unwrap().len(), 1);
}

#[test]
fn test_quote_argument() {
    assert_eq!(quote_argument("--ifo"), "--ifo");
    assert_eq!(quote_argument("$(gpstime)"), "$(gpstime)");
    assert_eq!(quote_argument("/data/omega config.ini"), "'/data/omega config.ini'");
    assert_eq!(quote_argument("it's"), "'it''s'");
    assert_eq!(quote_argument("say \"hi\""), "'say \"\"hi\"\"'");
    assert_eq!(quote_argument(""), "''");

    let tmp = TempDir::new().unwrap();
    let mut b = batch(tmp.path());
    b.config_file = Some(PathBuf::from("/home/detchar/my omega.ini"));
    b.extra_args = vec!["--title".to_string(), "Scattering 'arches'".to_string()];
    assert!(b.submit_description().contains(
        "arguments = \"--ifo H1 --output-directory $(outdir) --config-file '/home/detchar/my omega.ini' --title 'Scattering ''arches''' $(gpstime)\"\n"
    ));
}

#[test]
fn test_submit_dag_missing_command() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("bin").join(CONDOR_SUBMIT_DAG);
    let result = submit_dag_with(&missing.display().to_string(), &tmp.path().join("omega.dag"));
    assert!(
        matches!(&result, Err(CondorError::SubmitNotFound(p)) if p.ends_with(CONDOR_SUBMIT_DAG)),
        "{result:?}"
    );
}

#[cfg(unix)]
fn fake_submit(dir: &Path, script: &str) -> String {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(CONDOR_SUBMIT_DAG);
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path.display().to_string()
}

#[cfg(unix)]
#[test]
fn test_submit_dag_reports_stderr() {
    let tmp = TempDir::new().unwrap();
    let dag = tmp.path().join("omega.dag");
    let program = fake_submit(
        tmp.path(),
        indoc! {"
            #!/bin/sh
            echo \"ERROR: no schedd found\" >&2
            exit 1
        "},
    );
    match submit_dag_with(&program, &dag) {
        Err(CondorError::SubmitFailed {
            dag: failed,
            stderr,
            ..
        }) => {
            assert_eq!(failed, dag);
            assert_eq!(stderr, "ERROR: no schedd found");
        }
        other => panic!("expected a failed submission, got {other:?}"),
    }
}

#[cfg(unix)]
#[test]
fn test_submit_dag_returns_stdout() {
    let tmp = TempDir::new().unwrap();
    let dag = tmp.path().join("omega.dag");
    let program = fake_submit(
        tmp.path(),
        indoc! {"
            #!/bin/sh
            echo \"Submitting job(s).\"
            echo \"$1\"
        "},
    );
    let stdout = submit_dag_with(&program, &dag).unwrap();
    assert!(stdout.starts_with("Submitting job(s).\n"));
    assert!(stdout.contains(&dag.display().to_string()));
}
