//! End-to-end tests of the difftriage binary over replay recordings

use predicates::prelude::*;
use std::fs;
use std::path::Path;

fn write_recording(dir: &Path, circuit: u64, json: &str) {
    fs::write(dir.join(format!("circuit{}.json", circuit)), json).unwrap();
}

fn write_source(dir: &Path, circuit: u64) -> std::path::PathBuf {
    let path = dir.join(format!("circuit{}.py", circuit));
    fs::write(&path, format!("# circuit {}\n", circuit)).unwrap();
    path
}

const AGREEING: &str = r#"{
  "counts": {
    "0": {"00": 500, "11": 500},
    "1": {"00": 500, "11": 500},
    "2": {"00": 500, "11": 500},
    "3": {"00": 500, "11": 500}
  }
}"#;

const DIVERGING: &str = r#"{
  "counts": {
    "0": {"0": 1000},
    "1": {"0": 1000},
    "2": {"1": 1000},
    "3": {"0": 1000}
  }
}"#;

#[test]
fn test_triage_not_interesting() {
    let work = tempfile::tempdir().unwrap();
    let recordings = work.path().join("rec");
    fs::create_dir(&recordings).unwrap();
    write_recording(&recordings, 1, AGREEING);
    let source = write_source(work.path(), 1);

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("difftriage");
    cmd.arg("triage")
        .arg("--replay")
        .arg(&recordings)
        .arg("-o")
        .arg(work.path().join("out"))
        .arg(&source);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("circuit1 [replay]: ✅ NOT INTERESTING"))
        .stdout(predicate::str::contains("1 circuits: 0 interesting"));

    assert!(!work.path().join("out/interesting_circuits").exists());
}

#[test]
fn test_triage_saves_interesting_circuit() {
    let work = tempfile::tempdir().unwrap();
    let recordings = work.path().join("rec");
    fs::create_dir(&recordings).unwrap();
    write_recording(&recordings, 7, DIVERGING);
    let source = write_source(work.path(), 7);
    let out = work.path().join("out");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("difftriage");
    cmd.arg("triage")
        .arg("--replay")
        .arg(&recordings)
        .arg("--output-dir")
        .arg(&out)
        .arg(&source);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("INTERESTING (high-divergence)"));

    let saved = out.join("interesting_circuits/circuit7.py");
    assert_eq!(fs::read_to_string(saved).unwrap(), "# circuit 7\n");
    assert!(out.join("interesting_circuits/circuit7.verdict.json").exists());
}

#[test]
fn test_triage_json_output_parses() {
    let work = tempfile::tempdir().unwrap();
    let recordings = work.path().join("rec");
    fs::create_dir(&recordings).unwrap();
    write_recording(&recordings, 1, AGREEING);
    write_recording(&recordings, 2, DIVERGING);
    let first = write_source(work.path(), 1);
    let second = write_source(work.path(), 2);

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("difftriage");
    cmd.arg("triage")
        .arg("--replay")
        .arg(&recordings)
        .arg("-o")
        .arg(work.path().join("out"))
        .arg("--format")
        .arg("json")
        .arg(&first)
        .arg(&second);

    let output = cmd.output().unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let reports = json["reports"].as_array().unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0]["verdict"]["verdict"], "not_interesting");
    assert_eq!(reports[1]["verdict"]["verdict"], "interesting");
    assert_eq!(reports[1]["verdict"]["reason"], "high-divergence");
}

#[test]
fn test_triage_plot_writes_rendered_levels() {
    let work = tempfile::tempdir().unwrap();
    let recordings = work.path().join("rec");
    fs::create_dir(&recordings).unwrap();
    write_recording(&recordings, 3, AGREEING);
    let source = write_source(work.path(), 3);
    let out = work.path().join("out");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("difftriage");
    cmd.arg("triage")
        .arg("--replay")
        .arg(&recordings)
        .arg("--plot")
        .arg("--levels")
        .arg("1,2")
        .arg("-o")
        .arg(&out)
        .arg(&source);

    cmd.assert().success();
    assert!(out.join("circuit3/output3_uncompiled.json").exists());
    assert!(out.join("circuit3/output3_2.txt").exists());
    assert!(!out.join("circuit3/output3_3.json").exists());
}

#[test]
fn test_triage_without_backend_fails() {
    let work = tempfile::tempdir().unwrap();
    let source = write_source(work.path(), 1);

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("difftriage");
    cmd.arg("triage").arg(&source);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("No backend configured"));
}

#[test]
fn test_triage_rejects_duplicate_circuit_numbers() {
    let work = tempfile::tempdir().unwrap();
    let recordings = work.path().join("rec");
    fs::create_dir_all(work.path().join("other")).unwrap();
    fs::create_dir(&recordings).unwrap();
    write_recording(&recordings, 4, AGREEING);
    let first = write_source(work.path(), 4);
    let second = write_source(&work.path().join("other"), 4);

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("difftriage");
    cmd.arg("triage")
        .arg("--replay")
        .arg(&recordings)
        .arg("-o")
        .arg(work.path().join("out"))
        .arg(&first)
        .arg(&second);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Duplicate circuit number 4"));
}

#[test]
fn test_triage_unnumbered_source_avoids_claimed_number() {
    let work = tempfile::tempdir().unwrap();
    let recordings = work.path().join("rec");
    fs::create_dir(&recordings).unwrap();
    write_recording(&recordings, 1, AGREEING);
    write_recording(&recordings, 2, DIVERGING);
    let bell = work.path().join("bell.py");
    fs::write(&bell, "# bell\n").unwrap();
    let numbered = write_source(work.path(), 1);

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("difftriage");
    cmd.arg("triage")
        .arg("--replay")
        .arg(&recordings)
        .arg("-o")
        .arg(work.path().join("out"))
        .arg(&bell)
        .arg(&numbered);

    // bell.py takes number 2 instead of colliding with circuit1.py
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("circuit2 [replay]: ❌ INTERESTING"))
        .stdout(predicate::str::contains("circuit1 [replay]: ✅ NOT INTERESTING"));
}

#[test]
fn test_triage_reads_config_file() {
    let work = tempfile::tempdir().unwrap();
    let recordings = work.path().join("rec");
    fs::create_dir(&recordings).unwrap();
    // 100 shots recorded; the config must lower the expected total to match
    write_recording(
        &recordings,
        5,
        r#"{"counts": {"0": {"0": 100}, "1": {"0": 100}}}"#,
    );
    let source = write_source(work.path(), 5);
    let config = work.path().join("oracle.toml");
    fs::write(&config, "shots = 100\nlevels = [1]\n").unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("difftriage");
    cmd.arg("triage")
        .arg("--replay")
        .arg(&recordings)
        .arg("--config")
        .arg(&config)
        .arg("-o")
        .arg(work.path().join("out"))
        .arg(&source);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("NOT INTERESTING"))
        .stdout(predicate::str::contains("level 1: ks-test p-value: 1.000000"));
}

#[test]
fn test_compare_subcommand() {
    let work = tempfile::tempdir().unwrap();
    let left = work.path().join("left.json");
    let right = work.path().join("right.json");
    fs::write(&left, r#"{"0": 1000}"#).unwrap();
    fs::write(&right, r#"{"11": 1000}"#).unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("difftriage");
    cmd.arg("compare").arg(&left).arg(&right);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("statistic: 1.000000"))
        .stdout(predicate::str::contains("shots: 1000 / 1000"));
}

#[test]
fn test_compare_reports_sample_size_mismatch() {
    let work = tempfile::tempdir().unwrap();
    let left = work.path().join("left.json");
    let right = work.path().join("right.json");
    fs::write(&left, r#"{"0": 1000}"#).unwrap();
    fs::write(&right, r#"{"0": 999}"#).unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("difftriage");
    cmd.arg("compare").arg(&left).arg(&right);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Sample size"));
}

#[test]
fn test_overlap_subcommand() {
    let work = tempfile::tempdir().unwrap();
    let left = work.path().join("a.json");
    let right = work.path().join("b.json");
    fs::write(&left, "[[1.0, 0.0], [0.0, 0.0]]").unwrap();
    fs::write(&right, "[[0.0, 0.0], [1.0, 0.0]]").unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("difftriage");
    cmd.arg("overlap").arg(&left).arg(&left);
    cmd.assert().success().stdout("1\n");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("difftriage");
    cmd.arg("overlap").arg(&left).arg(&right);
    cmd.assert().success().stdout("0\n");
}

#[test]
fn test_version_flag() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("difftriage");
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("difftriage"));
}
