use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const HEADER: &str = "Market Segment Description,Age,Customer On Boarding Type,\
Creation Date,Generation,No. of days between CIR creation and Juice Subscription,\
Retail sgement,Accounts";

fn write_fixture(dir: &Path) -> PathBuf {
    let path = dir.join("onboarding.csv");
    let rows = [
        "MASS,30,Branch,04 Jan 2022,Millennials,3,MASS,120",
        "PRESTIGE,45,Online,15 Feb 2022,Gen X,,PRESTIGE,30",
        "MASS,22,Online,31 May 2023,Gen Z,12,,",
    ];
    std::fs::write(&path, format!("{HEADER}\n{}\n", rows.join("\n"))).unwrap();
    path
}

/// Command with HOME pointed at a scratch directory so no real settings leak in.
fn onboard(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("onboard").unwrap();
    cmd.env("HOME", home).env_remove("RUST_LOG");
    cmd
}

#[test]
fn report_prints_every_section() {
    let dir = TempDir::new().unwrap();
    let file = write_fixture(dir.path());
    onboard(dir.path())
        .args(["report", "--file"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Number of Accounts: 3"))
        .stdout(predicate::str::contains("January 2022"))
        .stdout(predicate::str::contains("Has Juice"));
}

#[test]
fn bare_invocation_without_terminal_prints_report() {
    let dir = TempDir::new().unwrap();
    let file = write_fixture(dir.path());
    onboard(dir.path())
        .arg("--file")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("02. A breakdown of account opening"));
}

#[test]
fn report_filters_narrow_the_counts() {
    let dir = TempDir::new().unwrap();
    let file = write_fixture(dir.path());
    onboard(dir.path())
        .args(["report", "--segment", "MASS", "--min-age", "25", "--file"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Number of Accounts: 1"));
}

#[test]
fn report_json_output() {
    let dir = TempDir::new().unwrap();
    let file = write_fixture(dir.path());
    let output = onboard(dir.path())
        .args(["report", "--format", "json", "--year", "2023", "--file"])
        .arg(&file)
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["views"]["total_accounts"], 3);
    assert_eq!(value["views"]["monthly"].as_array().unwrap().len(), 1);
    assert_eq!(value["views"]["monthly"][0]["label"], "May 2023");
    assert_eq!(value["views"]["attach_rate"][0]["label"], "Has Juice");
}

#[test]
fn report_rejects_unknown_segment() {
    let dir = TempDir::new().unwrap();
    let file = write_fixture(dir.path());
    onboard(dir.path())
        .args(["report", "--segment", "WEALTH", "--file"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown segment 'WEALTH'"));
}

#[test]
fn missing_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    onboard(dir.path())
        .args(["report", "--file", "/nonexistent/onboarding.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: Data file not found"));
}

#[test]
fn domains_lists_filter_values() {
    let dir = TempDir::new().unwrap();
    let file = write_fixture(dir.path());
    onboard(dir.path())
        .args(["domains", "--file"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("2022-01-04 to 2023-05-31"))
        .stdout(predicate::str::contains("Branch, Online"))
        .stdout(predicate::str::contains("22 to 45"));
}

#[test]
fn load_remembers_the_file() {
    let dir = TempDir::new().unwrap();
    let file = write_fixture(dir.path());
    onboard(dir.path())
        .arg("load")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Loaded 3 records"));

    assert!(dir.path().join(".config/onboard/settings.json").exists());
    onboard(dir.path())
        .arg("report")
        .assert()
        .success()
        .stdout(predicate::str::contains("Number of Accounts: 3"));
}

#[test]
fn completions_are_generated() {
    let dir = TempDir::new().unwrap();
    onboard(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("onboard"));
}
