//! Integration tests for the ledger CLI.
//!
//! These tests run the actual binary and verify output against expected CSV files.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

/// Get path to test data file
fn test_data_path(filename: &str) -> String {
    format!("tests/data/{}", filename)
}

/// Run the binary with the given arguments and return stdout
fn run_ledger(args: &[&str]) -> String {
    let mut cmd = Command::cargo_bin("ledger").unwrap();
    let assert = cmd.args(args).assert().success();
    String::from_utf8(assert.get_output().stdout.clone()).unwrap()
}

/// Normalize CSV for comparison (trim whitespace, drop blank lines)
fn normalize_csv(csv: &str) -> Vec<String> {
    csv.lines()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

fn assert_matches_expected(input: &str, expected: &str) {
    let output = run_ledger(&[&test_data_path(input)]);
    let expected = fs::read_to_string(test_data_path(expected)).unwrap();
    assert_eq!(normalize_csv(&output), normalize_csv(&expected));
}

#[test]
fn test_sample_a_deposits_transfers_withdrawals() {
    assert_matches_expected("sample_a.csv", "expected_a.csv");
}

#[test]
fn test_sample_b_failed_operations_are_skipped() {
    assert_matches_expected("sample_b_failures.csv", "expected_b.csv");
}

#[test]
fn test_sample_c_whitespace_handling() {
    assert_matches_expected("sample_c_whitespace.csv", "expected_c.csv");
}

#[test]
fn test_output_has_correct_header() {
    let output = run_ledger(&[&test_data_path("sample_a.csv")]);
    assert!(output.starts_with("address,balance,transactions,created_at,updated_at"));
}

#[test]
fn test_history_flag_prints_entries_in_order() {
    let output = run_ledger(&[&test_data_path("sample_a.csv"), "--history", "alice"]);
    assert_eq!(
        normalize_csv(&output),
        [
            "index,kind,amount,from,to,timestamp",
            "0,deposit,100,,,1002",
            "1,transfer,40,alice,bob,1004",
        ]
    );
}

#[test]
fn test_history_for_unknown_account_fails() {
    let mut cmd = Command::cargo_bin("ledger").unwrap();
    cmd.args([test_data_path("sample_a.csv").as_str(), "--history", "zed"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_snapshot_then_restore_continues_ledger() {
    let dir = tempdir().unwrap();
    let snapshot = dir.path().join("ledger.json");
    let snapshot = snapshot.to_str().unwrap();

    run_ledger(&[&test_data_path("sample_a.csv"), "--snapshot", snapshot]);
    assert!(fs::read_to_string(snapshot).unwrap().contains("\"kind\": \"transfer\""));

    let output = run_ledger(&[&test_data_path("sample_d_more.csv"), "--restore", snapshot]);
    assert_eq!(
        normalize_csv(&output),
        [
            "address,balance,transactions,created_at,updated_at",
            "alice,60,2,1000,1004",
            "bob,0,5,1001,2002",
            "carol,50,1,2000,2002",
        ]
    );
}

#[test]
fn test_corrupt_snapshot_is_rejected() {
    let dir = tempdir().unwrap();
    let snapshot = dir.path().join("bad.json");
    fs::write(
        &snapshot,
        r#"{"accounts":{"alice":{"address":"alice","created_at":1,"updated_at":2,"balance":99,"history":[{"kind":"deposit","amount":1,"timestamp":2}]}}}"#,
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("ledger").unwrap();
    cmd.arg(test_data_path("sample_a.csv"))
        .arg("--restore")
        .arg(&snapshot)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Corrupt snapshot"));
}

#[test]
fn test_missing_file_error() {
    let mut cmd = Command::cargo_bin("ledger").unwrap();
    cmd.arg("nonexistent.csv")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_missing_argument_error() {
    let mut cmd = Command::cargo_bin("ledger").unwrap();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}
