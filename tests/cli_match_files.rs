use assert_cmd::cargo;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn write(dir: &std::path::Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

#[test]
fn test_match_files_identical_trees_succeeds() {
    let left = TempDir::new().unwrap();
    let right = TempDir::new().unwrap();
    write(left.path(), "a.txt", "hello\n");
    write(right.path(), "a.txt", "hello\n");

    let mut cmd = cargo::cargo_bin_cmd!();
    cmd.args([
        "match-files",
        "--left",
        left.path().to_str().unwrap(),
        "--right",
        right.path().to_str().unwrap(),
    ]);

    cmd.assert().success();
}

#[test]
fn test_match_files_different_content_fails() {
    let left = TempDir::new().unwrap();
    let right = TempDir::new().unwrap();
    write(left.path(), "a.txt", "hello\n");
    write(right.path(), "a.txt", "goodbye\n");

    let mut cmd = cargo::cargo_bin_cmd!();
    cmd.args([
        "match-files",
        "--left",
        left.path().to_str().unwrap(),
        "--right",
        right.path().to_str().unwrap(),
    ]);

    cmd.assert().failure().code(1);
}

#[test]
fn test_match_files_missing_counterpart_fails() {
    let left = TempDir::new().unwrap();
    let right = TempDir::new().unwrap();
    write(left.path(), "a.txt", "hello\n");
    write(left.path(), "b.txt", "only on the left\n");
    write(right.path(), "a.txt", "hello\n");

    let mut cmd = cargo::cargo_bin_cmd!();
    cmd.args([
        "match-files",
        "--left",
        left.path().to_str().unwrap(),
        "--right",
        right.path().to_str().unwrap(),
    ]);

    cmd.assert().failure().code(1);
}

#[test]
fn test_match_files_json_output_reports_each_file() {
    let left = TempDir::new().unwrap();
    let right = TempDir::new().unwrap();
    write(left.path(), "a.txt", "hello\n");
    write(right.path(), "a.txt", "hello\n");

    let mut cmd = cargo::cargo_bin_cmd!();
    cmd.args([
        "--json",
        "match-files",
        "--left",
        left.path().to_str().unwrap(),
        "--right",
        right.path().to_str().unwrap(),
    ]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("a.txt"))
        .stdout(predicate::str::contains("MATCHING"));
}

#[test]
fn test_cache_report_runs_with_empty_cache() {
    let cache_dir = TempDir::new().unwrap();

    let mut cmd = cargo::cargo_bin_cmd!();
    cmd.args(["--op-cache-directory", cache_dir.path().to_str().unwrap(), "cache"]);

    cmd.assert().success();
}

#[test]
fn test_cache_clean_reports_confirmation() {
    let cache_dir = TempDir::new().unwrap();

    let mut cmd = cargo::cargo_bin_cmd!();
    cmd.args([
        "--op-cache-directory",
        cache_dir.path().to_str().unwrap(),
        "cache",
        "--clean",
    ]);

    cmd.assert().success().stdout(predicate::str::contains("cleared"));
}
