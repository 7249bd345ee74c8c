//! Integration tests for the bitclass CLI

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::{tempdir, TempDir};

const RULES: &str = "\
# sample routing table
1 10.0.0.0/8
2 10.1.0.0/16
3 10.1.2.0/24
4 192.168.0.0/16
";

fn write_rules(content: &str) -> (TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("rules.txt");
    fs::write(&path, content).unwrap();
    (dir, path)
}

fn bitclass() -> Command {
    let mut cmd = Command::cargo_bin("bitclass").unwrap();
    cmd.arg("--no-color");
    cmd
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("bitclass").unwrap();
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("bitclass"));
}

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("bitclass").unwrap();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("SIMD bit-vector packet classifier"));
}

#[test]
fn test_lookup_longest_prefix() {
    let (_dir, rules) = write_rules(RULES);

    bitclass()
        .arg("lookup")
        .arg(&rules)
        .args(["10.1.2.3", "10.1.9.9", "10.9.9.9", "192.168.4.4", "8.8.8.8"])
        .assert()
        .success()
        .stdout(predicate::str::contains("10.1.2.3 -> rule 3"))
        .stdout(predicate::str::contains("10.1.9.9 -> rule 2"))
        .stdout(predicate::str::contains("10.9.9.9 -> rule 1"))
        .stdout(predicate::str::contains("192.168.4.4 -> rule 4"))
        .stdout(predicate::str::contains("8.8.8.8 -> no match"));
}

#[test]
fn test_lookup_invalid_address() {
    let (_dir, rules) = write_rules(RULES);

    bitclass()
        .arg("lookup")
        .arg(&rules)
        .arg("10.1.2")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid IPv4 address"));
}

#[test]
fn test_check_reports_histogram() {
    let (_dir, rules) = write_rules(RULES);

    bitclass()
        .arg("check")
        .arg(&rules)
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid"))
        .stdout(predicate::str::contains("Rules:         4"))
        .stdout(predicate::str::contains("/16"))
        .stdout(predicate::str::contains("/24"));
}

#[test]
fn test_check_reports_line_number() {
    let (_dir, rules) = write_rules("1 10.0.0.0/8\n2 10.0.0.0/40\n");

    bitclass()
        .arg("check")
        .arg(&rules)
        .assert()
        .failure()
        .stderr(predicate::str::contains("line 2"));
}

#[test]
fn test_missing_rule_file() {
    let dir = tempdir().unwrap();

    bitclass()
        .arg("check")
        .arg(dir.path().join("absent.txt"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load rules"));
}

#[test]
fn test_bench_prints_throughput_and_checksum() {
    let (_dir, rules) = write_rules(RULES);

    for strategy in ["linear", "tree"] {
        bitclass()
            .arg("bench")
            .arg(&rules)
            .args(["--keys", "2000", "--seed", "11", "--strategy", strategy, "--lane", "128"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Lookups:    2000"))
            .stdout(predicate::str::contains("Checksum:"))
            .stdout(predicate::str::is_match(r"Throughput: [0-9.]+ (Mops|Kops|ops)").unwrap());
    }
}

#[test]
fn test_bench_checksum_is_deterministic() {
    let (_dir, rules) = write_rules(RULES);

    let run = |strategy: &str| {
        let output = bitclass()
            .arg("bench")
            .arg(&rules)
            .args(["--keys", "5000", "--seed", "3", "--strategy", strategy])
            .output()
            .unwrap();
        assert!(output.status.success());
        String::from_utf8(output.stdout)
            .unwrap()
            .lines()
            .find(|line| line.contains("Checksum:"))
            .map(str::to_string)
            .unwrap()
    };
    assert_eq!(run("linear"), run("tree"));
}

#[test]
fn test_bench_rejects_unknown_strategy() {
    let (_dir, rules) = write_rules(RULES);

    bitclass()
        .arg("bench")
        .arg(&rules)
        .args(["--strategy", "random"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown reduction strategy"));
}

#[test]
fn test_config_file() {
    let (dir, rules) = write_rules(RULES);
    let config = dir.path().join("bitclass.toml");
    fs::write(
        &config,
        "[classifier]\nlane = \"w128\"\nreduction = \"linear\"\n\n[bench]\nkeys = 300\nseed = 5\n",
    )
    .unwrap();

    bitclass()
        .arg("--config")
        .arg(&config)
        .arg("bench")
        .arg(&rules)
        .assert()
        .success()
        .stdout(predicate::str::contains("Lookups:    300"))
        .stdout(predicate::str::contains("128-bit lanes, linear reduction"));
}

#[test]
fn test_invalid_config_file() {
    let (dir, rules) = write_rules(RULES);
    let config = dir.path().join("bad.toml");
    fs::write(&config, "[bench]\nkeys = 0\n").unwrap();

    bitclass()
        .arg("--config")
        .arg(&config)
        .arg("check")
        .arg(&rules)
        .assert()
        .failure()
        .stderr(predicate::str::contains("bench.keys"));
}
