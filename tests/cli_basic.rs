//! Integration tests for basic CLI behavior.
//!
//! Tests that the binary exists, accepts standard flags, and the cues
//! subcommand handles real transcript input.

#![allow(deprecated)] // cargo_bin is deprecated without a stable replacement

use assert_cmd::Command;
use predicates::prelude::*;

/// Helper: get a Command for the `overcue` binary.
fn overcue() -> Command {
    Command::cargo_bin("overcue").expect("binary 'overcue' should be built")
}

#[test]
fn help_flag_shows_usage() {
    overcue()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: overcue"))
        .stdout(predicate::str::contains("demo"))
        .stdout(predicate::str::contains("cues"));
}

#[test]
fn version_flag_shows_semver() {
    overcue()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^overcue \d+\.\d+\.\d+\n$").unwrap());
}

#[test]
fn no_subcommand_is_an_error() {
    overcue().assert().failure();
}

#[test]
fn cues_reports_index_and_lookups() {
    let path = std::env::temp_dir().join("overcue_cli_basic.srt");
    std::fs::write(
        &path,
        "1\n00:00:00,000 --> 00:00:02,000\nHello, world!\n\n\
         2\n00:00:02,500 --> 00:00:04,000\nSecond cue.\n\n",
    )
    .unwrap();

    overcue()
        .arg("cues")
        .arg(&path)
        .args(["--at", "1000", "--at", "2250"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 received, 2 kept"))
        .stdout(predicate::str::contains("Hello, world!"))
        .stdout(predicate::str::contains("(no cue)"));

    std::fs::remove_file(&path).ok();
}

#[test]
fn cues_missing_file_fails() {
    overcue()
        .arg("cues")
        .arg("/nonexistent/transcript.srt")
        .assert()
        .failure()
        .stderr(predicate::str::contains("reading transcript"));
}
