//! Tests for the `finder` binary.

use assert_cmd::Command;
use predicates::prelude::*;

fn finder() -> Command {
    let mut cmd = Command::cargo_bin("finder").unwrap();
    cmd.env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_knn_reference_sample() {
    finder()
        .args(["knn", "-k", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1. user_3"))
        .stdout(predicate::str::contains("2. user_5"))
        .stdout(predicate::str::contains("3. user_6"))
        .stdout(predicate::str::contains("Vectorized euclidean"));
}

#[test]
fn test_knn_custom_query_and_metric() {
    finder()
        .args(["knn", "--metric", "manhattan", "-k", "1", "--query", "1.2,2.1,1.8,2.3,1.9"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1. user_4"))
        .stdout(predicate::str::contains("Vectorized").not());
}

#[test]
fn test_knn_unknown_metric() {
    finder()
        .args(["knn", "--metric", "chebyshev"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown distance metric"));
}

#[test]
fn test_score_all_bonuses() {
    finder()
        .args(["score", "80,50,70,60,40", "50,60,70,60,60"])
        .assert()
        .success()
        .stdout(predicate::str::contains("SharedConscientiousness"))
        .stdout(predicate::str::contains("100.0"));
}

#[test]
fn test_score_rejects_bad_vector() {
    finder()
        .args(["score", "80,50,70", "50,60,70,60,60"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid trait vector"));
}
