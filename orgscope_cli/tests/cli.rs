//! End-to-end tests of the `orgscope` binary
//!
//! Each test points XDG_CONFIG_HOME at a fresh temporary directory so the
//! user's real configuration is never read or written.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Port 9 (discard) is closed on test machines, so connections fail fast
const UNREACHABLE_ORG: &str = "http://127.0.0.1:9";

fn orgscope(config_home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("orgscope").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_home.path())
        .env("NO_COLOR", "1")
        .env_remove("ORGSCOPE_ORG__INSTANCE_URL")
        .env_remove("ORGSCOPE_ORG__ACCESS_TOKEN");
    cmd
}

fn with_org(mut cmd: Command) -> Command {
    cmd.env("ORGSCOPE_ORG__INSTANCE_URL", UNREACHABLE_ORG)
        .env("ORGSCOPE_ORG__ACCESS_TOKEN", "00Dtest!token")
        .env("ORGSCOPE_ORG__TIMEOUT_SECONDS", "5");
    cmd
}

#[test]
fn test_version() {
    let home = TempDir::new().unwrap();
    orgscope(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_completions_bash() {
    let home = TempDir::new().unwrap();
    orgscope(&home)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("orgscope"));
}

#[test]
fn test_config_set_then_get() {
    let home = TempDir::new().unwrap();

    orgscope(&home)
        .args(["config", "set", "core.pool.max_connections", "4"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Set core.pool.max_connections = 4"));

    let written = fs::read_to_string(home.path().join("orgscope").join("config.toml")).unwrap();
    assert!(written.contains("max_connections = 4"));

    orgscope(&home)
        .args(["config", "get", "core.pool.max_connections"])
        .assert()
        .success()
        .stdout("4\n");
}

#[test]
fn test_config_list_masks_token() {
    let home = TempDir::new().unwrap();

    orgscope(&home)
        .args(["config", "set", "org.access_token", "00Dxx!secretvalue9876"])
        .assert()
        .success();

    orgscope(&home)
        .args(["config", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("access_token = ****9876"))
        .stdout(predicate::str::contains("secretvalue").not())
        .stdout(predicate::str::contains("[core]"));
}

#[test]
fn test_config_set_rejects_invalid_value() {
    let home = TempDir::new().unwrap();

    orgscope(&home)
        .args(["config", "set", "org.instance_url", "acme.example.com"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("https://"));
}

#[test]
fn test_config_get_unknown_key() {
    let home = TempDir::new().unwrap();

    orgscope(&home)
        .args(["config", "get", "org.nothing_here"])
        .assert()
        .code(4);
}

#[test]
fn test_usage_without_org_is_misuse() {
    let home = TempDir::new().unwrap();

    orgscope(&home)
        .args(["usage", "Account"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No org configured"));
}

#[test]
fn test_usage_unreachable_org_is_network_error() {
    let home = TempDir::new().unwrap();

    with_org(orgscope(&home))
        .args(["usage", "Account", "--no-progress"])
        .assert()
        .code(3);
}

#[test]
fn test_usage_json_failure_prints_envelope() {
    let home = TempDir::new().unwrap();

    with_org(orgscope(&home))
        .args(["usage", "Account", "--format", "json"])
        .assert()
        .code(3)
        .stdout(predicate::str::contains("\"success\": false"))
        .stdout(predicate::str::contains("\"category\": \"network\""));
}

#[test]
fn test_usage_rejects_malformed_object_name() {
    let home = TempDir::new().unwrap();

    with_org(orgscope(&home))
        .args(["usage", "Account; DROP"])
        .assert()
        .code(2);
}

#[test]
fn test_diagnose_recursion_json() {
    let home = TempDir::new().unwrap();

    // Fetch failures are absorbed by the analyzers; recursion is detected
    // from the description alone
    with_org(orgscope(&home))
        .args([
            "diagnose",
            "auto",
            "Maximum trigger depth exceeded on update",
            "--object",
            "Opportunity",
            "--auto-fix",
            "--format",
            "json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"success\": true"))
        .stdout(predicate::str::contains("Trigger Recursion"))
        .stdout(predicate::str::contains("OpportunityTriggerHelper"));
}

#[test]
fn test_diagnose_unknown_issue_type_text() {
    let home = TempDir::new().unwrap();

    with_org(orgscope(&home))
        .args(["diagnose", "Workflowz", "something odd"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Unknown Issue Type"));
}
