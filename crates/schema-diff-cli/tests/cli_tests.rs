//! CLI integration tests for schema-diff.
//!
//! These tests verify command-line argument parsing, help output, and exit
//! codes for error conditions that surface before any connection is opened.

use assert_cmd::Command;
use predicates::prelude::*;

/// Get a command for the schema-diff binary.
fn cmd() -> Command {
    Command::cargo_bin("schema-diff").unwrap()
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("compare"))
        .stdout(predicate::str::contains("generate"))
        .stdout(predicate::str::contains("prompt"));
}

#[test]
fn test_generate_subcommand_help() {
    cmd()
        .args(["generate", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--target"))
        .stdout(predicate::str::contains("--direction"))
        .stdout(predicate::str::contains("--with-transaction"))
        .stdout(predicate::str::contains("--safe"))
        .stdout(predicate::str::contains("--cascade"))
        .stdout(predicate::str::contains("--if-exists"))
        .stdout(predicate::str::contains("--out"));
}

#[test]
fn test_compare_subcommand_help() {
    cmd()
        .args(["compare", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--from"))
        .stdout(predicate::str::contains("--to"))
        .stdout(predicate::str::contains("--schema"))
        .stdout(predicate::str::contains("--json"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("schema-diff"));
}

// =============================================================================
// Argument Validation Tests (no database required)
// =============================================================================

#[test]
fn test_missing_schema_is_a_hard_error() {
    cmd()
        .args([
            "compare",
            "--from",
            "postgres://app:pw@localhost/db_a",
            "--to",
            "postgres://app:pw@localhost/db_b",
        ])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("schema is required"));
}

#[test]
fn test_unsupported_protocol_fails() {
    cmd()
        .args([
            "compare",
            "--from",
            "mssql://sa:pw@localhost/db?schema=dbo",
            "--to",
            "postgres://app:pw@localhost/db?schema=public",
        ])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("unsupported dialect"));
}

#[test]
fn test_system_schema_is_refused() {
    cmd()
        .args([
            "compare",
            "--from",
            "postgres://app:pw@localhost/db?schema=pg_catalog",
            "--to",
            "postgres://app:pw@localhost/db?schema=public",
        ])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("system schema"));
}

#[test]
fn test_schema_flag_overrides_url() {
    // `--schema mysql` is a system schema for the mariadb side; the error
    // proves the flag took precedence over the URL parameter.
    cmd()
        .args([
            "compare",
            "--from",
            "mariadb://app:pw@localhost/db?schema=shop",
            "--to",
            "mariadb://app:pw@localhost/db?schema=shop",
            "--schema",
            "mysql",
        ])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("system schema"));
}

#[test]
fn test_invalid_direction_rejected() {
    cmd()
        .args([
            "generate",
            "--from",
            "postgres://app:pw@localhost/db?schema=public",
            "--to",
            "postgres://app:pw@localhost/db?schema=public",
            "--target",
            "postgres",
            "--direction",
            "sideways",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("sideways"));
}

#[test]
fn test_generate_requires_target() {
    cmd()
        .args([
            "generate",
            "--from",
            "postgres://app:pw@localhost/db?schema=public",
            "--to",
            "postgres://app:pw@localhost/db?schema=public",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--target"));
}

#[test]
fn test_unknown_url_parameter_is_rejected() {
    cmd()
        .args([
            "compare",
            "--from",
            "postgres://app:pw@localhost/db?schema=public&sslmode=require",
            "--to",
            "postgres://app:pw@localhost/db?schema=public",
        ])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("unknown connection URL parameter"));
}
