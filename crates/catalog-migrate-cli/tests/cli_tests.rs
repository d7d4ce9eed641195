//! CLI integration tests for catalog-migrate.
//!
//! These tests verify command-line argument parsing, help output,
//! config initialization and exit codes for error conditions that are
//! detected before (or while) connecting.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::TempDir;

/// Get a command for the catalog-migrate binary, isolated from the caller's
/// environment and working directory.
fn cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("catalog-migrate").unwrap();
    cmd.env_clear().current_dir(dir.path());
    cmd
}

fn workdir() -> TempDir {
    tempfile::tempdir().unwrap()
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    cmd(&workdir())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("connect"))
        .stdout(predicate::str::contains("introspect"))
        .stdout(predicate::str::contains("export"))
        .stdout(predicate::str::contains("migrations"));
}

#[test]
fn test_migrations_subcommand_help() {
    cmd(&workdir())
        .args(["migrations", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--target"))
        .stdout(predicate::str::contains("--only-data"))
        .stdout(predicate::str::contains("--tables"))
        .stdout(predicate::str::contains("--disable-identity"));
}

#[test]
fn test_version_flag() {
    cmd(&workdir())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("catalog-migrate"));
}

#[test]
fn test_logging_flag_defaults() {
    cmd(&workdir())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("[default: text]"))
        .stdout(predicate::str::contains("[default: info]"));
}

#[test]
fn test_no_subcommand_shows_usage() {
    cmd(&workdir())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

// =============================================================================
// Init Tests
// =============================================================================

#[test]
fn test_init_creates_config_and_refuses_overwrite() {
    let dir = workdir();

    cmd(&dir).arg("init").assert().success();
    let written = std::fs::read_to_string(dir.path().join("catalog-migrate.yaml")).unwrap();
    assert!(written.contains("connection:"));

    cmd(&dir)
        .arg("init")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--force"));

    cmd(&dir).args(["init", "--force"]).assert().success();
}

#[test]
fn test_init_custom_output_path() {
    let dir = workdir();
    cmd(&dir)
        .args(["init", "--output", "conf/dev.yaml"])
        .assert()
        .success();
    assert!(dir.path().join("conf/dev.yaml").exists());
}

// =============================================================================
// Exit Code Tests - Config Errors (Exit Code 1) and IO Errors (Exit Code 7)
// =============================================================================

#[test]
fn test_missing_config_exits_with_code_7() {
    cmd(&workdir())
        .args(["--config", "nonexistent_config_file.yaml", "connect"])
        .assert()
        .code(7);
}

#[test]
fn test_invalid_yaml_exits_with_code_1() {
    let dir = workdir();
    let mut file = tempfile::NamedTempFile::new_in(dir.path()).unwrap();
    writeln!(file, "connection: [unclosed").unwrap();

    cmd(&dir)
        .args(["--config", file.path().to_str().unwrap(), "connect"])
        .assert()
        .code(1);
}

#[test]
fn test_missing_type_exits_with_code_1() {
    cmd(&workdir())
        .args(["connect", "--database", "app", "--user", "app"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("connection.type"));
}

#[test]
fn test_unknown_database_type_exits_with_code_1() {
    cmd(&workdir())
        .args(["connect", "-t", "oracle", "-d", "app", "-u", "app"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("oracle"));
}

#[test]
fn test_unknown_connection_profile_exits_with_code_1() {
    let dir = workdir();
    std::fs::write(
        dir.path().join("catalog-migrate.yaml"),
        "connections:\n  analytics:\n    type: postgres\n    user: app\n    database: dw\n",
    )
    .unwrap();

    cmd(&dir)
        .args(["--conn", "staging", "connect"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("analytics"));
}

// =============================================================================
// Generator Option Tests (checked before connecting)
// =============================================================================

#[test]
fn test_unknown_target_exits_with_code_1() {
    cmd(&workdir())
        .args(["export", "--target", "hibernate"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("hibernate"));
}

#[test]
fn test_models_only_target_rejects_migrations() {
    cmd(&workdir())
        .args(["migrations", "--target", "prisma"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("does not support migrations"));
}

#[test]
fn test_data_requires_tables() {
    cmd(&workdir())
        .args(["migrations", "--target", "sequelize", "--data"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--tables"));
}

#[test]
fn test_data_and_only_data_conflict() {
    cmd(&workdir())
        .args([
            "migrations",
            "--target",
            "typeorm",
            "--data",
            "--only-data",
            "--tables",
            "users",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

// =============================================================================
// Connection Failure Tests (Exit Code 2)
// =============================================================================

#[test]
fn test_unreachable_server_exits_with_code_2() {
    cmd(&workdir())
        .args([
            "connect", "-t", "postgres", "-H", "127.0.0.1", "-P", "1", "-u", "app", "-d", "app",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Connection failed"));
}
