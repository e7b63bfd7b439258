//! CLI integration tests for polystore.
//!
//! These tests verify argument parsing, help output, exit codes, and the
//! init/export/import flow against temporary sqlite files.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

/// Get a command for the polystore binary.
fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("polystore").unwrap();
    cmd.env_remove("POLYSTORE_CONFIG");
    cmd
}

/// Write a sqlite configuration pointing into `dir` and return its path.
fn sqlite_config(dir: &TempDir, db_name: &str) -> String {
    let config_path = dir.path().join("polystore.json");
    let db_path = dir.path().join(db_name);
    let body = serde_json::json!({
        "provider": "sqlite",
        "sqlite": { "filePath": db_path.to_string_lossy() }
    });
    std::fs::write(&config_path, body.to_string()).unwrap();
    config_path.to_string_lossy().into_owned()
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
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
        .stdout(predicate::str::contains("config"))
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("export"))
        .stdout(predicate::str::contains("import"))
        .stdout(predicate::str::contains("migrate"))
        .stdout(predicate::str::contains("health-check"));
}

#[test]
fn test_import_subcommand_help() {
    cmd()
        .args(["import", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--input"))
        .stdout(predicate::str::contains("--mode"))
        .stdout(predicate::str::contains("--provider"));
}

#[test]
fn test_migrate_subcommand_help() {
    cmd()
        .args(["migrate", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--to"))
        .stdout(predicate::str::contains("--from"))
        .stdout(predicate::str::contains("--activate"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("polystore"));
}

#[test]
fn test_config_default_path() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("[default: polystore.json]"));
}

// =============================================================================
// Argument Errors
// =============================================================================

#[test]
fn test_no_subcommand_fails() {
    cmd().assert().failure();
}

#[test]
fn test_unknown_subcommand_fails() {
    cmd()
        .arg("resume")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_export_requires_output() {
    cmd()
        .arg("export")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--output"));
}

// =============================================================================
// Config Command
// =============================================================================

#[test]
fn test_config_show_defaults_without_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.json");

    cmd()
        .args(["--config", path.to_str().unwrap(), "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"provider\": \"sqlite\""))
        .stdout(predicate::str::contains("hasPassword"));
}

#[test]
fn test_config_set_preserves_password() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("polystore.json");
    let path_str = path.to_str().unwrap();

    cmd()
        .args([
            "--config",
            path_str,
            "config",
            "set",
            r#"{"provider":"postgres","postgres":{"host":"db","password":"s3cret"}}"#,
        ])
        .assert()
        .success();

    cmd()
        .args([
            "--config",
            path_str,
            "config",
            "set",
            r#"{"postgres":{"port":6543,"password":""}}"#,
        ])
        .assert()
        .success();

    let stored = read_json(&path);
    assert_eq!(stored["provider"], "postgres");
    assert_eq!(stored["postgres"]["port"], 6543);
    assert_eq!(stored["postgres"]["password"], "s3cret");

    cmd()
        .args(["--config", path_str, "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"hasPassword\": true"))
        .stdout(predicate::str::contains("s3cret").not());
}

#[test]
fn test_config_set_rejects_invalid_json() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("polystore.json");

    cmd()
        .args(["--config", path.to_str().unwrap(), "config", "set", "{not json"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("not valid JSON"));
}

#[test]
fn test_config_path_from_env() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("from-env.json");

    cmd()
        .env("POLYSTORE_CONFIG", &path)
        .args(["config", "set", r#"{"provider":"mariadb"}"#])
        .assert()
        .success();

    assert_eq!(read_json(&path)["provider"], "mariadb");
}

// =============================================================================
// Data Commands
// =============================================================================

#[test]
fn test_init_reports_tables() {
    let dir = TempDir::new().unwrap();
    let config = sqlite_config(&dir, "app.db");

    cmd()
        .args(["--config", &config, "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Tables: 9"));

    // Second run changes nothing
    cmd()
        .args(["--config", &config, "--output-json", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"tables\": 9"))
        .stdout(predicate::str::contains("already_present"));
}

#[test]
fn test_export_import_round_trip() {
    let dir = TempDir::new().unwrap();
    let config = sqlite_config(&dir, "app.db");
    let snapshot_path = dir.path().join("snapshot.json");
    let snapshot = serde_json::json!({
        "version": 1,
        "exportedAt": "2026-01-05T10:00:00Z",
        "source": "sqlite:seed.db",
        "tables": {
            "clients": [
                {"id": 1, "name": "Acme"},
                {"id": 5, "name": "Globex"}
            ],
            "invoices": [
                {
                    "id": 9,
                    "invoice_number": "INV-9",
                    "client_id": 5,
                    "issue_date": "2026-01-05",
                    "status": "sent",
                    "subtotal": 100.0,
                    "tax_total": 20.5,
                    "total": 120.5
                }
            ]
        }
    });
    std::fs::write(&snapshot_path, snapshot.to_string()).unwrap();

    cmd()
        .args([
            "--config",
            &config,
            "import",
            "--input",
            snapshot_path.to_str().unwrap(),
            "--mode",
            "replace",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 3 row(s)"));

    let export_path = dir.path().join("export.json");
    cmd()
        .args([
            "--config",
            &config,
            "export",
            "--output",
            export_path.to_str().unwrap(),
        ])
        .assert()
        .success();

    let exported = read_json(&export_path);
    assert_eq!(exported["version"], 1);
    assert_eq!(exported["tables"]["clients"].as_array().unwrap().len(), 2);
    assert_eq!(exported["tables"]["invoices"][0]["invoice_number"], "INV-9");
    assert_eq!(exported["tables"]["receipts"].as_array().unwrap().len(), 0);
}

#[test]
fn test_import_invalid_mode_is_validation_error() {
    let dir = TempDir::new().unwrap();
    let config = sqlite_config(&dir, "app.db");
    let snapshot_path = dir.path().join("snapshot.json");
    std::fs::write(&snapshot_path, r#"{"tables":{}}"#).unwrap();

    cmd()
        .args([
            "--config",
            &config,
            "import",
            "--input",
            snapshot_path.to_str().unwrap(),
            "--mode",
            "merge",
        ])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("unknown import mode"));
}

#[test]
fn test_import_unknown_provider_is_config_error() {
    let dir = TempDir::new().unwrap();
    let config = sqlite_config(&dir, "app.db");
    let snapshot_path = dir.path().join("snapshot.json");
    std::fs::write(&snapshot_path, r#"{"tables":{}}"#).unwrap();

    cmd()
        .args([
            "--config",
            &config,
            "import",
            "--input",
            snapshot_path.to_str().unwrap(),
            "--provider",
            "oracle",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Unsupported database provider"));
}

#[test]
fn test_import_missing_tables_is_validation_error() {
    let dir = TempDir::new().unwrap();
    let config = sqlite_config(&dir, "app.db");
    let snapshot_path = dir.path().join("snapshot.json");
    std::fs::write(&snapshot_path, r#"{"version":1}"#).unwrap();

    cmd()
        .args([
            "--config",
            &config,
            "import",
            "--input",
            snapshot_path.to_str().unwrap(),
        ])
        .assert()
        .code(3);
}

#[test]
fn test_migrate_to_same_provider_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config = sqlite_config(&dir, "app.db");

    cmd()
        .args(["--config", &config, "migrate", "--to", "sqlite"])
        .assert()
        .code(3);
}

#[test]
fn test_health_check_sqlite() {
    let dir = TempDir::new().unwrap();
    let config = sqlite_config(&dir, "health.db");

    cmd()
        .args(["--config", &config, "--output-json", "health-check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"healthy\": true"));
}

#[test]
fn test_health_check_missing_host_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("polystore.json");
    std::fs::write(&path, r#"{"provider":"supabase"}"#).unwrap();

    cmd()
        .args(["--config", path.to_str().unwrap(), "health-check"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("FAILED"));
}
