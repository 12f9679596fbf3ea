//! End-to-end tests for `symphovert convert`
//!
//! These tests run the binary against scratch archives:
//! - missing, uninitialised and unreadable catalogs
//! - archives with nothing to convert
//! - launch failures counted as per-file errors
//! - usage errors

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use symphovert_cli::catalog::{Catalog, FileRecord, PendingFilter};
use tempfile::TempDir;

/// Every protocol wait set to zero
const ZERO_TIMINGS: &str = r#"
[timings]
action_pause_ms = 0
launch_settle_ms = 0
open_chord_interval_ms = 0
open_dialog_ms = 0
after_open_ms = 0
document_load_ms = 0
save_as_chord_interval_ms = 0
after_save_ms = 0
after_app_kill_ms = 0
after_runtime_kill_ms = 0
"#;

/// Scratch archive with an initialised, empty catalog and a zero-wait config
fn archive() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("OriginalDocuments")).unwrap();
    Catalog::create(dir.path().join("_metadata/avid.db")).unwrap();
    std::fs::write(dir.path().join("symphovert.toml"), ZERO_TIMINGS).unwrap();
    dir
}

fn add_original(root: &Path, relative_path: &str, puid: &str) -> FileRecord {
    let source = root.join("OriginalDocuments").join(relative_path);
    std::fs::create_dir_all(source.parent().unwrap()).unwrap();
    std::fs::write(&source, b"Lotus Word Pro").unwrap();

    let catalog = Catalog::open(root.join("_metadata/avid.db")).unwrap();
    let record = FileRecord::for_conversion(relative_path, puid, "symphovert");
    catalog.insert_file_record(&record).unwrap();
    catalog.commit().unwrap();
    record
}

fn symphovert() -> Command {
    let mut cmd = Command::cargo_bin("symphovert").unwrap();
    cmd.env_remove("SYMPHOVERT_CONFIG")
        .env_remove("SYMPHOVERT_EXECUTABLE")
        .env_remove("SYMPHOVERT_TOOL_NAME")
        .env_remove("LOG_LEVEL")
        .env("NO_COLOR", "1");
    cmd
}

// ============================================================================
// Catalog Tests
// ============================================================================

#[test]
fn test_convert_missing_catalog() {
    let dir = TempDir::new().unwrap();

    symphovert()
        .arg("convert")
        .arg(dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Database is not present"))
        .stderr(predicate::str::contains("avid.db"));
}

#[test]
fn test_convert_uninitialised_catalog() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("_metadata")).unwrap();
    rusqlite::Connection::open(dir.path().join("_metadata/avid.db"))
        .unwrap()
        .execute("CREATE TABLE unrelated (id INTEGER)", [])
        .unwrap();

    symphovert()
        .arg("convert")
        .arg(dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("is not initialised"));
}

#[test]
fn test_convert_unreadable_catalog() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("_metadata/avid.db");
    std::fs::create_dir_all(db.parent().unwrap()).unwrap();
    let garbage = b"this is a plain text file, not a catalog\n".repeat(64);
    std::fs::write(&db, &garbage).unwrap();

    symphovert()
        .arg("convert")
        .arg(dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Catalog error"));

    // Nothing was logged into it
    assert_eq!(std::fs::read(&db).unwrap(), garbage);
}

#[test]
fn test_convert_missing_archive() {
    let dir = TempDir::new().unwrap();

    symphovert()
        .arg("convert")
        .arg(dir.path().join("AVID.NOPE.1"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Archive not found"));
}

// ============================================================================
// Batch Tests
// ============================================================================

#[test]
fn test_convert_nothing_pending() {
    let dir = archive();

    symphovert()
        .arg("convert")
        .arg(dir.path())
        .arg("--config")
        .arg(dir.path().join("symphovert.toml"))
        .arg("--no-progress")
        .assert()
        .success()
        .stdout(predicate::str::contains("Converted:         0"))
        .stdout(predicate::str::contains("Done"));
}

#[test]
fn test_convert_skips_unroutable_files() {
    let dir = archive();
    let record = add_original(dir.path(), "docs/scan.pdf", "fmt/276");

    symphovert()
        .arg("convert")
        .arg(dir.path())
        .arg("--config")
        .arg(dir.path().join("symphovert.toml"))
        .arg("--no-progress")
        .assert()
        .success()
        .stdout(predicate::str::contains("Skipped:           1"));

    let catalog = Catalog::open(dir.path().join("_metadata/avid.db")).unwrap();
    assert!(!catalog.get_file_record(record.uuid).unwrap().unwrap().processed);
}

#[test]
fn test_convert_launch_failure_exits_nonzero() {
    let dir = archive();
    let record = add_original(dir.path(), "docs/report.lwp", "fmt/340");

    symphovert()
        .env("SYMPHOVERT_EXECUTABLE", "symphovert-no-such-symphony-xyz")
        .arg("convert")
        .arg(dir.path())
        .arg("--config")
        .arg(dir.path().join("symphovert.toml"))
        .arg("--no-progress")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("1 file(s) failed"));

    let catalog = Catalog::open(dir.path().join("_metadata/avid.db")).unwrap();
    let stored = catalog.get_file_record(record.uuid).unwrap().unwrap();
    assert!(!stored.processed);
    assert!(catalog.master_artifacts_for(record.uuid).unwrap().is_empty());
    assert_eq!(catalog.select_pending(&PendingFilter::convert()).unwrap().len(), 1);

    let error = catalog
        .events()
        .unwrap()
        .into_iter()
        .find(|e| e.operation == "symphovert.error")
        .unwrap();
    assert_eq!(error.uuid, Some(record.uuid));
    assert!(error.reason.unwrap().starts_with("launch failed:"));

    assert!(!dir.path().join("MasterDocuments/docs/report.odt").exists());
}

#[test]
fn test_convert_config_from_env() {
    let dir = archive();
    std::fs::write(
        dir.path().join("broken.toml"),
        "[application]\nsave_as_chord = \"shift\"\n",
    )
    .unwrap();

    symphovert()
        .env("SYMPHOVERT_CONFIG", dir.path().join("broken.toml"))
        .arg("convert")
        .arg(dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to parse config file"));
}

// ============================================================================
// Usage Tests
// ============================================================================

#[test]
fn test_no_subcommand_is_usage_error() {
    symphovert()
        .assert()
        .code(2)
        .stderr(predicate::str::contains("A subcommand is required"));
}

#[test]
fn test_unknown_flag_is_usage_error() {
    symphovert()
        .arg("convert")
        .arg("--frobnicate")
        .assert()
        .code(2);
}

#[test]
fn test_markdown_help() {
    symphovert()
        .arg("--markdown-help")
        .assert()
        .success()
        .stdout(predicate::str::contains("symphovert convert"));
}
