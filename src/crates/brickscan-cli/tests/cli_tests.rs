//! Integration tests for the brickscan binary.
//!
//! These run the compiled binary in an empty temporary HOME and working
//! directory so no user or project config is picked up, and only exercise
//! paths that need no network.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn brickscan(dir: &Path, args: &[&str]) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_brickscan"));
    cmd.args(args)
        .current_dir(dir)
        .env("HOME", dir)
        .env_remove("RUST_LOG");
    for (key, _) in std::env::vars() {
        if key.starts_with("BRICKSCAN_") {
            cmd.env_remove(key);
        }
    }
    cmd.output().expect("Failed to run brickscan")
}

#[test]
fn test_config_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let output = brickscan(temp_dir.path(), &["config"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("api_base = \"http://localhost:3001\""), "{}", stdout);
    assert!(stdout.contains("condition = \"N\""), "{}", stdout);
    assert!(stdout.contains("field = \"image\""), "{}", stdout);
}

#[test]
fn test_config_file_and_flags() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("scan.yaml");
    fs::write(
        &config_path,
        "api_base: http://prices.internal:8080\ncondition: used\n",
    )
    .unwrap();

    let output = brickscan(
        temp_dir.path(),
        &[
            "config",
            "--config",
            config_path.to_str().unwrap(),
            "--fallback-url",
            "https://legacy.example/predict",
        ],
    );

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("api_base = \"http://prices.internal:8080\""), "{}", stdout);
    assert!(stdout.contains("condition = \"U\""), "{}", stdout);
    assert!(stdout.contains("url = \"https://legacy.example/predict\""), "{}", stdout);
    assert!(stdout.contains("field = \"query_image\""), "{}", stdout);
}

#[test]
fn test_project_config_is_picked_up() {
    let temp_dir = TempDir::new().unwrap();
    let project_dir = temp_dir.path().join(".brickscan");
    fs::create_dir_all(&project_dir).unwrap();
    fs::write(
        project_dir.join("brickscan.toml"),
        "api_base = \"https://prices.example.com\"\ntimeout_secs = 12\n",
    )
    .unwrap();

    let output = brickscan(temp_dir.path(), &["config"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("api_base = \"https://prices.example.com\""), "{}", stdout);
    assert!(stdout.contains("timeout_secs = 12"), "{}", stdout);
}

#[test]
fn test_invalid_api_base_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let output = brickscan(temp_dir.path(), &["config", "--api-base", "localhost:3001"]);

    assert!(!output.status.success());
}

#[test]
fn test_scan_rejects_non_image_file() {
    let temp_dir = TempDir::new().unwrap();
    let notes = temp_dir.path().join("notes.txt");
    fs::write(&notes, "not a picture").unwrap();

    let output = brickscan(temp_dir.path(), &["scan", notes.to_str().unwrap()]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("is not an image file"), "{}", stderr);
}

#[test]
fn test_scan_rejects_unknown_condition() {
    let temp_dir = TempDir::new().unwrap();
    let output = brickscan(temp_dir.path(), &["scan", "fig.jpg", "--condition", "mint"]);

    assert!(!output.status.success());
}

#[test]
fn test_condition_is_long_only() {
    let temp_dir = TempDir::new().unwrap();
    let output = brickscan(temp_dir.path(), &["price", "sw0001a", "-n", "used"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unexpected argument '-n'"), "{}", stderr);
}
