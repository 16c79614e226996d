//! CLI integration tests

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Run `spp` with an isolated, empty home directory
fn spp(args: &[&str]) -> Output {
    let home = TempDir::new().unwrap();
    spp_with_home(home.path(), args)
}

fn spp_with_home(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_spp"))
        .args(args)
        .env_remove("SPP_API_URL")
        .env_remove("SPP_ADMIN_TOKEN")
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = spp(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(
        stdout.contains("Student Performance Predictor"),
        "Should show app name"
    );
    for command in ["predict", "predict-batch", "model", "threshold", "health"] {
        assert!(stdout.contains(command), "Should show {} command", command);
    }
    assert!(stdout.contains("--api-url"));
    assert!(stdout.contains("--token"));
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = spp(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("spp"), "Should show binary name");
}

#[test]
fn test_predict_help_lists_features() {
    let output = spp(&["predict", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("--attendance"));
    assert!(stdout.contains("--marks"));
    assert!(stdout.contains("--internal-score"));
    assert!(stdout.contains("--final-exam-score"));
    assert!(stdout.contains("--threshold"));
}

#[test]
fn test_predict_requires_marks() {
    let output = spp(&["predict", "--attendance", "80", "--internal-score", "20"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--marks"));
}

#[test]
fn test_threshold_set_rejects_non_numeric() {
    let output = spp(&["threshold", "set", "high"]);
    assert!(!output.status.success());
}

#[test]
fn test_threshold_set_rejects_out_of_range_before_request() {
    // no server is listening here; validation has to fail first
    let output = spp(&["--api-url", "http://127.0.0.1:9", "threshold", "set", "1.5"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("between 0 and 1"));
}

#[test]
fn test_invalid_format_rejected() {
    let output = spp(&["--format", "yaml", "health"]);
    assert!(!output.status.success());
}

#[test]
fn test_predict_json_against_mock_server() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/api/predict")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"predicted_label": 1, "probability": 0.854, "threshold_used": 0.6,
                "threshold_source": "default", "model_version": "v1",
                "suspicious_input": false, "suspicious_reasons": [],
                "explanation": {"contributions": [], "feature_importances": []},
                "feedback": []}"#,
        )
        .create();

    let output = spp(&[
        "--api-url",
        &server.url(),
        "--format",
        "json",
        "predict",
        "--attendance",
        "82",
        "--marks",
        "75",
        "--internal-score",
        "20",
    ]);

    mock.assert();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"predicted_label\": 1"));
    assert!(stdout.contains("\"model_version\": \"v1\""));
}

#[test]
fn test_threshold_get_sends_token() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/api/settings/threshold")
        .match_header("authorization", "Bearer admin-secret")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"threshold": 0.65, "source": "metadata:user"}"#)
        .create();

    let output = spp(&[
        "--api-url",
        &server.url(),
        "--token",
        "admin-secret",
        "threshold",
        "get",
    ]);

    mock.assert();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("metadata:user"));
}

#[test]
fn test_unauthorized_reported_as_error() {
    let mut server = mockito::Server::new();
    server
        .mock("POST", "/api/model/reload")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error": "Unauthorized", "status": 401}"#)
        .create();

    let output = spp(&["--api-url", &server.url(), "model", "reload"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("401"));
    assert!(stderr.contains("Unauthorized"));
}

#[test]
fn test_config_file_supplies_url_and_token() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/api/settings/threshold")
        .match_header("authorization", "Bearer from-config")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"threshold": 0.6, "source": "default"}"#)
        .create();

    let home = TempDir::new().unwrap();
    let config_dir = home.path().join(".config").join("spp");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("config.json"),
        serde_json::json!({
            "api_url": server.url(),
            "admin_token": "from-config",
            "default_format": "json",
        })
        .to_string(),
    )
    .unwrap();

    let output = spp_with_home(home.path(), &["threshold", "get"]);

    mock.assert();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("\"source\": \"default\""));
}
