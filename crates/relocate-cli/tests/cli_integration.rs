use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// A `relocate` command isolated from the caller's config and environment.
fn relocate(home: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("relocate").unwrap();
    cmd.env("HOME", home)
        .env_remove("RELOCATE_APPIUM_URL")
        .env_remove("RELOCATE_SESSION_ID")
        .env_remove("RUST_LOG");
    cmd
}

fn temp_home(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("relocate-cli-{}-{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn offline_validate(home: &std::path::Path, source: &str, platform: &str, file: &str) -> Command {
    let mut cmd = relocate(home);
    cmd.args(["--source", fixture_path(source).to_str().unwrap()])
        .args(["--platform", platform])
        .args(["validate", fixture_path(file).to_str().unwrap()]);
    cmd
}

// ---------------------------------------------------------------------------
// Help and argument parsing
// ---------------------------------------------------------------------------

#[test]
fn test_help_exits_zero() {
    Command::cargo_bin("relocate")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("relocate"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("generate"));
}

#[test]
fn test_source_requires_platform() {
    let home = temp_home("source-platform");
    relocate(&home)
        .args(["--source", fixture_path("android_login.xml").to_str().unwrap()])
        .arg("generate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--platform"));
}

// ---------------------------------------------------------------------------
// generate
// ---------------------------------------------------------------------------

#[test]
fn test_generate_json_from_saved_source() {
    let home = temp_home("generate-json");
    let assert = relocate(&home)
        .args(["--source", fixture_path("android_login.xml").to_str().unwrap()])
        .args(["--platform", "android", "--format", "json", "generate"])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["platform"], "android");
    assert_eq!(json["elementCount"], 4);

    let submit = &json["elements"][3];
    assert_eq!(submit["text"], "Submit");
    assert_eq!(submit["candidates"]["id"], "com.example.app:id/submit_v2");
}

#[test]
fn test_generate_text_lists_candidates() {
    let home = temp_home("generate-text");
    relocate(&home)
        .args(["--source", fixture_path("ios_login.xml").to_str().unwrap()])
        .args(["--platform", "ios", "generate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[Button] login-button-v2 \"Log In\""))
        .stdout(predicate::str::contains("-ios class chain"))
        .stderr(predicate::str::contains("elements (ios)"));
}

#[test]
fn test_generate_without_session_id() {
    let home = temp_home("no-session");
    relocate(&home)
        .arg("generate")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No Appium session id"));
}

#[test]
fn test_generate_missing_source_file() {
    let home = temp_home("missing-source");
    relocate(&home)
        .args(["--source", "/nonexistent/relocate/screen.xml", "--platform", "android"])
        .arg("generate")
        .assert()
        .code(1)
        .stderr(predicate::str::starts_with("Error:"));
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

#[test]
fn test_validate_reports_missing_locators() {
    let home = temp_home("validate-missing");
    let assert = offline_validate(&home, "android_login.xml", "android", "locators.json")
        .args(["--format", "json"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("1 locator no longer resolves"));

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["total"], 2);
    assert_eq!(report["foundCount"], 1);
    assert_eq!(report["missingCount"], 1);
    assert_eq!(report["matcher"], "contains");

    let results = report["results"].as_array().unwrap();
    assert_eq!(results[0]["found"], true);
    assert_eq!(results[1]["found"], false);
    assert_eq!(results[1]["pageElementName"], "submitButton");
    let alternates = results[1]["alternates"].as_array().unwrap();
    assert!(!alternates.is_empty());
    assert!(alternates.iter().all(|a| a["strategy"] != "id"));
    assert!(alternates
        .iter()
        .any(|a| a["selector"].as_str().unwrap().contains("submit_v2")));
}

#[test]
fn test_validate_all_found() {
    let home = temp_home("validate-found");
    offline_validate(&home, "android_login.xml", "android", "all_found.json")
        .assert()
        .success()
        .stdout(predicate::str::contains("FOUND"))
        .stdout(predicate::str::contains("Checked 2 locators: 2 found, 0 missing"));
}

#[test]
fn test_validate_quiet_hides_found_lines() {
    let home = temp_home("validate-quiet");
    offline_validate(&home, "android_login.xml", "android", "locators.json")
        .arg("--quiet")
        .assert()
        .code(4)
        .stdout(predicate::str::contains("MISSING  Login/submitButton"))
        .stdout(predicate::str::contains("emailField").not());
}

#[test]
fn test_validate_ios_suggests_renamed_button() {
    let home = temp_home("validate-ios");
    offline_validate(&home, "ios_login.xml", "ios", "ios_locators.json")
        .args(["--matcher", "fuzzy"])
        .assert()
        .code(4)
        .stdout(predicate::str::contains("login-button-v2"));
}

#[test]
fn test_validate_rejects_non_array_file() {
    let home = temp_home("validate-object");
    offline_validate(&home, "android_login.xml", "android", "locators_object.json")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("JSON array"));
}

#[test]
fn test_validate_missing_locator_file() {
    let home = temp_home("validate-nofile");
    relocate(&home)
        .args(["--source", fixture_path("android_login.xml").to_str().unwrap()])
        .args(["--platform", "android", "validate", "/nonexistent/relocate/locators.json"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Cannot read locator file"));
}

#[test]
fn test_validate_checks_file_before_session() {
    let home = temp_home("validate-order");
    // No session id either: the bad file is reported first.
    relocate(&home)
        .args(["validate", fixture_path("locators_object.json").to_str().unwrap()])
        .assert()
        .code(3);
}

#[test]
fn test_validate_unreachable_appium() {
    let home = temp_home("validate-unreachable");
    relocate(&home)
        .args(["--appium-url", "http://127.0.0.1:9"])
        .args(["--session-id", "7c1e2a90-4f4b-4f7e-9d7e-0a1b2c3d4e5f"])
        .args(["validate", fixture_path("locators.json").to_str().unwrap()])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Connection error"));
}

/// Address of a server that accepts connections but never answers.
fn silent_server() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        let mut held = Vec::new();
        for stream in listener.incoming().flatten() {
            held.push(stream);
        }
    });
    format!("http://{}", addr)
}

#[test]
fn test_validate_timeout_discards_partial_results() {
    let home = temp_home("validate-timeout");
    let assert = relocate(&home)
        .args(["--appium-url", &silent_server()])
        .args(["--session-id", "7c1e2a90-4f4b-4f7e-9d7e-0a1b2c3d4e5f"])
        .args(["validate", fixture_path("locators.json").to_str().unwrap()])
        .args(["--timeout", "1"])
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .code(5)
        .stderr(predicate::str::contains("Timed out after 1s"));

    assert!(assert.get_output().stdout.is_empty());
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

#[test]
fn test_config_prints_defaults() {
    let home = temp_home("config-defaults");
    let assert = relocate(&home).arg("config").assert().success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["appium_url"], "http://127.0.0.1:4723");
    assert!(json.get("session_id").is_none());
}

#[test]
fn test_config_save_persists_overrides() {
    let home = temp_home("config-save");
    relocate(&home)
        .args(["--appium-url", "http://10.0.0.5:4723", "config", "--save"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Saved to"));

    let saved = std::fs::read_to_string(home.join(".relocate").join("config.json")).unwrap();
    assert!(saved.contains("http://10.0.0.5:4723"));

    // A later run picks the saved value up without the flag.
    relocate(&home)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("http://10.0.0.5:4723"));
}
