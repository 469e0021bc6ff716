use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

fn write_credentials(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("bot.conf");
    fs::write(&path, content).expect("write credentials");
    path
}

#[test]
fn config_init_writes_settings_and_credentials() {
    let dir = TempDir::new().expect("temp dir");
    let settings_path = dir.path().join("toot-mirror.toml");
    let credentials_path = dir.path().join("bot.conf");

    let mut cmd = cargo_bin_cmd!("toot-mirror");
    cmd.args(["config", "init", "--path"])
        .arg(&settings_path)
        .arg("--credentials")
        .arg(&credentials_path)
        .assert()
        .success();

    let settings = fs::read_to_string(&settings_path).expect("read settings");
    assert!(settings.contains("posting_delay_secs = 1"));
    assert!(settings.contains("https://pbs.twimg.com/"));

    let credentials = fs::read_to_string(&credentials_path).expect("read credentials");
    assert!(credentials.contains("auth_type:token"));
    assert!(credentials.contains("mastodon_account:"));
}

#[test]
fn config_init_refuses_to_overwrite() {
    let dir = TempDir::new().expect("temp dir");
    let settings_path = dir.path().join("toot-mirror.toml");
    fs::write(&settings_path, "# mine").expect("write settings");

    let mut cmd = cargo_bin_cmd!("toot-mirror");
    cmd.args(["config", "init", "--path"])
        .arg(&settings_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    assert_eq!(fs::read_to_string(&settings_path).unwrap(), "# mine");
}

#[test]
fn run_fails_without_credentials_file() {
    let dir = TempDir::new().expect("temp dir");

    let mut cmd = cargo_bin_cmd!("toot-mirror");
    cmd.current_dir(dir.path())
        .args(["run", "missing.conf", "rustlang", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Credentials file not found"));
}

#[test]
fn run_fails_on_missing_parameter() {
    let dir = TempDir::new().expect("temp dir");
    let credentials = write_credentials(&dir, "auth_type:email\ninstance:example.social\n");

    let mut cmd = cargo_bin_cmd!("toot-mirror");
    cmd.current_dir(dir.path())
        .arg("run")
        .arg(&credentials)
        .args(["rustlang", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "missing parameter mastodon_email_account",
        ));
}

#[test]
fn doctor_reports_credentials_as_json() {
    let dir = TempDir::new().expect("temp dir");
    let credentials = write_credentials(
        &dir,
        "auth_type:token\napp_client_id:cid\napp_client_secret:cs\napp_access_token:at\ninstance:example.social\nmastodon_account:mirror\n",
    );

    let mut cmd = cargo_bin_cmd!("toot-mirror");
    let output = cmd
        .current_dir(dir.path())
        .env("TOOT_MIRROR__GENERAL__STATE_DIR", dir.path())
        .arg("doctor")
        .arg(&credentials)
        .arg("--json")
        .output()
        .expect("run doctor");

    assert!(output.status.success());

    let value: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(value["credentials"]["status"], "ok");
    assert_eq!(
        value["credentials"]["details"]["account"],
        "mirror@example.social"
    );
    assert_eq!(value["ledger"]["status"], "warn");
    assert_eq!(value["overall"], "warn");
}

#[test]
fn doctor_fails_on_unknown_auth_type() {
    let dir = TempDir::new().expect("temp dir");
    let credentials = write_credentials(
        &dir,
        "auth_type:oauth\ninstance:example.social\nmastodon_account:mirror\n",
    );

    let mut cmd = cargo_bin_cmd!("toot-mirror");
    cmd.current_dir(dir.path())
        .arg("doctor")
        .arg(&credentials)
        .assert()
        .failure()
        .stdout(predicate::str::contains("no authentication method found"));
}

#[test]
fn run_rejects_out_of_range_day_count() {
    let dir = TempDir::new().expect("temp dir");
    let credentials = write_credentials(
        &dir,
        "auth_type:token\napp_client_id:cid\napp_client_secret:cs\napp_access_token:at\ninstance:example.social\nmastodon_account:mirror\n",
    );

    let mut cmd = cargo_bin_cmd!("toot-mirror");
    cmd.current_dir(dir.path())
        .arg("run")
        .arg(&credentials)
        .args(["rustlang", "200000000000000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of range"))
        .stderr(predicate::str::contains("panicked").not());
}
