//! Doctor command - validate settings, credentials and ledger

use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use toot_mirror_adapters::state::SqliteDedupStore;
use toot_mirror_domain::{DedupStore, qualified_account};

use crate::args::DoctorArgs;
use crate::config::{AppConfig, CredentialsFile, session_path};

#[derive(Debug, Serialize)]
struct DoctorReport {
    config: CheckResult,
    credentials: CheckResult,
    ledger: CheckResult,
    overall: String,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    status: String,
    message: String,
    details: Option<serde_json::Value>,
}

impl CheckResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn warn(message: impl Into<String>) -> Self {
        Self {
            status: "warn".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    fn is_error(&self) -> bool {
        self.status == "error"
    }
}

pub async fn execute(args: DoctorArgs, config_path: Option<PathBuf>) -> Result<()> {
    let mut report = DoctorReport {
        config: CheckResult::error("Not checked"),
        credentials: CheckResult::error("Not checked"),
        ledger: CheckResult::error("Not checked"),
        overall: "error".to_string(),
    };

    let config = match AppConfig::load(config_path.as_deref()) {
        Ok(c) => {
            report.config = match c.mastodon_settings() {
                Ok(_) => CheckResult::ok("Settings loaded successfully"),
                Err(e) => CheckResult::error(format!("Invalid settings: {}", e)),
            };
            Some(c)
        }
        Err(e) => {
            report.config = CheckResult::error(format!("Failed to load settings: {:#}", e));
            None
        }
    };

    let account = check_credentials(&args.credentials, &mut report);

    if let (Some(config), Some(account)) = (&config, &account) {
        report.ledger = check_ledger(&config.general.state_dir, account).await;
    }

    let checks = [&report.config, &report.credentials, &report.ledger];

    let has_error = checks.iter().any(|c| c.is_error());
    let all_ok = checks.iter().all(|c| c.is_ok());

    report.overall = if has_error {
        "error".to_string()
    } else if all_ok {
        "ok".to_string()
    } else {
        "warn".to_string()
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.overall == "error" {
        std::process::exit(1);
    }

    Ok(())
}

/// Fill in the credentials check; returns the qualified account when it parses
fn check_credentials(path: &Path, report: &mut DoctorReport) -> Option<String> {
    let account = CredentialsFile::load(path).and_then(|file| file.account());

    match account {
        Ok(account) => {
            let qualified = qualified_account(&account.account, &account.instance);
            let session = session_path(path);
            report.credentials = CheckResult::ok(format!(
                "Account: {}, auth: {}",
                qualified,
                account.credentials.kind()
            ))
            .with_details(serde_json::json!({
                "account": qualified,
                "instance": account.instance,
                "auth_type": account.credentials.kind(),
                "session_file": session.display().to_string(),
                "session_saved": session.exists(),
            }));
            Some(qualified)
        }
        Err(e) => {
            report.credentials = CheckResult::error(e.to_string());
            None
        }
    }
}

async fn check_ledger(state_dir: &Path, account: &str) -> CheckResult {
    let path = SqliteDedupStore::path_for(state_dir, account);

    if !path.exists() {
        return CheckResult::warn(format!(
            "No ledger yet at {}, it is created on the first run",
            path.display()
        ));
    }

    let store = match SqliteDedupStore::new(&path).await {
        Ok(s) => s,
        Err(e) => return CheckResult::error(format!("Failed to open ledger: {}", e)),
    };

    match store.count().await {
        Ok(count) => CheckResult::ok(format!("{} delivered entries", count)).with_details(
            serde_json::json!({
                "path": path.display().to_string(),
                "count": count,
            }),
        ),
        Err(e) => CheckResult::error(format!("Failed to read ledger: {}", e)),
    }
}

fn print_report(report: &DoctorReport) {
    println!("toot-mirror Doctor Report");
    println!("=========================");
    println!();

    print_check("Settings", &report.config);
    print_check("Credentials", &report.credentials);
    print_check("Ledger", &report.ledger);

    println!();
    let symbol = match report.overall.as_str() {
        "ok" => "✓",
        "warn" => "⚠",
        _ => "✗",
    };
    println!("{} Overall: {}", symbol, report.overall.to_uppercase());

    if report.overall != "error" {
        println!();
        println!("Ready to run! Try: toot-mirror run <CREDENTIALS> <SOURCE> <DAYS> --dry-run");
    }
}

fn print_check(name: &str, result: &CheckResult) {
    let symbol = match result.status.as_str() {
        "ok" => "✓",
        "warn" => "⚠",
        _ => "✗",
    };
    println!("{} {}: {}", symbol, name, result.message);
}
