//! Config command - settings management

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::args::{ConfigArgs, ConfigCommands};
use crate::config::AppConfig;

pub async fn execute(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Init {
            path,
            credentials,
            force,
        } => init_config(path, credentials, force).await,
    }
}

async fn init_config(path: PathBuf, credentials: Option<PathBuf>, force: bool) -> Result<()> {
    write_new(&path, &AppConfig::example_toml(), force)?;
    println!("Created settings file: {}", path.display());

    if let Some(credentials) = &credentials {
        write_new(credentials, &AppConfig::example_credentials(), force)?;
        println!("Created credentials template: {}", credentials.display());
    }

    let credentials = credentials
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<CREDENTIALS>".to_string());

    println!();
    println!("Next steps:");
    println!("  1. Fill in the credentials file (auth_type token or email)");
    println!("  2. Run 'toot-mirror doctor {}' to validate your setup", credentials);
    println!(
        "  3. Run 'toot-mirror run {} <SOURCE> <DAYS> --dry-run' to test",
        credentials
    );

    Ok(())
}

fn write_new(path: &Path, content: &str, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "File already exists: {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }

    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}
