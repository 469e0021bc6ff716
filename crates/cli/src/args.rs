//! CLI argument definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// toot-mirror: mirror a syndicated feed onto a Mastodon account
#[derive(Parser, Debug)]
#[command(name = "toot-mirror")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to settings file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Mirror new feed entries once and exit
    Run(RunArgs),

    /// Settings management
    Config(ConfigArgs),

    /// Validate settings, credentials and ledger
    Doctor(DoctorArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Credentials file (key:value lines)
    pub credentials: PathBuf,

    /// Feed URL, or the handle of the account to mirror
    pub source: String,

    /// Entries at least this many days old are ignored
    #[arg(allow_negative_numbers = true)]
    pub days: i64,

    /// Footer line appended to every post; empty disables it
    #[arg(default_value = "")]
    pub tags: String,

    /// Entries must be older than this many days before they are posted
    #[arg(default_value_t = 0, allow_negative_numbers = true)]
    pub delay: i64,

    /// Log what would be posted without contacting the instance
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Generate example settings and a credentials template
    Init {
        /// Path to write the settings file
        #[arg(long, default_value = "./toot-mirror.toml")]
        path: PathBuf,

        /// Path to write the credentials template
        #[arg(long)]
        credentials: Option<PathBuf>,

        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
pub struct DoctorArgs {
    /// Credentials file to check
    pub credentials: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
