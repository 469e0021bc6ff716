//! Settings and credentials loading

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use toot_mirror_adapters::feed::DEFAULT_ACCOUNT_PROXY_URL;
use toot_mirror_adapters::mastodon::{MastodonAccount, MastodonCredentials, MastodonSettings};
use toot_mirror_domain::Visibility;
use toot_mirror_domain::extract::default_media_hosts;

/// Top-level settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub feed: FeedConfig,

    #[serde(default)]
    pub media: MediaConfig,

    #[serde(default)]
    pub mastodon: MastodonConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Directory holding the per-account ledgers
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    #[serde(default = "default_posting_delay")]
    pub posting_delay_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_account_proxy_url")]
    pub account_proxy_url: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    #[serde(default = "default_media_hosts")]
    pub hosts: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MastodonConfig {
    #[serde(default = "default_app_name")]
    pub app_name: String,

    #[serde(default = "default_visibility")]
    pub visibility: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_posting_delay() -> u64 {
    1
}

fn default_account_proxy_url() -> String {
    DEFAULT_ACCOUNT_PROXY_URL.to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_app_name() -> String {
    "toot-mirror".to_string()
}

fn default_visibility() -> String {
    "public".to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
            posting_delay_secs: default_posting_delay(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            account_proxy_url: default_account_proxy_url(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            hosts: default_media_hosts(),
        }
    }
}

impl Default for MastodonConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            visibility: default_visibility(),
            timeout_secs: default_timeout(),
        }
    }
}

impl AppConfig {
    /// Load settings from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        let default_path = PathBuf::from("./toot-mirror.toml");
        let path = config_path.unwrap_or(&default_path);

        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        } else if config_path.is_some() {
            anyhow::bail!("Settings file not found: {}", path.display());
        }

        builder = builder.add_source(
            config::Environment::with_prefix("TOOT_MIRROR")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    pub fn mastodon_settings(&self) -> Result<MastodonSettings> {
        let visibility: Visibility = self
            .mastodon
            .visibility
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))?;

        Ok(MastodonSettings {
            app_name: self.mastodon.app_name.clone(),
            visibility,
            timeout: Duration::from_secs(self.mastodon.timeout_secs),
        })
    }

    /// Generate example settings as TOML string
    pub fn example_toml() -> String {
        r#"# toot-mirror settings

[general]
# One ledger per target account is kept here
state_dir = "."
# Seconds to wait after each publish attempt
posting_delay_secs = 1

[feed]
# Handles are appended to this URL to get their feed
account_proxy_url = "http://twitrss.me/twitter_user_to_rss/?user="
timeout_secs = 30

[media]
# Media links starting with these prefixes are attached, in this order
hosts = ["https://pbs.twimg.com/", "https://nitter.net/pic/"]

[mastodon]
app_name = "toot-mirror"
visibility = "public"  # public, unlisted, private, direct
timeout_secs = 30
"#
        .to_string()
    }

    /// Credentials file template
    pub fn example_credentials() -> String {
        r#"auth_type:token
app_client_id:
app_client_secret:
app_access_token:
mastodon_email_account:
mastodon_email_password:
instance:mastodon.social
mastodon_account:
"#
        .to_string()
    }
}

/// Credentials file problems; all of them stop the run before any network activity
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Credentials file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{}: missing parameter {key}", .path.display())]
    MissingKey { path: PathBuf, key: &'static str },

    #[error("{}: no authentication method found for auth_type {value:?}", .path.display())]
    UnknownAuthType { path: PathBuf, value: String },
}

/// Parsed `key:value` credentials file
#[derive(Debug)]
pub struct CredentialsFile {
    path: PathBuf,
    values: HashMap<String, String>,
}

impl CredentialsFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::MissingFile(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self::parse(path, &content))
    }

    /// First occurrence of a key wins; lines without a colon are ignored
    pub fn parse(path: &Path, content: &str) -> Self {
        let mut values = HashMap::new();
        for line in content.lines() {
            let line = line.trim();
            if line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once(':') {
                values
                    .entry(key.trim().to_string())
                    .or_insert_with(|| value.trim().to_string());
            }
        }

        Self {
            path: path.to_path_buf(),
            values,
        }
    }

    fn get(&self, key: &'static str) -> Result<&str, ConfigError> {
        self.values
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| ConfigError::MissingKey {
                path: self.path.clone(),
                key,
            })
    }

    fn secret(&self, key: &'static str) -> Result<SecretString, ConfigError> {
        Ok(SecretString::from(self.get(key)?.to_string()))
    }

    /// Resolve the target account and how to authenticate against it
    pub fn account(&self) -> Result<MastodonAccount, ConfigError> {
        let auth_type = self.get("auth_type")?;

        let credentials = if auth_type.contains("token") {
            MastodonCredentials::Token {
                client_id: self.get("app_client_id")?.to_string(),
                client_secret: self.secret("app_client_secret")?,
                access_token: self.secret("app_access_token")?,
            }
        } else if auth_type.contains("email") {
            MastodonCredentials::Password {
                email: self.get("mastodon_email_account")?.to_string(),
                password: self.secret("mastodon_email_password")?,
            }
        } else {
            return Err(ConfigError::UnknownAuthType {
                path: self.path.clone(),
                value: auth_type.to_string(),
            });
        };

        Ok(MastodonAccount {
            instance: self.get("instance")?.to_string(),
            account: self.get("mastodon_account")?.to_string(),
            credentials,
        })
    }
}

/// Session file kept next to the credentials file
pub fn session_path(credentials: &Path) -> PathBuf {
    let mut path = credentials.as_os_str().to_owned();
    path.push(".secret");
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn parse(content: &str) -> CredentialsFile {
        CredentialsFile::parse(Path::new("bot.conf"), content)
    }

    #[test]
    fn test_token_credentials() {
        let creds = parse(
            "auth_type:token\napp_client_id:cid\napp_client_secret:cs\napp_access_token:at\ninstance:mastodon.social\nmastodon_account:mirror\n",
        );
        let account = creds.account().unwrap();

        assert_eq!(account.instance, "mastodon.social");
        assert_eq!(account.account, "mirror");
        assert_eq!(account.credentials.kind(), "token");
    }

    #[test]
    fn test_email_credentials_trim_values() {
        let creds = parse(
            "auth_type: email\nmastodon_email_account: bot@example.org \nmastodon_email_password: p:w\ninstance: example.social\nmastodon_account: bot\n",
        );
        let account = creds.account().unwrap();

        match account.credentials {
            MastodonCredentials::Password { email, password } => {
                assert_eq!(email, "bot@example.org");
                assert_eq!(password.expose_secret(), "p:w");
            }
            other => panic!("unexpected credentials: {:?}", other),
        }
    }

    #[test]
    fn test_missing_key() {
        let creds = parse("auth_type:token\napp_client_id:cid\n");
        let err = creds.account().unwrap_err();

        assert!(matches!(
            err,
            ConfigError::MissingKey {
                key: "app_client_secret",
                ..
            }
        ));
        assert!(err.to_string().contains("missing parameter app_client_secret"));
    }

    #[test]
    fn test_instance_required_for_tokens() {
        let creds = parse(
            "auth_type:token\napp_client_id:cid\napp_client_secret:cs\napp_access_token:at\nmastodon_account:bot\n",
        );

        assert!(matches!(
            creds.account(),
            Err(ConfigError::MissingKey { key: "instance", .. })
        ));
    }

    #[test]
    fn test_unknown_auth_type() {
        let creds = parse("auth_type:oauth\ninstance:x\nmastodon_account:y\n");

        assert!(matches!(
            creds.account(),
            Err(ConfigError::UnknownAuthType { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = CredentialsFile::load(Path::new("/nonexistent/bot.conf"));
        assert!(matches!(result, Err(ConfigError::MissingFile(_))));
    }

    #[test]
    fn test_session_path_appends_suffix() {
        assert_eq!(
            session_path(Path::new("/etc/bots/news.conf")),
            PathBuf::from("/etc/bots/news.conf.secret")
        );
    }

    #[test]
    fn test_example_toml_deserializes() {
        let config: AppConfig = toml_from_example();
        assert_eq!(config.general.posting_delay_secs, 1);
        assert_eq!(config.media.hosts, default_media_hosts());
        assert_eq!(
            config.mastodon_settings().unwrap().visibility,
            Visibility::Public
        );
    }

    fn toml_from_example() -> AppConfig {
        config::Config::builder()
            .add_source(config::File::from_str(
                &AppConfig::example_toml(),
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_invalid_visibility() {
        let mut config = AppConfig::default();
        config.mastodon.visibility = "everyone".to_string();
        assert!(config.mastodon_settings().is_err());
    }
}
