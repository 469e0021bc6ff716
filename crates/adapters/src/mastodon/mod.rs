//! Mastodon adapters
//!
//! - `auth`: app registration, password login, session reuse
//! - `client`: media upload and status publishing

mod auth;
mod client;

pub use auth::{MastodonConnector, SessionFile};
pub use client::MastodonClient;

use secrecy::SecretString;
use std::time::Duration;
use toot_mirror_domain::Visibility;

/// How the bot authenticates against its instance
pub enum MastodonCredentials {
    /// Application token created in the account's developer settings
    Token {
        client_id: String,
        client_secret: SecretString,
        access_token: SecretString,
    },
    /// Account login; the resulting session is persisted and reused
    Password {
        email: String,
        password: SecretString,
    },
}

impl MastodonCredentials {
    /// Short label for logs and diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            MastodonCredentials::Token { .. } => "token",
            MastodonCredentials::Password { .. } => "email",
        }
    }
}

impl std::fmt::Debug for MastodonCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MastodonCredentials::Token { client_id, .. } => f
                .debug_struct("Token")
                .field("client_id", client_id)
                .finish_non_exhaustive(),
            MastodonCredentials::Password { email, .. } => f
                .debug_struct("Password")
                .field("email", email)
                .finish_non_exhaustive(),
        }
    }
}

/// Target account on an instance
#[derive(Debug)]
pub struct MastodonAccount {
    /// Instance host, e.g. `mastodon.social`
    pub instance: String,
    /// Account name on that instance, without the `@instance` part
    pub account: String,
    pub credentials: MastodonCredentials,
}

/// Client behavior shared by the connector and the clients it builds
#[derive(Debug, Clone)]
pub struct MastodonSettings {
    /// Name used when registering the application
    pub app_name: String,
    pub visibility: Visibility,
    pub timeout: Duration,
}

impl Default for MastodonSettings {
    fn default() -> Self {
        Self {
            app_name: "toot-mirror".to_string(),
            visibility: Visibility::Public,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Base API URL for an instance host; an explicit scheme is kept as is
pub fn instance_base_url(instance: &str) -> String {
    let instance = instance.trim().trim_end_matches('/');
    if instance.starts_with("http://") || instance.starts_with("https://") {
        instance.to_string()
    } else {
        format!("https://{}", instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_base_url() {
        assert_eq!(instance_base_url("mastodon.social"), "https://mastodon.social");
        assert_eq!(
            instance_base_url("http://localhost:3000/"),
            "http://localhost:3000"
        );
    }

    #[test]
    fn test_debug_hides_secrets() {
        let creds = MastodonCredentials::Password {
            email: "bot@example.org".to_string(),
            password: SecretString::new("hunter2".into()),
        };
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("bot@example.org"));
        assert!(!rendered.contains("hunter2"));
    }
}
