//! Mastodon authentication: token verification, app registration, password login

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use toot_mirror_domain::{AuthError, PlatformClient, PlatformConnector};

use super::{MastodonAccount, MastodonClient, MastodonCredentials, MastodonSettings, instance_base_url};

const OOB_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";
const SCOPES: &str = "read write";

/// Persisted app registration and login, reused across runs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionFile {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl SessionFile {
    /// Load a session, `None` if the file does not exist
    pub async fn load(path: &Path) -> Result<Option<Self>, AuthError> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AuthError::Session(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        toml::from_str(&content)
            .map(Some)
            .map_err(|e| AuthError::Session(format!("Invalid session file {}: {}", path.display(), e)))
    }

    /// Write the session, readable by the owner only
    pub async fn save(&self, path: &Path) -> Result<(), AuthError> {
        let content = toml::to_string(self).map_err(|e| AuthError::Session(e.to_string()))?;

        let write_error =
            |e: std::io::Error| AuthError::Session(format!("Failed to write {}: {}", path.display(), e));

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(path).await.map_err(write_error)?;

        // An existing file keeps its old mode on open
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(write_error)?;
        }

        file.write_all(content.as_bytes())
            .await
            .map_err(write_error)?;
        file.flush().await.map_err(write_error)?;

        Ok(())
    }
}

#[derive(Serialize)]
struct RegisterAppRequest<'a> {
    client_name: &'a str,
    redirect_uris: &'a str,
    scopes: &'a str,
}

#[derive(Deserialize)]
struct RegisterAppResponse {
    client_id: String,
    client_secret: String,
}

#[derive(Serialize)]
struct PasswordGrantRequest<'a> {
    grant_type: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    username: &'a str,
    password: &'a str,
    scope: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Builds an authenticated [`MastodonClient`] from configured credentials
pub struct MastodonConnector {
    http: Client,
    base_url: String,
    account: MastodonAccount,
    session_path: PathBuf,
    settings: MastodonSettings,
}

impl MastodonConnector {
    pub fn new(
        account: MastodonAccount,
        session_path: PathBuf,
        settings: MastodonSettings,
    ) -> Result<Self, AuthError> {
        let base_url = instance_base_url(&account.instance);
        Self::with_base_url(account, session_path, settings, base_url)
    }

    pub fn with_base_url(
        account: MastodonAccount,
        session_path: PathBuf,
        settings: MastodonSettings,
        base_url: String,
    ) -> Result<Self, AuthError> {
        let http = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| AuthError::Client(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            account,
            session_path,
            settings,
        })
    }

    pub fn session_path(&self) -> &Path {
        &self.session_path
    }

    fn client_for(&self, access_token: SecretString) -> Result<Arc<dyn PlatformClient>, AuthError> {
        let client = MastodonClient::new(
            self.base_url.clone(),
            access_token,
            self.settings.visibility,
            self.settings.timeout,
        )
        .map_err(|e| AuthError::Client(e.to_string()))?;

        Ok(Arc::new(client))
    }

    /// Check a token against the instance
    async fn verify(&self, access_token: &SecretString) -> Result<(), AuthError> {
        let response = self
            .http
            .get(format!("{}/api/v1/accounts/verify_credentials", self.base_url))
            .header(
                "Authorization",
                format!("Bearer {}", access_token.expose_secret()),
            )
            .send()
            .await
            .map_err(|e| AuthError::Client(format!("Can't reach {}: {}", self.base_url, e)))?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AuthError::InvalidToken(
                format!("HTTP {} from {}", response.status(), self.base_url),
            )),
            status => Err(AuthError::Client(format!(
                "Unexpected HTTP {} verifying credentials",
                status
            ))),
        }
    }

    async fn register_app(&self) -> Result<SessionFile, AuthError> {
        tracing::info!(instance = %self.account.instance, app = %self.settings.app_name, "Registering application");

        let request = RegisterAppRequest {
            client_name: &self.settings.app_name,
            redirect_uris: OOB_REDIRECT_URI,
            scopes: SCOPES,
        };

        let registration_error = |message: String| AuthError::Registration {
            instance: self.account.instance.clone(),
            message,
        };

        let response = self
            .http
            .post(format!("{}/api/v1/apps", self.base_url))
            .form(&request)
            .send()
            .await
            .map_err(|e| registration_error(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(registration_error(format!("HTTP {} {}", status, body)));
        }

        let app: RegisterAppResponse = response
            .json()
            .await
            .map_err(|e| registration_error(e.to_string()))?;

        Ok(SessionFile {
            client_id: app.client_id,
            client_secret: app.client_secret,
            access_token: None,
        })
    }

    async fn log_in(
        &self,
        session: &SessionFile,
        email: &str,
        password: &SecretString,
    ) -> Result<SecretString, AuthError> {
        tracing::info!(email = %email, "Logging in");

        let request = PasswordGrantRequest {
            grant_type: "password",
            client_id: &session.client_id,
            client_secret: &session.client_secret,
            username: email,
            password: password.expose_secret(),
            scope: SCOPES,
        };

        let response = self
            .http
            .post(format!("{}/oauth/token", self.base_url))
            .form(&request)
            .send()
            .await
            .map_err(|e| AuthError::Login(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Login(format!("HTTP {} {}", status, body)));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Login(e.to_string()))?;

        Ok(SecretString::from(token.access_token))
    }

    async fn connect_with_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Arc<dyn PlatformClient>, AuthError> {
        let existing = SessionFile::load(&self.session_path).await?;

        if let Some(token) = existing.as_ref().and_then(|s| s.access_token.clone()) {
            let token = SecretString::from(token);
            match self.verify(&token).await {
                Ok(()) => {
                    tracing::info!(session = %self.session_path.display(), "Reusing saved session");
                    return self.client_for(token);
                }
                Err(AuthError::InvalidToken(reason)) => {
                    tracing::warn!(reason = %reason, "Saved session rejected, logging in again");
                }
                Err(e) => return Err(e),
            }
        }

        let mut session = match existing {
            Some(session) if !session.client_id.is_empty() => session,
            _ => {
                let session = self.register_app().await?;
                session.save(&self.session_path).await?;
                session
            }
        };

        let token = self.log_in(&session, email, password).await?;
        session.access_token = Some(token.expose_secret().to_string());
        session.save(&self.session_path).await?;

        self.client_for(token)
    }
}

#[async_trait]
impl PlatformConnector for MastodonConnector {
    async fn connect(&self) -> Result<Arc<dyn PlatformClient>, AuthError> {
        match &self.account.credentials {
            MastodonCredentials::Token { access_token, .. } => {
                self.verify(access_token).await?;
                tracing::info!(instance = %self.account.instance, "Connected with application token");
                self.client_for(access_token.clone())
            }
            MastodonCredentials::Password { email, password } => {
                self.connect_with_password(email, password).await
            }
        }
    }
}
