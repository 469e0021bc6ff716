//! Mastodon API client for uploading media and publishing statuses

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, multipart};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use toot_mirror_domain::{
    MediaId, MediaPayload, PlatformClient, PlatformError, PostDraft, PublishResult, Visibility,
};

/// Authenticated Mastodon client
pub struct MastodonClient {
    client: Client,
    base_url: String,
    access_token: SecretString,
    visibility: Visibility,
}

impl MastodonClient {
    pub fn new(
        base_url: String,
        access_token: SecretString,
        visibility: Visibility,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            access_token,
            visibility,
        })
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token.expose_secret())
    }
}

#[derive(Serialize)]
struct CreateStatusRequest<'a> {
    status: &'a str,
    media_ids: Vec<&'a str>,
    sensitive: bool,
    visibility: &'static str,
}

#[derive(Deserialize)]
struct StatusResponse {
    id: String,
    url: Option<String>,
}

#[derive(Deserialize)]
struct MediaResponse {
    id: String,
}

/// Map non-success statuses to platform errors
async fn check_status(response: Response, action: &str) -> Result<Response, PlatformError> {
    let status = response.status();

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(PlatformError::Auth(format!("{} rejected: HTTP {}", action, status)));
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(PlatformError::RateLimited);
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(PlatformError::Api(format!(
            "Failed to {}: HTTP {} {}",
            action, status, body
        )));
    }

    Ok(response)
}

/// File name for the upload, taken from the last URL path segment
fn file_name_for(url: &str) -> String {
    url.split(['?', '#'])
        .next()
        .and_then(|path| path.rsplit('/').next())
        .filter(|name| !name.is_empty())
        .unwrap_or("media")
        .to_string()
}

#[async_trait]
impl PlatformClient for MastodonClient {
    async fn upload_media(&self, media: &MediaPayload) -> Result<MediaId, PlatformError> {
        let mime = media
            .mime_type
            .as_deref()
            .unwrap_or("application/octet-stream");

        let part = multipart::Part::bytes(media.bytes.clone())
            .file_name(file_name_for(&media.source_url))
            .mime_str(mime)
            .map_err(|e| PlatformError::Api(format!("Invalid media type {}: {}", mime, e)))?;

        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(format!("{}/api/v2/media", self.base_url))
            .header("Authorization", self.bearer())
            .multipart(form)
            .send()
            .await
            .map_err(|e| PlatformError::Network(e.to_string()))?;

        // 202 means the upload is accepted and still processing; the ID is already usable
        let response = check_status(response, "upload media").await?;

        let media_response: MediaResponse = response
            .json()
            .await
            .map_err(|e| PlatformError::Api(e.to_string()))?;

        Ok(MediaId(media_response.id))
    }

    async fn publish(&self, draft: &PostDraft) -> Result<PublishResult, PlatformError> {
        let request = CreateStatusRequest {
            status: &draft.text,
            media_ids: draft.media_ids.iter().map(|id| id.0.as_str()).collect(),
            sensitive: false,
            visibility: self.visibility.as_str(),
        };

        let response = self
            .client
            .post(format!("{}/api/v1/statuses", self.base_url))
            .header("Authorization", self.bearer())
            .json(&request)
            .send()
            .await
            .map_err(|e| PlatformError::Network(e.to_string()))?;

        let response = check_status(response, "publish status").await?;

        let status: StatusResponse = response
            .json()
            .await
            .map_err(|e| PlatformError::Api(e.to_string()))?;

        Ok(PublishResult {
            id: status.id,
            url: status.url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: String) -> MastodonClient {
        MastodonClient::new(
            base_url,
            SecretString::new("test-token".into()),
            Visibility::Public,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn draft() -> PostDraft {
        PostDraft {
            text: "Hello fediverse\n#bot".to_string(),
            media_ids: vec![MediaId("m1".to_string()), MediaId("m2".to_string())],
        }
    }

    #[tokio::test]
    async fn test_publish_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/statuses"))
            .and(header("Authorization", "Bearer test-token"))
            .and(body_json(serde_json::json!({
                "status": "Hello fediverse\n#bot",
                "media_ids": ["m1", "m2"],
                "sensitive": false,
                "visibility": "public"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "109999",
                "url": "https://example.social/@bot/109999"
            })))
            .mount(&mock_server)
            .await;

        let result = client(mock_server.uri()).publish(&draft()).await.unwrap();

        assert_eq!(result.id, "109999");
        assert_eq!(
            result.url.as_deref(),
            Some("https://example.social/@bot/109999")
        );
    }

    #[tokio::test]
    async fn test_publish_rejected() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/statuses"))
            .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
                "error": "Validation failed: Text character limit of 500 exceeded"
            })))
            .mount(&mock_server)
            .await;

        let result = client(mock_server.uri()).publish(&draft()).await;

        match result {
            Err(PlatformError::Api(message)) => assert!(message.contains("character limit")),
            other => panic!("unexpected result: {:?}", other.map(|r| r.id)),
        }
    }

    #[tokio::test]
    async fn test_publish_rate_limited() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/statuses"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&mock_server)
            .await;

        let result = client(mock_server.uri()).publish(&draft()).await;

        assert!(matches!(result, Err(PlatformError::RateLimited)));
    }

    #[tokio::test]
    async fn test_upload_media_accepted() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v2/media"))
            .and(header("Authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(202).set_body_json(serde_json::json!({
                "id": "media42",
                "type": "image",
                "url": null
            })))
            .mount(&mock_server)
            .await;

        let media = MediaPayload {
            bytes: vec![0xff, 0xd8, 0xff],
            mime_type: Some("image/jpeg".to_string()),
            source_url: "https://pbs.twimg.com/media/abc.jpg?name=large".to_string(),
        };

        let id = client(mock_server.uri()).upload_media(&media).await.unwrap();

        assert_eq!(id, MediaId("media42".to_string()));
    }

    #[tokio::test]
    async fn test_upload_media_auth_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v2/media"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;

        let media = MediaPayload {
            bytes: vec![1, 2, 3],
            mime_type: None,
            source_url: "https://nitter.net/pic/x".to_string(),
        };

        let result = client(mock_server.uri()).upload_media(&media).await;

        assert!(matches!(result, Err(PlatformError::Auth(_))));
    }

    #[test]
    fn test_file_name_for() {
        assert_eq!(
            file_name_for("https://pbs.twimg.com/media/abc.jpg?name=large"),
            "abc.jpg"
        );
        assert_eq!(file_name_for("https://nitter.net/pic/"), "media");
    }
}
