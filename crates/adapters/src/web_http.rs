//! Web client for media downloads and short-link probing

use async_trait::async_trait;
use reqwest::{Client, header, redirect};
use std::time::Duration;
use toot_mirror_domain::{FetchError, MediaPayload, WebClient};

/// reqwest-backed [`WebClient`]
pub struct HttpWebClient {
    client: Client,
    probe_client: Client,
}

impl HttpWebClient {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network(format!("Failed to build HTTP client: {}", e)))?;

        // Redirects must be observed, not followed
        let probe_client = Client::builder()
            .timeout(timeout)
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| FetchError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            probe_client,
        })
    }
}

#[async_trait]
impl WebClient for HttpWebClient {
    async fn fetch_media(&self, url: &str) -> Result<MediaPayload, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let mime_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(MediaPayload {
            bytes: bytes.to_vec(),
            mime_type,
            source_url: url.to_string(),
        })
    }

    async fn probe_redirect(&self, url: &str) -> Result<Option<String>, FetchError> {
        let response = self
            .probe_client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        if !response.status().is_redirection() {
            return Ok(None);
        }

        let Some(location) = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
        else {
            return Ok(None);
        };

        // Relative locations are resolved against the requested URL
        Ok(Some(match response.url().join(location) {
            Ok(resolved) => resolved.to_string(),
            Err(_) => location.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> HttpWebClient {
        HttpWebClient::new(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_redirect_returns_location() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/x"))
            .respond_with(
                ResponseTemplate::new(301).insert_header("Location", "http://full.example/page"),
            )
            .mount(&mock_server)
            .await;

        let location = client()
            .probe_redirect(&format!("{}/x", mock_server.uri()))
            .await
            .unwrap();

        assert_eq!(location.as_deref(), Some("http://full.example/page"));
    }

    #[tokio::test]
    async fn test_relative_location_is_resolved() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/short/abc"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/articles/42"))
            .mount(&mock_server)
            .await;

        let location = client()
            .probe_redirect(&format!("{}/short/abc", mock_server.uri()))
            .await
            .unwrap();

        assert_eq!(
            location,
            Some(format!("{}/articles/42", mock_server.uri()))
        );
    }

    #[tokio::test]
    async fn test_no_redirect_returns_none() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
            .mount(&mock_server)
            .await;

        let location = client()
            .probe_redirect(&format!("{}/page", mock_server.uri()))
            .await
            .unwrap();

        assert!(location.is_none());
    }

    #[tokio::test]
    async fn test_fetch_media_reads_content_type() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/media/a.png"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(vec![0x89, b'P', b'N', b'G'], "image/png"),
            )
            .mount(&mock_server)
            .await;

        let url = format!("{}/media/a.png", mock_server.uri());
        let media = client().fetch_media(&url).await.unwrap();

        assert_eq!(media.mime_type.as_deref(), Some("image/png"));
        assert_eq!(media.bytes, vec![0x89, b'P', b'N', b'G']);
        assert_eq!(media.source_url, url);
    }

    #[tokio::test]
    async fn test_fetch_media_not_found() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let result = client()
            .fetch_media(&format!("{}/media/gone.jpg", mock_server.uri()))
            .await;

        assert!(matches!(result, Err(FetchError::Status { status: 404, .. })));
    }
}
