//! HTTP feed source: fetches RSS/Atom and maps entries into the domain model

use async_trait::async_trait;
use feed_rs::parser;
use reqwest::Client;
use std::time::Duration;
use time::OffsetDateTime;
use toot_mirror_domain::{FeedAuthor, FeedEntry, FeedError, FeedSource, FeedTarget};

/// Handle-to-feed proxy used in account-mirroring mode
pub const DEFAULT_ACCOUNT_PROXY_URL: &str = "http://twitrss.me/twitter_user_to_rss/?user=";

/// Feed source over HTTP
pub struct HttpFeedSource {
    client: Client,
    account_proxy_url: String,
}

impl HttpFeedSource {
    pub fn new(timeout: Duration) -> Result<Self, FeedError> {
        Self::with_proxy_url(DEFAULT_ACCOUNT_PROXY_URL.to_string(), timeout)
    }

    /// `account_proxy_url` is used as a prefix: the handle is appended to it
    pub fn with_proxy_url(account_proxy_url: String, timeout: Duration) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FeedError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            account_proxy_url,
        })
    }

    /// URL to fetch for a target
    pub fn feed_url(&self, target: &FeedTarget) -> String {
        match target {
            FeedTarget::Url { url } => url.clone(),
            FeedTarget::Account { handle } => format!("{}{}", self.account_proxy_url, handle),
        }
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch_entries(&self, target: &FeedTarget) -> Result<Vec<FeedEntry>, FeedError> {
        let url = self.feed_url(target);
        tracing::info!(url = %url, "Parsing source");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FeedError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FeedError::Status(response.status().as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FeedError::Network(e.to_string()))?;

        let entries = parse_feed(&body)?;

        tracing::info!(url = %url, count = entries.len(), "Parsed feed");

        Ok(entries)
    }
}

/// Parse RSS or Atom bytes, keeping the feed's order.
///
/// Entries without any timestamp can't be placed in the age window and are dropped.
pub fn parse_feed(body: &[u8]) -> Result<Vec<FeedEntry>, FeedError> {
    let feed = parser::parse(body).map_err(|e| FeedError::Parse(e.to_string()))?;

    let entries = feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let Some(stamp) = entry.published.or(entry.updated) else {
                tracing::warn!(entry_id = %entry.id, "Entry has no timestamp, dropping");
                return None;
            };
            let published = match OffsetDateTime::from_unix_timestamp(stamp.timestamp()) {
                Ok(published) => published,
                Err(e) => {
                    tracing::warn!(entry_id = %entry.id, error = %e, "Entry timestamp out of range, dropping");
                    return None;
                }
            };

            let authors: Vec<FeedAuthor> = entry
                .authors
                .iter()
                .map(|person| FeedAuthor {
                    name: person.name.clone(),
                })
                .collect();

            Some(FeedEntry {
                id: entry.id,
                title: entry.title.map(|t| t.content).unwrap_or_default(),
                summary: entry
                    .summary
                    .map(|s| s.content)
                    .or_else(|| entry.content.and_then(|c| c.body))
                    .unwrap_or_default(),
                author: authors.first().map(|a| a.name.clone()).unwrap_or_default(),
                published,
                link: entry
                    .links
                    .first()
                    .map(|l| l.href.clone())
                    .unwrap_or_default(),
                authors,
            })
        })
        .collect();

    Ok(entries)
}
