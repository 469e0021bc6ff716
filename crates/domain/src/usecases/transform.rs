//! Content transformation use case - turns a feed entry into a post draft

use regex::Regex;
use std::sync::LazyLock;

use crate::{
    extract::MediaExtractor,
    model::{FeedEntry, FeedTarget, MediaId, PostDraft},
    ports::{PlatformClient, WebClient},
};

static FIRST_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"http[^\s\u{a0}]*").expect("valid link pattern"));

static PREVIEW_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"pic\.twitter\.com[^\s\u{a0}]*").expect("valid preview pattern"));

/// Truncation artifact the source feed leaves at the end of long titles
const ELLIPSIS_ARTIFACT: &str = "\u{a0}…";

/// Profile URL prefix used in retweet attribution lines
const PROFILE_URL_PREFIX: &str = "https://twitter.com/";

/// Configuration for the transformer
#[derive(Debug, Clone)]
pub struct TransformConfig {
    /// What the run mirrors; selects retweet attribution or source attribution
    pub target: FeedTarget,
    /// Footer appended as the last line; ignored when two characters or shorter
    pub footer_tags: String,
}

/// Builds post drafts. Enrichment failures are logged and never abort the entry.
pub struct ContentTransformer {
    config: TransformConfig,
    extractors: Vec<Box<dyn MediaExtractor>>,
}

impl ContentTransformer {
    pub fn new(config: TransformConfig, extractors: Vec<Box<dyn MediaExtractor>>) -> Self {
        Self { config, extractors }
    }

    /// Transform one entry. Media are uploaded through `platform` as they are found.
    pub async fn transform<W, P>(&self, entry: &FeedEntry, web: &W, platform: &P) -> PostDraft
    where
        W: WebClient + ?Sized,
        P: PlatformClient + ?Sized,
    {
        let mut text = self.with_attribution(entry);
        let media_ids = self.collect_media(entry, web, platform).await;

        text = resolve_first_link(&text, web).await;
        text = strip_preview_link(&text);
        text = text.replace(ELLIPSIS_ARTIFACT, " ");

        if self.config.target.handle().is_none() {
            let name = entry
                .authors
                .first()
                .map(|a| a.name.as_str())
                .unwrap_or(entry.author.as_str());
            text = format!("{}\n\nSource: {} {}", text, name, entry.link);
        }

        if self.config.footer_tags.chars().count() > 2 {
            text = format!("{}\n{}", text, self.config.footer_tags);
        }

        tracing::debug!(
            entry_id = %entry.id,
            media_count = media_ids.len(),
            "Transformed entry"
        );

        PostDraft { text, media_ids }
    }

    /// Title, prefixed with an RT line when a mirrored account reposted someone else
    fn with_attribution(&self, entry: &FeedEntry) -> String {
        let Some(handle) = self.config.target.handle() else {
            return entry.title.clone();
        };

        let own_label = format!("(@{})", handle);
        if entry.author.to_lowercase() == own_label.to_lowercase() {
            return entry.title.clone();
        }

        let original_author = entry
            .author
            .trim()
            .trim_start_matches('(')
            .trim_start_matches('@')
            .trim_end_matches(')');

        format!("RT {}{}\n{}", PROFILE_URL_PREFIX, original_author, entry.title)
    }

    async fn collect_media<W, P>(&self, entry: &FeedEntry, web: &W, platform: &P) -> Vec<MediaId>
    where
        W: WebClient + ?Sized,
        P: PlatformClient + ?Sized,
    {
        let mut media_ids = Vec::new();

        for extractor in &self.extractors {
            for url in extractor.extract(&entry.summary) {
                let payload = match web.fetch_media(&url).await {
                    Ok(payload) => payload,
                    Err(e) => {
                        tracing::warn!(entry_id = %entry.id, url = %url, error = %e, "Can't get media");
                        continue;
                    }
                };

                match platform.upload_media(&payload).await {
                    Ok(id) => {
                        tracing::debug!(entry_id = %entry.id, url = %url, media_id = %id, "Uploaded media");
                        media_ids.push(id);
                    }
                    Err(e) => {
                        tracing::warn!(entry_id = %entry.id, url = %url, error = %e, "Can't upload media");
                    }
                }
            }
        }

        media_ids
    }
}

/// Replace the first link in `text` with its redirect target, if it redirects
async fn resolve_first_link<W: WebClient + ?Sized>(text: &str, web: &W) -> String {
    let Some(found) = FIRST_LINK.find(text) else {
        return text.to_string();
    };
    let link = found.as_str();

    match web.probe_redirect(link).await {
        Ok(Some(location)) => {
            tracing::debug!(from = %link, to = %location, "Resolved link");
            text.replace(link, &location)
        }
        Ok(None) => text.to_string(),
        Err(e) => {
            tracing::warn!(url = %link, error = %e, "Can't resolve link");
            text.to_string()
        }
    }
}

fn strip_preview_link(text: &str) -> String {
    match PREVIEW_LINK.find(text) {
        Some(found) => text.replace(found.as_str(), " "),
        None => text.to_string(),
    }
}
