//! Platform adapters that log instead of posting

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use toot_mirror_domain::{
    AuthError, MediaId, MediaPayload, PlatformClient, PlatformConnector, PlatformError, PostDraft,
    PublishResult,
};

/// Connector that never contacts the instance
#[derive(Default)]
pub struct DryRunConnector {
    client: Arc<DryRunClient>,
}

impl DryRunConnector {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PlatformConnector for DryRunConnector {
    async fn connect(&self) -> Result<Arc<dyn PlatformClient>, AuthError> {
        tracing::info!("[DRY RUN] Skipping authentication");
        Ok(self.client.clone())
    }
}

/// Client returning placeholder ids
#[derive(Default)]
pub struct DryRunClient {
    counter: AtomicU64,
}

impl DryRunClient {
    fn next_id(&self, prefix: &str) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("dry-run-{}-{}", prefix, n)
    }
}

#[async_trait]
impl PlatformClient for DryRunClient {
    async fn upload_media(&self, media: &MediaPayload) -> Result<MediaId, PlatformError> {
        tracing::info!(
            source_url = %media.source_url,
            size = media.bytes.len(),
            "[DRY RUN] Would upload media"
        );
        Ok(MediaId(self.next_id("media")))
    }

    async fn publish(&self, draft: &PostDraft) -> Result<PublishResult, PlatformError> {
        tracing::info!(
            text = %draft.text,
            media = draft.media_ids.len(),
            "[DRY RUN] Would publish"
        );
        Ok(PublishResult {
            id: self.next_id("post"),
            url: None,
        })
    }
}
