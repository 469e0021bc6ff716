//! Sync run use case - orchestrates fetching, filtering, transforming, and publishing

use std::sync::Arc;

use crate::{
    extract::{default_media_hosts, extractors_for_hosts},
    model::{DedupKey, DedupRecord, FeedEntry, FeedTarget, ProcessResult, SkipReason},
    policy::AgeWindow,
    ports::{
        AuthError, Clock, DedupStore, FeedError, FeedSource, PlatformClient, PlatformConnector,
        WebClient,
    },
    usecases::transform::{ContentTransformer, TransformConfig},
};
use tokio::time::{Duration, sleep};

/// Configuration for a sync run
#[derive(Debug, Clone)]
pub struct SyncRunConfig {
    /// Feed being mirrored
    pub target: FeedTarget,
    /// Target account, `user@instance`
    pub account: String,
    /// Target instance host
    pub instance: String,
    /// Entries outside this window are never published
    pub age_window: AgeWindow,
    /// Footer line appended to every post
    pub footer_tags: String,
    /// Pause after each publish attempt
    pub posting_delay: Duration,
    /// Media hosting prefixes, scanned in order
    pub media_hosts: Vec<String>,
}

impl Default for SyncRunConfig {
    fn default() -> Self {
        Self {
            target: FeedTarget::Account {
                handle: String::new(),
            },
            account: String::new(),
            instance: String::new(),
            age_window: AgeWindow::new(time::Duration::ZERO, time::Duration::DAY),
            footer_tags: String::new(),
            posting_delay: Duration::from_secs(1),
            media_hosts: default_media_hosts(),
        }
    }
}

/// Sync run orchestrator
pub struct SyncRun<F, D, P, W, Cl>
where
    F: FeedSource + ?Sized,
    D: DedupStore + ?Sized,
    P: PlatformConnector + ?Sized,
    W: WebClient + ?Sized,
    Cl: Clock + ?Sized,
{
    feed_source: Arc<F>,
    dedup_store: Arc<D>,
    connector: Arc<P>,
    web: Arc<W>,
    clock: Arc<Cl>,
    config: SyncRunConfig,
    transformer: ContentTransformer,
}

impl<F, D, P, W, Cl> SyncRun<F, D, P, W, Cl>
where
    F: FeedSource + ?Sized,
    D: DedupStore + ?Sized,
    P: PlatformConnector + ?Sized,
    W: WebClient + ?Sized,
    Cl: Clock + ?Sized,
{
    pub fn new(
        feed_source: Arc<F>,
        dedup_store: Arc<D>,
        connector: Arc<P>,
        web: Arc<W>,
        clock: Arc<Cl>,
        config: SyncRunConfig,
    ) -> Self {
        let extractors = extractors_for_hosts(&config.media_hosts);
        let transformer = ContentTransformer::new(transform_config(&config), extractors);
        Self {
            feed_source,
            dedup_store,
            connector,
            web,
            clock,
            config,
            transformer,
        }
    }

    /// Run a single pass over the feed.
    ///
    /// Returns per-entry results in processing order. Only feed and
    /// authentication failures abort the pass.
    pub async fn run_once(&self) -> Result<Vec<(String, ProcessResult)>, SyncError> {
        tracing::info!(feed = %self.config.target, account = %self.config.account, "Fetching feed");

        let entries = self.feed_source.fetch_entries(&self.config.target).await?;
        let entries = oldest_first(entries);

        tracing::info!(count = entries.len(), "Fetched entries");

        let mut client: Option<Arc<dyn PlatformClient>> = None;
        let mut results = Vec::with_capacity(entries.len());

        for entry in entries {
            let key = self.dedup_key(&entry);

            if let Some(result) = self.filter_entry(&entry, &key).await {
                if let ProcessResult::Skipped { reason } = &result {
                    tracing::debug!(entry_id = %entry.id, reason = %reason, "Skipped");
                }
                results.push((entry.id, result));
                continue;
            }

            let platform = match &client {
                Some(platform) => Arc::clone(platform),
                None => {
                    tracing::info!(instance = %self.config.instance, "Connecting to instance");
                    let platform = self.connector.connect().await?;
                    client = Some(Arc::clone(&platform));
                    platform
                }
            };

            let result = self.deliver(&entry, key, platform.as_ref()).await;
            results.push((entry.id, result));

            if !self.config.posting_delay.is_zero() {
                sleep(self.config.posting_delay).await;
            }
        }

        Ok(results)
    }

    fn dedup_key(&self, entry: &FeedEntry) -> DedupKey {
        DedupKey {
            entry_id: entry.id.clone(),
            source: self.config.target.ledger_source(),
            account: self.config.account.clone(),
            instance: self.config.instance.clone(),
        }
    }

    /// `Some(result)` when the entry must not be published this run
    async fn filter_entry(&self, entry: &FeedEntry, key: &DedupKey) -> Option<ProcessResult> {
        if !self
            .config
            .age_window
            .admits(entry.published, self.clock.now())
        {
            return Some(ProcessResult::Skipped {
                reason: SkipReason::OutsideAgeWindow,
            });
        }

        match self.dedup_store.is_processed(key).await {
            Ok(true) => Some(ProcessResult::Skipped {
                reason: SkipReason::AlreadyDelivered,
            }),
            Ok(false) => None,
            Err(e) => {
                // No ledger answer, no publish
                tracing::error!(entry_id = %entry.id, error = %e, "Failed to check ledger, skipping entry");
                Some(ProcessResult::Failed {
                    error: format!("Ledger lookup failed: {}", e),
                })
            }
        }
    }

    /// Transform, publish and record a single eligible entry
    async fn deliver(
        &self,
        entry: &FeedEntry,
        key: DedupKey,
        platform: &dyn PlatformClient,
    ) -> ProcessResult {
        tracing::info!(entry_id = %entry.id, title = %preview(&entry.title), "Posting entry");

        let draft = self
            .transformer
            .transform(entry, self.web.as_ref(), platform)
            .await;

        let published = match platform.publish(&draft).await {
            Ok(published) => published,
            Err(e) => {
                tracing::error!(entry_id = %entry.id, error = %e, "Can't publish, skipping this one");
                tracing::debug!(entry_id = %entry.id, text = %draft.text, "Skipped post");
                return ProcessResult::Failed {
                    error: format!("Publish failed: {}", e),
                };
            }
        };

        tracing::info!(
            entry_id = %entry.id,
            post_id = %published.id,
            url = ?published.url,
            media_count = draft.media_ids.len(),
            "Published"
        );

        let record = DedupRecord {
            key,
            post_id: published.id.clone(),
            recorded_at: self.clock.now(),
        };

        let recorded = match self.dedup_store.record(&record).await {
            Ok(true) => true,
            Ok(false) => {
                match self.dedup_store.get_record(&record.key).await {
                    Ok(Some(existing)) => tracing::warn!(
                        entry_id = %entry.id,
                        post_id = %published.id,
                        recorded_post_id = %existing.post_id,
                        recorded_at = %existing.recorded_at,
                        "Entry was already recorded by another run"
                    ),
                    Ok(None) => {
                        tracing::warn!(entry_id = %entry.id, post_id = %published.id, "Entry was already recorded")
                    }
                    Err(e) => tracing::warn!(
                        entry_id = %entry.id,
                        post_id = %published.id,
                        error = %e,
                        "Entry was already recorded, existing record unreadable"
                    ),
                }
                false
            }
            Err(e) => {
                tracing::error!(
                    entry_id = %entry.id,
                    post_id = %published.id,
                    error = %e,
                    "Failed to record delivery; entry may be posted again next run"
                );
                false
            }
        };

        ProcessResult::Published {
            post_id: published.id,
            media_count: draft.media_ids.len(),
            recorded,
        }
    }
}

/// Errors that abort a sync run
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),
    #[error("Authentication error: {0}")]
    Authentication(#[from] AuthError),
}

fn transform_config(config: &SyncRunConfig) -> TransformConfig {
    TransformConfig {
        target: config.target.clone(),
        footer_tags: config.footer_tags.clone(),
    }
}

/// Feeds list newest first; reverse, then sort stably so ties keep that order
fn oldest_first(mut entries: Vec<FeedEntry>) -> Vec<FeedEntry> {
    entries.reverse();
    entries.sort_by_key(|e| e.published);
    entries
}

fn preview(text: &str) -> String {
    text.chars().take(60).collect()
}
