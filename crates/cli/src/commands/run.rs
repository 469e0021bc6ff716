//! Run command - one mirroring pass over the feed

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use toot_mirror_adapters::{
    dry_run::DryRunConnector,
    feed::HttpFeedSource,
    mastodon::MastodonConnector,
    state::{InMemoryDedupStore, SqliteDedupStore},
    web::HttpWebClient,
};
use toot_mirror_domain::{
    DedupStore, FeedTarget, PlatformConnector, ProcessResult, SystemClock,
    policy::AgeWindow,
    qualified_account,
    usecases::{SyncRun, SyncRunConfig},
};

use crate::args::RunArgs;
use crate::config::{AppConfig, CredentialsFile, session_path};

pub async fn execute(args: RunArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    let mastodon_account = CredentialsFile::load(&args.credentials)?.account()?;

    let target = FeedTarget::parse(&args.source);
    let instance = mastodon_account.instance.clone();
    let account = qualified_account(&mastodon_account.account, &instance);

    let age_window = AgeWindow::from_days(args.delay, args.days)
        .context("Invalid age window, check DAYS and DELAY")?;
    if age_window.is_empty() {
        tracing::warn!(
            days = args.days,
            delay = args.delay,
            "Age window is empty, nothing will be posted"
        );
    }

    tracing::info!(
        feed = %target,
        account = %account,
        days = args.days,
        delay = args.delay,
        dry_run = args.dry_run,
        "Starting toot-mirror run"
    );

    let feed_timeout = Duration::from_secs(config.feed.timeout_secs);
    let feed_source = Arc::new(
        HttpFeedSource::with_proxy_url(config.feed.account_proxy_url.clone(), feed_timeout)
            .context("Failed to initialize feed source")?,
    );
    let web = Arc::new(HttpWebClient::new(feed_timeout).context("Failed to initialize web client")?);

    let (dedup_store, connector): (Arc<dyn DedupStore>, Arc<dyn PlatformConnector>) =
        if args.dry_run {
            let store: Arc<dyn DedupStore> = Arc::new(InMemoryDedupStore::new());
            let connector: Arc<dyn PlatformConnector> = Arc::new(DryRunConnector::new());
            (store, connector)
        } else {
            let ledger_path = SqliteDedupStore::path_for(&config.general.state_dir, &account);
            tracing::debug!(ledger = %ledger_path.display(), "Opening ledger");
            let store = SqliteDedupStore::new(&ledger_path)
                .await
                .with_context(|| format!("Failed to open ledger {}", ledger_path.display()))?;

            let connector = MastodonConnector::new(
                mastodon_account,
                session_path(&args.credentials),
                config.mastodon_settings()?,
            )
            .context("Failed to initialize Mastodon connector")?;

            let store: Arc<dyn DedupStore> = Arc::new(store);
            let connector: Arc<dyn PlatformConnector> = Arc::new(connector);
            (store, connector)
        };

    let sync_config = SyncRunConfig {
        target,
        account,
        instance,
        age_window,
        footer_tags: args.tags,
        posting_delay: Duration::from_secs(config.general.posting_delay_secs),
        media_hosts: config.media.hosts.clone(),
    };

    let sync_run = SyncRun::new(
        feed_source,
        dedup_store,
        connector,
        web,
        Arc::new(SystemClock),
        sync_config,
    );

    let results = sync_run.run_once().await.context("Mirroring run aborted")?;

    let mut published = 0;
    let mut skipped = 0;
    let mut failed = 0;

    for (entry_id, result) in &results {
        match result {
            ProcessResult::Published { .. } => published += 1,
            ProcessResult::Skipped { .. } => skipped += 1,
            ProcessResult::Failed { .. } => failed += 1,
        }
        tracing::debug!(entry_id = %entry_id, result = ?result, "Entry processed");
    }

    tracing::info!(
        published = published,
        skipped = skipped,
        failed = failed,
        "toot-mirror run completed"
    );
    Ok(())
}
