//! Port definitions (traits) for external dependencies
//!
//! These traits define the boundaries between the domain and external systems.
//! Adapters implement these traits to connect to real infrastructure.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use time::OffsetDateTime;

use crate::model::{DedupKey, DedupRecord, FeedEntry, FeedTarget, MediaId, MediaPayload, PostDraft};

/// Error type for feed source operations
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Feed returned HTTP {0}")]
    Status(u16),
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Port for fetching entries from a syndicated feed
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch entries for a target, in the feed's natural order
    async fn fetch_entries(&self, target: &FeedTarget) -> Result<Vec<FeedEntry>, FeedError>;
}

/// Error type for ledger operations
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Port for the durable delivery ledger
#[async_trait]
pub trait DedupStore: Send + Sync {
    /// Check whether an entry was already delivered under this exact key
    async fn is_processed(&self, key: &DedupKey) -> Result<bool, StateError>;

    /// Record a delivery. Insert-if-absent: returns `false` when the key already existed.
    async fn record(&self, record: &DedupRecord) -> Result<bool, StateError>;

    /// Get the record stored for a key
    async fn get_record(&self, key: &DedupKey) -> Result<Option<DedupRecord>, StateError>;

    /// Number of records in the ledger
    async fn count(&self) -> Result<u64, StateError>;
}

/// Error type for authenticating against the target platform. Always fatal.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Failed to register application on {instance}: {message}")]
    Registration { instance: String, message: String },
    #[error("Login failed: {0}")]
    Login(String),
    #[error("Access token rejected: {0}")]
    InvalidToken(String),
    #[error("Session file error: {0}")]
    Session(String),
    #[error("Can't construct client: {0}")]
    Client(String),
}

/// Error type for media upload and post publishing
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("API error: {0}")]
    Api(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Rate limited")]
    RateLimited,
    #[error("Authentication failed: {0}")]
    Auth(String),
}

/// Result of a successful publish operation
#[derive(Debug, Clone)]
pub struct PublishResult {
    /// Platform-specific post ID
    pub id: String,
    /// URL to the published post, if available
    pub url: Option<String>,
}

/// An authenticated handle on the target platform
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Upload a medium, returning the reference to attach at publish time
    async fn upload_media(&self, media: &MediaPayload) -> Result<MediaId, PlatformError>;

    /// Publish a post with its attached media
    async fn publish(&self, draft: &PostDraft) -> Result<PublishResult, PlatformError>;
}

/// Produces an authenticated [`PlatformClient`]. Called at most once per run.
#[async_trait]
pub trait PlatformConnector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn PlatformClient>, AuthError>;
}

/// Error type for the transformer's HTTP side effects
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },
}

/// Port for plain web requests made while enriching an entry
#[async_trait]
pub trait WebClient: Send + Sync {
    /// Download a medium
    async fn fetch_media(&self, url: &str) -> Result<MediaPayload, FetchError>;

    /// Issue a single request without following redirects.
    /// Returns the `Location` target when the response is a redirect.
    async fn probe_redirect(&self, url: &str) -> Result<Option<String>, FetchError>;
}

/// Port for time/clock operations (enables deterministic testing)
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> OffsetDateTime;
}

/// Real clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}
