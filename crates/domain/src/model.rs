//! Domain models and value objects

use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

/// A structured author attached to a feed entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedAuthor {
    pub name: String,
}

/// One syndicated item from the source feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedEntry {
    /// Source-unique entry identifier
    pub id: String,
    /// Entry title, used as the post body
    pub title: String,
    /// Summary markup, may embed media URLs as plain substrings
    pub summary: String,
    /// Author label as the feed renders it, e.g. `(@handle)`
    pub author: String,
    /// When the entry was published
    #[serde(with = "time::serde::rfc3339")]
    pub published: OffsetDateTime,
    /// Permalink to the entry
    pub link: String,
    /// Structured authors, if the feed provides them
    #[serde(default)]
    pub authors: Vec<FeedAuthor>,
}

/// What a run mirrors: a source account (through the feed proxy) or an arbitrary feed URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedTarget {
    /// Account-mirroring mode
    Account { handle: String },
    /// Generic-feed mode
    Url { url: String },
}

impl FeedTarget {
    /// Interpret a run source argument: anything starting with `http` is a feed URL
    pub fn parse(source: &str) -> Self {
        let source = source.trim();
        if source.starts_with("http") {
            FeedTarget::Url {
                url: source.to_string(),
            }
        } else {
            FeedTarget::Account {
                handle: source.trim_start_matches('@').to_string(),
            }
        }
    }

    /// Source identifier stored in the ledger.
    ///
    /// Search feeds are cut at `/search/` so that query variations of the
    /// same feed share one ledger namespace.
    pub fn ledger_source(&self) -> String {
        match self {
            FeedTarget::Account { handle } => handle.clone(),
            FeedTarget::Url { url } => url
                .split("/search/")
                .next()
                .unwrap_or(url.as_str())
                .to_string(),
        }
    }

    /// The mirrored handle, in account mode
    pub fn handle(&self) -> Option<&str> {
        match self {
            FeedTarget::Account { handle } => Some(handle),
            FeedTarget::Url { .. } => None,
        }
    }
}

impl fmt::Display for FeedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedTarget::Account { handle } => write!(f, "@{}", handle),
            FeedTarget::Url { url } => f.write_str(url),
        }
    }
}

/// Identifies "this entry was already delivered to this account on this instance"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DedupKey {
    pub entry_id: String,
    /// Ledger source identifier, see [`FeedTarget::ledger_source`]
    pub source: String,
    /// Full target account, `user@instance`
    pub account: String,
    pub instance: String,
}

/// A delivered entry and the post it produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupRecord {
    pub key: DedupKey,
    /// Platform post ID
    pub post_id: String,
    /// When the delivery was recorded
    #[serde(with = "time::serde::rfc3339")]
    pub recorded_at: OffsetDateTime,
}

/// Opaque media reference returned by the target platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaId(pub String);

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A downloaded medium ready for upload
#[derive(Debug, Clone)]
pub struct MediaPayload {
    pub bytes: Vec<u8>,
    /// Content type reported by the hosting server
    pub mime_type: Option<String>,
    pub source_url: String,
}

/// Post text and attached media, built by the transformer and consumed by the publisher
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostDraft {
    pub text: String,
    pub media_ids: Vec<MediaId>,
}

/// Post visibility on the target platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Unlisted,
    Private,
    Direct,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Unlisted => "unlisted",
            Visibility::Private => "private",
            Visibility::Direct => "direct",
        }
    }
}

impl std::str::FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "public" => Ok(Visibility::Public),
            "unlisted" => Ok(Visibility::Unlisted),
            "private" => Ok(Visibility::Private),
            "direct" => Ok(Visibility::Direct),
            other => Err(format!("Invalid visibility: {}", other)),
        }
    }
}

/// Why an entry was not published
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// A ledger record already exists for this entry
    AlreadyDelivered,
    /// Too fresh or too old
    OutsideAgeWindow,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::AlreadyDelivered => f.write_str("already delivered"),
            SkipReason::OutsideAgeWindow => f.write_str("outside age window"),
        }
    }
}

/// Processing result for a single entry
#[derive(Debug)]
pub enum ProcessResult {
    /// Entry was published; `recorded` is false when the ledger write did not land
    Published {
        post_id: String,
        media_count: usize,
        recorded: bool,
    },
    /// Entry was filtered out before publishing
    Skipped { reason: SkipReason },
    /// Publishing (or the ledger lookup) failed; the entry is retried next run
    Failed { error: String },
}
