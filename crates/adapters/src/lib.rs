//! toot-mirror adapters crate
//!
//! Infrastructure adapters implementing the domain ports:
//! - `state`: SQLite and in-memory delivery ledgers
//! - `feed`: RSS/Atom feed source over HTTP
//! - `web`: media downloads and redirect probing
//! - `mastodon`: Mastodon connector and client
//! - `dry_run`: platform adapters that only log

pub mod dry_run;
mod feed_http;
pub mod mastodon;
mod state_memory;
mod state_sqlite;
mod web_http;

/// Re-exports for ledger adapters
pub mod state {
    pub use crate::state_memory::InMemoryDedupStore;
    pub use crate::state_sqlite::SqliteDedupStore;
}

/// Re-exports for feed adapters
pub mod feed {
    pub use crate::feed_http::{DEFAULT_ACCOUNT_PROXY_URL, HttpFeedSource, parse_feed};
}

/// Re-exports for web adapters
pub mod web {
    pub use crate::web_http::HttpWebClient;
}
