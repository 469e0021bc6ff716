//! toot-mirror domain crate
//!
//! This crate contains the core domain logic following hexagonal architecture:
//! - `model`: Domain entities and value objects
//! - `ports`: Trait definitions for external dependencies (adapters)
//! - `policy`: Age window eligibility
//! - `extract`: Pluggable media URL extraction
//! - `usecases`: Content transformation and the sync run

pub mod extract;
pub mod model;
pub mod policy;
pub mod ports;
pub mod usecases;

pub use model::*;
pub use ports::*;

/// Full target account handle as stored in the ledger, `user@instance`
pub fn qualified_account(account: &str, instance: &str) -> String {
    let account = account.trim().trim_start_matches('@');
    if account.contains('@') {
        account.to_string()
    } else {
        format!("{}@{}", account, instance)
    }
}
