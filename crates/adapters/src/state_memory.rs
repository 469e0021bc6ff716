//! In-memory ledger for testing and dry runs

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use toot_mirror_domain::{DedupKey, DedupRecord, DedupStore, StateError};

/// In-memory ledger implementation
pub struct InMemoryDedupStore {
    records: RwLock<HashMap<DedupKey, DedupRecord>>,
}

impl InMemoryDedupStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryDedupStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DedupStore for InMemoryDedupStore {
    async fn is_processed(&self, key: &DedupKey) -> Result<bool, StateError> {
        let records = self
            .records
            .read()
            .map_err(|e| StateError::Database(e.to_string()))?;
        Ok(records.contains_key(key))
    }

    async fn record(&self, record: &DedupRecord) -> Result<bool, StateError> {
        let mut records = self
            .records
            .write()
            .map_err(|e| StateError::Database(e.to_string()))?;
        if records.contains_key(&record.key) {
            return Ok(false);
        }
        records.insert(record.key.clone(), record.clone());
        Ok(true)
    }

    async fn get_record(&self, key: &DedupKey) -> Result<Option<DedupRecord>, StateError> {
        let records = self
            .records
            .read()
            .map_err(|e| StateError::Database(e.to_string()))?;
        Ok(records.get(key).cloned())
    }

    async fn count(&self) -> Result<u64, StateError> {
        let records = self
            .records
            .read()
            .map_err(|e| StateError::Database(e.to_string()))?;
        Ok(records.len() as u64)
    }
}
