//! LMDB implementation of CatalogStore.
//!
//! Key: item id as 8 big-endian bytes. Value: counter as 8 big-endian bytes.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use hotness_store::{CatalogStore, StoreError};
use hotness_types::ItemId;

use crate::LmdbError;

pub struct LmdbCatalogStore {
    pub(crate) env: Arc<Env>,
    pub(crate) counters_db: Database<Bytes, Bytes>,
}

fn decode_count(bytes: &[u8]) -> Result<u64, LmdbError> {
    let arr: [u8; 8] = bytes
        .try_into()
        .map_err(|_| LmdbError::Serialization("invalid counter bytes length".into()))?;
    Ok(u64::from_be_bytes(arr))
}

fn decode_item(bytes: &[u8]) -> Result<ItemId, LmdbError> {
    let arr: [u8; 8] = bytes
        .try_into()
        .map_err(|_| LmdbError::Serialization("invalid item key length".into()))?;
    ItemId::from_be_bytes(arr).map_err(|e| LmdbError::Serialization(e.to_string()))
}

impl LmdbCatalogStore {
    /// Create (or overwrite) the catalog row for `item`.
    pub fn insert_item(&self, item: ItemId, count: u64) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.counters_db
            .put(&mut wtxn, &item.to_be_bytes(), &count.to_be_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    /// Remove the catalog row for `item`. Returns whether a row existed.
    pub fn remove_item(&self, item: ItemId) -> Result<bool, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let existed = self
            .counters_db
            .delete(&mut wtxn, &item.to_be_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(existed)
    }

    pub fn item_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.counters_db.len(&rtxn).map_err(LmdbError::from)?)
    }
}

impl CatalogStore for LmdbCatalogStore {
    fn read_counter(&self, item: ItemId) -> Result<Option<u64>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self
            .counters_db
            .get(&rtxn, &item.to_be_bytes())
            .map_err(LmdbError::from)?
        {
            Some(bytes) => Ok(Some(decode_count(bytes)?)),
            None => Ok(None),
        }
    }

    fn apply_delta(&self, item: ItemId, delta: u64) -> Result<u64, StoreError> {
        // LMDB allows a single writer, so the read-modify-write below cannot
        // interleave with another apply.
        let key = item.to_be_bytes();
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let current = match self
            .counters_db
            .get(&wtxn, &key)
            .map_err(LmdbError::from)?
        {
            Some(bytes) => decode_count(bytes)?,
            None => return Ok(0),
        };
        let updated = current.saturating_add(delta);
        self.counters_db
            .put(&mut wtxn, &key, &updated.to_be_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(1)
    }

    fn read_all_counters(&self) -> Result<Vec<(ItemId, u64)>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self.counters_db.iter(&rtxn).map_err(LmdbError::from)?;
        let mut results = Vec::new();
        for entry in iter {
            let (key, val) = entry.map_err(LmdbError::from)?;
            let item = match decode_item(key) {
                Ok(item) => item,
                Err(e) => {
                    tracing::warn!("skipping malformed catalog key: {e}");
                    continue;
                }
            };
            results.push((item, decode_count(val)?));
        }
        Ok(results)
    }
}
