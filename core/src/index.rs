//! Content index
//!
//! Durable mapping from payload CID to a small label set, isolated under
//! the `/supply/` key prefix so it cannot collide with other subsystems
//! sharing the same key-value store. The one label this layer requires is
//! the owning block-store identifier; inbound handling also records the
//! advertised payload size.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use cid::Cid;
use serde::{Deserialize, Serialize};

use crate::data::{KeyValueStore, KvError};
use crate::store::StoreId;

/// Key prefix for every index record.
pub const INDEX_NAMESPACE: &str = "/supply/";

/// Label holding the owning block-store identifier, as a decimal string.
pub const LABEL_STORE_ID: &str = "storeId";

/// Label holding the advertised payload size in bytes.
pub const LABEL_SIZE: &str = "size";

/// Label map attached to an indexed payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    labels: BTreeMap<String, String>,
}

impl ContentRecord {
    pub fn new() -> Self {
        ContentRecord::default()
    }

    /// Record for a payload owned by `store_id`.
    pub fn for_store(store_id: StoreId) -> Self {
        ContentRecord::new().with_label(LABEL_STORE_ID, store_id.to_string())
    }

    pub fn with_label(mut self, key: &str, value: impl Into<String>) -> Self {
        self.labels.insert(key.to_string(), value.into());
        self
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    /// Decode the owning store identifier.
    pub fn store_id(&self) -> Result<StoreId, IndexError> {
        let label = self
            .label(LABEL_STORE_ID)
            .ok_or_else(|| IndexError::MissingLabel(LABEL_STORE_ID.to_string()))?;
        let id = label
            .parse::<u64>()
            .map_err(|e| IndexError::InvalidLabel(format!("{}: {}", label, e)))?;
        Ok(StoreId(id))
    }

    fn to_bytes(&self) -> Vec<u8> {
        postcard::to_allocvec(self).expect("serialization should not fail")
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, IndexError> {
        postcard::from_bytes(bytes).map_err(|e| IndexError::Decode(e.to_string()))
    }
}

/// The index itself, namespaced over a key-value store.
pub struct ContentIndex {
    kv: Arc<dyn KeyValueStore>,
}

impl ContentIndex {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        ContentIndex { kv }
    }

    fn key_for(cid: &Cid) -> String {
        format!("{}{}", INDEX_NAMESPACE, cid)
    }

    /// Idempotent overwrite of the record for `cid`.
    pub fn put(&self, cid: &Cid, record: &ContentRecord) -> Result<(), IndexError> {
        self.kv.put(&Self::key_for(cid), &record.to_bytes())?;
        Ok(())
    }

    pub fn get(&self, cid: &Cid) -> Result<ContentRecord, IndexError> {
        match self.kv.get(&Self::key_for(cid))? {
            Some(bytes) => ContentRecord::from_bytes(&bytes),
            None => Err(IndexError::NotFound),
        }
    }

    /// Succeeds whether or not a record exists.
    pub fn remove(&self, cid: &Cid) -> Result<(), IndexError> {
        self.kv.delete(&Self::key_for(cid))?;
        Ok(())
    }

    /// Resolve the block store owning `cid`. Fails distinctly when the
    /// record is missing, the label is missing, or the label fails to
    /// parse.
    pub fn store_id(&self, cid: &Cid) -> Result<StoreId, IndexError> {
        self.get(cid)?.store_id()
    }
}

/// Errors from index lookups.
#[derive(Debug)]
pub enum IndexError {
    /// No record for the requested CID.
    NotFound,
    /// The record lacks a required label.
    MissingLabel(String),
    /// A label value failed to parse.
    InvalidLabel(String),
    /// The stored record did not decode.
    Decode(String),
    /// The backing store failed.
    Store(String),
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexError::NotFound => write!(f, "content record not found"),
            IndexError::MissingLabel(l) => write!(f, "record is missing label {}", l),
            IndexError::InvalidLabel(e) => write!(f, "invalid label value: {}", e),
            IndexError::Decode(e) => write!(f, "failed to decode record: {}", e),
            IndexError::Store(e) => write!(f, "index store error: {}", e),
        }
    }
}

impl std::error::Error for IndexError {}

impl From<KvError> for IndexError {
    fn from(e: KvError) -> Self {
        IndexError::Store(e.to_string())
    }
}
