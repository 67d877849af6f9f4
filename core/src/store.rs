//! Block store seams
//!
//! Every payload in transit gets its own isolated block store so unrelated
//! payloads never share storage. The stores themselves are owned by an
//! external multi-store; the supply layer only holds identifiers and routes
//! transfer channels to the right store.

use std::fmt;
use std::sync::Arc;

use cid::Cid;

/// Identifier of one store inside the external multi-store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreId(pub u64);

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A content-addressed block store. This is the load/store capability a
/// transfer channel is routed through.
pub trait BlockStore: Send + Sync {
    fn get(&self, cid: &Cid) -> Result<Option<Vec<u8>>, StoreError>;

    fn put(&self, cid: Cid, data: Vec<u8>) -> Result<(), StoreError>;

    fn has(&self, cid: &Cid) -> Result<bool, StoreError>;
}

/// Factory vending per-identifier block stores.
pub trait MultiStore: Send + Sync + 'static {
    /// Allocate a fresh store and return its identifier.
    fn next_id(&self) -> StoreId;

    /// Resolve an identifier to its store.
    fn get(&self, id: StoreId) -> Result<Arc<dyn BlockStore>, StoreError>;

    /// Destroy a store and all blocks it holds.
    fn delete(&self, id: StoreId) -> Result<(), StoreError>;
}

/// Errors from store operations.
#[derive(Debug)]
pub enum StoreError {
    /// No store with the given identifier.
    NotFound(StoreId),
    /// Backend failure.
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound(id) => write!(f, "store {} not found", id),
            StoreError::Backend(e) => write!(f, "store backend error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}
