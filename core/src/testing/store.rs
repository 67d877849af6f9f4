//! In-memory multi-store
//!
//! Stand-in for the external per-payload block store factory. `next_id`
//! materializes the store immediately, so an identifier exists iff the
//! store does.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use cid::Cid;

use crate::store::{BlockStore, MultiStore, StoreError, StoreId};

/// Block store backed by a hash map.
#[derive(Default)]
pub struct MemoryBlockStore {
    blocks: RwLock<HashMap<Cid, Vec<u8>>>,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        MemoryBlockStore::default()
    }
}

impl BlockStore for MemoryBlockStore {
    fn get(&self, cid: &Cid) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.blocks.read().unwrap().get(cid).cloned())
    }

    fn put(&self, cid: Cid, data: Vec<u8>) -> Result<(), StoreError> {
        self.blocks.write().unwrap().insert(cid, data);
        Ok(())
    }

    fn has(&self, cid: &Cid) -> Result<bool, StoreError> {
        Ok(self.blocks.read().unwrap().contains_key(cid))
    }
}

/// Multi-store vending [`MemoryBlockStore`]s.
#[derive(Default)]
pub struct MemoryMultiStore {
    stores: Mutex<HashMap<StoreId, Arc<MemoryBlockStore>>>,
    next: AtomicU64,
}

impl MemoryMultiStore {
    pub fn new() -> Self {
        MemoryMultiStore::default()
    }

    /// Whether a store with this identifier currently exists.
    pub fn contains(&self, id: StoreId) -> bool {
        self.stores.lock().unwrap().contains_key(&id)
    }
}

impl MultiStore for MemoryMultiStore {
    fn next_id(&self) -> StoreId {
        let id = StoreId(self.next.fetch_add(1, Ordering::SeqCst) + 1);
        self.stores
            .lock()
            .unwrap()
            .insert(id, Arc::new(MemoryBlockStore::new()));
        id
    }

    fn get(&self, id: StoreId) -> Result<Arc<dyn BlockStore>, StoreError> {
        let stores = self.stores.lock().unwrap();
        match stores.get(&id) {
            Some(store) => Ok(store.clone()),
            None => Err(StoreError::NotFound(id)),
        }
    }

    fn delete(&self, id: StoreId) -> Result<(), StoreError> {
        self.stores.lock().unwrap().remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::payload_cid;

    #[test]
    fn test_each_allocation_is_isolated() {
        let ms = MemoryMultiStore::new();
        let a = ms.next_id();
        let b = ms.next_id();
        assert_ne!(a, b);

        let block = payload_cid(b"block");
        ms.get(a).unwrap().put(block, b"in-a".to_vec()).unwrap();

        assert!(ms.get(a).unwrap().has(&block).unwrap());
        assert!(!ms.get(b).unwrap().has(&block).unwrap());
    }

    #[test]
    fn test_delete_removes_store() {
        let ms = MemoryMultiStore::new();
        let id = ms.next_id();
        assert!(ms.contains(id));

        ms.delete(id).unwrap();
        assert!(!ms.contains(id));
        assert!(matches!(ms.get(id), Err(StoreError::NotFound(_))));

        // Deleting again still succeeds.
        ms.delete(id).unwrap();
    }

    #[test]
    fn test_get_unknown_id_fails() {
        let ms = MemoryMultiStore::new();
        assert!(matches!(ms.get(StoreId(99)), Err(StoreError::NotFound(_))));
    }
}
