//! # State Adapter
//!
//! In-memory record storage for tests and the sandbox ledger.

use crate::errors::{CollectionError, CollectionResult};
use crate::ports::outbound::StateStore;
use shared_cells::{Cell, StdAddress};
use std::collections::HashMap;
use std::sync::Arc;

/// In-memory state store.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStateStore {
    /// Records by account.
    records: HashMap<StdAddress, Arc<Cell>>,
    /// Reject every write.
    read_only: bool,
}

impl InMemoryStateStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Makes subsequent writes fail.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// Drops the record of `account`.
    pub fn remove(&mut self, account: &StdAddress) -> Option<Arc<Cell>> {
        self.records.remove(account)
    }
}

impl StateStore for InMemoryStateStore {
    fn load(&self, account: &StdAddress) -> CollectionResult<Option<Arc<Cell>>> {
        Ok(self.records.get(account).cloned())
    }

    fn save(&mut self, account: &StdAddress, data: Arc<Cell>) -> CollectionResult<()> {
        if self.read_only {
            return Err(CollectionError::Store(format!("{account} is read-only")));
        }
        self.records.insert(*account, data);
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use shared_cells::bytes_cell;

    #[test]
    fn test_load_save() {
        let mut store = InMemoryStateStore::new();
        let addr = StdAddress::new(0, [1u8; 32]);

        // Initially nothing
        assert!(store.load(&addr).unwrap().is_none());
        assert!(store.is_empty());

        let record = Arc::new(bytes_cell(b"record").unwrap());
        store.save(&addr, Arc::clone(&record)).unwrap();
        assert_eq!(store.load(&addr).unwrap(), Some(record));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_save_replaces() {
        let mut store = InMemoryStateStore::new();
        let addr = StdAddress::new(0, [1u8; 32]);
        store.save(&addr, Arc::new(bytes_cell(b"a").unwrap())).unwrap();
        let second = Arc::new(bytes_cell(b"b").unwrap());
        store.save(&addr, Arc::clone(&second)).unwrap();
        assert_eq!(store.load(&addr).unwrap(), Some(second));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_read_only_rejects_writes() {
        let mut store = InMemoryStateStore::new();
        store.set_read_only(true);
        let err = store
            .save(&StdAddress::new(0, [1u8; 32]), Arc::new(Cell::empty()))
            .unwrap_err();
        assert!(matches!(err, CollectionError::Store(_)));
    }
}
