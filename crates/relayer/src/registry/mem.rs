use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::util::mutex::MutexUtil;

use super::{PathKey, PathRecord, PathStore, PathStoreError};

/// A path store that lives as long as the process.
#[derive(Clone, Debug, Default)]
pub struct MemoryPathStore {
    records: Arc<Mutex<HashMap<PathKey, PathRecord>>>,
    writes: Arc<AtomicU64>,
}

impl MemoryPathStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PathStore for MemoryPathStore {
    fn lookup(&self, key: &PathKey) -> Result<Option<PathRecord>, PathStoreError> {
        Ok(self.records.acquire_mutex().get(key).cloned())
    }

    fn save(&self, key: &PathKey, record: &PathRecord) -> Result<(), PathStoreError> {
        self.records
            .acquire_mutex()
            .insert(key.clone(), record.clone());

        self.writes.fetch_add(1, Ordering::SeqCst);

        Ok(())
    }

    fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::registry::tests::record;

    #[test]
    fn save_overwrites() {
        let store = MemoryPathStore::new();
        let first = record("ibc-0", "ibc-1", 0);
        let second = record("ibc-0", "ibc-1", 4);

        assert_eq!(store.lookup(&first.key()).unwrap(), None);

        store.save(&first.key(), &first).unwrap();
        store.save(&second.key(), &second).unwrap();

        assert_eq!(store.lookup(&first.key()).unwrap(), Some(second));
        assert_eq!(store.write_count(), 2);
    }

    #[test]
    fn clones_share_records() {
        let store = MemoryPathStore::new();
        let clone = store.clone();
        let record = record("ibc-0", "ibc-1", 0);

        clone.save(&record.key(), &record).unwrap();

        assert_eq!(store.lookup(&record.key()).unwrap(), Some(record));
        assert_eq!(store.write_count(), 1);
    }
}
