use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::error::Error as RelayerError;
use crate::util::sled::{self as db, KeyValueDb};

use super::{PathKey, PathRecord, PathStore, PathStoreError};

const PATHS_PREFIX: &str = "paths/";

/// A path store persisted on disk, surviving restarts of the relayer.
#[derive(Debug)]
pub struct SledPathStore {
    db: ::sled::Db,
    paths: KeyValueDb<PathKey, PathRecord>,
    writes: AtomicU64,
}

impl SledPathStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PathStoreError> {
        let path = path.as_ref();

        let db = ::sled::open(path)
            .map_err(|e| PathStoreError::open(path.display().to_string(), e))?;

        debug!(path = %path.display(), "opened path store");

        Ok(Self {
            db,
            paths: db::key_value(PATHS_PREFIX),
            writes: AtomicU64::new(0),
        })
    }

    /// Every record in the store, in key order.
    pub fn records(&self) -> Result<Vec<PathRecord>, PathStoreError> {
        let entries = self.paths.entries(&self.db).map_err(PathStoreError::store)?;
        Ok(entries.into_iter().map(|(_, record)| record).collect())
    }
}

impl PathStore for SledPathStore {
    fn lookup(&self, key: &PathKey) -> Result<Option<PathRecord>, PathStoreError> {
        self.paths.fetch(&self.db, key).map_err(PathStoreError::store)
    }

    fn save(&self, key: &PathKey, record: &PathRecord) -> Result<(), PathStoreError> {
        self.paths
            .insert(&self.db, key, record)
            .map_err(PathStoreError::store)?;

        self.db
            .flush()
            .map_err(|e| PathStoreError::store(RelayerError::store(e)))?;

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

    use serial_test::serial;
    use test_log::test;

    use crate::registry::tests::record;

    #[test]
    #[serial]
    fn records_survive_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paths");

        let record = record("ibc-0", "ibc-1", 2);

        {
            let store = SledPathStore::open(&path).unwrap();
            assert_eq!(store.lookup(&record.key()).unwrap(), None);

            store.save(&record.key(), &record).unwrap();
            assert_eq!(store.write_count(), 1);
        }

        let store = SledPathStore::open(&path).unwrap();

        assert_eq!(store.lookup(&record.key()).unwrap(), Some(record.clone()));
        assert_eq!(store.records().unwrap(), vec![record]);
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    #[serial]
    fn reversed_key_is_a_different_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledPathStore::open(dir.path()).unwrap();

        let record = record("ibc-0", "ibc-1", 0);
        store.save(&record.key(), &record).unwrap();

        let reversed = record.key().reversed(record.b_side.port_id.clone());
        assert_eq!(store.lookup(&reversed).unwrap(), None);
    }
}
