//! Versioned key/value store of the mock chain.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;

use ibc_relay_types::core::ics23_commitment::commitment::{CommitmentProofBytes, CommitmentRoot};
use ibc_relay_types::core::ics23_commitment::proof::StoreProof;
use ibc_relay_types::core::ics24_host::identifier::ChainId;
use ibc_relay_types::core::ics24_host::path::Path;
use ibc_relay_types::Height;

use crate::error::Error;

type Snapshot = BTreeMap<String, Vec<u8>>;

/// A key/value store keyed by ICS-24 paths, keeping a snapshot of its
/// contents for each of the last `window` committed heights.
#[derive(Clone, Debug)]
pub struct VersionedStore {
    chain_id: ChainId,
    window: usize,
    working: Snapshot,
    committed: BTreeMap<Height, Snapshot>,
}

impl VersionedStore {
    pub fn new(chain_id: ChainId, window: usize) -> Self {
        Self {
            chain_id,
            window: window.max(1),
            working: Snapshot::new(),
            committed: BTreeMap::new(),
        }
    }

    pub fn get(&self, path: &Path) -> Option<&[u8]> {
        self.working.get(&path.to_string()).map(Vec::as_slice)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.working.contains_key(&path.to_string())
    }

    pub fn set(&mut self, path: Path, value: Vec<u8>) {
        self.working.insert(path.to_string(), value);
    }

    pub fn delete(&mut self, path: &Path) {
        self.working.remove(&path.to_string());
    }

    pub fn get_json<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>, Error> {
        self.get(path)
            .map(|bytes| serde_json::from_slice(bytes).map_err(Error::decode))
            .transpose()
    }

    pub fn set_json<T: Serialize>(&mut self, path: Path, value: &T) -> Result<(), Error> {
        let bytes = serde_json::to_vec(value).map_err(Error::decode)?;
        self.set(path, bytes);
        Ok(())
    }

    /// Keys of the working state starting with `prefix`.
    pub fn keys_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.working
            .range(prefix.to_string()..)
            .map(|(key, _)| key.as_str())
            .take_while(move |key| key.starts_with(prefix))
    }

    /// Freezes the working state as the state at `height`, dropping the
    /// snapshots that fall out of the history window.
    pub fn commit(&mut self, height: Height) -> CommitmentRoot {
        self.committed.insert(height, self.working.clone());

        while self.committed.len() > self.window {
            self.committed.pop_first();
        }

        StoreProof::from_entries(&self.working).root()
    }

    fn snapshot(&self, height: Height) -> Result<&Snapshot, Error> {
        self.committed
            .get(&height)
            .ok_or_else(|| Error::height_not_available(self.chain_id.clone(), height))
    }

    pub fn get_at(&self, path: &Path, height: Height) -> Result<Option<&[u8]>, Error> {
        Ok(self
            .snapshot(height)?
            .get(&path.to_string())
            .map(Vec::as_slice))
    }

    pub fn get_json_at<T: DeserializeOwned>(
        &self,
        path: &Path,
        height: Height,
    ) -> Result<Option<T>, Error> {
        self.get_at(path, height)?
            .map(|bytes| serde_json::from_slice(bytes).map_err(Error::decode))
            .transpose()
    }

    pub fn keys_with_prefix_at<'a>(
        &'a self,
        prefix: &'a str,
        height: Height,
    ) -> Result<impl Iterator<Item = &'a str> + 'a, Error> {
        Ok(self
            .snapshot(height)?
            .range(prefix.to_string()..)
            .map(|(key, _)| key.as_str())
            .take_while(move |key| key.starts_with(prefix)))
    }

    pub fn root_at(&self, height: Height) -> Result<CommitmentRoot, Error> {
        Ok(StoreProof::from_entries(self.snapshot(height)?).root())
    }

    /// A proof of the whole state at `height`, from which the membership or
    /// absence of any path can be verified against the root at that height.
    pub fn proof_at(&self, height: Height) -> Result<CommitmentProofBytes, Error> {
        StoreProof::from_entries(self.snapshot(height)?)
            .encode()
            .map_err(Error::proof)
    }

    pub fn oldest_height(&self) -> Option<Height> {
        self.committed.keys().next().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use ibc_relay_types::core::ics04_channel::packet::Sequence;
    use ibc_relay_types::core::ics24_host::identifier::{ChannelId, PortId};
    use ibc_relay_types::core::ics24_host::path::{CommitmentsPath, ReceiptsPath};

    fn height(h: u64) -> Height {
        Height::new(0, h).unwrap()
    }

    fn commitment(sequence: u64) -> Path {
        CommitmentsPath {
            port_id: PortId::transfer(),
            channel_id: ChannelId::new(0),
            sequence: Sequence::from(sequence),
        }
        .into()
    }

    #[test]
    fn snapshots_are_isolated_from_later_writes() {
        let mut store = VersionedStore::new(ChainId::from_string("ibc-0"), 10);

        store.set(commitment(1), vec![1]);
        store.commit(height(1));

        store.delete(&commitment(1));
        store.set(commitment(2), vec![2]);
        store.commit(height(2));

        assert_eq!(store.get_at(&commitment(1), height(1)).unwrap(), Some(&[1u8][..]));
        assert_eq!(store.get_at(&commitment(1), height(2)).unwrap(), None);
        assert_eq!(store.get(&commitment(2)), Some(&[2u8][..]));
    }

    #[test]
    fn history_window_is_bounded() {
        let mut store = VersionedStore::new(ChainId::from_string("ibc-0"), 2);

        for h in 1..=3 {
            store.commit(height(h));
        }

        assert_eq!(store.oldest_height(), Some(height(2)));
        assert!(store.get_at(&commitment(1), height(1)).is_err());
    }

    #[test]
    fn proofs_verify_against_the_committed_root() {
        let mut store = VersionedStore::new(ChainId::from_string("ibc-0"), 10);

        store.set(commitment(1), vec![7]);
        let root = store.commit(height(1));
        assert_eq!(root, store.root_at(height(1)).unwrap());

        let proof = StoreProof::decode(&store.proof_at(height(1)).unwrap()).unwrap();
        proof.verify_membership(&root, &commitment(1), &[7]).unwrap();

        let receipt: Path = ReceiptsPath {
            port_id: PortId::transfer(),
            channel_id: ChannelId::new(0),
            sequence: Sequence::from(1),
        }
        .into();
        proof.verify_non_membership(&root, &receipt).unwrap();
    }

    #[test]
    fn prefix_scan() {
        let mut store = VersionedStore::new(ChainId::from_string("ibc-0"), 10);

        store.set(commitment(1), vec![1]);
        store.set(commitment(2), vec![2]);

        let keys = store
            .keys_with_prefix("commitments/ports/transfer/channels/channel-0/sequences/")
            .count();
        assert_eq!(keys, 2);
    }
}
