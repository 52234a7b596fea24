//! Store proofs.
//!
//! A [`StoreProof`] carries the digest of every entry of a store at a given
//! height. Its root is the hash over all `(path, value digest)` leaves in
//! path order, so a proof verifies against a trusted [`CommitmentRoot`] only
//! if it describes exactly the committed store. Membership of a path is then
//! checked by comparing the digest of the expected value with the leaf, and
//! non-membership by the absence of the leaf.

use std::collections::BTreeMap;

use serde_derive::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::commitment::{CommitmentProofBytes, CommitmentRoot};
use super::error::Error;
use crate::core::ics24_host::path::Path;

/// Digest of a value committed in the store.
pub fn value_digest(value: &[u8]) -> Vec<u8> {
    Sha256::digest(value).to_vec()
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreProof {
    leaves: BTreeMap<String, Vec<u8>>,
}

impl StoreProof {
    pub fn new(leaves: BTreeMap<String, Vec<u8>>) -> Self {
        Self { leaves }
    }

    /// Builds a proof from the raw store entries, hashing each value.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = (&'a String, &'a Vec<u8>)>) -> Self {
        let leaves = entries
            .into_iter()
            .map(|(path, value)| (path.clone(), value_digest(value)))
            .collect();

        Self { leaves }
    }

    /// Computes the commitment root this proof attests to.
    pub fn root(&self) -> CommitmentRoot {
        let mut hasher = Sha256::new();

        for (path, digest) in &self.leaves {
            hasher.update((path.len() as u64).to_be_bytes());
            hasher.update(path.as_bytes());
            hasher.update(digest);
        }

        CommitmentRoot::from(hasher.finalize().to_vec())
    }

    pub fn encode(&self) -> Result<CommitmentProofBytes, Error> {
        let bytes = serde_json::to_vec(self)
            .map_err(|e| Error::invalid_merkle_proof(e.to_string()))?;

        CommitmentProofBytes::try_from(bytes)
    }

    pub fn decode(proof: &CommitmentProofBytes) -> Result<Self, Error> {
        serde_json::from_slice(proof.as_bytes())
            .map_err(|e| Error::invalid_merkle_proof(e.to_string()))
    }

    fn check_root(&self, root: &CommitmentRoot) -> Result<(), Error> {
        if root.as_bytes().is_empty() {
            return Err(Error::empty_merkle_root());
        }

        if &self.root() != root {
            return Err(Error::mismatched_root());
        }

        Ok(())
    }

    pub fn verify_membership(
        &self,
        root: &CommitmentRoot,
        path: &Path,
        value: &[u8],
    ) -> Result<(), Error> {
        self.check_root(root)?;

        let key = path.to_string();
        match self.leaves.get(&key) {
            Some(digest) if digest == &value_digest(value) => Ok(()),
            _ => Err(Error::verification_failure(key)),
        }
    }

    pub fn verify_non_membership(&self, root: &CommitmentRoot, path: &Path) -> Result<(), Error> {
        self.check_root(root)?;

        let key = path.to_string();
        if self.leaves.contains_key(&key) {
            return Err(Error::non_membership_failure(key));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::core::ics04_channel::packet::Sequence;
    use crate::core::ics24_host::identifier::{ChannelId, PortId};
    use crate::core::ics24_host::path::{CommitmentsPath, ReceiptsPath};

    fn commitment_path(sequence: u64) -> Path {
        CommitmentsPath {
            port_id: PortId::transfer(),
            channel_id: ChannelId::new(0),
            sequence: Sequence::from(sequence),
        }
        .into()
    }

    fn store() -> BTreeMap<String, Vec<u8>> {
        let mut store = BTreeMap::new();
        store.insert(commitment_path(1).to_string(), b"one".to_vec());
        store.insert(commitment_path(2).to_string(), b"two".to_vec());
        store
    }

    #[test]
    fn membership_is_verified_against_root() {
        let entries = store();
        let proof = StoreProof::from_entries(&entries);
        let root = proof.root();

        assert!(proof
            .verify_membership(&root, &commitment_path(1), b"one")
            .is_ok());
        assert!(proof
            .verify_membership(&root, &commitment_path(1), b"two")
            .is_err());
        assert!(proof
            .verify_membership(&root, &commitment_path(3), b"three")
            .is_err());
    }

    #[test]
    fn non_membership_is_verified_against_root() {
        let entries = store();
        let proof = StoreProof::from_entries(&entries);
        let root = proof.root();

        let receipt: Path = ReceiptsPath {
            port_id: PortId::transfer(),
            channel_id: ChannelId::new(0),
            sequence: Sequence::from(1),
        }
        .into();

        assert!(proof.verify_non_membership(&root, &receipt).is_ok());
        assert!(proof
            .verify_non_membership(&root, &commitment_path(2))
            .is_err());
    }

    #[test]
    fn tampered_proof_does_not_match_root() {
        let entries = store();
        let root = StoreProof::from_entries(&entries).root();

        let mut forged = entries;
        forged.insert(commitment_path(3).to_string(), b"three".to_vec());
        let forged = StoreProof::from_entries(&forged);

        assert!(forged
            .verify_membership(&root, &commitment_path(3), b"three")
            .is_err());
    }

    #[test]
    fn proof_survives_encoding() {
        let entries = store();
        let proof = StoreProof::from_entries(&entries);
        let bytes = proof.encode().unwrap();

        assert_eq!(StoreProof::decode(&bytes).unwrap(), proof);
    }
}
