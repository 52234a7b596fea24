use serde_derive::{Deserialize, Serialize};

use crate::core::ics02_client::header::Header;
use crate::core::ics23_commitment::commitment::CommitmentRoot;
use crate::timestamp::Timestamp;

/// The consensus state of a counterparty chain at a given height, as recorded
/// by the light client that tracks it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusState {
    pub timestamp: Timestamp,
    pub root: CommitmentRoot,
    #[serde(with = "crate::serializers::hex")]
    pub next_validators_hash: Vec<u8>,
}

impl ConsensusState {
    pub fn new(root: CommitmentRoot, timestamp: Timestamp, next_validators_hash: Vec<u8>) -> Self {
        Self {
            timestamp,
            root,
            next_validators_hash,
        }
    }

    pub fn root(&self) -> &CommitmentRoot {
        &self.root
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

impl From<Header> for ConsensusState {
    fn from(header: Header) -> Self {
        Self {
            timestamp: header.timestamp,
            root: header.root,
            next_validators_hash: header.validators_hash,
        }
    }
}
