use serde_derive::{Deserialize, Serialize};

use crate::core::ics02_client::client_type::ClientType;
use crate::core::ics02_client::consensus_state::ConsensusState;
use crate::core::ics02_client::error::Error;
use crate::core::ics02_client::header::Header;
use crate::core::ics23_commitment::commitment::CommitmentProofBytes;
use crate::core::ics23_commitment::error::Error as CommitmentError;
use crate::core::ics23_commitment::proof::StoreProof;
use crate::core::ics24_host::identifier::ChainId;
use crate::core::ics24_host::path::Path;
use crate::Height;

/// Client state of a light client tracking a counterparty chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientState {
    pub chain_id: ChainId,
    pub latest_height: Height,
    pub frozen_height: Option<Height>,
}

impl ClientState {
    pub fn new(chain_id: ChainId, latest_height: Height) -> Self {
        Self {
            chain_id,
            latest_height,
            frozen_height: None,
        }
    }

    pub fn client_type(&self) -> ClientType {
        ClientType::Mock
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain_id.clone()
    }

    pub fn latest_height(&self) -> Height {
        self.latest_height
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen_height.is_some()
    }

    pub fn with_frozen_height(self, height: Height) -> Self {
        Self {
            frozen_height: Some(height),
            ..self
        }
    }

    /// Verifies `header` against the consensus state stored at the header's
    /// trusted height, and returns the client and consensus states that the
    /// update produces.
    pub fn check_header_and_update_state(
        &self,
        trusted: &ConsensusState,
        header: Header,
    ) -> Result<(ClientState, ConsensusState), Error> {
        if self.is_frozen() {
            return Err(Error::client_frozen(self.chain_id.clone()));
        }

        if header.chain_id != self.chain_id {
            return Err(Error::mismatched_chain_id(
                self.chain_id.clone(),
                header.chain_id,
            ));
        }

        if header.height <= header.trusted_height {
            return Err(Error::non_increasing_height(
                header.trusted_height,
                header.height,
            ));
        }

        if !header.timestamp.after(&trusted.timestamp) {
            return Err(Error::non_increasing_timestamp(
                trusted.timestamp,
                header.timestamp,
            ));
        }

        if header.validators_hash != trusted.next_validators_hash {
            return Err(Error::validator_set_mismatch(header.height));
        }

        let client_state = Self {
            latest_height: core::cmp::max(self.latest_height, header.height),
            ..self.clone()
        };

        Ok((client_state, ConsensusState::from(header)))
    }

    /// Verifies that `value` is stored at `path` in the counterparty state
    /// committed to by `consensus_state`.
    pub fn verify_membership(
        &self,
        consensus_state: &ConsensusState,
        proof: &CommitmentProofBytes,
        path: &Path,
        value: &[u8],
    ) -> Result<(), CommitmentError> {
        let proof = StoreProof::decode(proof)?;
        proof.verify_membership(consensus_state.root(), path, value)
    }

    /// Verifies that nothing is stored at `path` in the counterparty state
    /// committed to by `consensus_state`.
    pub fn verify_non_membership(
        &self,
        consensus_state: &ConsensusState,
        proof: &CommitmentProofBytes,
        path: &Path,
    ) -> Result<(), CommitmentError> {
        let proof = StoreProof::decode(proof)?;
        proof.verify_non_membership(consensus_state.root(), path)
    }
}
